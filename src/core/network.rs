use crate::game::beatmap::NoteRecord;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::time::Duration;

const GENERATOR_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GENERATOR_MODEL: &str = "gemini-3-flash-preview";
const API_KEY_ENV: &str = "API_KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_INSTRUCTION: &str = "\
You are a rhythm game level designer. \
Create a JSON beatmap for a 4-key rhythm game based on the song description. \
Lanes are 0, 1, 2, 3. \
Time is in seconds. \
The song is approx 60 seconds long. \
Output pure JSON.";

#[derive(Deserialize, Debug)]
struct GeneratePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GenerateContent {
    #[serde(default)]
    parts: Vec<GeneratePart>,
}

#[derive(Deserialize, Debug)]
struct GenerateCandidate {
    content: Option<GenerateContent>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.text.as_deref())
    }
}

/// Shared agent for outgoing requests.
pub fn get_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build()
        .into()
}

fn request_body(description: &str) -> serde_json::Value {
    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{
            "role": "user",
            "parts": [{ "text": format!("Song style: {description}. Generate 20-30 notes.") }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "time": { "type": "NUMBER" },
                        "lane": { "type": "INTEGER" },
                        "type": { "type": "STRING" },
                        "duration": { "type": "NUMBER" }
                    },
                    "required": ["time", "lane", "type"]
                }
            }
        }
    })
}

/// Pulls the note list out of a generateContent response body.
fn parse_generated_notes(
    response: &GenerateResponse,
) -> Result<Vec<NoteRecord>, Box<dyn Error + Send + Sync>> {
    let Some(text) = response.first_text() else {
        return Ok(Vec::new());
    };
    let notes: Vec<NoteRecord> = serde_json::from_str(text.trim())?;
    Ok(notes)
}

fn request_beatmap(
    api_key: &str,
    model: &str,
    description: &str,
) -> Result<Vec<NoteRecord>, Box<dyn Error + Send + Sync>> {
    let url = format!("{GENERATOR_API_BASE}/{model}:generateContent");
    let agent = get_agent();
    let response = agent
        .post(&url)
        .header("x-goog-api-key", api_key)
        .send_json(request_body(description))?;

    if response.status() != 200 {
        return Err(format!("API returned status {}", response.status()).into());
    }

    let body: GenerateResponse = response.into_body().read_json()?;
    parse_generated_notes(&body)
}

/// Asks the generator service for a beatmap matching `description`.
///
/// Never fails: a missing key, transport error, or unparseable reply all
/// yield an empty list so the caller can fall back to a built-in chart. The
/// records are unvalidated and must still go through `Beatmap::from_records`.
pub fn generate_beatmap(description: &str, model: &str) -> Vec<NoteRecord> {
    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(k) if !k.trim().is_empty() => k,
        _ => {
            warn!("No {API_KEY_ENV} set in the environment. Returning empty beatmap.");
            return Vec::new();
        }
    };
    let model = if model.trim().is_empty() {
        DEFAULT_GENERATOR_MODEL
    } else {
        model.trim()
    };

    info!("Requesting generated beatmap from '{model}'...");
    match request_beatmap(&api_key, model, description) {
        Ok(notes) => {
            info!("Generator returned {} notes.", notes.len());
            notes
        }
        Err(e) => {
            warn!("Beatmap generation failed: {e}");
            Vec::new()
        }
    }
}
