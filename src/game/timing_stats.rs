#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TimingStats {
    pub mean_abs_ms: f32,
    pub mean_ms: f32,
    pub stddev_ms: f32,
    pub max_abs_ms: f32,
    pub count: usize,
}

/// Summarises signed hit offsets (ms, early negative). Misses are never fed
/// in, since they carry no meaningful offset.
#[inline(always)]
pub fn compute_timing_stats(offsets_ms: &[f32]) -> TimingStats {
    let count = offsets_ms.len();
    if count == 0 {
        return TimingStats::default();
    }

    let n = count as f32;
    let (sum_signed, sum_abs, max_abs_ms) = offsets_ms
        .iter()
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(signed, abs, max), &e| {
            (signed + e, abs + e.abs(), max.max(e.abs()))
        });
    let mean_ms = sum_signed / n;

    // Sample (n - 1) deviation around the signed mean.
    let stddev_ms = if count > 1 {
        let sq: f32 = offsets_ms.iter().map(|&e| (e - mean_ms).powi(2)).sum();
        (sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    TimingStats {
        mean_abs_ms: sum_abs / n,
        mean_ms,
        stddev_ms,
        max_abs_ms,
        count,
    }
}
