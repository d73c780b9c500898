/// `delay_n = min(maxDelay, initial * factor^(n-1) * (1 + 0.2*jitter))`.
///
/// `jitter_sample` is expected in `[0, 1)`; callers pass `rand::random()` in
/// production and fixed values in tests to keep the formula itself
/// deterministic and independently checkable.
pub fn retry_delay_ms(attempt: u32, initial_ms: u64, factor: f64, max_ms: u64, jitter_sample: f64) -> u64 {
    let n = attempt.max(1) as i32;
    let base = initial_ms as f64 * factor.powi(n - 1);
    let jittered = base * (1.0 + 0.2 * jitter_sample);
    jittered.min(max_ms as f64).round() as u64
}
