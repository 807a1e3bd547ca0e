use std::time::Duration;

/// Uniform random duration in `[0, max)`, millisecond resolution.
///
/// Xorshift seeded from the clock: good enough to de-synchronise request
/// timing, not for anything that needs real randomness.
pub fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x |= 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    Duration::from_millis(x % max_ms)
}

/// Pick an index below `len` with the same generator. `len` must be non-zero.
pub fn pick_index(len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    jitter(Duration::from_millis(len as u64)).as_millis() as usize
}

/// Keep at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
