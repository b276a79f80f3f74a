//! Motion Scorer (component C): per-frame L1 mean-abs-diff over a raw
//! grayscale byte stream. Pure function, no I/O.

/// Bytes per sampled frame: `160 * 90` grayscale pixels.
pub const FRAME_SIZE: usize = 160 * 90;

/// Computes `N = floor(buf.len() / frame_size)` motion scores, one per
/// sampled frame. `score[0]` is always `0.0`; for `i >= 1` it is the mean
/// absolute per-byte difference against frame `i - 1`, normalised to `[0, 1]`.
pub fn score(buf: &[u8], frame_size: usize) -> Vec<f64> {
    if frame_size == 0 {
        return Vec::new();
    }
    let n = buf.len() / frame_size;
    if n == 0 {
        return Vec::new();
    }

    let mut scores = Vec::with_capacity(n);
    scores.push(0.0);
    for i in 1..n {
        let prev = &buf[(i - 1) * frame_size..i * frame_size];
        let curr = &buf[i * frame_size..(i + 1) * frame_size];
        let sum: u64 = prev
            .iter()
            .zip(curr.iter())
            .map(|(&a, &b)| a.abs_diff(b) as u64)
            .sum();
        scores.push(sum as f64 / frame_size as f64 / 255.0);
    }
    scores
}
