//! Segmenter (component E): threshold -> run-length -> min-length filter ->
//! pre/post padding -> merge overlaps. Pure function, no I/O.

/// A half-open time range `[start, end)` in seconds relative to the source video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

struct Run {
    start_index: usize,
    /// Exclusive end index, or `None` when the run reaches the end of the array.
    end_index: Option<usize>,
}

fn run_length(active: &[bool]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut current_start: Option<usize> = None;
    for (i, &is_active) in active.iter().enumerate() {
        match (is_active, current_start) {
            (true, None) => current_start = Some(i),
            (false, Some(start)) => {
                runs.push(Run {
                    start_index: start,
                    end_index: Some(i),
                });
                current_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current_start {
        runs.push(Run {
            start_index: start,
            end_index: None,
        });
    }
    runs
}

/// Runs the full segmenter pipeline against a (typically smoothed) score
/// sequence, producing strictly ordered, non-overlapping, padded time ranges.
#[allow(clippy::too_many_arguments)]
pub fn segment(
    smoothed: &[f64],
    sample_fps: f64,
    threshold: f64,
    min_segment_length: f64,
    pre_roll: f64,
    post_roll: f64,
    duration: f64,
) -> Vec<TimeRange> {
    let active: Vec<bool> = smoothed.iter().map(|&v| v >= threshold).collect();
    let runs = run_length(&active);

    // Run-length -> raw time ranges. A run reaching the end of the array
    // extends to `duration` rather than `active.len() / sample_fps` — this
    // asymmetry with inner runs is intentional, see design notes.
    let raw: Vec<TimeRange> = runs
        .into_iter()
        .map(|run| {
            let start = run.start_index as f64 / sample_fps;
            let end = match run.end_index {
                Some(idx) => idx as f64 / sample_fps,
                None => duration,
            };
            TimeRange::new(start, end)
        })
        .collect();

    // Min-length filter (pre-padding).
    let filtered: Vec<TimeRange> = raw
        .into_iter()
        .filter(|r| r.duration() >= min_segment_length)
        .collect();

    // Padding, clamped to [0, duration].
    let padded: Vec<TimeRange> = filtered
        .into_iter()
        .map(|r| {
            TimeRange::new(
                (r.start - pre_roll).max(0.0),
                (r.end + post_roll).min(duration),
            )
        })
        .collect();

    // Merge overlapping/adjacent segments in order.
    let mut merged: Vec<TimeRange> = Vec::with_capacity(padded.len());
    for seg in padded {
        match merged.last_mut() {
            Some(last) if seg.start <= last.end => {
                last.end = last.end.max(seg.end);
            }
            _ => merged.push(seg),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores_with_active_range(len: usize, range: std::ops::Range<usize>, value: f64) -> Vec<f64> {
        let mut xs = vec![0.0; len];
        for i in range {
            xs[i] = value;
        }
        xs
    }

    #[test]
    fn scenario_1_all_quiet_yields_no_segments() {
        let scores = vec![0.0; 40];
        let segs = segment(&scores, 2.0, 0.02, 3.0, 1.0, 1.0, 20.0);
        assert!(segs.is_empty());
    }

    #[test]
    fn scenario_2_single_active_region_no_padding() {
        let scores = scores_with_active_range(40, 4..=11, 0.1);
        let segs = segment(&scores, 2.0, 0.02, 3.0, 0.0, 0.0, 20.0);
        assert_eq!(segs.len(), 1);
        assert!((segs[0].start - 2.0).abs() < 1e-9);
        assert!((segs[0].end - 6.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_3_too_short_is_dropped() {
        let scores = scores_with_active_range(20, 4..=5, 0.1);
        let segs = segment(&scores, 2.0, 0.02, 3.0, 0.0, 0.0, 10.0);
        assert!(segs.is_empty());
    }

    #[test]
    fn scenario_4_padding_applied() {
        let scores = scores_with_active_range(40, 10..=19, 0.1);
        let segs = segment(&scores, 2.0, 0.02, 3.0, 1.0, 2.0, 20.0);
        assert_eq!(segs.len(), 1);
        assert!((segs[0].start - 4.0).abs() < 1e-9);
        assert!((segs[0].end - 12.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_5_overlap_merges_into_one() {
        let mut scores = vec![0.0; 40];
        for i in 4..=10 {
            scores[i] = 0.1;
        }
        for i in 12..=18 {
            scores[i] = 0.1;
        }
        let segs = segment(&scores, 2.0, 0.02, 3.0, 1.0, 1.0, 20.0);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn p6_segments_are_ordered_non_overlapping_and_bounded() {
        let mut scores = vec![0.0; 60];
        for i in 2..=6 {
            scores[i] = 0.1;
        }
        for i in 20..=26 {
            scores[i] = 0.1;
        }
        for i in 40..=50 {
            scores[i] = 0.1;
        }
        let segs = segment(&scores, 2.0, 0.02, 1.0, 0.5, 0.5, 30.0);
        for w in segs.windows(2) {
            assert!(w[0].end <= w[1].start);
        }
        for s in &segs {
            assert!(s.start >= 0.0 && s.end <= 30.0);
            assert!(s.start < s.end);
        }
    }

    #[test]
    fn p7_surviving_segments_meet_min_length_before_padding() {
        let scores = scores_with_active_range(40, 4..=11, 0.1);
        let segs = segment(&scores, 2.0, 0.02, 3.0, 0.0, 0.0, 20.0);
        // Duration here already includes padding of 0, so this directly
        // checks the pre-padding invariant.
        assert!(segs[0].duration() >= 3.0);
    }

    #[test]
    fn p8_merge_end_is_max_of_the_two() {
        let mut scores = vec![0.0; 40];
        for i in 4..=10 {
            scores[i] = 0.1;
        }
        for i in 11..=14 {
            scores[i] = 0.1;
        }
        let segs = segment(&scores, 2.0, 0.02, 1.0, 1.0, 1.0, 20.0);
        assert_eq!(segs.len(), 1);
        assert!((segs[0].end - (14.0 / 2.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn threshold_tie_break_is_inclusive() {
        let scores = vec![0.02, 0.02, 0.02, 0.02, 0.02, 0.02, 0.0, 0.0];
        let segs = segment(&scores, 2.0, 0.02, 1.0, 0.0, 0.0, 10.0);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn pre_roll_clamps_to_zero_without_shortening_end() {
        let scores = scores_with_active_range(10, 0..=3, 0.1);
        let segs = segment(&scores, 2.0, 0.02, 1.0, 5.0, 0.0, 10.0);
        assert_eq!(segs[0].start, 0.0);
    }

    #[test]
    fn final_run_reaching_array_end_extends_to_duration() {
        let scores = scores_with_active_range(10, 6..=9, 0.1);
        let segs = segment(&scores, 2.0, 0.02, 1.0, 0.0, 0.0, 20.0);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].end, 20.0);
    }
}
