//! Two-phase timing.
//!
//! A two-phase run lasts `duration + element_duration`. The global progress
//! `p` covers that whole span; the first `duration` of it staggers element
//! starts and the remainder lets the last elements finish.

use std::time::Duration;

pub fn expected_duration(duration: Duration, element_duration: Duration) -> Duration {
    duration + element_duration
}

fn secs(d: Duration) -> f32 {
    d.as_secs_f32()
}

/// `s = min(1, p·expected/duration)`.
pub fn start_phase_progress(global: f32, duration: Duration, expected: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    (global.clamp(0.0, 1.0) * secs(expected) / secs(duration)).min(1.0)
}

pub fn is_started(global: f32, threshold: f32, duration: Duration, expected: Duration) -> bool {
    start_phase_progress(global, duration, expected) >= threshold
}

/// Local progress of one element at global progress `global`.
///
/// The element starts at `p0 = threshold·duration/expected` and then advances
/// at `expected/element_duration` per unit of global progress. Every element
/// is complete at `global == 1`.
pub fn element_progress(
    global: f32,
    threshold: f32,
    duration: Duration,
    expected: Duration,
    element_duration: Duration,
) -> f32 {
    let global = global.clamp(0.0, 1.0);
    if global >= 1.0 {
        return 1.0;
    }
    if !is_started(global, threshold, duration, expected) {
        return 0.0;
    }
    if element_duration.is_zero() || expected.is_zero() {
        return 1.0;
    }
    let start = threshold.clamp(0.0, 1.0) * secs(duration) / secs(expected);
    ((global - start) * secs(expected) / secs(element_duration)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: Duration = Duration::from_millis(1000);
    const ED: Duration = Duration::from_millis(500);

    #[test]
    fn start_phase_saturates_before_end() {
        let e = expected_duration(D, ED);
        assert_eq!(e, Duration::from_millis(1500));
        assert!((start_phase_progress(0.5, D, e) - 0.75).abs() < 1e-6);
        assert_eq!(start_phase_progress(0.9, D, e), 1.0);
    }

    #[test]
    fn element_waits_for_threshold() {
        let e = expected_duration(D, ED);
        assert_eq!(element_progress(0.3, 0.5, D, e, ED), 0.0);
        // starts at p0 = 0.5 * 1000/1500 = 1/3
        let p = 1.0 / 3.0 + 0.1;
        let expected = 0.1 * 1500.0 / 500.0;
        assert!((element_progress(p, 0.5, D, e, ED) - expected).abs() < 1e-5);
    }

    #[test]
    fn last_started_element_finishes_at_global_end() {
        let e = expected_duration(D, ED);
        assert_eq!(element_progress(1.0, 1.0, D, e, ED), 1.0);
        assert_eq!(element_progress(1.0, 0.0, D, e, ED), 1.0);
    }

    #[test]
    fn element_progress_is_monotonic_in_global() {
        let e = expected_duration(D, ED);
        let mut last = 0.0;
        for step in 0..=200 {
            let v = element_progress(step as f32 / 200.0, 0.42, D, e, ED);
            assert!(v >= last);
            last = v;
        }
    }
}
