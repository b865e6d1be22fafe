//! Window lookup over an axis series

use std::ops::Range;

/// Index range of the contiguous run of `axis` values inside `[min, max]`.
///
/// The run spans from the first to the last matching index, so for a sorted
/// axis it covers exactly the matching values. `None` when nothing matches.
pub fn window_range(axis: &[f64], min: f64, max: f64) -> Option<Range<usize>> {
    let inside = |v: &f64| *v >= min && *v <= max;
    let start = axis.iter().position(inside)?;
    let end = axis.iter().rposition(inside)?;
    Some(start..end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_bounds() {
        assert_eq!(window_range(&[1.0, 2.0, 3.0, 4.0, 5.0], 2.0, 4.0), Some(1..4));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(window_range(&[1.0, 2.0, 3.0], 100.0, 200.0), None);
        assert_eq!(window_range(&[], 0.0, 1.0), None);
    }

    #[test]
    fn test_nan_never_matches() {
        assert_eq!(window_range(&[f64::NAN, 2.0, f64::NAN], 0.0, 10.0), Some(1..2));
    }

    #[test]
    fn test_inverted_bounds_match_nothing() {
        assert_eq!(window_range(&[1.0, 2.0, 3.0], 3.0, 1.0), None);
    }
}
