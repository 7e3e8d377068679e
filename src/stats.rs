//! Small numeric helpers shared by the summary endpoints.

use serde::Serialize;

/// Rounds to two decimals, halves away from zero.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `part / whole * 100`, rounded to two decimals; an empty whole yields 0.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

/// Running mean: only the sum and the count are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Average {
    pub sum: f64,
    pub count: u32,
}

impl Average {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn percentage_guards_empty_denominator() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn average_tracks_sum_and_count() {
        let mut avg = Average::default();
        assert_eq!(avg.mean(), None);
        avg.push(80.0);
        avg.push(90.0);
        avg.push(100.0);
        assert_eq!(avg.count, 3);
        assert_eq!(avg.mean(), Some(90.0));
    }
}
