pub struct Math {}

impl Math {
    /// mean of the present values, truncated to whole milliseconds.
    /// absent values are skipped entirely, they do not count towards the
    /// denominator. `None` when nothing is present.
    pub fn mean_millis(values: &[Option<i64>]) -> Option<i64> {
        let mut sum: i64 = 0;
        let mut count: i64 = 0;
        for value in values {
            if let Some(millis) = value {
                sum += millis;
                count += 1;
            }
        }

        if count == 0 {
            return None;
        }
        Some(sum / count)
    }

    /// minimum of the present values. `None` when nothing is present.
    pub fn min_millis(values: &[Option<i64>]) -> Option<i64> {
        values.iter().flatten().min().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::Math;

    #[test]
    fn mean_skips_absent_values() {
        assert_eq!(Math::mean_millis(&[Some(40_000), None, Some(50_000)]), Some(45_000));
    }

    #[test]
    fn mean_truncates_to_whole_milliseconds() {
        assert_eq!(Math::mean_millis(&[Some(100), Some(101), Some(101)]), Some(100));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(Math::mean_millis(&[]), None);
        assert_eq!(Math::mean_millis(&[None, None]), None);
    }

    #[test]
    fn min_skips_absent_values() {
        assert_eq!(Math::min_millis(&[None, Some(42_000), Some(41_000)]), Some(41_000));
        assert_eq!(Math::min_millis(&[None]), None);
    }
}
