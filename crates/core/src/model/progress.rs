use std::fmt;

/// Integer completion percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Clamps an arbitrary value into range.
    #[must_use]
    pub fn clamped(value: u32) -> Self {
        // Bounded by the `min`, so the narrowing is lossless.
        #[allow(clippy::cast_possible_truncation)]
        Self(value.min(100) as u8)
    }

    /// `round(100 * done / total)`, or zero when `total` is zero.
    ///
    /// Halves round up, matching how progress has always been displayed.
    #[must_use]
    pub fn from_ratio(done: usize, total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let done = done.min(total) as u64;
        let total = total as u64;
        let rounded = (200 * done + total) / (2 * total);
        Self::clamped(u32::try_from(rounded).unwrap_or(100))
    }

    /// Rounded arithmetic mean of the given values, or zero for none.
    #[must_use]
    pub fn mean<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Progress>,
    {
        let (sum, count) = values
            .into_iter()
            .fold((0_u64, 0_u64), |(sum, count), p| {
                (sum + u64::from(p.0), count + 1)
            });
        if count == 0 {
            return Self::ZERO;
        }
        let rounded = (2 * sum + count) / (2 * count);
        Self::clamped(u32::try_from(rounded).unwrap_or(100))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_empty_set_is_zero() {
        assert_eq!(Progress::from_ratio(0, 0), Progress::ZERO);
    }

    #[test]
    fn ratio_rounds_half_up() {
        assert_eq!(Progress::from_ratio(1, 8).value(), 13);
        assert_eq!(Progress::from_ratio(1, 3).value(), 33);
        assert_eq!(Progress::from_ratio(2, 3).value(), 67);
        assert_eq!(Progress::from_ratio(1, 2).value(), 50);
        assert_eq!(Progress::from_ratio(4, 4), Progress::COMPLETE);
    }

    #[test]
    fn mean_rounds_half_up() {
        let values = [Progress::clamped(50), Progress::clamped(51)];
        assert_eq!(Progress::mean(values).value(), 51);

        let values = [Progress::clamped(33), Progress::clamped(0), Progress::clamped(0)];
        assert_eq!(Progress::mean(values).value(), 11);
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(Progress::mean(std::iter::empty()), Progress::ZERO);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Progress::clamped(250), Progress::COMPLETE);
        assert_eq!(Progress::clamped(100).to_string(), "100%");
    }
}
