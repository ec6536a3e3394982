use std::time::Duration;

use crate::foundation::error::{RaceError, RaceResult};

/// Ordered years to render: every distinct year once, then the last year held for
/// `repeat_frames` extra steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationPlan {
    steps: Vec<i32>,
    repeat_frames: u32,
    interval: Duration,
}

impl AnimationPlan {
    /// `years` may arrive unsorted or with duplicates; steps always ascend.
    pub fn new(
        years: impl IntoIterator<Item = i32>,
        repeat_frames: u32,
        interval: Duration,
    ) -> RaceResult<Self> {
        let mut years: Vec<i32> = years.into_iter().collect();
        years.sort_unstable();
        years.dedup();

        let Some(&last) = years.last() else {
            return Err(RaceError::validation("animation needs at least one year"));
        };

        let mut steps = years;
        steps.extend(std::iter::repeat_n(last, repeat_frames as usize));
        Ok(Self {
            steps,
            repeat_frames,
            interval,
        })
    }

    pub fn steps(&self) -> &[i32] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of distinct years, excluding the held tail.
    pub fn distinct_years(&self) -> usize {
        self.steps.len() - self.repeat_frames as usize
    }

    /// Length of the preview at the configured step interval.
    pub fn nominal_duration(&self) -> Duration {
        self.interval.saturating_mul(self.steps.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_the_final_year() {
        let plan = AnimationPlan::new([2001, 2000, 2002], 3, Duration::from_millis(100)).unwrap();
        assert_eq!(plan.steps(), &[2000, 2001, 2002, 2002, 2002, 2002]);
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.distinct_years(), 3);
        assert_eq!(plan.steps().last(), Some(&2002));
        assert_eq!(plan.nominal_duration(), Duration::from_millis(600));
    }

    #[test]
    fn duplicates_collapse_and_zero_repeat_is_allowed() {
        let plan = AnimationPlan::new([1990, 1990, 1960], 0, Duration::ZERO).unwrap();
        assert_eq!(plan.steps(), &[1960, 1990]);
        assert_eq!(plan.nominal_duration(), Duration::ZERO);
    }

    #[test]
    fn length_is_years_plus_repeat() {
        for years in 1..6 {
            for repeat in 0..10u32 {
                let plan = AnimationPlan::new(2000..2000 + years, repeat, Duration::ZERO).unwrap();
                assert_eq!(plan.len(), years as usize + repeat as usize);
                let tail = &plan.steps()[plan.len() - repeat as usize..];
                assert!(tail.iter().all(|&y| y == 2000 + years - 1));
                assert!(plan.steps().windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn no_years_is_a_validation_error() {
        let err = AnimationPlan::new([], 8, Duration::ZERO).unwrap_err();
        assert!(matches!(err, RaceError::Validation(_)));
    }
}
