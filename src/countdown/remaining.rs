use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Whole minutes left until the event, split into days, hours and minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Remaining {
    /// Full days.
    pub days: i64,
    /// Hours within the last day (0-23).
    pub hours: i64,
    /// Minutes within the last hour (0-59).
    pub minutes: i64,
}

impl Remaining {
    /// Time left from `now` until `target`, or `None` once the target has
    /// been reached.
    #[must_use]
    pub fn until(now: DateTime<Utc>, target: DateTime<Utc>) -> Option<Self> {
        let left = target - now;
        (left > TimeDelta::zero())
            .then(|| Self::from_minutes(left.num_minutes()))
    }

    /// Split a minute count.
    #[must_use]
    pub const fn from_minutes(total: i64) -> Self {
        Self {
            days: total / MINUTES_PER_DAY,
            hours: total % MINUTES_PER_DAY / MINUTES_PER_HOUR,
            minutes: total % MINUTES_PER_HOUR,
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d ", self.days)?;
        }
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn days_only_when_nonzero() {
        assert_eq!(
            Remaining::from_minutes(2 * 1440 + 3 * 60 + 15).to_string(),
            "2d 3h 15m"
        );
        assert_eq!(Remaining::from_minutes(65).to_string(), "1h 5m");
        assert_eq!(Remaining::from_minutes(0).to_string(), "0h 0m");
        assert_eq!(Remaining::from_minutes(1440).to_string(), "1d 0h 0m");
    }

    #[test]
    fn partial_minutes_round_down() {
        let now = Utc::now();
        let left = Remaining::until(now, now + Duration::seconds(119));
        assert_eq!(left, Some(Remaining::from_minutes(1)));
        let left = Remaining::until(now, now + Duration::seconds(30));
        assert_eq!(left.map(|r| r.to_string()).as_deref(), Some("0h 0m"));
    }

    #[test]
    fn reached_target_has_nothing_left() {
        let now = Utc::now();
        assert_eq!(Remaining::until(now, now), None);
        assert_eq!(Remaining::until(now, now - Duration::minutes(5)), None);
    }
}
