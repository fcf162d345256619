use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Countdown target and refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Countdown", inline)]
#[serde(default)]
pub struct CountdownOptions {
    /// `id` of the element showing the remaining time.
    pub element_id: String,
    /// Event start, RFC 3339 with offset.
    pub target: DateTime<FixedOffset>,
    /// Text shown once the event has started.
    pub finished_message: String,
    /// Refresh period while the event is far away, in seconds.
    #[schemars(title = "Slow Interval", range(min = 1))]
    pub slow_interval_secs: u64,
    /// Refresh period close to the event, in seconds.
    #[schemars(title = "Fast Interval", range(min = 1))]
    pub fast_interval_secs: u64,
    /// Remaining time below which the fast cadence applies, in minutes.
    #[schemars(title = "Fast Threshold", range(min = 1))]
    pub fast_threshold_mins: u64,
    /// How often the cadence is re-evaluated, in seconds.
    #[schemars(skip)]
    pub cadence_check_secs: u64,
}

impl Default for CountdownOptions {
    fn default() -> Self {
        Self {
            element_id: "countdown".into(),
            target: default_target(),
            finished_message: "Event is starting".into(),
            slow_interval_secs: 60,
            fast_interval_secs: 15,
            fast_threshold_mins: 120,
            cadence_check_secs: 60,
        }
    }
}

impl CountdownOptions {
    /// Refresh period while at least the threshold remains.
    #[must_use]
    pub fn slow_interval(&self) -> Duration {
        Duration::from_secs(self.slow_interval_secs)
    }

    /// Refresh period once under the threshold.
    #[must_use]
    pub fn fast_interval(&self) -> Duration {
        Duration::from_secs(self.fast_interval_secs)
    }

    /// Remaining time that switches to the fast cadence.
    #[must_use]
    pub fn fast_threshold(&self) -> Duration {
        Duration::from_secs(self.fast_threshold_mins.saturating_mul(60))
    }

    /// Cadence re-evaluation period.
    #[must_use]
    pub fn cadence_check(&self) -> Duration {
        Duration::from_secs(self.cadence_check_secs)
    }
}

/// 2025-11-05 16:45 Europe/Zurich (CET, UTC+1).
fn default_target() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .and_then(|cet| cet.with_ymd_and_hms(2025, 11, 5, 16, 45, 0).single())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_threshold_saturates() {
        let opts = CountdownOptions {
            fast_threshold_mins: u64::MAX,
            ..CountdownOptions::default()
        };
        assert_eq!(opts.fast_threshold(), Duration::from_secs(u64::MAX));
        assert_eq!(
            CountdownOptions::default().fast_threshold(),
            Duration::from_secs(2 * 60 * 60)
        );
    }

    #[test]
    fn huge_threshold_parses_from_toml() {
        let opts: CountdownOptions =
            toml::from_str("fast_threshold_mins = 9223372036854775807")
                .unwrap();
        assert!(opts.fast_threshold() > Duration::from_secs(i64::MAX as u64));
    }
}
