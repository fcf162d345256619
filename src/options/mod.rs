//! Page behavior options with TOML / JSON support.
//!
//! Every tweakable constant of the page (offsets, thresholds, delays,
//! selectors, messages, the event timestamp) lives here. Options load from
//! TOML on native targets and from a JSON `<script>` block on the page.

mod countdown;
mod form;
mod navigation;
mod page;
mod reveal;
mod scroll;

use std::path::Path;

pub use countdown::CountdownOptions;
pub use form::{FormOptions, ValidationMessages};
pub use navigation::NavigationOptions;
pub use page::PageChromeOptions;
pub use reveal::RevealOptions;
use schemars::JsonSchema;
pub use scroll::ScrollOptions;
use serde::{Deserialize, Serialize};

use crate::error::MeetupError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial files (e.g. only overriding `[countdown]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct PageOptions {
    /// Mobile menu and active-section highlighting.
    pub navigation: NavigationOptions,
    /// In-page anchor scrolling.
    pub scroll: ScrollOptions,
    /// Scroll-triggered reveal animations.
    pub reveal: RevealOptions,
    /// Registration form validation and submission.
    pub form: FormOptions,
    /// Event countdown.
    pub countdown: CountdownOptions,
    /// Header, scroll-to-top button, hero buttons and map link.
    pub page: PageChromeOptions,
}

impl PageOptions {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(PageOptions)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, MeetupError> {
        toml::from_str(content)
            .map_err(|e| MeetupError::OptionsParse(e.to_string()))
    }

    /// Parse options from JSON text. Missing fields use defaults.
    pub fn from_json_str(content: &str) -> Result<Self, MeetupError> {
        serde_json::from_str(content)
            .map_err(|e| MeetupError::OptionsParse(e.to_string()))
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, MeetupError> {
        let content = std::fs::read_to_string(path).map_err(MeetupError::Io)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = PageOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = PageOptions::from_toml_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[countdown]
target = "2026-03-01T18:00:00+01:00"
finished_message = "Doors open"
"#;
        let opts = PageOptions::from_toml_str(toml_str).unwrap();
        assert_eq!(opts.countdown.finished_message, "Doors open");
        assert_eq!(
            opts.countdown.target.to_rfc3339(),
            "2026-03-01T18:00:00+01:00"
        );
        // Everything else should be default
        assert_eq!(opts.countdown.slow_interval(), Duration::from_secs(60));
        assert_eq!(opts.form.form_id, "registrationForm");
        assert_eq!(opts.scroll.header_offset, 80.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let opts = PageOptions::from_json_str(
            r#"{ "form": { "success_rate": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(opts.form.success_rate, 1.0);
        assert_eq!(opts.form.submit_delay(), Duration::from_millis(1500));
        assert_eq!(opts.reveal.observer.threshold, 0.1);
    }

    #[test]
    fn malformed_input_is_an_options_error() {
        let err =
            PageOptions::from_toml_str("[countdown]\ntarget = 5").unwrap_err();
        assert!(matches!(err, MeetupError::OptionsParse(_)));
    }

    #[test]
    fn schema_lists_sections() {
        let schema = serde_json::to_value(PageOptions::json_schema()).unwrap();
        let props = schema.pointer("/properties").unwrap().as_object().unwrap();
        for key in
            ["navigation", "scroll", "reveal", "form", "countdown", "page"]
        {
            assert!(props.contains_key(key), "missing {key}");
        }
    }
}
