use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// In-page anchor scrolling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Smooth Scroll", inline)]
#[serde(default)]
pub struct ScrollOptions {
    /// Height of the fixed header subtracted from scroll targets, in pixels.
    #[schemars(title = "Header Offset", range(min = 0.0, max = 400.0))]
    pub header_offset: f64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            header_offset: 80.0,
        }
    }
}
