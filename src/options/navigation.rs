use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::env::{ObserverConfig, RootMargin};

/// Mobile menu and active-section highlighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Navigation", inline)]
#[serde(default)]
pub struct NavigationOptions {
    /// Height of the fixed header subtracted from scroll targets, in pixels.
    #[schemars(title = "Header Offset", range(min = 0.0, max = 400.0))]
    pub header_offset: f64,
    /// When a section counts as "current".
    pub section_observer: ObserverConfig,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            header_offset: 80.0,
            section_observer: ObserverConfig {
                threshold: 0.3,
                root_margin: RootMargin::vertical(-80.0, -80.0),
            },
        }
    }
}
