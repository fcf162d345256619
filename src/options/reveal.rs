use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::env::{ObserverConfig, RootMargin};

/// Scroll-triggered reveal animations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Reveal", inline)]
#[serde(default)]
pub struct RevealOptions {
    /// Selectors of the blocks that fade in.
    pub selectors: Vec<String>,
    /// When a block counts as visible.
    pub observer: ObserverConfig,
}

impl Default for RevealOptions {
    fn default() -> Self {
        let selectors = [
            ".detail-card",
            ".agenda__item",
            ".location__info",
            ".location__map",
            ".register__info",
            ".registration-form",
            ".section-title",
        ];
        Self {
            selectors: selectors.iter().map(|s| (*s).to_owned()).collect(),
            observer: ObserverConfig {
                threshold: 0.1,
                root_margin: RootMargin::vertical(0.0, -50.0),
            },
        }
    }
}

impl RevealOptions {
    /// All selectors joined into one selector list.
    #[must_use]
    pub fn selector_list(&self) -> String {
        self.selectors.join(", ")
    }
}
