use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Header, scroll-to-top button, hero buttons and map link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Page", inline)]
#[serde(default)]
pub struct PageChromeOptions {
    /// Scroll offset after which the header gets its `scrolled` style.
    #[schemars(title = "Header Shadow After", range(min = 0.0))]
    pub header_scrolled_after: f64,
    /// Scroll offset after which the scroll-to-top button shows.
    #[schemars(title = "Scroll-To-Top After", range(min = 0.0))]
    pub scroll_top_after: f64,
    /// Delay before the first registration field is focused, in
    /// milliseconds.
    #[schemars(skip)]
    pub cta_focus_delay_ms: u64,
    /// Venue address searched when the map placeholder is clicked.
    pub map_address: String,
    /// Map search URL; the encoded address is appended.
    pub map_search_url: String,
}

impl Default for PageChromeOptions {
    fn default() -> Self {
        Self {
            header_scrolled_after: 50.0,
            scroll_top_after: 300.0,
            cta_focus_delay_ms: 500,
            map_address: "isolutions AG, The circle 38, Kloten, Switzerland"
                .into(),
            map_search_url: "https://www.google.com/maps/search/?api=1&query="
                .into(),
        }
    }
}

impl PageChromeOptions {
    /// Delay before focusing the first registration field.
    #[must_use]
    pub fn cta_focus_delay(&self) -> Duration {
        Duration::from_millis(self.cta_focus_delay_ms)
    }
}
