//! WASM bundle of the meetup page behaviors.
//!
//! Load the generated module on the event page; behaviors mount as soon as
//! the document is ready. Page options can be overridden with a
//! `<script id="meetup-options" type="application/json">` block.

use wasm_bindgen::prelude::*;

/// Mount every page behavior. Runs automatically when the module loads.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    meetup::env::web::start().map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Detach every listener, timer and observer added by [`start`].
#[wasm_bindgen]
pub fn unmount() {
    meetup::env::web::unmount();
}
