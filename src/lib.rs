// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Client-side behaviors for the meetup event-registration page.
//!
//! The page is static HTML; this crate adds the interactive parts: the
//! mobile menu and section highlighting, smooth in-page scrolling,
//! scroll-triggered reveal animations, the registration form with inline
//! validation and a simulated submission, the event countdown, and the
//! page chrome (header shadow, scroll-to-top button, hero buttons, map
//! link).
//!
//! # Key entry points
//!
//! - [`MeetupApp`] - mounts every behavior on a page
//! - [`env::Environment`] - the capability traits behaviors run against
//! - [`env::HeadlessEnv`] - an in-memory page with a virtual clock
//! - [`options::PageOptions`] - every tweakable constant, TOML / JSON
//!
//! # Architecture
//!
//! Each behavior is a `setup(env, options) -> Teardown` function. It looks
//! up its elements, attaches listeners, timers and observers through the
//! [`env::SharedEnv`] handle and returns the disposers. Missing elements
//! disable the behavior instead of failing. In the browser the `web`
//! feature provides `env::web::WebEnv`, backed by `web-sys`.

pub mod app;
pub mod countdown;
pub mod env;
pub mod error;
pub mod form;
pub mod navigation;
pub mod options;
pub mod page;
pub mod reveal;
pub mod scroll;

pub use app::{MeetupApp, MeetupAppBuilder};
pub use error::MeetupError;
pub use options::PageOptions;
