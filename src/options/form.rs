use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Inline messages shown next to invalid fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Validation Messages", inline)]
#[serde(default)]
pub struct ValidationMessages {
    /// Required field left empty.
    pub required: String,
    /// Email field failing the address pattern.
    pub invalid_email: String,
    /// First name shorter than two characters.
    pub first_name_too_short: String,
    /// Last name shorter than two characters.
    pub last_name_too_short: String,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self {
            required: "This field is required".into(),
            invalid_email: "Please enter a valid email address".into(),
            first_name_too_short: "First name must be at least 2 characters"
                .into(),
            last_name_too_short: "Last name must be at least 2 characters"
                .into(),
        }
    }
}

/// Registration form wiring and the simulated registration call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Registration Form", inline)]
#[serde(default)]
pub struct FormOptions {
    /// `id` of the `<form>` element.
    pub form_id: String,
    /// Submit button label while the call is in flight.
    pub busy_label: String,
    /// Simulated network delay, in milliseconds.
    #[schemars(title = "Submit Delay", range(min = 0, max = 10000))]
    pub submit_delay_ms: u64,
    /// Probability that the simulated call succeeds.
    #[schemars(
        title = "Success Rate",
        range(min = 0.0, max = 1.0),
        extend("step" = 0.05)
    )]
    pub success_rate: f64,
    /// How long banners stay up, in milliseconds.
    #[schemars(title = "Banner Duration", range(min = 0))]
    pub banner_dismiss_ms: u64,
    /// Success banner heading.
    pub success_title: String,
    /// Success banner paragraph.
    pub success_body: String,
    /// Error banner text.
    pub failure_message: String,
    /// Inline field messages.
    pub messages: ValidationMessages,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            form_id: "registrationForm".into(),
            busy_label: "Registering...".into(),
            submit_delay_ms: 1500,
            success_rate: 0.95,
            banner_dismiss_ms: 5000,
            success_title: "\u{1f389} Registration Successful!".into(),
            success_body: "Thank you for registering! You'll receive a \
                           confirmation email shortly with event details \
                           and updates."
                .into(),
            failure_message: "Registration failed. Please try again.".into(),
            messages: ValidationMessages::default(),
        }
    }
}

impl FormOptions {
    /// Simulated network delay.
    #[must_use]
    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    /// Banner lifetime.
    #[must_use]
    pub fn banner_dismiss(&self) -> Duration {
        Duration::from_millis(self.banner_dismiss_ms)
    }
}
