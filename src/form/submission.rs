//! Submission phases of the registration form.

/// Where a form is in its submit cycle.
///
/// ```text
/// Idle → Validating → Invalid
///                   → Submitting → Succeeded → Idle
///                                → Failed    → Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Checking every required field.
    Validating,
    /// Validation failed; errors are shown and nothing was sent.
    Invalid,
    /// The registration call is in flight.
    Submitting,
    /// The call succeeded; the success banner is up.
    Succeeded,
    /// The call failed; the error banner is up.
    Failed,
}

/// Input to [`Phase::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The form was submitted.
    Submit,
    /// Every required field passed.
    Valid,
    /// At least one required field failed.
    Invalid,
    /// The registration call resolved successfully.
    Succeeded,
    /// The registration call failed.
    Failed,
    /// The submit button was restored.
    Settled,
}

impl Phase {
    /// Phase after `step`. Steps that do not apply leave the phase as is.
    ///
    /// `Submit` is accepted in every phase: only the disabled submit
    /// button keeps a second submission from starting.
    #[must_use]
    pub fn next(self, step: Step) -> Self {
        match (self, step) {
            (_, Step::Submit) => Self::Validating,
            (Self::Validating, Step::Valid) => Self::Submitting,
            (Self::Validating, Step::Invalid) => Self::Invalid,
            (Self::Submitting, Step::Succeeded) => Self::Succeeded,
            (Self::Submitting, Step::Failed) => Self::Failed,
            (Self::Succeeded | Self::Failed, Step::Settled) => Self::Idle,
            (phase, _) => phase,
        }
    }

    /// Whether a registration call is in flight.
    #[must_use]
    pub fn is_submitting(self) -> bool {
        self == Self::Submitting
    }
}
