//! The registration call, abstracted as a local future.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::env::{sleep, SharedEnv};

/// Why a registration call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The (simulated) network request failed.
    Network,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("Network error"),
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Field values submitted with a registration, keyed by field `name`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RegistrationRequest {
    /// `name` → value.
    pub fields: BTreeMap<String, String>,
}

/// Performs a registration.
///
/// Implementations return a future so the caller does not depend on how
/// the result is scheduled.
pub trait Registrar {
    /// Register with the given field values.
    fn register(
        &self,
        request: RegistrationRequest,
    ) -> LocalBoxFuture<'static, Result<(), RegistrationError>>;
}

/// Stand-in for a registration endpoint: resolves after a fixed delay and
/// fails with [`RegistrationError::Network`] at a configured rate.
pub struct SimulatedRegistrar<R = StdRng> {
    env: SharedEnv,
    delay: Duration,
    success_rate: f64,
    rng: RefCell<R>,
}

impl SimulatedRegistrar<StdRng> {
    /// Registrar seeded from the operating system.
    #[must_use]
    pub fn new(env: &SharedEnv, delay: Duration, success_rate: f64) -> Self {
        Self::with_rng(env, delay, success_rate, StdRng::from_os_rng())
    }
}

impl<R: Rng> SimulatedRegistrar<R> {
    /// Registrar drawing outcomes from `rng`.
    pub fn with_rng(
        env: &SharedEnv,
        delay: Duration,
        success_rate: f64,
        rng: R,
    ) -> Self {
        Self {
            env: SharedEnv::clone(env),
            delay,
            success_rate,
            rng: RefCell::new(rng),
        }
    }

    fn roll(&self) -> bool {
        let p = if self.success_rate.is_nan() {
            0.0
        } else {
            self.success_rate.clamp(0.0, 1.0)
        };
        self.rng.borrow_mut().random_bool(p)
    }
}

impl<R: Rng> Registrar for SimulatedRegistrar<R> {
    fn register(
        &self,
        request: RegistrationRequest,
    ) -> LocalBoxFuture<'static, Result<(), RegistrationError>> {
        log::debug!(
            "simulating registration of {} field(s), {:?} delay",
            request.fields.len(),
            self.delay
        );
        let succeeded = self.roll();
        let wait = sleep(&self.env, self.delay);
        Box::pin(async move {
            wait.await;
            if succeeded {
                Ok(())
            } else {
                Err(RegistrationError::Network)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::env::HeadlessEnv;

    fn run(
        success_rate: f64,
        seed: u64,
    ) -> (Rc<HeadlessEnv>, Rc<Cell<Option<Result<(), RegistrationError>>>>) {
        let headless = Rc::new(HeadlessEnv::new());
        let env: SharedEnv = headless.clone();
        let registrar = SimulatedRegistrar::with_rng(
            &env,
            Duration::from_millis(1500),
            success_rate,
            StdRng::seed_from_u64(seed),
        );
        let slot = Rc::new(Cell::new(None));
        let out = Rc::clone(&slot);
        let call = registrar.register(RegistrationRequest::default());
        env.spawn_local(Box::pin(async move {
            out.set(Some(call.await));
        }));
        (headless, slot)
    }

    #[test]
    fn resolves_only_after_delay() {
        let (env, slot) = run(1.0, 7);
        env.advance(Duration::from_millis(1499));
        assert_eq!(slot.take(), None);
        env.advance(Duration::from_millis(1));
        assert_eq!(slot.take(), Some(Ok(())));
    }

    #[test]
    fn zero_rate_always_fails() {
        let (env, slot) = run(0.0, 7);
        env.advance(Duration::from_millis(1500));
        assert_eq!(slot.take(), Some(Err(RegistrationError::Network)));
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        let (env, slot) = run(3.0, 1);
        env.advance(Duration::from_millis(1500));
        assert_eq!(slot.take(), Some(Ok(())));

        let (env, slot) = run(f64::NAN, 1);
        env.advance(Duration::from_millis(1500));
        assert_eq!(slot.take(), Some(Err(RegistrationError::Network)));
    }

    #[test]
    fn default_rate_mostly_succeeds() {
        let headless = Rc::new(HeadlessEnv::new());
        let env: SharedEnv = headless.clone();
        let registrar = SimulatedRegistrar::with_rng(
            &env,
            Duration::ZERO,
            0.95,
            StdRng::seed_from_u64(42),
        );
        let successes = (0..1000).filter(|_| registrar.roll()).count();
        assert!((900..=990).contains(&successes), "{successes}");
    }
}
