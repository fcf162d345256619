//! Live countdown to the event start.
//!
//! The display is refreshed every minute while the event is far away and
//! every 15 seconds once less than two hours remain. The switch happens
//! at most once. When the event starts the finished message is shown and
//! every countdown timer is cleared.

mod remaining;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};

pub use remaining::Remaining;

use crate::env::{require_id, ElementRef, SharedEnv, Teardown, TimerId};
use crate::options::CountdownOptions;

/// Refresh rate of the countdown display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// At least the fast threshold remains.
    Slow,
    /// Under the fast threshold.
    Fast,
}

impl Cadence {
    /// Cadence for `left` time remaining.
    #[must_use]
    pub fn for_remaining(left: Duration, options: &CountdownOptions) -> Self {
        if left < options.fast_threshold() {
            Self::Fast
        } else {
            Self::Slow
        }
    }

    /// Refresh period for this cadence.
    #[must_use]
    pub fn period(self, options: &CountdownOptions) -> Duration {
        match self {
            Self::Slow => options.slow_interval(),
            Self::Fast => options.fast_interval(),
        }
    }
}

/// Text the countdown shows at `now`.
#[must_use]
pub fn render(options: &CountdownOptions, now: DateTime<Utc>) -> String {
    Remaining::until(now, options.target.with_timezone(&Utc))
        .map_or_else(|| options.finished_message.clone(), |r| r.to_string())
}

/// Start the countdown. Returns an empty teardown when `#countdown` is
/// not on the page.
pub fn setup(env: &SharedEnv, options: &CountdownOptions) -> Teardown {
    let el = match require_id(env, &options.element_id) {
        Ok(el) => el,
        Err(e) => {
            log::debug!("countdown disabled: {e}");
            return Teardown::new();
        }
    };
    let countdown = Rc::new(Countdown {
        env: SharedEnv::clone(env),
        el,
        options: options.clone(),
        tick: Cell::new(None),
        check: Cell::new(None),
        cadence: Cell::new(Cadence::Slow),
    });

    if countdown.update() {
        let cadence = countdown.left().map_or(Cadence::Fast, |left| {
            Cadence::for_remaining(left, options)
        });
        Countdown::start(&countdown, cadence);
        if cadence == Cadence::Slow {
            Countdown::start_check(&countdown);
        }
    }

    let mut teardown = Teardown::new();
    teardown.push(move || countdown.stop());
    teardown
}

struct Countdown {
    env: SharedEnv,
    el: ElementRef,
    options: CountdownOptions,
    tick: Cell<Option<TimerId>>,
    check: Cell<Option<TimerId>>,
    cadence: Cell<Cadence>,
}

impl Countdown {
    fn left(&self) -> Option<Duration> {
        let target = self.options.target.with_timezone(&Utc);
        (target - self.env.now()).to_std().ok()
    }

    /// Refresh the display. Returns `false` once the event has started,
    /// after clearing every timer.
    fn update(&self) -> bool {
        let text = render(&self.options, self.env.now());
        self.env.set_text(self.el, &text);
        let running = self.left().is_some_and(|left| !left.is_zero());
        if !running {
            log::info!("countdown finished");
            self.stop();
        }
        running
    }

    fn start(this: &Rc<Self>, cadence: Cadence) {
        if let Some(old) = this.tick.take() {
            this.env.clear_timer(old);
        }
        let period = cadence.period(&this.options);
        log::debug!("countdown refresh every {}s", period.as_secs());
        let countdown = Rc::clone(this);
        let id = this.env.set_interval(
            period,
            Box::new(move || {
                let _ = countdown.update();
            }),
        );
        this.tick.set(Some(id));
        this.cadence.set(cadence);
    }

    fn start_check(this: &Rc<Self>) {
        let countdown = Rc::clone(this);
        let id = this.env.set_interval(
            this.options.cadence_check(),
            Box::new(move || Self::check(&countdown)),
        );
        this.check.set(Some(id));
    }

    /// Switch to the fast cadence once under the threshold. One way only.
    fn check(this: &Rc<Self>) {
        if this.cadence.get() == Cadence::Fast {
            return;
        }
        let Some(left) = this.left() else {
            this.stop();
            return;
        };
        if Cadence::for_remaining(left, &this.options) == Cadence::Fast {
            if let Some(check) = this.check.take() {
                this.env.clear_timer(check);
            }
            Self::start(this, Cadence::Fast);
        }
    }

    fn stop(&self) {
        let timers = [self.tick.take(), self.check.take()];
        for timer in timers.into_iter().flatten() {
            self.env.clear_timer(timer);
        }
    }
}
