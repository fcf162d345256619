//! Registration form: inline validation, simulated submission, banners.
//!
//! Required inputs are validated on `blur` and cleared on `input`. On
//! `submit` every required input is validated; if all pass, the submit
//! button is disabled while a [`Registrar`] call runs, then a banner
//! reports the outcome and the button is restored.

mod registration;
mod submission;
mod validate;

use std::cell::Cell;
use std::rc::Rc;

pub use registration::{
    Registrar, RegistrationError, RegistrationRequest, SimulatedRegistrar,
};
pub use submission::{Phase, Step};
pub use validate::{
    is_valid_email, validate, FieldError, FieldKind, MIN_NAME_LEN,
};

use crate::env::{
    require_id, DomEvent, ElementRef, EventKind, ScrollBlock, SharedEnv,
    Target, Teardown,
};
use crate::error::MeetupError;
use crate::options::FormOptions;

const REQUIRED_FIELDS: &str = "input[required]";
const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";
const FORM_GROUP: &str = ".form-group";
const ERROR_CLASS: &str = "error";
const ERROR_MESSAGE_CLASS: &str = "error-message";

/// Attach the registration form using the simulated registrar from
/// `options`.
pub fn setup(env: &SharedEnv, options: &FormOptions) -> Teardown {
    let registrar = SimulatedRegistrar::new(
        env,
        options.submit_delay(),
        options.success_rate,
    );
    setup_with_registrar(env, options, Rc::new(registrar))
}

/// Attach the registration form with a custom [`Registrar`].
///
/// Returns an empty teardown when the form is not on the page.
pub fn setup_with_registrar(
    env: &SharedEnv,
    options: &FormOptions,
    registrar: Rc<dyn Registrar>,
) -> Teardown {
    let form = match require_id(env, &options.form_id) {
        Ok(form) => form,
        Err(e) => {
            log::debug!("registration form disabled: {e}");
            return Teardown::new();
        }
    };
    let submit_button = env
        .query_within(form, SUBMIT_BUTTON)
        .into_iter()
        .next()
        .map(|button| (button, env.text(button)));
    let this = Rc::new(RegistrationForm {
        env: SharedEnv::clone(env),
        form,
        submit_button,
        options: options.clone(),
        registrar,
        phase: Cell::new(Phase::Idle),
    });

    let mut teardown = Teardown::new();
    for field in this.required_fields() {
        let f = Rc::clone(&this);
        let id = env.listen(
            Target::Element(field),
            EventKind::Blur,
            Box::new(move |_| {
                let _ = f.validate_field(field);
            }),
        );
        teardown.listener(env, id);

        let f = Rc::clone(&this);
        let id = env.listen(
            Target::Element(field),
            EventKind::Input,
            Box::new(move |_| f.clear_errors(field)),
        );
        teardown.listener(env, id);
    }

    let f = Rc::clone(&this);
    let id = env.listen(
        Target::Element(form),
        EventKind::Submit,
        Box::new(move |event| RegistrationForm::handle_submit(&f, event)),
    );
    teardown.listener(env, id);
    teardown
}

struct RegistrationForm {
    env: SharedEnv,
    form: ElementRef,
    /// The submit button and its idle label.
    submit_button: Option<(ElementRef, String)>,
    options: FormOptions,
    registrar: Rc<dyn Registrar>,
    phase: Cell<Phase>,
}

impl RegistrationForm {
    fn required_fields(&self) -> Vec<ElementRef> {
        self.env.query_within(self.form, REQUIRED_FIELDS)
    }

    fn step(&self, step: Step) {
        let from = self.phase.get();
        let to = from.next(step);
        log::trace!("registration form {from:?} --{step:?}--> {to:?}");
        self.phase.set(to);
    }

    // ── Field annotations ────────────────────────────────────────────────

    /// Validate one field and update its annotation. Returns whether it
    /// passed.
    fn validate_field(&self, field: ElementRef) -> bool {
        let value = self.env.value(field);
        let name = self.env.attribute(field, "name");
        let required = self.env.attribute(field, "required").is_some();

        self.clear_errors(field);
        match validate(&value, FieldKind::from_name(name.as_deref()), required)
        {
            Ok(()) => true,
            Err(err) => {
                self.show_error(field, err.message(&self.options.messages));
                false
            }
        }
    }

    fn show_error(&self, field: ElementRef, message: &str) {
        self.env.add_class(field, ERROR_CLASS);
        let Some(group) = self.env.closest(field, FORM_GROUP) else {
            log::debug!("invalid field outside a {FORM_GROUP}: {message}");
            return;
        };
        let note = self.env.create_element("span");
        self.env.add_class(note, ERROR_MESSAGE_CLASS);
        self.env.set_text(note, message);
        self.env.append_child(group, note);
    }

    fn clear_errors(&self, field: ElementRef) {
        self.env.remove_class(field, ERROR_CLASS);
        if let Some(group) = self.env.closest(field, FORM_GROUP) {
            let selector = format!(".{ERROR_MESSAGE_CLASS}");
            for note in self.env.query_within(group, &selector) {
                self.env.remove_element(note);
            }
        }
    }

    // ── Submission ───────────────────────────────────────────────────────

    fn handle_submit(this: &Rc<Self>, event: &DomEvent) {
        event.prevent_default();
        if this.phase.get().is_submitting() {
            log::debug!("form submitted again while a call is in flight");
        }
        this.step(Step::Submit);

        // Validate everything so every invalid field gets its note.
        let all_valid = this
            .required_fields()
            .into_iter()
            .fold(true, |ok, field| this.validate_field(field) && ok);

        if all_valid {
            this.step(Step::Valid);
            Self::submit(this);
        } else {
            this.step(Step::Invalid);
            let selector = format!(".{ERROR_CLASS}");
            if let Some(first) =
                this.env.query_within(this.form, &selector).into_iter().next()
            {
                this.env.focus(first);
            }
        }
    }

    fn submit(this: &Rc<Self>) {
        let env = &this.env;
        if let Some((button, _)) = &this.submit_button {
            env.set_text(*button, &this.options.busy_label);
            env.set_attribute(*button, "disabled", "");
        }

        let call = this.registrar.register(this.request());
        let form = Rc::clone(this);
        env.spawn_local(Box::pin(async move {
            let outcome = call.await;
            form.finish(outcome);
            if let Some((button, label)) = &form.submit_button {
                form.env.set_text(*button, label);
                form.env.remove_attribute(*button, "disabled");
            }
            form.step(Step::Settled);
        }));
    }

    fn request(&self) -> RegistrationRequest {
        let fields = self
            .env
            .query_within(self.form, "input[name]")
            .into_iter()
            .filter_map(|input| {
                let name = self.env.attribute(input, "name")?;
                Some((name, self.env.value(input)))
            })
            .collect();
        RegistrationRequest { fields }
    }

    fn finish(&self, outcome: Result<(), RegistrationError>) {
        match outcome {
            Ok(()) => {
                self.step(Step::Succeeded);
                log::info!("registration submitted");
                self.show_success();
                self.reset();
            }
            Err(e) => {
                self.step(Step::Failed);
                log::error!("{}", MeetupError::from(e));
                let message = &self.options.failure_message;
                self.show_banner_text("error-banner", message);
            }
        }
    }

    fn reset(&self) {
        for field in self.env.query_within(self.form, "input, textarea") {
            self.env.set_value(field, "");
            self.env.remove_class(field, ERROR_CLASS);
        }
    }

    // ── Banners ──────────────────────────────────────────────────────────

    fn show_success(&self) {
        let env = &self.env;
        let banner = env.create_element("div");
        env.add_class(banner, "success-message");
        let title = env.create_element("h3");
        env.set_text(title, &self.options.success_title);
        env.append_child(banner, title);
        let body = env.create_element("p");
        env.set_text(body, &self.options.success_body);
        env.append_child(banner, body);

        env.insert_before(self.form, banner);
        env.scroll_into_view(banner, ScrollBlock::Center);
        self.dismiss_later(banner);
    }

    fn show_banner_text(&self, class: &str, text: &str) {
        let banner = self.env.create_element("div");
        self.env.add_class(banner, class);
        self.env.set_text(banner, text);
        self.env.insert_before(self.form, banner);
        self.dismiss_later(banner);
    }

    fn dismiss_later(&self, banner: ElementRef) {
        let env = SharedEnv::clone(&self.env);
        let _ = self.env.set_timeout(
            self.options.banner_dismiss(),
            Box::new(move || env.remove_element(banner)),
        );
    }
}
