use super::{new_error_toast, new_success_toast};
use crate::api::{self, Connection};
use crate::validation::FieldErrors;
use eframe::egui;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("please correct the highlighted fields")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Api(#[from] api::Error),
}

impl From<FieldErrors> for SubmitError {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Saved,
    Deleted,
    Closed,
}

/// A create/edit form for one entity. The form is created from the record being edited, or
/// `None` when creating.
pub trait EntityForm {
    type Entity;
    /// Reference data the form picks from, fetched by the page owning the form.
    type Context;

    fn new(initial: Option<&Self::Entity>) -> Self;

    fn title(&self) -> String;

    fn is_edit(&self) -> bool;

    fn show(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        context: &Self::Context,
        errors: &FieldErrors,
    );

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError>;

    fn delete(&self, conn: &mut Connection) -> api::Result<()>;

    /// Buttons shown next to Save and Delete.
    fn extra_actions(
        &mut self,
        _ui: &mut egui::Ui,
        _conn: &mut Connection,
        _toasts: &mut egui_toast::Toasts,
    ) {
    }
}

pub fn report_api_error(toasts: &mut egui_toast::Toasts, error: &api::Error) {
    // the shell announces an expired session once for every request
    if !matches!(error, api::Error::Unauthorized) {
        toasts.add(new_error_toast(error.to_string()));
    }
}

/// Reports the outcome of a submit. Field errors from a failed validation replace `errors` so
/// they can be drawn under their inputs.
pub fn report(
    result: Result<(), SubmitError>,
    errors: &mut FieldErrors,
    toasts: &mut egui_toast::Toasts,
    success: &str,
) -> bool {
    match result {
        Ok(()) => {
            errors.clear();
            toasts.add(new_success_toast(success));
            true
        }
        Err(SubmitError::Invalid(invalid)) => {
            log::debug!("form rejected: {invalid:?}");
            *errors = invalid;
            toasts.add(new_error_toast("Please correct the highlighted fields"));
            false
        }
        Err(SubmitError::Api(error)) => {
            report_api_error(toasts, &error);
            false
        }
    }
}

pub fn show_field_errors(ui: &mut egui::Ui, errors: &FieldErrors, field: &str) {
    for message in errors.get(field) {
        ui.label(
            egui::RichText::new(message)
                .small()
                .color(ui.visuals().error_fg_color),
        );
    }
}

/// A labelled input followed by the messages for `field`.
pub fn field(
    ui: &mut egui::Ui,
    label: &str,
    errors: &FieldErrors,
    name: &str,
    add_contents: impl FnOnce(&mut egui::Ui),
) {
    ui.label(label);
    ui.vertical(|ui| {
        add_contents(ui);
        show_field_errors(ui, errors, name);
    });
    ui.end_row();
}

#[test]
fn invalid_submit_keeps_field_errors() {
    let mut toasts = egui_toast::Toasts::new();
    let mut errors = FieldErrors::default();

    let mut invalid = FieldErrors::default();
    invalid.add("name", "Please enter a name");
    assert!(!report(Err(invalid.into()), &mut errors, &mut toasts, "Saved"));
    assert_eq!(errors.get("name"), ["Please enter a name"]);

    assert!(report(Ok(()), &mut errors, &mut toasts, "Saved"));
    assert!(errors.is_empty());
}
