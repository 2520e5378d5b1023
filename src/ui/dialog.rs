use super::form::{self, EntityForm, FormEvent};
use crate::api::Connection;
use crate::validation::FieldErrors;
use eframe::egui;

/// Below this width dialogs are drawn as a drawer along the bottom edge.
pub const NARROW_WIDTH: f32 = 768.0;

pub fn is_narrow(ctx: &egui::Context) -> bool {
    ctx.screen_rect().width() < NARROW_WIDTH
}

/// Dims the page and swallows the pointer so that only the dialog on top can be used.
fn backdrop(ctx: &egui::Context, id: egui::Id) {
    let screen = ctx.screen_rect();
    egui::Area::new(id.with("backdrop"))
        .order(egui::Order::Middle)
        .fixed_pos(screen.min)
        .show(ctx, |ui| {
            ui.allocate_rect(screen, egui::Sense::click_and_drag());
            ui.painter()
                .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(96));
        });
}

/// Shows `add_contents` in a centred modal window, or in a bottom drawer on narrow screens.
/// Returns false once the user dismissed it.
pub fn show(
    ctx: &egui::Context,
    id: egui::Id,
    title: &str,
    add_contents: impl FnOnce(&mut egui::Ui),
) -> bool {
    backdrop(ctx, id);
    let mut open = true;
    let window = egui::Window::new(title)
        .id(id)
        .order(egui::Order::Foreground)
        .collapsible(false)
        .resizable(false)
        .open(&mut open);

    if is_narrow(ctx) {
        let width = ctx.screen_rect().width();
        window
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, 0.0])
            .min_width(width)
            .max_height(ctx.screen_rect().height() * 0.8)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, add_contents);
            });
    } else {
        window
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, add_contents);
    }
    open
}

/// Asks `question`, returns `Some(answer)` once one of the buttons was pressed.
pub fn confirm(ctx: &egui::Context, id: egui::Id, question: &str) -> Option<bool> {
    let mut answer = None;
    let open = show(ctx, id, "Are you sure?", |ui| {
        ui.label(question);
        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Continue").clicked() {
                answer = Some(true);
            }
            if ui.button("Cancel").clicked() {
                answer = Some(false);
            }
        });
    });
    if !open {
        answer = Some(false);
    }
    answer
}

/// An entity form shown in a dialog, with Save and (when editing) Delete buttons.
pub struct FormDialog<F> {
    form: F,
    errors: FieldErrors,
    id: egui::Id,
}

impl<F: EntityForm> FormDialog<F> {
    pub fn new(initial: Option<&F::Entity>) -> Self {
        Self::with_form(F::new(initial))
    }

    /// Shows a form that was prepared by the caller.
    pub fn with_form(form: F) -> Self {
        let id = egui::Id::new(("form dialog", form.title()));
        Self {
            form,
            errors: FieldErrors::default(),
            id,
        }
    }

    #[cfg(test)]
    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    #[cfg(test)]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit(
        &mut self,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) -> Option<FormEvent> {
        let result = self.form.submit(conn);
        let success = if self.form.is_edit() {
            "Changes saved"
        } else {
            "Created successfully"
        };
        form::report(result, &mut self.errors, toasts, success).then_some(FormEvent::Saved)
    }

    pub fn delete(
        &mut self,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) -> Option<FormEvent> {
        match self.form.delete(conn) {
            Ok(()) => {
                toasts.add(super::new_success_toast("Deleted successfully"));
                Some(FormEvent::Deleted)
            }
            Err(error) => {
                form::report_api_error(toasts, &error);
                None
            }
        }
    }

    pub fn update(
        &mut self,
        ctx: &egui::Context,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        context: &F::Context,
    ) -> Option<FormEvent> {
        let mut save = false;
        let mut delete = false;
        let title = self.form.title();
        let open = show(ctx, self.id, &title, |ui| {
            egui::Grid::new((self.id, "fields"))
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    self.form.show(ui, conn, toasts, context, &self.errors);
                });
            ui.separator();
            ui.horizontal(|ui| {
                save = ui.button("Save").clicked();
                if self.form.is_edit() {
                    delete = ui.button("Delete").clicked();
                }
                self.form.extra_actions(ui, conn, toasts);
            });
        });

        if save {
            return self.submit(conn, toasts);
        }
        if delete {
            return self.delete(conn, toasts);
        }
        (!open).then_some(FormEvent::Closed)
    }
}

#[test]
fn page_behind_a_dialog_is_covered() {
    let ctx = egui::Context::default();
    let id = egui::Id::new("delete diet");
    let input = || egui::RawInput {
        screen_rect: Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(1024.0, 768.0),
        )),
        ..Default::default()
    };
    for _ in 0..3 {
        let _ = ctx.run(input(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                let _ = ui.button("Add");
            });
            confirm(ctx, id, "Delete this diet?");
        });
    }

    assert_eq!(
        ctx.layer_id_at(egui::pos2(5.0, 5.0)),
        Some(egui::LayerId::new(egui::Order::Middle, id.with("backdrop")))
    );
    assert_eq!(
        ctx.layer_id_at(egui::pos2(512.0, 384.0)).map(|layer| layer.order),
        Some(egui::Order::Foreground)
    );
}
