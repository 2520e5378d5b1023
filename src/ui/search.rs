use eframe::egui;
use std::hash::Hash;

/// Returns the options whose label contains `query`, ignoring case.
pub fn search_options<T: Clone>(options: &[(T, String)], query: &str) -> Vec<(T, String)> {
    let query = query.trim().to_lowercase();
    options
        .iter()
        .filter(|(_, label)| label.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// Text box with a pop-up of matching options. `value` is set when the text matches an
/// option exactly or one is clicked, and cleared when the text matches nothing.
pub struct SearchWidget<'a, ValueT> {
    buf: &'a mut String,
    value: &'a mut Option<ValueT>,
    options: &'a [(ValueT, String)],
    popup_id: egui::Id,
    hint_text: Option<egui::WidgetText>,
    desired_width: Option<f32>,
}

impl<'a, ValueT> SearchWidget<'a, ValueT> {
    pub fn new(
        id_salt: impl Hash,
        buf: &'a mut String,
        value: &'a mut Option<ValueT>,
        options: &'a [(ValueT, String)],
    ) -> Self {
        Self {
            buf,
            value,
            options,
            popup_id: egui::Id::new(id_salt),
            hint_text: None,
            desired_width: None,
        }
    }

    pub fn hint_text(mut self, hint_text: impl Into<egui::WidgetText>) -> Self {
        self.hint_text = Some(hint_text.into());
        self
    }

    pub fn desired_width(mut self, desired_width: f32) -> Self {
        self.desired_width = Some(desired_width);
        self
    }
}

impl<'a, ValueT: Clone> egui::Widget for SearchWidget<'a, ValueT> {
    fn ui(self, ui: &mut egui::Ui) -> egui::Response {
        let Self {
            buf,
            value,
            options,
            popup_id,
            hint_text,
            desired_width,
        } = self;

        let mut edit = egui::TextEdit::singleline(buf);
        if let Some(hint_text) = hint_text {
            edit = edit.hint_text(hint_text);
        }
        if let Some(desired_width) = desired_width {
            edit = edit.desired_width(desired_width);
        }
        let mut response = edit.show(ui).response;
        if response.gained_focus() {
            ui.memory_mut(|m| m.open_popup(popup_id));
        }
        if response.changed() {
            *value = options
                .iter()
                .find(|(_, label)| label.as_str() == buf.as_str())
                .map(|(v, _)| v.clone());
        }

        let mut picked = false;
        egui::popup_below_widget(
            ui,
            popup_id,
            &response,
            egui::PopupCloseBehavior::CloseOnClick,
            |ui| {
                egui::ScrollArea::vertical()
                    .max_height(240.0)
                    .show(ui, |ui| {
                        let matches = search_options(options, buf);
                        if matches.is_empty() {
                            ui.label("Nothing found");
                        }
                        for (option, label) in matches {
                            if ui.selectable_label(false, &label).clicked() {
                                *value = Some(option);
                                *buf = label;
                                picked = true;
                                ui.memory_mut(|m| m.close_popup());
                            }
                        }
                    });
            },
        );

        if picked {
            response.mark_changed();
        }
        response
    }
}

#[test]
fn search_ignores_case() {
    let options = vec![
        (1, "Beras putih".to_owned()),
        (2, "Telur ayam".to_owned()),
        (3, "Daging ayam".to_owned()),
    ];
    let ids: Vec<_> = search_options(&options, "AYAM")
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, [2, 3]);
    assert_eq!(search_options(&options, "").len(), 3);
}
