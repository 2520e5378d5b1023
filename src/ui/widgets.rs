use eframe::egui;
use std::collections::BTreeSet;
use std::hash::Hash;

/// A drop-down choosing one of `options`, showing `placeholder` until something is picked.
pub fn single_select<T: Copy + PartialEq>(
    ui: &mut egui::Ui,
    id_salt: impl Hash,
    value: &mut Option<T>,
    options: &[(T, String)],
    placeholder: &str,
) -> egui::Response {
    let selected_text = options
        .iter()
        .find(|(v, _)| Some(*v) == *value)
        .map(|(_, label)| label.as_str())
        .unwrap_or(placeholder);
    let mut changed = false;
    let mut response = egui::ComboBox::from_id_salt(id_salt)
        .selected_text(selected_text)
        .width(220.0)
        .show_ui(ui, |ui| {
            for (option, label) in options {
                if ui
                    .selectable_label(Some(*option) == *value, label)
                    .clicked()
                {
                    *value = Some(*option);
                    changed = true;
                }
            }
        })
        .response;
    if changed {
        response.mark_changed();
    }
    response
}

/// A drop-down with a check box per option. The chosen labels are shown joined by commas.
pub fn multi_select<T: Copy + Ord>(
    ui: &mut egui::Ui,
    id_salt: impl Hash,
    selected: &mut BTreeSet<T>,
    options: &[(T, String)],
    placeholder: &str,
) -> egui::Response {
    let chosen: Vec<&str> = options
        .iter()
        .filter(|(v, _)| selected.contains(v))
        .map(|(_, label)| label.as_str())
        .collect();
    let selected_text = if chosen.is_empty() {
        placeholder.to_owned()
    } else {
        chosen.join(", ")
    };

    let mut changed = false;
    let mut response = egui::ComboBox::from_id_salt(id_salt)
        .selected_text(selected_text)
        .width(220.0)
        .show_ui(ui, |ui| {
            for (option, label) in options {
                let mut checked = selected.contains(option);
                if ui.checkbox(&mut checked, label).changed() {
                    if checked {
                        selected.insert(*option);
                    } else {
                        selected.remove(option);
                    }
                    changed = true;
                }
            }
        })
        .response;
    if changed {
        response.mark_changed();
    }
    response
}

pub fn text_input(ui: &mut egui::Ui, value: &mut String, hint: &str) -> egui::Response {
    ui.add(
        egui::TextEdit::singleline(value)
            .hint_text(hint)
            .desired_width(220.0),
    )
}

pub fn password_input(ui: &mut egui::Ui, value: &mut String) -> egui::Response {
    ui.add(
        egui::TextEdit::singleline(value)
            .password(true)
            .desired_width(220.0),
    )
}

pub fn date_input(ui: &mut egui::Ui, id_salt: &str, date: &mut chrono::NaiveDate) -> egui::Response {
    ui.add(egui_extras::DatePickerButton::new(date).id_salt(id_salt))
}

/// Search box for the client-side table filter.
pub fn filter_input(ui: &mut egui::Ui, filter: &mut String, hint: &str) -> egui::Response {
    ui.add(
        egui::TextEdit::singleline(filter)
            .hint_text(hint)
            .desired_width(260.0),
    )
}
