use crate::api::models::DietCounts;
use eframe::egui;

fn combination_label(diet_codes: &str) -> &str {
    if diet_codes.trim().is_empty() {
        "Without diet"
    } else {
        diet_codes
    }
}

/// How many of the day's requests share each diet combination. Nothing is drawn when no
/// request carries a diet.
pub fn show(ui: &mut egui::Ui, counts: &DietCounts) {
    if counts.combinations_count.is_empty() {
        return;
    }
    ui.heading("Diets");
    egui::Grid::new("diet summary")
        .striped(true)
        .num_columns(2)
        .show(ui, |ui| {
            ui.strong("Diet");
            ui.strong("Count");
            ui.end_row();
            for combination in &counts.combinations_count {
                ui.label(combination_label(&combination.diet_codes));
                ui.label(combination.count.to_string());
                ui.end_row();
            }
            ui.strong("Complication");
            ui.strong(counts.complication_count.to_string());
            ui.end_row();
            ui.strong("Non-complication");
            ui.strong(counts.non_complication_count.to_string());
            ui.end_row();
        });
}

#[test]
fn empty_combination_has_a_label() {
    assert_eq!(combination_label(""), "Without diet");
    assert_eq!(combination_label("DM, RG"), "DM, RG");
}
