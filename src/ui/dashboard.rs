//! The day's meal requests for one room type, with the meal and diet counts derived from them.

use super::catalog::matches_filter;
use super::daily_meal::{DailyMealForm, MealChoices};
use super::dialog::FormDialog;
use super::form::{self, FormEvent};
use super::notifications::{Lookups, NotificationPanel};
use super::patients::format_date_of_birth;
use super::{diet_summary, new_error_toast, query, widgets};
use crate::api::models::{DailyPatientMeal, DietCounts, Room, RoomTypeId};
use crate::api::{self, Connection};
use crate::report::{self, MealMatrix};
use crate::store::{MealFilterStore, NotificationBookmark};
use chrono::NaiveDate;
use eframe::egui;
use regex_lite::Regex;
use std::sync::OnceLock;

/// Collapses runs of whitespace and capitalizes the first letter of every word, names are
/// typed in all sorts of ways at admission.
pub fn title_case(name: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid pattern"));
    let collapsed = whitespace.replace_all(name.trim(), " ");

    let mut titled = String::with_capacity(collapsed.len());
    let mut capitalize = true;
    for c in collapsed.chars() {
        if capitalize {
            titled.extend(c.to_uppercase());
        } else {
            titled.push(c);
        }
        capitalize = c == ' ' || c == '.';
    }
    titled
}

/// Hands the day's spreadsheet download to the browser.
pub fn export_spreadsheet(conn: &Connection, date: NaiveDate) -> crate::Result<()> {
    let url = query::export_url(conn, date)?;
    log::info!("opening export {url}");
    open::that(url.as_str())?;
    Ok(())
}

fn or_report<T: Default>(result: api::Result<T>, toasts: &mut egui_toast::Toasts) -> T {
    result.unwrap_or_else(|error| {
        form::report_api_error(toasts, &error);
        T::default()
    })
}

fn show_matrix(ui: &mut egui::Ui, id: &str, matrix: &MealMatrix) {
    if matrix.rows.is_empty() {
        ui.label("No meals requested");
        return;
    }
    egui::Grid::new(id)
        .striped(true)
        .num_columns(matrix.columns.len() + 2)
        .show(ui, |ui| {
            ui.strong("Class");
            for column in &matrix.columns {
                ui.strong(column);
            }
            ui.strong("Total");
            ui.end_row();

            for row in &matrix.rows {
                ui.label(&row.treatment_class);
                for count in &row.counts {
                    ui.label(count.to_string());
                }
                ui.label(row.total.to_string());
                ui.end_row();
            }

            let (sums, total) = matrix.totals();
            ui.strong("Total");
            for sum in sums {
                ui.strong(sum.to_string());
            }
            ui.strong(total.to_string());
            ui.end_row();
        });
}

pub struct Dashboard {
    choices: MealChoices,
    rooms: Vec<Room>,
    meals: Vec<DailyPatientMeal>,
    room_matrix: MealMatrix,
    all_matrix: MealMatrix,
    diet_counts: DietCounts,
    filter: String,
    notifications: NotificationPanel,
    dialog: Option<FormDialog<DailyMealForm>>,
}

impl Dashboard {
    pub fn new(
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        meal_filter: &MealFilterStore,
    ) -> Self {
        let room_types = or_report(query::list(conn, "/room-type"), toasts);
        let meal_types = or_report(query::list(conn, "/meal-type"), toasts);
        let diets = or_report(query::list(conn, "/diet"), toasts);
        let mut dashboard = Self {
            choices: MealChoices {
                room_types,
                meal_types,
                diets,
            },
            rooms: vec![],
            meals: vec![],
            room_matrix: MealMatrix::default(),
            all_matrix: MealMatrix::default(),
            diet_counts: DietCounts::default(),
            filter: String::new(),
            notifications: NotificationPanel::default(),
            dialog: None,
        };
        dashboard.reload(conn, toasts, meal_filter);
        dashboard
    }

    /// Fetches everything that depends on the selected date and room type. Requests are only
    /// listed once a room type is chosen.
    pub fn reload(
        &mut self,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        meal_filter: &MealFilterStore,
    ) {
        let date = meal_filter.date();
        let room_type = meal_filter.room_type();

        match room_type {
            Some(room_type) => {
                self.rooms = or_report(query::rooms_for_room_type(conn, room_type), toasts);
                self.meals = or_report(query::daily_meals(conn, date, room_type), toasts);
                self.meals.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                let counts = or_report(query::meal_counts(conn, date, Some(room_type)), toasts);
                self.room_matrix = report::pivot_meal_matrix(&counts, &self.choices.meal_types);
            }
            None => {
                self.rooms.clear();
                self.meals.clear();
                self.room_matrix = MealMatrix::default();
            }
        }

        let counts = or_report(query::meal_counts(conn, date, None), toasts);
        self.all_matrix = report::pivot_meal_matrix(&counts, &self.choices.meal_types);
        self.diet_counts = or_report(query::diet_counts(conn, date), toasts);
        self.notifications.refresh(conn, toasts, date, room_type);
    }

    pub fn visible(&self) -> impl Iterator<Item = &DailyPatientMeal> {
        self.meals.iter().filter(|meal| {
            matches_filter(
                &self.filter,
                [
                    meal.patient.medical_record_number.as_str(),
                    meal.patient.name.as_str(),
                ],
            )
        })
    }

    fn update_filters(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        meal_filter: &mut MealFilterStore,
        bookmark: &mut NotificationBookmark,
    ) {
        let mut date = meal_filter.date();
        let mut room_type = meal_filter.room_type();
        let room_types: Vec<_> = self
            .choices
            .room_types
            .iter()
            .map(|t| (t.id, t.name.clone()))
            .collect();

        let mut add = false;
        let mut export = false;
        ui.horizontal(|ui| {
            widgets::date_input(ui, "dashboard date", &mut date);
            widgets::single_select(
                ui,
                "dashboard room type",
                &mut room_type,
                &room_types,
                "Choose room type",
            );
            widgets::filter_input(ui, &mut self.filter, "Search MRN or name...");
            add = ui.button("Add entry").clicked();
            export = ui.button("Spreadsheet").clicked();
            self.notifications.button(ui, bookmark);
        });

        if date != meal_filter.date() || room_type != meal_filter.room_type() {
            meal_filter.set_date(date);
            meal_filter.set_room_type(room_type);
            self.reload(conn, toasts, meal_filter);
        }
        if add {
            let form = DailyMealForm::for_date(meal_filter.date(), meal_filter.room_type());
            self.dialog = Some(FormDialog::with_form(form));
        }
        if export {
            if let Err(error) = export_spreadsheet(conn, meal_filter.date()) {
                toasts.add(new_error_toast(format!("Couldn't open the export: {error}")));
            }
        }
    }

    fn update_table(&self, ui: &mut egui::Ui) -> Option<DailyPatientMeal> {
        let mut clicked = None;
        egui_extras::TableBuilder::new(ui)
            .id_salt("daily meals table")
            .striped(true)
            .sense(egui::Sense::click())
            .max_scroll_height(360.0)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(egui_extras::Column::exact(90.0))
            .column(egui_extras::Column::auto().at_least(160.0))
            .column(egui_extras::Column::exact(120.0))
            .column(egui_extras::Column::auto())
            .column(egui_extras::Column::exact(50.0))
            .column(egui_extras::Column::exact(50.0))
            .column(egui_extras::Column::auto())
            .column(egui_extras::Column::auto())
            .column(egui_extras::Column::remainder())
            .header(22.0, |mut header| {
                for title in [
                    "MRN",
                    "Name",
                    "Date of birth",
                    "Room",
                    "Class",
                    "Meal",
                    "Diets",
                    "Allergies",
                    "Notes",
                ] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for meal in self.visible() {
                    body.row(22.0, |mut row| {
                        row.set_selected(meal.is_newly_admitted);
                        let diets: Vec<_> = meal.diets.iter().map(|d| d.code.as_str()).collect();
                        let allergies: Vec<_> = meal
                            .patient
                            .allergies
                            .iter()
                            .map(|a| a.code.as_str())
                            .collect();
                        let cells = [
                            meal.patient.medical_record_number.clone(),
                            title_case(&meal.patient.name),
                            format_date_of_birth(meal.patient.date_of_birth),
                            meal.room.name.clone(),
                            meal.room.treatment_class.clone(),
                            meal.meal_type.code.clone(),
                            diets.join(", "),
                            allergies.join(", "),
                            meal.notes.clone(),
                        ];
                        for cell in cells {
                            row.col(|ui| {
                                ui.label(cell);
                            });
                        }
                        if row.response().clicked() {
                            clicked = Some(meal.clone());
                        }
                    });
                }
            });
        clicked
    }

    pub fn update(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        meal_filter: &mut MealFilterStore,
        bookmark: &mut NotificationBookmark,
    ) {
        ui.heading("Daily Meals");
        self.update_filters(ui, conn, toasts, meal_filter, bookmark);
        ui.separator();

        if meal_filter.room_type().is_none() {
            ui.label("Choose a room type to see its meal requests");
        } else if self.meals.is_empty() {
            ui.label("No meal requests for this day");
        } else if let Some(meal) = self.update_table(ui) {
            self.dialog = Some(FormDialog::new(Some(&meal)));
        }
        ui.separator();

        egui::ScrollArea::vertical().id_salt("dashboard reports").show(ui, |ui| {
            ui.horizontal_top(|ui| {
                ui.vertical(|ui| {
                    ui.heading("Selected room type");
                    show_matrix(ui, "room type matrix", &self.room_matrix);
                });
                ui.add_space(24.0);
                ui.vertical(|ui| {
                    ui.heading("All rooms");
                    show_matrix(ui, "all rooms matrix", &self.all_matrix);
                });
                ui.add_space(24.0);
                ui.vertical(|ui| {
                    diet_summary::show(ui, &self.diet_counts);
                });
            });
        });

        let lookups = Lookups {
            meal_types: &self.choices.meal_types,
            rooms: &self.rooms,
            diets: &self.choices.diets,
        };
        self.notifications.update(ui.ctx(), &lookups);

        let event = self
            .dialog
            .as_mut()
            .and_then(|dialog| dialog.update(ui.ctx(), conn, toasts, &self.choices));
        if let Some(event) = event {
            self.dialog = None;
            if event != FormEvent::Closed {
                self.reload(conn, toasts, meal_filter);
            }
        }
    }
}

#[cfg(test)]
use super::daily_meal::sample_meal;
#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};
#[cfg(test)]
use crate::store::LocalStorage;

#[test]
fn names_are_title_cased() {
    assert_eq!(title_case("siti   aminah"), "Siti Aminah");
    assert_eq!(title_case(" budi s.santoso "), "Budi S.Santoso");
    assert_eq!(title_case(""), "");
}

#[cfg(test)]
fn dashboard_backend() -> TestServer {
    TestServer::start(|request| match request.path() {
        "/meal-type" => Reply::data(serde_json::json!([
            {"id": 2, "code": "BL", "name": "Bubur lunak"},
            {"id": 3, "code": "NB", "name": "Nasi biasa"}
        ])),
        "/daily-patient-meal/filter" => {
            let mut older = serde_json::to_value(sample_meal()).unwrap();
            older["id"] = 11.into();
            older["updatedAt"] = "2025-03-01T05:00:00Z".into();
            older["patient"]["name"] = "Budi".into();
            older["patient"]["medicalRecordNumber"] = "00-55-10".into();
            let newer = serde_json::to_value(sample_meal()).unwrap();
            Reply::data(serde_json::json!([older, newer]))
        }
        "/daily-patient-meal/count" => Reply::data(serde_json::json!([
            {"treatmentClass": "I", "mealType": "BL", "mealCount": 2},
            {"treatmentClass": "VIP", "mealType": "NB", "mealCount": "1"}
        ])),
        "/daily-patient-meal/count/diet" => Reply::data(serde_json::json!({
            "combinationsCount": [{"dietCodes": "DM", "count": 2}],
            "complicationCount": 1,
            "nonComplicationCount": 1
        })),
        _ => Reply::data(serde_json::json!(null)),
    })
}

#[test]
fn requests_wait_for_a_room_type() {
    let server = dashboard_backend();
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();
    let dir = tempfile::tempdir().unwrap();
    let mut meal_filter = MealFilterStore::load(LocalStorage::new(dir.path()));
    meal_filter.set_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

    let mut dashboard = Dashboard::new(&mut conn, &mut toasts, &meal_filter);
    assert!(dashboard.meals.is_empty());
    assert!(server
        .requests()
        .iter()
        .all(|r| r.path() != "/daily-patient-meal/filter"));
    assert_eq!(dashboard.all_matrix.columns, ["BL", "NB"]);
    assert_eq!(dashboard.diet_counts.complication_count, 1);

    meal_filter.set_room_type(Some(RoomTypeId(3)));
    dashboard.reload(&mut conn, &mut toasts, &meal_filter);
    let urls: Vec<_> = server.requests().into_iter().map(|r| r.url).collect();
    assert!(urls.contains(&"/room/filter?roomType=3".to_owned()));
    assert!(urls.contains(&"/daily-patient-meal/filter?date=2025-03-01&roomType=3".to_owned()));
    assert!(urls.contains(&"/daily-patient-meal/count?date=2025-03-01&roomType=3".to_owned()));
    assert!(urls.contains(&"/daily-patient-meal/count?date=2025-03-01&roomType=".to_owned()));

    let ids: Vec<_> = dashboard.meals.iter().map(|m| m.id.0).collect();
    assert_eq!(ids, [12, 11]);
    assert_eq!(dashboard.room_matrix.rows[1].counts, [0, 1]);

    dashboard.filter = "00-55".into();
    let visible: Vec<_> = dashboard.visible().map(|m| m.id.0).collect();
    assert_eq!(visible, [11]);
    dashboard.filter = "SITI".into();
    let visible: Vec<_> = dashboard.visible().map(|m| m.id.0).collect();
    assert_eq!(visible, [12]);
}
