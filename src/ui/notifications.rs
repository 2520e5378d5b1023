//! Change history of the daily meal requests on display, with an unread counter.

use super::form;
use super::query;
use crate::api::models::{DailyPatientMealLog, Diet, MealType, Room, RoomTypeId};
use crate::api::Connection;
use crate::store::NotificationBookmark;
use chrono::{DateTime, NaiveDate, Utc};
use eframe::egui;

const PLACEHOLDER: &str = "-";

/// Already-fetched reference lists used to turn logged ids into labels.
pub struct Lookups<'a> {
    pub meal_types: &'a [MealType],
    pub rooms: &'a [Room],
    pub diets: &'a [Diet],
}

impl Lookups<'_> {
    fn label<T>(items: &[T], raw: &str, id: impl Fn(&T) -> i64, label: impl Fn(&T) -> &str) -> String {
        raw.trim()
            .parse::<i64>()
            .ok()
            .and_then(|raw| items.iter().find(|item| id(item) == raw))
            .map(|item| label(item).to_owned())
            .unwrap_or_else(|| PLACEHOLDER.into())
    }

    /// Human readable form of one logged value.
    pub fn resolve(&self, field: &str, raw: &str) -> String {
        if raw.trim().is_empty() {
            return PLACEHOLDER.into();
        }
        match field {
            "MealTypeID" => Self::label(self.meal_types, raw, |t| t.id.0, |t| &t.code),
            "RoomID" => Self::label(self.rooms, raw, |r| r.id.0, |r| &r.name),
            "Diets" => raw
                .split(',')
                .map(|id| Self::label(self.diets, id, |d| d.id.0, |d| &d.code))
                .collect::<Vec<_>>()
                .join(", "),
            _ => raw.to_owned(),
        }
    }
}

pub fn field_label(field: &str) -> &str {
    match field {
        "MealTypeID" => "Meal type",
        "RoomID" => "Room",
        "Diets" => "Diets",
        "Notes" => "Notes",
        "IsNewlyAdmitted" => "Newly admitted",
        other => other,
    }
}

pub fn describe_change(log: &DailyPatientMealLog, lookups: &Lookups<'_>) -> String {
    format!(
        "{}: {} \u{2192} {}",
        field_label(&log.field),
        lookups.resolve(&log.field, &log.old_value),
        lookups.resolve(&log.field, &log.new_value),
    )
}

#[derive(Default)]
pub struct NotificationPanel {
    logs: Vec<DailyPatientMealLog>,
    open: bool,
}

impl NotificationPanel {
    /// Refetches the log, called whenever the daily requests on display were (re)loaded.
    pub fn refresh(
        &mut self,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        date: NaiveDate,
        room_type: Option<RoomTypeId>,
    ) {
        match query::meal_logs(conn, date, room_type) {
            Ok(mut logs) => {
                logs.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
                self.logs = logs;
            }
            Err(error) => form::report_api_error(toasts, &error),
        }
    }

    #[cfg(test)]
    pub fn logs(&self) -> &[DailyPatientMealLog] {
        &self.logs
    }

    /// Entries changed after the panel was last opened. Everything counts before the first
    /// opening.
    pub fn unread(&self, last_seen: Option<DateTime<Utc>>) -> usize {
        self.logs
            .iter()
            .filter(|log| last_seen.map_or(true, |seen| log.changed_at > seen))
            .count()
    }

    pub fn open(&mut self, bookmark: &mut NotificationBookmark, now: DateTime<Utc>) {
        self.open = true;
        bookmark.mark_seen(now);
    }

    pub fn button(&mut self, ui: &mut egui::Ui, bookmark: &mut NotificationBookmark) {
        let unread = self.unread(bookmark.last_seen());
        let text = if unread > 0 {
            egui::RichText::new(format!("Notifications ({unread})")).strong()
        } else {
            egui::RichText::new("Notifications")
        };
        if ui.button(text).clicked() {
            self.open(bookmark, Utc::now());
        }
    }

    pub fn update(&mut self, ctx: &egui::Context, lookups: &Lookups<'_>) {
        if !self.open {
            return;
        }
        let mut open = self.open;
        egui::Window::new("Notifications")
            .open(&mut open)
            .default_width(420.0)
            .show(ctx, |ui| {
                if self.logs.is_empty() {
                    ui.label("No changes yet");
                    return;
                }
                egui::ScrollArea::vertical().max_height(400.0).show(ui, |ui| {
                    for log in &self.logs {
                        let changed_at = log.changed_at.with_timezone(&chrono::Local);
                        ui.horizontal(|ui| {
                            ui.strong(format!("{} {}", log.patient_mrn, log.patient_name));
                            ui.weak(changed_at.format("%-d %b %H:%M").to_string());
                        });
                        if !log.room_name.is_empty() {
                            ui.label(format!("{} / {}", log.room_type_name, log.room_name));
                        }
                        ui.label(describe_change(log, lookups));
                        ui.separator();
                    }
                });
            });
        self.open = open;
    }
}

#[cfg(test)]
use super::daily_meal::{sample_meal, DailyMealForm};
#[cfg(test)]
use super::form::EntityForm as _;
#[cfg(test)]
use crate::api::models::{DietId, RoomId};
#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[cfg(test)]
fn reference() -> (Vec<MealType>, Vec<Room>, Vec<Diet>) {
    let meal_types = serde_json::from_value(serde_json::json!([
        {"id": 2, "code": "BL", "name": "Bubur lunak"},
        {"id": 3, "code": "NB", "name": "Nasi biasa"}
    ]))
    .unwrap();
    let rooms = serde_json::from_value(serde_json::json!([
        {"id": 9, "name": "Melati 2", "treatmentClass": "I", "roomTypeID": 3},
        {"id": 10, "name": "Melati 3", "treatmentClass": "II", "roomTypeID": 3}
    ]))
    .unwrap();
    let diets = serde_json::from_value(serde_json::json!([
        {"id": 1, "code": "DM", "name": "Diabetes Mellitus"},
        {"id": 2, "code": "RG", "name": "Rendah garam"}
    ]))
    .unwrap();
    (meal_types, rooms, diets)
}

#[test]
fn unresolvable_ids_become_placeholders() {
    let (meal_types, rooms, diets) = reference();
    let lookups = Lookups {
        meal_types: &meal_types,
        rooms: &rooms,
        diets: &diets,
    };
    assert_eq!(lookups.resolve("MealTypeID", "3"), "NB");
    assert_eq!(lookups.resolve("MealTypeID", "77"), "-");
    assert_eq!(lookups.resolve("Diets", "2,99,1"), "RG, -, DM");
    assert_eq!(lookups.resolve("RoomID", ""), "-");
    assert_eq!(lookups.resolve("Notes", "no salt"), "no salt");
}

#[test]
fn editing_room_and_diets_shows_up_in_log() {
    let server = TestServer::start(|request| match request.path() {
        "/daily-patient-meal/logs" => Reply::data(serde_json::json!([
            {
                "id": 1, "dailyPatientMealID": 12, "roomTypeName": "Rawat Inap",
                "roomName": "Melati 3", "patientMRN": "00-12-34",
                "patientName": "Siti Aminah", "field": "RoomID",
                "oldValue": "9", "newValue": "10",
                "changedAt": "2025-03-01T08:00:00Z"
            },
            {
                "id": 2, "dailyPatientMealID": 12, "roomTypeName": "Rawat Inap",
                "roomName": "Melati 3", "patientMRN": "00-12-34",
                "patientName": "Siti Aminah", "field": "Diets",
                "oldValue": "1", "newValue": "1,2",
                "changedAt": "2025-03-01T08:00:01Z"
            }
        ])),
        _ => Reply::data(serde_json::json!(null)),
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let meal = sample_meal();
    let mut form = DailyMealForm::new(Some(&meal));
    form.room = Some(RoomId(10));
    form.diets.insert(DietId(2));
    form.submit(&mut conn).unwrap();

    let patch = &server.requests()[0];
    assert_eq!((patch.method.as_str(), patch.path()), ("PATCH", "/daily-patient-meal/12"));
    let body = patch.json();
    assert_eq!(body["roomID"], 10);
    assert_eq!(body["dietIDs"], serde_json::json!([1, 2]));
    assert_eq!(body["patientID"], 4);
    assert_eq!(body["date"], "2025-03-01T00:00:00Z");

    let mut panel = NotificationPanel::default();
    let date = meal.date.date_naive();
    panel.refresh(&mut conn, &mut toasts, date, Some(RoomTypeId(3)));
    assert_eq!(
        server.requests()[1].url,
        "/daily-patient-meal/logs?date=2025-03-01&roomType=3"
    );

    let (meal_types, rooms, diets) = reference();
    let lookups = Lookups {
        meal_types: &meal_types,
        rooms: &rooms,
        diets: &diets,
    };
    let changes: Vec<_> = panel
        .logs()
        .iter()
        .map(|log| describe_change(log, &lookups))
        .collect();
    assert_eq!(
        changes,
        ["Diets: DM \u{2192} DM, RG", "Room: Melati 2 \u{2192} Melati 3"]
    );
}

#[test]
fn opening_marks_everything_seen() {
    let dir = tempfile::tempdir().unwrap();
    let storage = crate::store::LocalStorage::new(dir.path());
    let mut bookmark = NotificationBookmark::load(storage.clone());

    let mut panel = NotificationPanel::default();
    panel.logs = serde_json::from_value(serde_json::json!([
        {
            "id": 1, "dailyPatientMealID": 12, "patientMRN": "00-12-34",
            "patientName": "Siti Aminah", "field": "Notes",
            "oldValue": "", "newValue": "no salt", "changedAt": "2025-03-01T08:00:00Z"
        },
        {
            "id": 2, "dailyPatientMealID": 13, "patientMRN": "00-55-10",
            "patientName": "Budi", "field": "Notes",
            "oldValue": "", "newValue": "soft", "changedAt": "2025-03-01T10:00:00Z"
        }
    ]))
    .unwrap();
    assert_eq!(panel.unread(bookmark.last_seen()), 2);

    let seen = "2025-03-01T09:00:00Z".parse().unwrap();
    panel.open(&mut bookmark, seen);
    assert_eq!(panel.unread(bookmark.last_seen()), 1);
    assert_eq!(
        NotificationBookmark::load(storage).last_seen(),
        Some(seen)
    );
}
