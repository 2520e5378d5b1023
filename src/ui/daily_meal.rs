//! The form for one patient's meal request of the day.

use super::form::{self, EntityForm, SubmitError};
use super::{query, widgets};
use crate::api::models::{
    Allergy, DailyPatientMeal, DailyPatientMealId, Diet, DietId, MealType, MealTypeId,
    PatientId, Room, RoomId, RoomType, RoomTypeId,
};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use chrono::{DateTime, NaiveDate, Utc};
use eframe::egui;
use serde::Serialize;
use std::collections::BTreeSet;

pub const PATH: &str = "/daily-patient-meal";

/// Reference lists the dashboard already fetched.
#[derive(Default)]
pub struct MealChoices {
    pub room_types: Vec<RoomType>,
    pub meal_types: Vec<MealType>,
    pub diets: Vec<Diet>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatientLookup {
    NotChecked,
    Found {
        id: PatientId,
        name: String,
        allergies: Vec<Allergy>,
    },
    NotFound,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DailyMealBody<'a> {
    #[serde(rename = "patientID")]
    patient_id: PatientId,
    #[serde(rename = "roomID")]
    room_id: RoomId,
    #[serde(rename = "mealTypeID")]
    meal_type_id: MealTypeId,
    date: DateTime<Utc>,
    notes: &'a str,
    #[serde(rename = "dietIDs")]
    diet_ids: Vec<DietId>,
    is_newly_admitted: bool,
}

pub struct DailyMealForm {
    id: Option<DailyPatientMealId>,
    date: NaiveDate,
    pub(super) medical_record_number: String,
    pub(super) patient: PatientLookup,
    pub(super) room_type: Option<RoomTypeId>,
    rooms: Vec<Room>,
    rooms_loaded_for: Option<RoomTypeId>,
    pub(super) room: Option<RoomId>,
    pub(super) meal_type: Option<MealTypeId>,
    pub(super) diets: BTreeSet<DietId>,
    pub(super) notes: String,
    pub(super) is_newly_admitted: bool,
}

impl DailyMealForm {
    /// An empty request for `date`, starting from the room type the dashboard shows.
    pub fn for_date(date: NaiveDate, room_type: Option<RoomTypeId>) -> Self {
        Self {
            date,
            room_type,
            ..Self::new(None)
        }
    }

    pub fn lookup_patient(&mut self, conn: &mut Connection, toasts: &mut egui_toast::Toasts) {
        let mrn = self.medical_record_number.trim();
        if mrn.is_empty() {
            self.patient = PatientLookup::NotChecked;
            return;
        }
        self.patient = match query::find_patient_by_mrn(conn, mrn) {
            Ok(patient) => PatientLookup::Found {
                id: patient.id,
                name: patient.name,
                allergies: patient.allergies,
            },
            Err(error @ api::Error::Transport(_)) => {
                form::report_api_error(toasts, &error);
                PatientLookup::NotChecked
            }
            Err(api::Error::Unauthorized) => PatientLookup::NotChecked,
            Err(error) => {
                if error.status() != Some(404) {
                    form::report_api_error(toasts, &error);
                }
                PatientLookup::NotFound
            }
        };
    }

    fn load_rooms(&mut self, conn: &mut Connection, toasts: &mut egui_toast::Toasts) {
        if self.rooms_loaded_for == self.room_type {
            return;
        }
        self.rooms_loaded_for = self.room_type;
        self.rooms = match self.room_type {
            Some(room_type) => query::rooms_for_room_type(conn, room_type).unwrap_or_else(|e| {
                form::report_api_error(toasts, &e);
                vec![]
            }),
            None => vec![],
        };
        if !self.rooms.iter().any(|r| Some(r.id) == self.room) {
            self.room = None;
        }
    }

    fn validate(&self) -> Result<DailyMealBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patient_id = match &self.patient {
            PatientLookup::Found { id, .. } => *id,
            PatientLookup::NotFound => {
                errors.add("medicalRecordNumber", "Patient not found");
                PatientId::default()
            }
            PatientLookup::NotChecked => {
                errors.add(
                    "medicalRecordNumber",
                    "Please look up the patient's medical record number",
                );
                PatientId::default()
            }
        };
        validation::selected(&mut errors, "roomTypeID", self.room_type, "Please choose a room type");
        let room_id = validation::selected(&mut errors, "roomID", self.room, "Please choose a room");
        let meal_type_id = validation::selected(
            &mut errors,
            "mealTypeID",
            self.meal_type,
            "Please choose a meal type",
        );
        errors.check(DailyMealBody {
            patient_id,
            room_id,
            meal_type_id,
            date: self.date.and_time(Default::default()).and_utc(),
            notes: self.notes.trim(),
            diet_ids: self.diets.iter().copied().collect(),
            is_newly_admitted: self.is_newly_admitted,
        })
    }

    fn show_patient(&mut self, ui: &mut egui::Ui, conn: &mut Connection, toasts: &mut egui_toast::Toasts) {
        if self.id.is_some() {
            ui.label(&self.medical_record_number);
        } else {
            let mut check = false;
            ui.horizontal(|ui| {
                let response = widgets::text_input(ui, &mut self.medical_record_number, "00-00-00");
                if response.changed() {
                    self.patient = PatientLookup::NotChecked;
                }
                check = ui.button("Check").clicked()
                    || (response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
            });
            if check {
                self.lookup_patient(conn, toasts);
            }
        }

        match &self.patient {
            PatientLookup::Found {
                name, allergies, ..
            } => {
                ui.label(format!("Patient: {name}"));
                if !allergies.is_empty() {
                    let codes: Vec<_> = allergies.iter().map(|a| a.code.as_str()).collect();
                    ui.label(format!("Allergies: {}", codes.join(", ")));
                }
            }
            PatientLookup::NotFound => {
                ui.colored_label(ui.visuals().error_fg_color, "Patient not found");
            }
            PatientLookup::NotChecked => {}
        }
    }
}

impl EntityForm for DailyMealForm {
    type Entity = DailyPatientMeal;
    type Context = MealChoices;

    fn new(initial: Option<&DailyPatientMeal>) -> Self {
        match initial {
            Some(meal) => Self {
                id: Some(meal.id),
                date: meal.date.date_naive(),
                medical_record_number: meal.patient.medical_record_number.clone(),
                patient: PatientLookup::Found {
                    id: meal.patient_id,
                    name: meal.patient.name.clone(),
                    allergies: meal.patient.allergies.clone(),
                },
                room_type: Some(meal.room.room_type_id),
                rooms: vec![],
                rooms_loaded_for: None,
                room: Some(meal.room_id),
                meal_type: Some(meal.meal_type_id),
                diets: meal.diets.iter().map(|d| d.id).collect(),
                notes: meal.notes.clone(),
                is_newly_admitted: meal.is_newly_admitted,
            },
            None => Self {
                id: None,
                date: chrono::Local::now().date_naive(),
                medical_record_number: String::new(),
                patient: PatientLookup::NotChecked,
                room_type: None,
                rooms: vec![],
                rooms_loaded_for: None,
                room: None,
                meal_type: None,
                diets: BTreeSet::new(),
                notes: String::new(),
                is_newly_admitted: false,
            },
        }
    }

    fn title(&self) -> String {
        if self.id.is_some() {
            "Edit Meal Request".into()
        } else {
            "Add Meal Request".into()
        }
    }

    fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    fn show(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        choices: &MealChoices,
        errors: &FieldErrors,
    ) {
        ui.label("Date");
        ui.label(self.date.format("%-d %B %Y").to_string());
        ui.end_row();

        form::field(ui, "Medical record number", errors, "medicalRecordNumber", |ui| {
            self.show_patient(ui, conn, toasts);
        });

        let room_types: Vec<_> = choices
            .room_types
            .iter()
            .map(|t| (t.id, t.name.clone()))
            .collect();
        form::field(ui, "Room type", errors, "roomTypeID", |ui| {
            widgets::single_select(ui, "meal room type", &mut self.room_type, &room_types, "Choose room type");
        });
        self.load_rooms(conn, toasts);

        let rooms: Vec<_> = self
            .rooms
            .iter()
            .map(|r| (r.id, format!("{} ({})", r.name, r.treatment_class)))
            .collect();
        form::field(ui, "Room", errors, "roomID", |ui| {
            widgets::single_select(ui, "meal room", &mut self.room, &rooms, "Choose room");
        });

        let meal_types: Vec<_> = choices
            .meal_types
            .iter()
            .map(|t| (t.id, format!("{} - {}", t.code, t.name)))
            .collect();
        form::field(ui, "Meal type", errors, "mealTypeID", |ui| {
            widgets::single_select(ui, "meal type", &mut self.meal_type, &meal_types, "Choose meal type");
        });

        let diets: Vec<_> = choices
            .diets
            .iter()
            .map(|d| (d.id, format!("{} - {}", d.code, d.name)))
            .collect();
        form::field(ui, "Diets", errors, "dietIDs", |ui| {
            widgets::multi_select(ui, "meal diets", &mut self.diets, &diets, "None");
        });

        form::field(ui, "Notes", errors, "notes", |ui| {
            ui.add(egui::TextEdit::multiline(&mut self.notes).desired_rows(2).desired_width(220.0));
        });

        ui.label("");
        ui.checkbox(&mut self.is_newly_admitted, "Newly admitted");
        ui.end_row();
    }

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError> {
        let body = self.validate()?;
        query::save(conn, PATH, self.id, &body)?;
        Ok(())
    }

    fn delete(&self, conn: &mut Connection) -> api::Result<()> {
        match self.id {
            Some(id) => query::delete(conn, PATH, id),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[cfg(test)]
fn patient_backend() -> TestServer {
    TestServer::start(|request| {
        if request.url == "/patient/filter?mrn=00-12-34" {
            Reply::data(serde_json::json!({
                "id": 4,
                "medicalRecordNumber": "00-12-34",
                "name": "Siti Aminah",
                "allergies": [{"id": 2, "code": "SF", "name": "Seafood"}]
            }))
        } else if request.path() == "/patient/filter" {
            Reply::not_found("patient not found")
        } else {
            Reply::data(serde_json::json!(null))
        }
    })
}

#[test]
fn known_record_number_fills_patient() {
    let server = patient_backend();
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();
    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let mut form = DailyMealForm::for_date(date, Some(RoomTypeId(3)));
    form.medical_record_number = "00-12-34".into();
    form.lookup_patient(&mut conn, &mut toasts);
    let PatientLookup::Found { id, name, allergies } = &form.patient else {
        panic!("patient not found: {:?}", form.patient);
    };
    assert_eq!((*id, name.as_str()), (PatientId(4), "Siti Aminah"));
    assert_eq!(allergies[0].code, "SF");

    form.room = Some(RoomId(9));
    form.meal_type = Some(MealTypeId(2));
    form.diets.insert(DietId(1));
    form.submit(&mut conn).unwrap();

    let post = server.requests().pop().unwrap();
    assert_eq!((post.method.as_str(), post.path()), ("POST", "/daily-patient-meal"));
    assert_eq!(
        post.json(),
        serde_json::json!({
            "patientID": 4,
            "roomID": 9,
            "mealTypeID": 2,
            "date": "2025-03-01T00:00:00Z",
            "notes": "",
            "dietIDs": [1],
            "isNewlyAdmitted": false
        })
    );
}

#[test]
fn unknown_record_number_blocks_submit() {
    let server = patient_backend();
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut form = DailyMealForm::for_date(
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        Some(RoomTypeId(3)),
    );
    form.medical_record_number = "11-11-11".into();
    form.lookup_patient(&mut conn, &mut toasts);
    assert_eq!(form.patient, PatientLookup::NotFound);

    form.room = Some(RoomId(9));
    form.meal_type = Some(MealTypeId(2));
    let Err(SubmitError::Invalid(errors)) = form.submit(&mut conn) else {
        panic!("submitted without a patient");
    };
    assert_eq!(errors.get("medicalRecordNumber"), ["Patient not found"]);
    assert!(server.requests().iter().all(|r| r.method == "GET"));
}

#[test]
fn editing_keeps_the_calendar_day_of_an_offset_date() {
    let server = patient_backend();
    let mut conn = Connection::new(&server.base_url()).unwrap();

    let mut meal = sample_meal();
    meal.date = "2025-03-01T00:00:00+07:00".parse().unwrap();
    let mut form = DailyMealForm::new(Some(&meal));
    assert_eq!(form.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

    form.notes = "soft rice".into();
    form.submit(&mut conn).unwrap();
    let patch = server.requests().pop().unwrap();
    assert_eq!((patch.method.as_str(), patch.path()), ("PATCH", "/daily-patient-meal/12"));
    assert_eq!(patch.json()["date"], "2025-03-01T00:00:00Z");
}

#[cfg(test)]
pub fn sample_meal() -> DailyPatientMeal {
    serde_json::from_value(serde_json::json!({
        "id": 12,
        "patientID": 4,
        "roomID": 9,
        "mealTypeID": 2,
        "date": "2025-03-01T00:00:00Z",
        "notes": "no sugar",
        "createdAt": "2025-03-01T06:10:00Z",
        "updatedAt": "2025-03-01T07:45:00Z",
        "patient": {
            "id": 4,
            "medicalRecordNumber": "00-12-34",
            "name": "siti   aminah",
            "dateOfBirth": "1961-08-17T00:00:00Z",
            "allergies": [{"id": 2, "code": "SF", "name": "Seafood"}]
        },
        "room": {
            "id": 9,
            "code": "M-2",
            "name": "Melati 2",
            "treatmentClass": "I",
            "roomTypeID": 3
        },
        "mealType": {"id": 2, "code": "BL", "name": "Bubur lunak"},
        "diets": [{"id": 1, "code": "DM", "name": "Diabetes Mellitus"}],
        "isNewlyAdmitted": false
    }))
    .unwrap()
}
