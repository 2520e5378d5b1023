use super::dialog::FormDialog;
use super::form::{self, EntityForm, FormEvent, SubmitError};
use super::{pagination, query, widgets};
use crate::api::models::{Allergy, AllergyId, Patient, PatientId};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use eframe::egui;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

const PATH: &str = "/patient";

/// How long the keyword has to stay unchanged before it is searched for.
pub const KEYWORD_DEBOUNCE: Duration = Duration::from_secs(1);

pub fn format_date_of_birth(date_of_birth: Option<DateTime<FixedOffset>>) -> String {
    date_of_birth
        .map(|d| d.format("%-d %B %Y").to_string())
        .unwrap_or_else(|| "-".into())
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PatientBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    medical_record_number: Option<&'a str>,
    name: &'a str,
    date_of_birth: DateTime<Utc>,
    #[serde(rename = "allergyIDs")]
    allergy_ids: Vec<AllergyId>,
}

pub struct PatientForm {
    id: Option<PatientId>,
    medical_record_number: String,
    name: String,
    date_of_birth: NaiveDate,
    allergies: BTreeSet<AllergyId>,
}

impl PatientForm {
    fn validate(&self) -> Result<PatientBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.id.is_none() {
            validation::required(
                &mut errors,
                "medicalRecordNumber",
                &self.medical_record_number,
                "Please enter the medical record number",
            );
        }
        validation::required(&mut errors, "name", &self.name, "Please enter the patient name");
        errors.check(PatientBody {
            // the record number can't change once the patient exists
            medical_record_number: self
                .id
                .is_none()
                .then(|| self.medical_record_number.trim()),
            name: self.name.trim(),
            date_of_birth: self.date_of_birth.and_time(Default::default()).and_utc(),
            allergy_ids: self.allergies.iter().copied().collect(),
        })
    }
}

impl EntityForm for PatientForm {
    type Entity = Patient;
    type Context = Vec<Allergy>;

    fn new(initial: Option<&Patient>) -> Self {
        Self {
            id: initial.map(|p| p.id),
            medical_record_number: initial
                .map(|p| p.medical_record_number.clone())
                .unwrap_or_default(),
            name: initial.map(|p| p.name.clone()).unwrap_or_default(),
            date_of_birth: initial
                .and_then(|p| p.date_of_birth)
                .map(|d| d.date_naive())
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
            allergies: initial
                .map(|p| p.allergies.iter().map(|a| a.id).collect())
                .unwrap_or_default(),
        }
    }

    fn title(&self) -> String {
        if self.id.is_some() {
            "Edit Patient".into()
        } else {
            "Add Patient".into()
        }
    }

    fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    fn show(
        &mut self,
        ui: &mut egui::Ui,
        _conn: &mut Connection,
        _toasts: &mut egui_toast::Toasts,
        allergies: &Vec<Allergy>,
        errors: &FieldErrors,
    ) {
        form::field(ui, "Medical record number", errors, "medicalRecordNumber", |ui| {
            if self.id.is_some() {
                ui.label(&self.medical_record_number);
            } else {
                widgets::text_input(ui, &mut self.medical_record_number, "00-00-00");
            }
        });
        form::field(ui, "Name", errors, "name", |ui| {
            widgets::text_input(ui, &mut self.name, "");
        });
        form::field(ui, "Date of birth", errors, "dateOfBirth", |ui| {
            widgets::date_input(ui, "patient date of birth", &mut self.date_of_birth);
        });
        let options: Vec<_> = allergies
            .iter()
            .map(|a| (a.id, format!("{} - {}", a.code, a.name)))
            .collect();
        form::field(ui, "Allergies", errors, "allergyIDs", |ui| {
            widgets::multi_select(ui, "patient allergies", &mut self.allergies, &options, "None");
        });
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

pub struct PatientsPage {
    patients: Vec<Patient>,
    allergies: Vec<Allergy>,
    /// One-based.
    page: usize,
    total_pages: usize,
    total: u64,
    keyword: String,
    searched_keyword: String,
    keyword_edited_at: Option<Instant>,
    dialog: Option<FormDialog<PatientForm>>,
}

impl PatientsPage {
    pub fn new(conn: &mut Connection, toasts: &mut egui_toast::Toasts) -> Self {
        let allergies = query::list(conn, "/allergy").unwrap_or_else(|error| {
            form::report_api_error(toasts, &error);
            vec![]
        });
        let mut page = Self {
            patients: vec![],
            allergies,
            page: 1,
            total_pages: 0,
            total: 0,
            keyword: String::new(),
            searched_keyword: String::new(),
            keyword_edited_at: None,
            dialog: None,
        };
        page.fetch(conn, toasts);
        page
    }

    fn fetch(&mut self, conn: &mut Connection, toasts: &mut egui_toast::Toasts) {
        match query::patients_page(conn, self.page, &self.searched_keyword) {
            Ok(page) => {
                self.patients = page.data;
                self.total_pages = page.total_pages;
                self.total = page.total;
            }
            Err(error) => form::report_api_error(toasts, &error),
        }
    }

    pub fn keyword_edited(&mut self, now: Instant) {
        self.keyword_edited_at = Some(now);
    }

    /// Once the keyword settled, searches for it starting from the first page. Returns how
    /// long to wait otherwise.
    pub fn apply_keyword(
        &mut self,
        now: Instant,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) -> Option<Duration> {
        let edited_at = self.keyword_edited_at?;
        let elapsed = now.saturating_duration_since(edited_at);
        if elapsed < KEYWORD_DEBOUNCE {
            return Some(KEYWORD_DEBOUNCE - elapsed);
        }
        self.keyword_edited_at = None;
        if self.keyword != self.searched_keyword {
            self.searched_keyword = self.keyword.clone();
            self.page = 1;
            self.fetch(conn, toasts);
        }
        None
    }

    fn update_table(&self, ui: &mut egui::Ui) -> Option<Patient> {
        let mut clicked = None;
        egui_extras::TableBuilder::new(ui)
            .id_salt("patients table")
            .striped(true)
            .sense(egui::Sense::click())
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(egui_extras::Column::exact(120.0))
            .column(egui_extras::Column::auto().at_least(200.0))
            .column(egui_extras::Column::exact(150.0))
            .column(egui_extras::Column::remainder())
            .header(22.0, |mut header| {
                for title in ["MRN", "Name", "Date of birth", "Allergies"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for patient in &self.patients {
                    body.row(22.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&patient.medical_record_number);
                        });
                        row.col(|ui| {
                            ui.label(&patient.name);
                        });
                        row.col(|ui| {
                            ui.label(format_date_of_birth(patient.date_of_birth));
                        });
                        row.col(|ui| {
                            let codes: Vec<_> =
                                patient.allergies.iter().map(|a| a.code.as_str()).collect();
                            ui.label(codes.join(", "));
                        });
                        if row.response().clicked() {
                            clicked = Some(patient.clone());
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
    ) {
        ui.heading("Patients");
        let mut add = false;
        ui.horizontal(|ui| {
            if widgets::filter_input(ui, &mut self.keyword, "Search MRN or name...").changed() {
                self.keyword_edited(Instant::now());
            }
            add = ui.button("Add patient").clicked();
            ui.label(format!("{} patients", self.total));
        });
        if add {
            self.dialog = Some(FormDialog::new(None));
        }
        if let Some(wait) = self.apply_keyword(Instant::now(), conn, toasts) {
            ui.ctx().request_repaint_after(wait);
        }
        ui.separator();

        if self.patients.is_empty() {
            ui.label("No patients found");
        } else if let Some(patient) = self.update_table(ui) {
            self.dialog = Some(FormDialog::new(Some(&patient)));
        }

        ui.separator();
        if pagination::show(ui, self.total_pages, &mut self.page) {
            self.fetch(conn, toasts);
        }

        let event = self
            .dialog
            .as_mut()
            .and_then(|dialog| dialog.update(ui.ctx(), conn, toasts, &self.allergies));
        if let Some(event) = event {
            self.dialog = None;
            if event != FormEvent::Closed {
                self.fetch(conn, toasts);
            }
        }
    }
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[test]
fn keyword_is_debounced_and_resets_page() {
    let server = TestServer::start(|request| match request.path() {
        "/allergy" => Reply::data(serde_json::json!([])),
        _ => Reply::json(
            200,
            serde_json::json!({"data": [], "message": "ok", "total": 40, "totalPages": 4})
                .to_string(),
        ),
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut page = PatientsPage::new(&mut conn, &mut toasts);
    page.page = 3;

    let start = Instant::now();
    page.keyword = "siti".into();
    page.keyword_edited(start);
    assert_eq!(
        page.apply_keyword(start + Duration::from_millis(400), &mut conn, &mut toasts),
        Some(Duration::from_millis(600))
    );
    assert_eq!(server.requests().len(), 2);

    assert_eq!(page.apply_keyword(start + KEYWORD_DEBOUNCE, &mut conn, &mut toasts), None);
    assert_eq!(page.page, 1);
    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(
        requests[2].url,
        "/patient/paginated?page=1&limit=10&keyword=siti"
    );
}

#[test]
fn record_number_is_fixed_once_created() {
    let patient: Patient = serde_json::from_value(serde_json::json!({
        "id": 4,
        "medicalRecordNumber": "00-12-34",
        "name": "Siti Aminah",
        "dateOfBirth": "1961-08-17T00:00:00Z",
        "allergies": [{"id": 2, "code": "SF", "name": "Seafood"}]
    }))
    .unwrap();

    let mut form = PatientForm::new(Some(&patient));
    form.medical_record_number = "99-99-99".into();
    let body = serde_json::to_value(form.validate().unwrap()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "name": "Siti Aminah",
            "dateOfBirth": "1961-08-17T00:00:00Z",
            "allergyIDs": [2]
        })
    );

    let mut form = PatientForm::new(None);
    form.name = "Budi".into();
    let errors = form.validate().unwrap_err();
    assert!(errors.contains("medicalRecordNumber"));
}

#[test]
fn date_of_birth_keeps_the_sent_calendar_day() {
    let patient: Patient = serde_json::from_value(serde_json::json!({
        "id": 4,
        "medicalRecordNumber": "00-12-34",
        "name": "Siti Aminah",
        "dateOfBirth": "1961-08-17T00:00:00+07:00"
    }))
    .unwrap();
    assert_eq!(format_date_of_birth(patient.date_of_birth), "17 August 1961");

    let form = PatientForm::new(Some(&patient));
    assert_eq!(form.date_of_birth, NaiveDate::from_ymd_opt(1961, 8, 17).unwrap());
    let body = serde_json::to_value(form.validate().unwrap()).unwrap();
    assert_eq!(body["dateOfBirth"], "1961-08-17T00:00:00Z");
}
