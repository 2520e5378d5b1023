use super::form::{self, SubmitError};
use super::{query, widgets};
use crate::api::Connection;
use crate::validation::{self, FieldErrors};
use eframe::egui;

/// The signed-in user's own name and password.
pub struct ProfilePage {
    name: String,
    name_errors: FieldErrors,
    password: String,
    confirmation: String,
    password_errors: FieldErrors,
}

impl ProfilePage {
    pub fn new(conn: &Connection) -> Self {
        Self {
            name: conn
                .session()
                .user()
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            name_errors: FieldErrors::default(),
            password: String::new(),
            confirmation: String::new(),
            password_errors: FieldErrors::default(),
        }
    }

    fn validate_name(&self) -> Result<&str, FieldErrors> {
        let mut errors = FieldErrors::default();
        validation::required(&mut errors, "name", &self.name, "Please enter your name");
        errors.check(self.name.trim())
    }

    fn validate_password(&self) -> Result<&str, FieldErrors> {
        let mut errors = FieldErrors::default();
        validation::password(&mut errors, "password", &self.password);
        validation::confirmation(
            &mut errors,
            "confirmPassword",
            &self.password,
            &self.confirmation,
        );
        errors.check(self.password.as_str())
    }

    pub fn change_name(&mut self, conn: &mut Connection, toasts: &mut egui_toast::Toasts) {
        let Some(user_id) = conn.session().user().map(|u| u.user_id) else {
            return;
        };
        let result = self.validate_name().map(str::to_owned);
        let result: Result<(), SubmitError> = match result {
            Ok(name) => query::change_name(conn, user_id, &name)
                .and_then(|()| query::check_session(conn))
                .map_err(Into::into),
            Err(errors) => Err(errors.into()),
        };
        form::report(result, &mut self.name_errors, toasts, "Name changed");
    }

    pub fn change_password(&mut self, conn: &mut Connection, toasts: &mut egui_toast::Toasts) {
        let Some(user_id) = conn.session().user().map(|u| u.user_id) else {
            return;
        };
        let result: Result<(), SubmitError> = match self.validate_password() {
            Ok(password) => query::change_password(conn, user_id, password).map_err(Into::into),
            Err(errors) => Err(errors.into()),
        };
        if form::report(result, &mut self.password_errors, toasts, "Password changed") {
            self.password.clear();
            self.confirmation.clear();
        }
    }

    fn password_edited(&mut self) {
        self.password_errors = self.validate_password().err().unwrap_or_default();
    }

    pub fn update(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) {
        ui.heading("Profile");
        if let Some(user) = conn.session().user() {
            ui.label(format!("Signed in as {} ({})", user.username, user.role));
        }
        ui.separator();

        let mut save_name = false;
        egui::Grid::new("profile name")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                form::field(ui, "Name", &self.name_errors, "name", |ui| {
                    widgets::text_input(ui, &mut self.name, "");
                });
                ui.label("");
                save_name = ui.button("Change name").clicked();
                ui.end_row();
            });
        if save_name {
            self.change_name(conn, toasts);
        }
        ui.separator();

        let mut save_password = false;
        let mut edited = false;
        egui::Grid::new("profile password")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                form::field(ui, "New password", &self.password_errors, "password", |ui| {
                    edited |= widgets::password_input(ui, &mut self.password).changed();
                });
                form::field(
                    ui,
                    "Confirm password",
                    &self.password_errors,
                    "confirmPassword",
                    |ui| {
                        edited |= widgets::password_input(ui, &mut self.confirmation).changed();
                    },
                );
                ui.label("");
                save_password = ui.button("Change password").clicked();
                ui.end_row();
            });
        if edited {
            self.password_edited();
        }
        if save_password {
            self.change_password(conn, toasts);
        }
    }
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[cfg(test)]
fn signed_in() -> (TestServer, Connection) {
    let server = TestServer::start(|request| match request.path() {
        "/auth/check-session" => Reply::data(serde_json::json!({
            "userID": 5, "username": "perawat1", "name": "Rina Wati", "role": "perawat"
        })),
        _ => Reply::data(serde_json::json!(null)),
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    query::check_session(&mut conn).unwrap();
    (server, conn)
}

#[test]
fn password_is_checked_while_typing() {
    let (server, mut conn) = signed_in();
    let mut toasts = egui_toast::Toasts::new();
    let mut page = ProfilePage::new(&conn);

    page.password = "Abcdefg1".into();
    page.confirmation = "Abcdefg".into();
    page.password_edited();
    assert!(page.password_errors.contains("confirmPassword"));
    assert!(!page.password_errors.contains("password"));

    page.change_password(&mut conn, &mut toasts);
    assert_eq!(server.requests().len(), 1);

    page.confirmation = "Abcdefg1".into();
    page.password_edited();
    assert!(page.password_errors.is_empty());
    page.change_password(&mut conn, &mut toasts);

    let request = server.requests().pop().unwrap();
    assert_eq!(request.path(), "/user/5/actions/change-password");
    assert_eq!(request.json(), serde_json::json!({"password": "Abcdefg1"}));
    assert!(page.password.is_empty());
}

#[test]
fn name_change_refreshes_session() {
    let (server, mut conn) = signed_in();
    let mut toasts = egui_toast::Toasts::new();
    let mut page = ProfilePage::new(&conn);
    assert_eq!(page.name, "Rina Wati");

    page.name = "  ".into();
    page.change_name(&mut conn, &mut toasts);
    assert!(page.name_errors.contains("name"));

    page.name = "Rina".into();
    page.change_name(&mut conn, &mut toasts);
    let paths: Vec<_> = server
        .requests()
        .iter()
        .map(|r| r.path().to_owned())
        .collect();
    assert_eq!(
        paths,
        [
            "/auth/check-session",
            "/user/5/actions/change-name",
            "/auth/check-session"
        ]
    );
    assert!(page.name_errors.is_empty());
}
