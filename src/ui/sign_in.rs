use super::form::{self, SubmitError};
use super::{query, widgets};
use crate::api::Connection;
use crate::validation::{self, FieldErrors};
use eframe::egui;

#[derive(Default)]
pub struct SignInPage {
    username: String,
    password: String,
    errors: FieldErrors,
}

impl SignInPage {
    fn validate(&self) -> Result<(&str, &str), FieldErrors> {
        let mut errors = FieldErrors::default();
        validation::required(&mut errors, "username", &self.username, "Please enter your username");
        validation::required(&mut errors, "password", &self.password, "Please enter your password");
        errors.check((self.username.trim(), self.password.as_str()))
    }

    /// Returns true once the session is established.
    pub fn submit(&mut self, conn: &mut Connection, toasts: &mut egui_toast::Toasts) -> bool {
        let result: Result<(), SubmitError> = match self.validate() {
            Ok((username, password)) => {
                query::sign_in(conn, username, password).map_err(Into::into)
            }
            Err(errors) => Err(errors.into()),
        };
        let signed_in = form::report(result, &mut self.errors, toasts, "Signed in");
        if signed_in {
            self.password.clear();
        }
        signed_in
    }

    pub fn update(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) -> bool {
        let mut submit = false;
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.heading("Sign in");
            ui.add_space(16.0);
            egui::Grid::new("sign in")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    form::field(ui, "Username", &self.errors, "username", |ui| {
                        widgets::text_input(ui, &mut self.username, "");
                    });
                    form::field(ui, "Password", &self.errors, "password", |ui| {
                        let response = widgets::password_input(ui, &mut self.password);
                        submit |= response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    });
                });
            ui.add_space(8.0);
            submit |= ui.button("Sign in").clicked();
        });
        submit && self.submit(conn, toasts)
    }
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[test]
fn blank_credentials_never_reach_the_server() {
    let server = TestServer::start(|_| {
        Reply::data(serde_json::json!({
            "userID": 1, "username": "admin", "name": "Admin", "role": "admin"
        }))
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut page = SignInPage::default();
    page.username = "admin".into();
    assert!(!page.submit(&mut conn, &mut toasts));
    assert!(page.errors.contains("password"));
    assert!(server.requests().is_empty());

    page.password = "Rahasia1".into();
    assert!(page.submit(&mut conn, &mut toasts));
    assert!(conn.session().is_authenticated());
    assert_eq!(
        server.requests()[0].json(),
        serde_json::json!({"username": "admin", "password": "Rahasia1"})
    );
}

#[test]
fn wrong_password_is_not_an_expired_session() {
    let server = TestServer::start(|_| Reply::json(401, r#"{"error": "wrong password"}"#));
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut page = SignInPage::default();
    page.username = "admin".into();
    page.password = "Salah123".into();
    assert!(!page.submit(&mut conn, &mut toasts));
    assert!(!conn.take_session_expired());
    assert!(!conn.sign_in_redirect_pending());
    assert_eq!(page.username, "admin");

    let error = query::sign_in(&mut conn, "admin", "Salah123").unwrap_err();
    assert_eq!(error.to_string(), "wrong password");
}
