use super::catalog::{Catalog, FormContext};
use super::form::{self, EntityForm, SubmitError};
use super::{dialog, new_success_toast, query, widgets};
use crate::api::models::{User, UserId, UserRole};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use eframe::egui;
use serde::Serialize;

#[derive(Serialize, Debug)]
struct RegisterBody<'a> {
    username: &'a str,
    name: &'a str,
    password: &'a str,
    role: UserRole,
}

#[derive(Serialize, Debug)]
struct UserBody<'a> {
    username: &'a str,
    name: &'a str,
    role: UserRole,
}

/// Registers a new user, or edits an existing one. Passwords are only set at registration,
/// afterwards an admin can reset them.
pub struct UserForm {
    id: Option<UserId>,
    username: String,
    name: String,
    password: String,
    role: Option<UserRole>,
    confirming_reset: bool,
}

impl UserForm {
    fn validate_common(&self, errors: &mut FieldErrors) -> UserRole {
        validation::username(errors, "username", &self.username);
        validation::required(errors, "name", &self.name, "Please enter the user's name");
        validation::selected(errors, "role", self.role, "Please choose a role")
    }

    fn validate_registration(&self) -> Result<RegisterBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        let role = self.validate_common(&mut errors);
        validation::password(&mut errors, "password", &self.password);
        errors.check(RegisterBody {
            username: self.username.trim(),
            name: self.name.trim(),
            password: &self.password,
            role,
        })
    }

    fn validate_edit(&self) -> Result<UserBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        let role = self.validate_common(&mut errors);
        errors.check(UserBody {
            username: self.username.trim(),
            name: self.name.trim(),
            role,
        })
    }
}

impl EntityForm for UserForm {
    type Entity = User;
    type Context = ();

    fn new(initial: Option<&User>) -> Self {
        Self {
            id: initial.map(|u| u.id),
            username: initial.map(|u| u.username.clone()).unwrap_or_default(),
            name: initial.map(|u| u.name.clone()).unwrap_or_default(),
            password: String::new(),
            role: initial.map(|u| u.role),
            confirming_reset: false,
        }
    }

    fn title(&self) -> String {
        if self.id.is_some() {
            "Edit User".into()
        } else {
            "Register User".into()
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
        _context: &(),
        errors: &FieldErrors,
    ) {
        form::field(ui, "Username", errors, "username", |ui| {
            widgets::text_input(ui, &mut self.username, "");
        });
        form::field(ui, "Name", errors, "name", |ui| {
            widgets::text_input(ui, &mut self.name, "");
        });
        if self.id.is_none() {
            form::field(ui, "Password", errors, "password", |ui| {
                widgets::password_input(ui, &mut self.password);
            });
        }
        let roles: Vec<_> = UserRole::iter().map(|r| (r, r.to_string())).collect();
        form::field(ui, "Role", errors, "role", |ui| {
            widgets::single_select(ui, "user role", &mut self.role, &roles, "Choose role");
        });
    }

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError> {
        match self.id {
            None => query::register_user(conn, &self.validate_registration()?)?,
            Some(id) => query::save(conn, User::PATH, Some(id), &self.validate_edit()?)?,
        }
        Ok(())
    }

    fn delete(&self, conn: &mut Connection) -> api::Result<()> {
        match self.id {
            Some(id) => query::delete(conn, User::PATH, id),
            None => Ok(()),
        }
    }

    fn extra_actions(
        &mut self,
        ui: &mut egui::Ui,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) {
        let Some(id) = self.id else {
            return;
        };
        if ui.button("Reset password").clicked() {
            self.confirming_reset = true;
        }
        if !self.confirming_reset {
            return;
        }

        let question = format!(
            "The password of {} will be reset to the default password.",
            self.username
        );
        match dialog::confirm(ui.ctx(), egui::Id::new(("reset password", id)), &question) {
            Some(true) => {
                self.confirming_reset = false;
                match query::reset_password(conn, id) {
                    Ok(()) => {
                        toasts.add(new_success_toast("Password has been reset"));
                    }
                    Err(error) => form::report_api_error(toasts, &error),
                }
            }
            Some(false) => self.confirming_reset = false,
            None => {}
        }
    }
}

impl Catalog for User {
    type Form = UserForm;

    const TITLE: &'static str = "Users";
    const PATH: &'static str = "/user";
    const ADD_LABEL: &'static str = "Register user";
    const COLUMNS: &'static [&'static str] = &["Username", "Name", "Role"];
    const FILTER_COLUMNS: &'static [usize] = &[0, 1];

    fn cells(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.name.clone(),
            self.role.to_string(),
        ]
    }

    fn load_context(_conn: &mut Connection) -> api::Result<FormContext<Self>> {
        Ok(())
    }
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[test]
fn registration_goes_to_register_endpoint() {
    let server = TestServer::start(|_| Reply::data(serde_json::json!(null)));
    let mut conn = Connection::new(&server.base_url()).unwrap();

    let mut form = UserForm::new(None);
    form.username = "abc".into();
    form.name = "Rina".into();
    form.password = "abc".into();
    let Err(SubmitError::Invalid(errors)) = form.submit(&mut conn) else {
        panic!("weak registration accepted");
    };
    assert!(errors.contains("username"));
    assert!(errors.contains("password"));
    assert!(errors.contains("role"));
    assert!(server.requests().is_empty());

    form.username = "perawat1".into();
    form.password = "Abcdefg1".into();
    form.role = Some(UserRole::Nurse);
    form.submit(&mut conn).unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].path(), "/auth/register");
    assert_eq!(
        requests[0].json(),
        serde_json::json!({
            "username": "perawat1",
            "name": "Rina",
            "password": "Abcdefg1",
            "role": "perawat"
        })
    );
}

#[test]
fn editing_a_user_patches_without_password() {
    let server = TestServer::start(|_| Reply::data(serde_json::json!(null)));
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let user: User = serde_json::from_value(serde_json::json!({
        "id": 8, "username": "gizi01", "name": "Dewi", "role": "ahli_gizi"
    }))
    .unwrap();

    let mut form = UserForm::new(Some(&user));
    form.role = Some(UserRole::Admin);
    form.submit(&mut conn).unwrap();
    query::reset_password(&mut conn, user.id).unwrap();

    let requests = server.requests();
    assert_eq!((requests[0].method.as_str(), requests[0].path()), ("PATCH", "/user/8"));
    assert_eq!(
        requests[0].json(),
        serde_json::json!({"username": "gizi01", "name": "Dewi", "role": "admin"})
    );
    assert_eq!(requests[1].path(), "/user/8/actions/reset-password");
}
