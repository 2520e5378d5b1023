//! The code + name catalogs: diets and allergies.

use super::catalog::{Catalog, FormContext};
use super::form::{self, EntityForm, SubmitError};
use super::{query, widgets};
use crate::api::models::{Allergy, Diet};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use eframe::egui;
use serde::Serialize;
use std::marker::PhantomData;

pub trait CodeNamed {
    const NOUN: &'static str;

    fn id(&self) -> i64;
    fn code(&self) -> &str;
    fn name(&self) -> &str;
}

impl CodeNamed for Diet {
    const NOUN: &'static str = "Diet";

    fn id(&self) -> i64 {
        self.id.0
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl CodeNamed for Allergy {
    const NOUN: &'static str = "Allergy";

    fn id(&self) -> i64 {
        self.id.0
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Serialize, Debug, PartialEq)]
struct CodeNameBody<'a> {
    code: &'a str,
    name: &'a str,
}

pub struct CodeNameForm<E> {
    id: Option<i64>,
    pub(super) code: String,
    pub(super) name: String,
    entity: PhantomData<E>,
}

impl<E: CodeNamed + Catalog> CodeNameForm<E> {
    fn validate(&self) -> Result<CodeNameBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        let noun = E::NOUN.to_lowercase();
        validation::required(
            &mut errors,
            "code",
            &self.code,
            &format!("Please enter the {noun} code"),
        );
        validation::required(
            &mut errors,
            "name",
            &self.name,
            &format!("Please enter the {noun} name"),
        );
        errors.check(CodeNameBody {
            code: self.code.trim(),
            name: self.name.trim(),
        })
    }
}

impl<E: CodeNamed + Catalog> EntityForm for CodeNameForm<E> {
    type Entity = E;
    type Context = ();

    fn new(initial: Option<&E>) -> Self {
        Self {
            id: initial.map(CodeNamed::id),
            code: initial.map(|e| e.code().to_owned()).unwrap_or_default(),
            name: initial.map(|e| e.name().to_owned()).unwrap_or_default(),
            entity: PhantomData,
        }
    }

    fn title(&self) -> String {
        match self.id {
            Some(_) => format!("Edit {}", E::NOUN),
            None => format!("Add {}", E::NOUN),
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
        form::field(ui, "Code", errors, "code", |ui| {
            widgets::text_input(ui, &mut self.code, "e.g. DM");
        });
        form::field(ui, "Name", errors, "name", |ui| {
            widgets::text_input(ui, &mut self.name, "");
        });
    }

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError> {
        let body = self.validate()?;
        query::save(conn, E::PATH, self.id, &body)?;
        Ok(())
    }

    fn delete(&self, conn: &mut Connection) -> api::Result<()> {
        match self.id {
            Some(id) => query::delete(conn, E::PATH, id),
            None => Ok(()),
        }
    }
}

impl Catalog for Diet {
    type Form = CodeNameForm<Diet>;

    const TITLE: &'static str = "Diets";
    const PATH: &'static str = "/diet";
    const ADD_LABEL: &'static str = "Add diet";
    const COLUMNS: &'static [&'static str] = &["ID", "Code", "Name"];
    const FILTER_COLUMNS: &'static [usize] = &[1, 2];

    fn cells(&self) -> Vec<String> {
        vec![self.id.to_string(), self.code.clone(), self.name.clone()]
    }

    fn load_context(_conn: &mut Connection) -> api::Result<FormContext<Self>> {
        Ok(())
    }
}

impl Catalog for Allergy {
    type Form = CodeNameForm<Allergy>;

    const TITLE: &'static str = "Allergies";
    const PATH: &'static str = "/allergy";
    const ADD_LABEL: &'static str = "Add allergy";
    const COLUMNS: &'static [&'static str] = &["ID", "Code", "Name"];
    const FILTER_COLUMNS: &'static [usize] = &[1, 2];

    fn cells(&self) -> Vec<String> {
        vec![self.id.to_string(), self.code.clone(), self.name.clone()]
    }

    fn load_context(_conn: &mut Connection) -> api::Result<FormContext<Self>> {
        Ok(())
    }
}

#[cfg(test)]
use {
    super::catalog::CatalogPage,
    super::form::FormEvent,
    crate::api::test_server::{Reply, TestServer},
    serde_json::json,
    std::sync::{Arc, Mutex},
};

#[cfg(test)]
fn diet_backend(diets: Vec<serde_json::Value>) -> TestServer {
    let diets = Arc::new(Mutex::new(diets));
    TestServer::start(move |request| {
        let mut diets = diets.lock().unwrap();
        match (request.method.as_str(), request.path()) {
            ("GET", "/diet") => Reply::data(json!(*diets)),
            ("POST", "/diet") => {
                let mut diet = request.json();
                diet["id"] = json!(diets.len() + 1);
                diets.push(diet.clone());
                Reply::json(201, json!({"data": diet, "message": "created"}).to_string())
            }
            _ => Reply::not_found("no such route"),
        }
    })
}

#[test]
fn creating_a_diet_posts_and_refetches() {
    let server = diet_backend(vec![json!({"id": 1, "code": "RG", "name": "Rendah Garam"})]);
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut page = CatalogPage::<Diet>::new(&mut conn, &mut toasts);
    assert_eq!(page.entities().len(), 1);

    page.open_create();
    let dialog = page.dialog_mut().unwrap();
    dialog.form_mut().code = "DM".into();
    dialog.form_mut().name = "Diabetes Mellitus".into();
    let event = dialog.submit(&mut conn, &mut toasts);
    assert_eq!(event, Some(FormEvent::Saved));
    page.form_finished(FormEvent::Saved, &mut conn, &mut toasts);

    assert!(page.dialog_mut().is_none());
    let codes: Vec<_> = page.entities().iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, ["RG", "DM"]);

    let requests = server.requests();
    let post = requests.iter().find(|r| r.method == "POST").unwrap();
    assert_eq!(post.path(), "/diet");
    assert_eq!(
        post.json(),
        json!({"code": "DM", "name": "Diabetes Mellitus"})
    );
    let last = requests.last().unwrap();
    assert_eq!((last.method.as_str(), last.path()), ("GET", "/diet"));
}

#[test]
fn empty_diet_is_not_sent() {
    let server = diet_backend(vec![]);
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut page = CatalogPage::<Diet>::new(&mut conn, &mut toasts);
    page.open_create();
    let dialog = page.dialog_mut().unwrap();
    dialog.form_mut().code = "DM".into();
    assert_eq!(dialog.submit(&mut conn, &mut toasts), None);
    assert!(dialog.errors().contains("name"));
    assert!(!dialog.errors().contains("code"));

    assert!(server.requests().iter().all(|r| r.method == "GET"));
}

#[test]
fn editing_an_allergy_patches_by_id() {
    let server = TestServer::start(|_| Reply::data(json!(null)));
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let allergy = Allergy {
        id: crate::api::models::AllergyId(4),
        code: "SF".into(),
        name: "Seafood".into(),
    };

    let mut form = CodeNameForm::<Allergy>::new(Some(&allergy));
    assert_eq!(form.title(), "Edit Allergy");
    form.name = "Seafood & shellfish".into();
    form.submit(&mut conn).unwrap();
    form.delete(&mut conn).unwrap();

    let requests = server.requests();
    assert_eq!((requests[0].method.as_str(), requests[0].path()), ("PATCH", "/allergy/4"));
    assert_eq!(requests[0].json()["name"], "Seafood & shellfish");
    assert_eq!((requests[1].method.as_str(), requests[1].path()), ("DELETE", "/allergy/4"));
}

#[test]
fn diet_filter_looks_at_code_and_name() {
    let server = diet_backend(vec![
        json!({"id": 1, "code": "RG", "name": "Rendah Garam"}),
        json!({"id": 2, "code": "DM", "name": "Diabetes Mellitus"}),
    ]);
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let mut toasts = egui_toast::Toasts::new();

    let mut page = CatalogPage::<Diet>::new(&mut conn, &mut toasts);
    page.set_filter("garam");
    let visible: Vec<_> = page.visible().iter().map(|d| d.id.0).collect();
    assert_eq!(visible, [1]);

    page.set_filter("dm");
    let visible: Vec<_> = page.visible().iter().map(|d| d.id.0).collect();
    assert_eq!(visible, [2]);
}
