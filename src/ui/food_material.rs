use super::catalog::{Catalog, FormContext};
use super::form::{self, EntityForm, SubmitError};
use super::{query, widgets};
use crate::api::models::{FoodMaterial, FoodMaterialId};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use eframe::egui;
use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FoodMaterialBody<'a> {
    name: &'a str,
    unit: &'a str,
    standard_per_meal: f64,
}

pub struct FoodMaterialForm {
    id: Option<FoodMaterialId>,
    name: String,
    unit: String,
    standard_per_meal: String,
}

impl FoodMaterialForm {
    fn validate(&self) -> Result<FoodMaterialBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        validation::required(&mut errors, "name", &self.name, "Please enter the material name");
        validation::required(&mut errors, "unit", &self.unit, "Please enter the unit");
        let standard_per_meal = validation::positive_number(
            &mut errors,
            "standardPerMeal",
            &self.standard_per_meal,
            "The standard quantity must be greater than 0",
        );
        errors.check(FoodMaterialBody {
            name: self.name.trim(),
            unit: self.unit.trim(),
            standard_per_meal,
        })
    }
}

impl EntityForm for FoodMaterialForm {
    type Entity = FoodMaterial;
    type Context = ();

    fn new(initial: Option<&FoodMaterial>) -> Self {
        match initial {
            Some(material) => Self {
                id: Some(material.id),
                name: material.name.clone(),
                unit: material.unit.clone(),
                standard_per_meal: material.standard_per_meal.to_string(),
            },
            None => Self {
                id: None,
                name: String::new(),
                unit: String::new(),
                standard_per_meal: String::new(),
            },
        }
    }

    fn title(&self) -> String {
        if self.id.is_some() {
            "Edit Food Material".into()
        } else {
            "Add Food Material".into()
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
        form::field(ui, "Name", errors, "name", |ui| {
            widgets::text_input(ui, &mut self.name, "e.g. Beras");
        });
        form::field(ui, "Unit", errors, "unit", |ui| {
            widgets::text_input(ui, &mut self.unit, "e.g. gram");
        });
        form::field(ui, "Standard per meal", errors, "standardPerMeal", |ui| {
            widgets::text_input(ui, &mut self.standard_per_meal, "0");
        });
    }

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError> {
        let body = self.validate()?;
        query::save(conn, FoodMaterial::PATH, self.id, &body)?;
        Ok(())
    }

    fn delete(&self, conn: &mut Connection) -> api::Result<()> {
        match self.id {
            Some(id) => query::delete(conn, FoodMaterial::PATH, id),
            None => Ok(()),
        }
    }
}

impl Catalog for FoodMaterial {
    type Form = FoodMaterialForm;

    const TITLE: &'static str = "Food Materials";
    const PATH: &'static str = "/food-material";
    const ADD_LABEL: &'static str = "Add food material";
    const COLUMNS: &'static [&'static str] = &["Name", "Unit", "Standard per meal"];
    const FILTER_COLUMNS: &'static [usize] = &[0, 1];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.unit.clone(),
            self.standard_per_meal.to_string(),
        ]
    }

    fn load_context(_conn: &mut Connection) -> api::Result<FormContext<Self>> {
        Ok(())
    }
}

#[test]
fn standard_per_meal_is_coerced_and_positive() {
    let mut form = FoodMaterialForm::new(None);
    form.name = "Beras".into();
    form.unit = "gram".into();
    form.standard_per_meal = "abc".into();
    let errors = form.validate().unwrap_err();
    assert!(errors.contains("standardPerMeal"));

    form.standard_per_meal = "-5".into();
    assert!(form.validate().is_err());

    form.standard_per_meal = "100".into();
    let body = serde_json::to_value(form.validate().unwrap()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"name": "Beras", "unit": "gram", "standardPerMeal": 100.0})
    );
}
