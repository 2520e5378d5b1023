use super::catalog::{Catalog, FormContext};
use super::form::{self, EntityForm, SubmitError};
use super::search::SearchWidget;
use super::{query, widgets};
use crate::api::models::{Food, FoodId, FoodMaterial, FoodMaterialId, FoodMaterialUsage};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use eframe::egui;
use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageBody {
    #[serde(rename = "foodMaterialID")]
    food_material_id: FoodMaterialId,
    quantity_used: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FoodBody<'a> {
    name: &'a str,
    food_material_usages: Vec<UsageBody>,
}

#[derive(Default)]
struct UsageRow {
    material: Option<FoodMaterialId>,
    material_name: String,
    quantity: String,
}

impl UsageRow {
    fn from_usage(usage: &FoodMaterialUsage) -> Self {
        Self {
            material: Some(usage.food_material_id),
            material_name: usage
                .food_material
                .as_ref()
                .map(|m| m.name.clone())
                .unwrap_or_default(),
            quantity: usage.quantity_used.to_string(),
        }
    }
}

pub struct FoodForm {
    id: Option<FoodId>,
    name: String,
    usages: Vec<UsageRow>,
}

impl FoodForm {
    fn validate(&self) -> Result<FoodBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        validation::required(&mut errors, "name", &self.name, "Please enter the food name");
        if self.usages.is_empty() {
            errors.add("usages", "Add at least one food material");
        }

        let mut usages = vec![];
        for (i, row) in self.usages.iter().enumerate() {
            let n = i + 1;
            let quantity_used = validation::positive_number(
                &mut errors,
                "usages",
                &row.quantity,
                &format!("Row {n}: the quantity must be greater than 0"),
            );
            match row.material {
                Some(food_material_id) => usages.push(UsageBody {
                    food_material_id,
                    quantity_used,
                }),
                None => errors.add("usages", format!("Row {n}: choose a food material")),
            }
        }

        errors.check(FoodBody {
            name: self.name.trim(),
            food_material_usages: usages,
        })
    }

    fn show_usages(&mut self, ui: &mut egui::Ui, materials: &[FoodMaterial]) {
        let options: Vec<(FoodMaterialId, String)> =
            materials.iter().map(|m| (m.id, m.name.clone())).collect();

        let mut removed = None;
        egui::Grid::new("food material usages").show(ui, |ui| {
            for (i, row) in self.usages.iter_mut().enumerate() {
                ui.add(
                    SearchWidget::new(
                        ("food material", i),
                        &mut row.material_name,
                        &mut row.material,
                        &options,
                    )
                    .hint_text("search material")
                    .desired_width(160.0),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut row.quantity)
                        .hint_text("quantity")
                        .desired_width(60.0),
                );
                let unit = row
                    .material
                    .and_then(|id| materials.iter().find(|m| m.id == id))
                    .map(|m| m.unit.as_str())
                    .unwrap_or("");
                ui.label(unit);
                if ui.button("Remove").clicked() {
                    removed = Some(i);
                }
                ui.end_row();
            }
        });
        if let Some(i) = removed {
            self.usages.remove(i);
        }
        if ui.button("Add material").clicked() {
            self.usages.push(UsageRow::default());
        }
    }
}

impl EntityForm for FoodForm {
    type Entity = Food;
    type Context = Vec<FoodMaterial>;

    fn new(initial: Option<&Food>) -> Self {
        match initial {
            Some(food) => Self {
                id: Some(food.id),
                name: food.name.clone(),
                usages: food
                    .food_material_usages
                    .iter()
                    .map(UsageRow::from_usage)
                    .collect(),
            },
            None => Self {
                id: None,
                name: String::new(),
                usages: vec![UsageRow::default()],
            },
        }
    }

    fn title(&self) -> String {
        if self.id.is_some() {
            "Edit Food".into()
        } else {
            "Add Food".into()
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
        materials: &Vec<FoodMaterial>,
        errors: &FieldErrors,
    ) {
        form::field(ui, "Name", errors, "name", |ui| {
            widgets::text_input(ui, &mut self.name, "e.g. Nasi tim");
        });
        form::field(ui, "Materials", errors, "usages", |ui| {
            self.show_usages(ui, materials);
        });
    }

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError> {
        let body = self.validate()?;
        query::save(conn, Food::PATH, self.id, &body)?;
        Ok(())
    }

    fn delete(&self, conn: &mut Connection) -> api::Result<()> {
        match self.id {
            Some(id) => query::delete(conn, Food::PATH, id),
            None => Ok(()),
        }
    }
}

fn describe_usage(usage: &FoodMaterialUsage) -> String {
    match &usage.food_material {
        Some(material) => format!(
            "{} {} {}",
            material.name, usage.quantity_used, material.unit
        ),
        None => format!("#{} {}", usage.food_material_id, usage.quantity_used),
    }
}

impl Catalog for Food {
    type Form = FoodForm;

    const TITLE: &'static str = "Foods";
    const PATH: &'static str = "/food";
    const ADD_LABEL: &'static str = "Add food";
    const COLUMNS: &'static [&'static str] = &["Name", "Materials"];
    const FILTER_COLUMNS: &'static [usize] = &[0, 1];

    fn cells(&self) -> Vec<String> {
        let materials: Vec<String> = self.food_material_usages.iter().map(describe_usage).collect();
        vec![self.name.clone(), materials.join(", ")]
    }

    fn load_context(conn: &mut Connection) -> api::Result<FormContext<Self>> {
        query::list(conn, FoodMaterial::PATH)
    }
}

#[test]
fn food_needs_a_positive_usage() {
    let mut form = FoodForm::new(None);
    form.name = "Nasi tim".into();
    form.usages.clear();
    let errors = form.validate().unwrap_err();
    assert_eq!(errors.get("usages"), ["Add at least one food material"]);

    form.usages.push(UsageRow {
        material: None,
        material_name: "Ber".into(),
        quantity: "0".into(),
    });
    let errors = form.validate().unwrap_err();
    assert_eq!(
        errors.get("usages"),
        [
            "Row 1: the quantity must be greater than 0",
            "Row 1: choose a food material",
        ]
    );

    form.usages[0].material = Some(FoodMaterialId(2));
    form.usages[0].quantity = "75.5".into();
    let body = serde_json::to_value(form.validate().unwrap()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "name": "Nasi tim",
            "foodMaterialUsages": [{"foodMaterialID": 2, "quantityUsed": 75.5}]
        })
    );
}

#[test]
fn food_cells_describe_materials() {
    let food: Food = serde_json::from_value(serde_json::json!({
        "id": 1,
        "name": "Bubur ayam",
        "foodMaterialUsages": [
            {
                "foodMaterialID": 2,
                "quantityUsed": 50,
                "foodMaterial": {"id": 2, "name": "Beras", "unit": "gram", "standardPerMeal": 100}
            },
            {"foodMaterialID": 5, "quantityUsed": 1.5}
        ]
    }))
    .unwrap();
    assert_eq!(food.cells()[1], "Beras 50 gram, #5 1.5");
}
