use super::catalog::{Catalog, FormContext};
use super::form::{self, EntityForm, SubmitError};
use super::{query, widgets};
use crate::api::models::{
    Food, FoodId, MealMenu, MealMenuId, MealType, MealTypeId, MenuDay, MenuTime,
};
use crate::api::{self, Connection};
use crate::validation::{self, FieldErrors};
use eframe::egui;
use serde::Serialize;
use std::collections::BTreeSet;

/// Position of `value` in the fixed display sequence, so that days and times sort by the
/// calendar rather than by their spelling.
fn sequence_index<T: PartialEq>(mut sequence: impl Iterator<Item = T>, value: T) -> usize {
    sequence.position(|v| v == value).unwrap_or(usize::MAX)
}

fn menu_order(menu: &MealMenu) -> (usize, usize) {
    (
        sequence_index(MenuDay::iter(), menu.day),
        sequence_index(MenuTime::iter(), menu.time),
    )
}

#[derive(Default)]
pub struct MenuChoices {
    meal_types: Vec<MealType>,
    foods: Vec<Food>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MealMenuBody<'a> {
    name: &'a str,
    day: MenuDay,
    time: MenuTime,
    #[serde(rename = "mealTypeID")]
    meal_type_id: MealTypeId,
    #[serde(rename = "foodIDs")]
    food_ids: Vec<FoodId>,
}

pub struct MealMenuForm {
    id: Option<MealMenuId>,
    name: String,
    day: Option<MenuDay>,
    time: Option<MenuTime>,
    meal_type: Option<MealTypeId>,
    foods: BTreeSet<FoodId>,
}

impl MealMenuForm {
    fn validate(&self) -> Result<MealMenuBody<'_>, FieldErrors> {
        let mut errors = FieldErrors::default();
        validation::required(&mut errors, "name", &self.name, "Please enter the menu name");
        let day = self.day.unwrap_or_else(|| {
            errors.add("day", "Please choose the day the menu is served");
            MenuDay::Monday
        });
        let time = self.time.unwrap_or_else(|| {
            errors.add("time", "Please choose the time the menu is served");
            MenuTime::Morning
        });
        let meal_type_id = validation::selected(
            &mut errors,
            "mealTypeID",
            self.meal_type,
            "Please choose a meal type",
        );
        errors.check(MealMenuBody {
            name: self.name.trim(),
            day,
            time,
            meal_type_id,
            food_ids: self.foods.iter().copied().collect(),
        })
    }
}

impl EntityForm for MealMenuForm {
    type Entity = MealMenu;
    type Context = MenuChoices;

    fn new(initial: Option<&MealMenu>) -> Self {
        Self {
            id: initial.map(|m| m.id),
            name: initial.map(|m| m.name.clone()).unwrap_or_default(),
            day: initial.map(|m| m.day),
            time: initial.map(|m| m.time),
            meal_type: initial.map(|m| m.meal_type_id),
            foods: initial
                .map(|m| m.foods.iter().map(|f| f.id).collect())
                .unwrap_or_default(),
        }
    }

    fn title(&self) -> String {
        if self.id.is_some() {
            "Edit Menu".into()
        } else {
            "Add Menu".into()
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
        choices: &MenuChoices,
        errors: &FieldErrors,
    ) {
        form::field(ui, "Name", errors, "name", |ui| {
            widgets::text_input(ui, &mut self.name, "");
        });

        let days: Vec<_> = MenuDay::iter().map(|d| (d, d.to_string())).collect();
        form::field(ui, "Day", errors, "day", |ui| {
            widgets::single_select(ui, "menu day", &mut self.day, &days, "Choose day");
        });

        let times: Vec<_> = MenuTime::iter().map(|t| (t, t.to_string())).collect();
        form::field(ui, "Time", errors, "time", |ui| {
            widgets::single_select(ui, "menu time", &mut self.time, &times, "Choose time");
        });

        let meal_types: Vec<_> = choices
            .meal_types
            .iter()
            .map(|t| (t.id, format!("{} - {}", t.code, t.name)))
            .collect();
        form::field(ui, "Meal type", errors, "mealTypeID", |ui| {
            widgets::single_select(
                ui,
                "menu meal type",
                &mut self.meal_type,
                &meal_types,
                "Choose meal type",
            );
        });

        let foods: Vec<_> = choices
            .foods
            .iter()
            .map(|f| (f.id, f.name.clone()))
            .collect();
        form::field(ui, "Foods", errors, "foodIDs", |ui| {
            widgets::multi_select(ui, "menu foods", &mut self.foods, &foods, "Choose foods");
        });
    }

    fn submit(&self, conn: &mut Connection) -> Result<(), SubmitError> {
        let body = self.validate()?;
        query::save(conn, MealMenu::PATH, self.id, &body)?;
        Ok(())
    }

    fn delete(&self, conn: &mut Connection) -> api::Result<()> {
        match self.id {
            Some(id) => query::delete(conn, MealMenu::PATH, id),
            None => Ok(()),
        }
    }
}

impl Catalog for MealMenu {
    type Form = MealMenuForm;

    const TITLE: &'static str = "Meal Menus";
    const PATH: &'static str = "/meal-menu";
    const ADD_LABEL: &'static str = "Add menu";
    const COLUMNS: &'static [&'static str] = &["Name", "Day", "Time", "Meal type", "Foods"];
    const FILTER_COLUMNS: &'static [usize] = &[0, 3, 4];

    fn cells(&self) -> Vec<String> {
        let foods: Vec<&str> = self.foods.iter().map(|f| f.name.as_str()).collect();
        vec![
            self.name.clone(),
            self.day.to_string(),
            self.time.to_string(),
            self.meal_type
                .as_ref()
                .map(|t| t.code.clone())
                .unwrap_or_else(|| "-".into()),
            foods.join(", "),
        ]
    }

    fn load_context(conn: &mut Connection) -> api::Result<FormContext<Self>> {
        let meal_types = query::list(conn, "/meal-type")?;
        let foods = query::list(conn, Food::PATH)?;
        Ok(MenuChoices { meal_types, foods })
    }

    fn sort(menus: &mut [Self]) {
        menus.sort_by_key(menu_order);
    }
}

#[cfg(test)]
fn menu(id: i64, day: &str, time: &str) -> MealMenu {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": format!("menu {id}"),
        "day": day,
        "time": time,
        "mealTypeID": 1,
        "foods": null
    }))
    .unwrap()
}

#[test]
fn menus_sort_by_calendar_not_spelling() {
    let mut menus = vec![
        menu(1, "sabtu", "pagi"),
        menu(2, "senin", "sore"),
        menu(3, "jumat", "siang"),
        menu(4, "senin", "pagi"),
        menu(5, "kamis", "sore"),
        menu(6, "senin", "siang"),
    ];
    MealMenu::sort(&mut menus);
    let ids: Vec<_> = menus.iter().map(|m| m.id.0).collect();
    assert_eq!(ids, [4, 6, 2, 5, 3, 1]);
}

#[test]
fn menu_requires_day_time_and_meal_type() {
    let mut form = MealMenuForm::new(None);
    form.name = "Menu pagi".into();
    let errors = form.validate().unwrap_err();
    assert!(errors.contains("day"));
    assert!(errors.contains("time"));
    assert!(errors.contains("mealTypeID"));
    assert!(!errors.contains("name"));

    form.day = Some(MenuDay::Wednesday);
    form.time = Some(MenuTime::Afternoon);
    form.meal_type = Some(MealTypeId(3));
    form.foods.insert(FoodId(9));
    form.foods.insert(FoodId(2));
    let body = serde_json::to_value(form.validate().unwrap()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "name": "Menu pagi",
            "day": "rabu",
            "time": "sore",
            "mealTypeID": 3,
            "foodIDs": [2, 9]
        })
    );
}
