// Copyright 2023 Remi Bernotavicius

use crate::api::models::{Allergy, Diet, Food, FoodMaterial, MealMenu, User, UserRole};
use crate::api::Connection;
use crate::store::{LocalStorage, MealFilterStore, NotificationBookmark};
use derive_more::Display;
use eframe::egui;
use std::time::{Duration, Instant};
use strum::{EnumIter, IntoEnumIterator as _};

mod catalog;
mod daily_meal;
mod dashboard;
mod dialog;
mod diet_summary;
mod food;
mod food_material;
mod form;
mod meal_menu;
mod notifications;
mod pagination;
mod patients;
mod profile;
mod query;
mod reference;
mod search;
mod sign_in;
mod users;
mod widgets;

use catalog::CatalogPage;
use dashboard::Dashboard;
pub use dashboard::export_spreadsheet;
use patients::PatientsPage;
use profile::ProfilePage;
use sign_in::SignInPage;

fn new_toast(kind: egui_toast::ToastKind, text: impl Into<egui::WidgetText>) -> egui_toast::Toast {
    egui_toast::Toast {
        text: text.into(),
        kind,
        options: egui_toast::ToastOptions::default()
            .duration_in_seconds(3.0)
            .show_progress(false)
            .show_icon(true),
        ..Default::default()
    }
}

pub fn new_error_toast(text: impl Into<egui::WidgetText>) -> egui_toast::Toast {
    new_toast(egui_toast::ToastKind::Error, text)
}

pub fn new_success_toast(text: impl Into<egui::WidgetText>) -> egui_toast::Toast {
    new_toast(egui_toast::ToastKind::Success, text)
}

#[derive(Display, Debug, EnumIter, Copy, Clone, PartialEq, Eq)]
pub enum Route {
    #[display("Sign in")]
    SignIn,
    #[display("Dashboard")]
    Dashboard,
    #[display("Patients")]
    Patients,
    #[display("Diets")]
    Diets,
    #[display("Allergies")]
    Allergies,
    #[display("Food Materials")]
    FoodMaterials,
    #[display("Foods")]
    Foods,
    #[display("Meal Menus")]
    MealMenus,
    #[display("Users")]
    Users,
    #[display("Profile")]
    Profile,
}

impl Route {
    pub fn allowed(self, role: Option<UserRole>) -> bool {
        match self {
            Self::SignIn => true,
            Self::Users => role == Some(UserRole::Admin),
            Self::FoodMaterials | Self::Foods | Self::MealMenus => {
                matches!(role, Some(UserRole::Admin | UserRole::Nutritionist))
            }
            _ => role.is_some(),
        }
    }
}

enum Page {
    SignIn(SignInPage),
    Dashboard(Dashboard),
    Patients(PatientsPage),
    Diets(CatalogPage<Diet>),
    Allergies(CatalogPage<Allergy>),
    FoodMaterials(CatalogPage<FoodMaterial>),
    Foods(CatalogPage<Food>),
    MealMenus(CatalogPage<MealMenu>),
    Users(CatalogPage<User>),
    Profile(ProfilePage),
}

impl Page {
    fn mount(
        route: Route,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
        meal_filter: &MealFilterStore,
    ) -> Self {
        match route {
            Route::SignIn => Self::SignIn(SignInPage::default()),
            Route::Dashboard => Self::Dashboard(Dashboard::new(conn, toasts, meal_filter)),
            Route::Patients => Self::Patients(PatientsPage::new(conn, toasts)),
            Route::Diets => Self::Diets(CatalogPage::new(conn, toasts)),
            Route::Allergies => Self::Allergies(CatalogPage::new(conn, toasts)),
            Route::FoodMaterials => Self::FoodMaterials(CatalogPage::new(conn, toasts)),
            Route::Foods => Self::Foods(CatalogPage::new(conn, toasts)),
            Route::MealMenus => Self::MealMenus(CatalogPage::new(conn, toasts)),
            Route::Users => Self::Users(CatalogPage::new(conn, toasts)),
            Route::Profile => Self::Profile(ProfilePage::new(conn)),
        }
    }
}

pub struct DietManager {
    conn: Connection,
    meal_filter: MealFilterStore,
    bookmark: NotificationBookmark,
    route: Route,
    page: Page,
    toasts: egui_toast::Toasts,
}

impl DietManager {
    pub fn new(conn: Connection, storage: LocalStorage) -> Self {
        let mut manager = Self {
            conn,
            meal_filter: MealFilterStore::load(storage.clone()),
            bookmark: NotificationBookmark::load(storage),
            route: Route::SignIn,
            page: Page::SignIn(SignInPage::default()),
            toasts: egui_toast::Toasts::new()
                .anchor(egui::Align2::RIGHT_BOTTOM, (-10.0, -10.0))
                .direction(egui::Direction::BottomUp),
        };
        manager.navigate(Route::Dashboard);
        manager
    }

    /// Re-verifies the session with the backend before mounting anything but the sign-in
    /// page.
    fn navigate(&mut self, mut route: Route) {
        if route != Route::SignIn {
            if let Err(error) = query::check_session(&mut self.conn) {
                log::info!("session check failed: {error}");
            }
            if !self.conn.session().is_authenticated() {
                route = Route::SignIn;
            } else if !route.allowed(self.conn.session().role()) {
                self.toasts
                    .add(new_error_toast(format!("You don't have access to {route}")));
                route = Route::Dashboard;
            }
        }
        log::debug!("navigating to {route}");
        self.route = route;
        self.page = Page::mount(route, &mut self.conn, &mut self.toasts, &self.meal_filter);
    }

    fn logout(&mut self) {
        if let Err(error) = query::logout(&mut self.conn) {
            form::report_api_error(&mut self.toasts, &error);
        }
        self.meal_filter.clear();
        self.navigate(Route::SignIn);
    }

    fn poll_session(&mut self, ctx: &egui::Context) {
        if self.conn.take_session_expired() {
            self.toasts
                .add(new_error_toast(crate::api::Error::Unauthorized.to_string()));
        }
        if self.conn.sign_in_redirect_due(Instant::now()) {
            self.navigate(Route::SignIn);
        } else if self.conn.sign_in_redirect_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn update_menu(&mut self, ctx: &egui::Context) {
        if self.route == Route::SignIn {
            return;
        }
        let role = self.conn.session().role();
        let mut target = None;
        let mut logout = false;
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                for route in Route::iter().filter(|r| *r != Route::SignIn && r.allowed(role)) {
                    if ui
                        .selectable_label(self.route == route, route.to_string())
                        .clicked()
                    {
                        target = Some(route);
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    logout = ui.button("Log out").clicked();
                    if let Some(user) = self.conn.session().user() {
                        ui.label(&user.name);
                    }
                });
            });
        });
        if logout {
            self.logout();
        } else if let Some(route) = target {
            self.navigate(route);
        }
    }

    fn update_page(&mut self, ctx: &egui::Context) {
        let mut signed_in = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            let conn = &mut self.conn;
            let toasts = &mut self.toasts;
            match &mut self.page {
                Page::SignIn(page) => signed_in = page.update(ui, conn, toasts),
                Page::Dashboard(page) => {
                    page.update(ui, conn, toasts, &mut self.meal_filter, &mut self.bookmark)
                }
                Page::Patients(page) => page.update(ui, conn, toasts),
                Page::Diets(page) => page.update(ui, conn, toasts),
                Page::Allergies(page) => page.update(ui, conn, toasts),
                Page::FoodMaterials(page) => page.update(ui, conn, toasts),
                Page::Foods(page) => page.update(ui, conn, toasts),
                Page::MealMenus(page) => page.update(ui, conn, toasts),
                Page::Users(page) => page.update(ui, conn, toasts),
                Page::Profile(page) => page.update(ui, conn, toasts),
            }
        });
        if signed_in {
            self.navigate(Route::Dashboard);
        }
    }
}

impl eframe::App for DietManager {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_session(ctx);
        self.update_menu(ctx);
        self.update_page(ctx);
        self.toasts.show(ctx);
    }
}

#[test]
fn routes_are_gated_by_role() {
    assert!(Route::SignIn.allowed(None));
    assert!(!Route::Dashboard.allowed(None));
    assert!(Route::Patients.allowed(Some(UserRole::Nurse)));
    assert!(!Route::Foods.allowed(Some(UserRole::Nurse)));
    assert!(Route::MealMenus.allowed(Some(UserRole::Nutritionist)));
    assert!(!Route::Users.allowed(Some(UserRole::Nutritionist)));
    assert!(Route::Users.allowed(Some(UserRole::Admin)));
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[test]
fn expired_session_starts_at_sign_in() {
    let server = TestServer::start(|_| Reply::json(401, r#"{"error": "unauthorized"}"#));
    let dir = tempfile::tempdir().unwrap();
    let conn = Connection::new(&server.base_url()).unwrap();

    let mut manager = DietManager::new(conn, LocalStorage::new(dir.path()));
    assert_eq!(manager.route, Route::SignIn);
    assert!(matches!(manager.page, Page::SignIn(_)));
    assert!(manager.conn.take_session_expired());
    assert_eq!(server.requests()[0].path(), "/auth/check-session");
}

#[test]
fn nurse_is_kept_out_of_user_admin() {
    let server = TestServer::start(|request| match request.path() {
        "/auth/check-session" => Reply::data(serde_json::json!({
            "userID": 5, "username": "perawat1", "name": "Rina", "role": "perawat"
        })),
        _ => Reply::data(serde_json::json!(null)),
    });
    let dir = tempfile::tempdir().unwrap();
    let conn = Connection::new(&server.base_url()).unwrap();

    let mut manager = DietManager::new(conn, LocalStorage::new(dir.path()));
    assert_eq!(manager.route, Route::Dashboard);

    manager.navigate(Route::Users);
    assert_eq!(manager.route, Route::Dashboard);
    assert!(server.requests().iter().all(|r| r.path() != "/user"));

    manager.navigate(Route::Patients);
    assert_eq!(manager.route, Route::Patients);
}
