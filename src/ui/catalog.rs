//! One table screen shared by every small reference catalog: the whole collection is fetched,
//! filtered on the client and edited through a form dialog, after which it is fetched again.

use super::dialog::FormDialog;
use super::form::{self, EntityForm, FormEvent};
use super::{query, widgets};
use crate::api::{self, Connection};
use eframe::egui;
use serde::de::DeserializeOwned;

pub type FormContext<E> = <<E as Catalog>::Form as EntityForm>::Context;

pub trait Catalog: DeserializeOwned + Clone {
    type Form: EntityForm<Entity = Self>;

    const TITLE: &'static str;
    const PATH: &'static str;
    const ADD_LABEL: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Indexes into `COLUMNS` the free-text filter looks at.
    const FILTER_COLUMNS: &'static [usize];

    fn cells(&self) -> Vec<String>;

    fn load_context(conn: &mut Connection) -> api::Result<FormContext<Self>>;

    fn sort(_entities: &mut [Self]) {}
}

/// True when `query` is a case-insensitive substring of any of `cells`.
pub fn matches_filter<'a>(query: &str, cells: impl IntoIterator<Item = &'a str>) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || cells
            .into_iter()
            .any(|cell| cell.to_lowercase().contains(&query))
}

pub struct CatalogPage<E: Catalog> {
    entities: Vec<E>,
    context: FormContext<E>,
    filter: String,
    dialog: Option<FormDialog<E::Form>>,
}

impl<E: Catalog> CatalogPage<E>
where
    FormContext<E>: Default,
{
    pub fn new(conn: &mut Connection, toasts: &mut egui_toast::Toasts) -> Self {
        let mut entities = query::list(conn, E::PATH).unwrap_or_else(|error| {
            form::report_api_error(toasts, &error);
            vec![]
        });
        E::sort(&mut entities);

        let context = E::load_context(conn).unwrap_or_else(|error| {
            form::report_api_error(toasts, &error);
            Default::default()
        });

        Self {
            entities,
            context,
            filter: String::new(),
            dialog: None,
        }
    }

    #[cfg(test)]
    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn visible(&self) -> Vec<&E> {
        self.entities
            .iter()
            .filter(|e| {
                let cells = e.cells();
                matches_filter(
                    &self.filter,
                    E::FILTER_COLUMNS
                        .iter()
                        .filter_map(|&i| cells.get(i))
                        .map(String::as_str)
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    #[cfg(test)]
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn open_create(&mut self) {
        self.dialog = Some(FormDialog::new(None));
    }

    pub fn open_edit(&mut self, entity: &E) {
        self.dialog = Some(FormDialog::new(Some(entity)));
    }

    #[cfg(test)]
    pub fn dialog_mut(&mut self) -> Option<&mut FormDialog<E::Form>> {
        self.dialog.as_mut()
    }

    /// Closes the dialog after a finished form, refetching the list when something changed.
    pub fn form_finished(
        &mut self,
        event: FormEvent,
        conn: &mut Connection,
        toasts: &mut egui_toast::Toasts,
    ) {
        self.dialog = None;
        if event != FormEvent::Closed {
            let filter = std::mem::take(&mut self.filter);
            *self = Self::new(conn, toasts);
            self.filter = filter;
        }
    }

    fn update_table(&self, ui: &mut egui::Ui) -> Option<E> {
        let mut clicked = None;
        let rows = self.visible();
        let available_height = ui.available_height();
        egui_extras::TableBuilder::new(ui)
            .id_salt((E::TITLE, "table"))
            .striped(true)
            .sense(egui::Sense::click())
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(
                egui_extras::Column::auto().at_least(80.0).resizable(true),
                E::COLUMNS.len().saturating_sub(1),
            )
            .column(egui_extras::Column::remainder())
            .min_scrolled_height(0.0)
            .max_scroll_height(available_height)
            .header(22.0, |mut header| {
                for column in E::COLUMNS {
                    header.col(|ui| {
                        ui.strong(*column);
                    });
                }
            })
            .body(|mut body| {
                for entity in rows {
                    body.row(22.0, |mut row| {
                        for cell in entity.cells() {
                            row.col(|ui| {
                                ui.label(cell);
                            });
                        }
                        if row.response().clicked() {
                            clicked = Some(entity.clone());
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
        ui.heading(E::TITLE);
        let mut add = false;
        ui.horizontal(|ui| {
            widgets::filter_input(ui, &mut self.filter, "Search...");
            add = ui.button(E::ADD_LABEL).clicked();
        });
        ui.separator();
        if add {
            self.open_create();
        }

        if self.entities.is_empty() {
            ui.label("No data");
        } else if let Some(entity) = self.update_table(ui) {
            self.open_edit(&entity);
        }

        let event = self
            .dialog
            .as_mut()
            .and_then(|dialog| dialog.update(ui.ctx(), conn, toasts, &self.context));
        if let Some(event) = event {
            self.form_finished(event, conn, toasts);
        }
    }
}

#[test]
fn filter_matches_any_column() {
    assert!(matches_filter("dm", ["DM", "Diabetes Mellitus"]));
    assert!(matches_filter("MELL", ["DM", "Diabetes Mellitus"]));
    assert!(!matches_filter("rendah", ["DM", "Diabetes Mellitus"]));
    assert!(matches_filter("  ", ["anything"]));
}
