use eframe::egui;

/// How many pages either side of the current one get their own button.
const RANGE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// Zero-based page index.
    Page(usize),
    Ellipsis,
}

/// The buttons to draw for `total_pages` pages with the zero-based `current` page selected.
/// Pages away from the current one collapse into a single ellipsis per run.
pub fn generate_pagination(total_pages: usize, current: usize) -> Vec<PageItem> {
    let mut items = vec![];
    for i in 0..total_pages {
        if i + RANGE >= current && i <= current + RANGE {
            items.push(PageItem::Page(i));
        } else if items.last() != Some(&PageItem::Ellipsis) {
            items.push(PageItem::Ellipsis);
        }
    }
    items
}

/// Draws the page buttons, `page` is one-based. Returns true when the page changed.
pub fn show(ui: &mut egui::Ui, total_pages: usize, page: &mut usize) -> bool {
    let before = *page;
    ui.horizontal(|ui| {
        if ui
            .add_enabled(*page > 1, egui::Button::new("Previous"))
            .clicked()
        {
            *page -= 1;
        }
        for item in generate_pagination(total_pages, page.saturating_sub(1)) {
            match item {
                PageItem::Page(i) => {
                    if ui.selectable_label(*page == i + 1, (i + 1).to_string()).clicked() {
                        *page = i + 1;
                    }
                }
                PageItem::Ellipsis => {
                    ui.label("...");
                }
            }
        }
        if ui
            .add_enabled(*page < total_pages, egui::Button::new("Next"))
            .clicked()
        {
            *page += 1;
        }
    });
    *page != before
}

#[test]
fn pages_around_current_are_kept() {
    use PageItem::*;
    assert_eq!(
        generate_pagination(10, 4),
        [Ellipsis, Page(3), Page(4), Page(5), Ellipsis]
    );
}

#[test]
fn edges_have_one_ellipsis() {
    use PageItem::*;
    assert_eq!(generate_pagination(5, 0), [Page(0), Page(1), Ellipsis]);
    assert_eq!(generate_pagination(5, 4), [Ellipsis, Page(3), Page(4)]);
    assert_eq!(generate_pagination(3, 1), [Page(0), Page(1), Page(2)]);
    assert!(generate_pagination(0, 0).is_empty());
}
