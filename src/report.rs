// Copyright 2023 Remi Bernotavicius

//! Aggregate views over the day's meal requests.

use crate::api::models::{MealMatrixEntry, MealType};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub treatment_class: String,
    /// One count per column of the owning `MealMatrix`, in column order.
    pub counts: Vec<u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MealMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

/// Pivots `(treatment class, meal type, count)` entries into one row per treatment class with
/// a column for every known meal type. Rows keep the order in which their treatment class first
/// appears. Entries for meal types that aren't known are dropped.
pub fn pivot_meal_matrix(entries: &[MealMatrixEntry], meal_types: &[MealType]) -> MealMatrix {
    let columns: Vec<String> = meal_types.iter().map(|t| t.code.clone()).collect();
    let column_index: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, code)| (code.as_str(), i))
        .collect();

    let mut rows: Vec<MatrixRow> = vec![];
    let mut row_index: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        let row = *row_index
            .entry(entry.treatment_class.as_str())
            .or_insert_with(|| {
                rows.push(MatrixRow {
                    treatment_class: entry.treatment_class.clone(),
                    counts: vec![0; columns.len()],
                    total: 0,
                });
                rows.len() - 1
            });
        match column_index.get(entry.meal_type.as_str()) {
            Some(&column) => rows[row].counts[column] += entry.meal_count,
            None => log::debug!("ignoring count for unknown meal type {:?}", entry.meal_type),
        }
    }

    for row in &mut rows {
        row.total = row.counts.iter().sum();
    }

    MealMatrix { columns, rows }
}

impl MealMatrix {
    /// Column sums followed by the grand total.
    pub fn totals(&self) -> (Vec<u64>, u64) {
        let mut sums = vec![0; self.columns.len()];
        for row in &self.rows {
            for (sum, count) in sums.iter_mut().zip(&row.counts) {
                *sum += count;
            }
        }
        let total = sums.iter().sum();
        (sums, total)
    }
}

#[cfg(test)]
fn meal_types(codes: &[&str]) -> Vec<MealType> {
    codes
        .iter()
        .enumerate()
        .map(|(i, code)| MealType {
            id: crate::api::models::MealTypeId(i as i64 + 1),
            code: code.to_string(),
            name: format!("meal {code}"),
        })
        .collect()
}

#[cfg(test)]
fn entry(treatment_class: &str, meal_type: &str, meal_count: u64) -> MealMatrixEntry {
    MealMatrixEntry {
        treatment_class: treatment_class.into(),
        meal_type: meal_type.into(),
        meal_count,
    }
}

#[test]
fn every_row_has_every_meal_type() {
    let matrix = pivot_meal_matrix(
        &[entry("VIP", "BB", 2), entry("I", "BL", 5), entry("VIP", "TKTP", 1)],
        &meal_types(&["BB", "BL", "TKTP", "CAIR"]),
    );

    assert_eq!(matrix.columns, ["BB", "BL", "TKTP", "CAIR"]);
    assert_eq!(
        matrix.rows,
        vec![
            MatrixRow {
                treatment_class: "VIP".into(),
                counts: vec![2, 0, 1, 0],
                total: 3,
            },
            MatrixRow {
                treatment_class: "I".into(),
                counts: vec![0, 5, 0, 0],
                total: 5,
            },
        ]
    );
}

#[test]
fn total_is_sum_of_columns() {
    let entries = [
        entry("I", "BB", 4),
        entry("II", "BB", 1),
        entry("II", "BL", 7),
        entry("III", "BL", 0),
        entry("I", "BL", 9),
    ];
    let matrix = pivot_meal_matrix(&entries, &meal_types(&["BB", "BL"]));
    for row in &matrix.rows {
        assert_eq!(row.counts.len(), 2);
        assert_eq!(row.total, row.counts.iter().sum::<u64>());
    }
    assert_eq!(matrix.totals(), (vec![5, 16], 21));
}

#[test]
fn treatment_classes_are_not_duplicated() {
    let entries = [
        entry("I", "BB", 1),
        entry("I", "BB", 2),
        entry("II", "BB", 3),
        entry("I", "BL", 4),
    ];
    let matrix = pivot_meal_matrix(&entries, &meal_types(&["BB", "BL"]));
    let classes: Vec<_> = matrix.rows.iter().map(|r| r.treatment_class.as_str()).collect();
    assert_eq!(classes, ["I", "II"]);

    let by_class: std::collections::BTreeMap<_, _> = matrix
        .rows
        .iter()
        .map(|r| (r.treatment_class.as_str(), r.counts.clone()))
        .collect();
    assert_eq!(
        by_class,
        maplit::btreemap! {
            "I" => vec![3, 4],
            "II" => vec![3, 0],
        }
    );
}

#[test]
fn unknown_meal_types_are_ignored() {
    let matrix = pivot_meal_matrix(
        &[entry("VIP", "XX", 10), entry("VIP", "BB", 1)],
        &meal_types(&["BB"]),
    );
    assert_eq!(matrix.rows[0].counts, [1]);
    assert_eq!(matrix.rows[0].total, 1);
}

#[test]
fn empty_input_has_no_rows() {
    let matrix = pivot_meal_matrix(&[], &meal_types(&["BB", "BL"]));
    assert!(matrix.rows.is_empty());
    assert_eq!(matrix.totals(), (vec![0, 0], 0));
}
