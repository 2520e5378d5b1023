// Copyright 2023 Remi Bernotavicius

use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const USERNAME_MIN_LEN: usize = 4;

/// Client-side validation failures, keyed by form field.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn check<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub fn required(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

pub fn min_len(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    message: &str,
) {
    if value.chars().count() < min {
        errors.add(field, message);
    }
}

/// Coerces `value` to a number that must be strictly positive.
pub fn positive_number(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    message: &str,
) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(n) if n > 0.0 && n.is_finite() => n,
        _ => {
            errors.add(field, message);
            0.0
        }
    }
}

pub fn selected<T: Copy + Default>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<T>,
    message: &str,
) -> T {
    value.unwrap_or_else(|| {
        errors.add(field, message);
        T::default()
    })
}

fn password_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            ("[A-Z]", "Must contain an uppercase letter"),
            ("[a-z]", "Must contain a lowercase letter"),
            ("[0-9]", "Must contain a digit"),
        ]
        .into_iter()
        .map(|(pattern, message)| (Regex::new(pattern).expect("valid pattern"), message))
        .collect()
    })
}

pub fn password(errors: &mut FieldErrors, field: &'static str, value: &str) {
    min_len(
        errors,
        field,
        value,
        PASSWORD_MIN_LEN,
        "Password must be at least 8 characters",
    );
    for (rule, message) in password_rules() {
        if !rule.is_match(value) {
            errors.add(field, *message);
        }
    }
}

pub fn username(errors: &mut FieldErrors, field: &'static str, value: &str) {
    min_len(
        errors,
        field,
        value,
        USERNAME_MIN_LEN,
        "Username must be at least 4 characters",
    );
}

pub fn confirmation(errors: &mut FieldErrors, field: &'static str, original: &str, repeated: &str) {
    if original != repeated {
        errors.add(field, "Passwords don't match");
    }
}

#[test]
fn weak_password_is_rejected() {
    let mut errors = FieldErrors::default();
    password(&mut errors, "password", "abc");
    assert_eq!(
        errors.get("password"),
        [
            "Password must be at least 8 characters",
            "Must contain an uppercase letter",
            "Must contain a digit",
        ]
    );
}

#[test]
fn strong_password_is_accepted() {
    let mut errors = FieldErrors::default();
    password(&mut errors, "password", "Abcdefg1");
    assert!(errors.is_empty());
}

#[test]
fn confirmation_must_match() {
    let mut errors = FieldErrors::default();
    confirmation(&mut errors, "confirmPassword", "Abcdefg1", "Abcdefg2");
    assert!(errors.contains("confirmPassword"));
    assert!(!errors.contains("password"));
}

#[test]
fn positive_number_is_coerced_from_text() {
    let mut errors = FieldErrors::default();
    assert_eq!(positive_number(&mut errors, "qty", " 2.5 ", "must be > 0"), 2.5);
    assert!(errors.is_empty());

    positive_number(&mut errors, "qty", "0", "must be > 0");
    positive_number(&mut errors, "other", "abc", "must be > 0");
    assert!(errors.contains("qty"));
    assert!(errors.contains("other"));
}

#[test]
fn required_ignores_surrounding_whitespace() {
    let mut errors = FieldErrors::default();
    required(&mut errors, "name", "   ", "Please enter a name");
    required(&mut errors, "code", "DM", "Please enter a code");
    assert_eq!(errors.get("name"), ["Please enter a name"]);
    assert!(errors.check(()).is_err());
}
