//! Field-level validation.
//!
//! Errors are collected per field rather than returned one at a time so a
//! caller can report every problem with a submission at once.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

/// Minimum length of a dataset or organization name.
pub const NAME_MIN_LENGTH: usize = 2;
/// Maximum length of a dataset or organization name.
pub const NAME_MAX_LENGTH: usize = 100;

pub const MISSING_VALUE: &str = "Missing value";

/// Validation failures keyed by field name, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
  fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  /// Shorthand for a single failing field.
  pub fn single(field: &str, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.add(field, message);
    errors
  }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self
      .fields
      .entry(field.to_owned())
      .or_default()
      .push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.fields.get(field).map(Vec::as_slice)
  }

  pub fn fields(&self) -> &BTreeMap<String, Vec<String>> { &self.fields }

  pub fn merge(&mut self, other: ValidationErrors) {
    for (field, messages) in other.fields {
      self.fields.entry(field).or_default().extend(messages);
    }
  }

  /// `Ok(())` when nothing was collected.
  pub fn into_result(self) -> Result<(), ValidationErrors> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.fields {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        first = false;
        write!(f, "{}: {message}", capitalize(field))?;
      }
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

fn capitalize(field: &str) -> String {
  let mut chars = field.chars();
  match chars.next() {
    Some(c) => c.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// URL-safe name rule shared by datasets and organizations.
pub fn check_name(errors: &mut ValidationErrors, field: &str, value: &str) {
  if value.is_empty() {
    errors.add(field, MISSING_VALUE);
    return;
  }
  if value.len() < NAME_MIN_LENGTH {
    errors.add(
      field,
      format!("Must be at least {NAME_MIN_LENGTH} characters long"),
    );
  }
  if value.len() > NAME_MAX_LENGTH {
    errors.add(
      field,
      format!("Name must be a maximum of {NAME_MAX_LENGTH} characters long"),
    );
  }
  let allowed = |c: char| {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
  };
  if !value.chars().all(allowed) {
    errors.add(
      field,
      "Must be purely lowercase alphanumeric (ascii) characters and these \
       symbols: -_",
    );
  }
}

/// User names additionally allow dots, but are otherwise URL-safe.
pub fn check_user_name(errors: &mut ValidationErrors, value: &str) {
  if value.is_empty() {
    errors.add("name", MISSING_VALUE);
    return;
  }
  let allowed = |c: char| {
    c.is_ascii_lowercase()
      || c.is_ascii_digit()
      || c == '-'
      || c == '_'
      || c == '.'
  };
  if value.len() < NAME_MIN_LENGTH || !value.chars().all(allowed) {
    errors.add(
      "name",
      "Must be at least 2 characters long and contain only lowercase \
       alphanumeric characters and -_.",
    );
  }
}

pub fn check_required(errors: &mut ValidationErrors, field: &str, value: &str) {
  if value.trim().is_empty() {
    errors.add(field, MISSING_VALUE);
  }
}

pub fn check_tags(errors: &mut ValidationErrors, tags: &[String]) {
  for tag in tags {
    if tag.trim().is_empty() {
      errors.add("tags", "Tag must not be empty");
    } else if tag.len() > NAME_MAX_LENGTH {
      errors.add(
        "tags",
        format!("Tag \"{tag}\" length is more than maximum {NAME_MAX_LENGTH}"),
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn name_errors(value: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", value);
    errors
  }

  #[test]
  fn empty_name_is_missing() {
    let errors = name_errors("");
    assert_eq!(errors.get("name"), Some(&[MISSING_VALUE.to_owned()][..]));
    assert_eq!(errors.to_string(), "Name: Missing value");
  }

  #[test]
  fn valid_names_pass() {
    assert!(name_errors("annakarenina").is_empty());
    assert!(name_errors("census_2021-v2").is_empty());
  }

  #[test]
  fn uppercase_and_spaces_are_rejected() {
    assert!(!name_errors("Anna Karenina").is_empty());
  }

  #[test]
  fn short_and_long_names_are_rejected() {
    assert!(!name_errors("a").is_empty());
    assert!(!name_errors(&"x".repeat(NAME_MAX_LENGTH + 1)).is_empty());
  }

  #[test]
  fn errors_accumulate_per_field() {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", "A");
    check_required(&mut errors, "url", " ");
    assert_eq!(errors.fields().len(), 2);
    assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
  }
}
