//! Validation and serialization
//!
//! Converts between the JSON wire shapes and persisted entities.
//!
//! Write paths go through a `Validator`: a pure check of one request payload
//! against facts the service looked up beforehand (which ids exist, whether an
//! email is taken). Failures are collected per field into `FieldErrors`.
//!
//! Read paths build response shapes with `ReadShapes`, which resolves related
//! rows and the viewer-dependent flags from an explicit `ViewContext`.

mod image;
mod ingredient;
mod read;
mod recipe;
mod tag;
mod user;

pub use image::{decode_data_uri, DecodedImage};
pub use ingredient::{IngredientInput, IngredientValidator};
pub use read::{ReadShapes, RecipeRead, RecipeShort, SubscriptionRead, UserCreated, UserRead};
pub use recipe::{IngredientRef, RecipeDraft, RecipeWriteInput, RecipeWriteValidator, WriteMode};
pub use tag::{TagInput, TagValidator};
pub use user::{SetPasswordInput, UserCreateInput, UserCreateValidator};
pub(crate) use user::password_field;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Validation errors keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` when no errors were recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Checks one request payload and produces the validated value
pub trait Validator<T> {
    type Output;

    fn validate(&self, input: T) -> Result<Self::Output, FieldErrors>;
}

/// Who is looking, and how much of a nested list they asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewContext {
    /// Authenticated viewer, `None` for anonymous requests
    pub viewer: Option<i64>,
    /// Cap on nested recipe lists in subscription shapes
    pub recipes_limit: Option<i64>,
}

impl ViewContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_viewer(viewer: Option<i64>) -> Self {
        Self {
            viewer,
            recipes_limit: None,
        }
    }

    pub fn with_recipes_limit(mut self, limit: Option<i64>) -> Self {
        self.recipes_limit = limit;
        self
    }
}

/// An integer that may arrive as a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LenientInt {
    Int(i64),
    Text(String),
}

impl LenientInt {
    pub fn value(&self) -> Option<i64> {
        match self {
            LenientInt::Int(n) => Some(*n),
            LenientInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for LenientInt {
    fn from(n: i64) -> Self {
        LenientInt::Int(n)
    }
}

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const BLANK: &str = "This field may not be blank.";

/// Validate a required, non-blank string field with a character limit
pub(crate) fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some(value) => optional_text(errors, field, Some(value), max_chars),
    }
}

/// Validate an optional string field; present values must be non-blank and short enough
pub(crate) fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > max_chars {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_chars),
        );
        return None;
    }
    Some(value)
}
