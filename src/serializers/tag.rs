//! Tag write validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{required_text, FieldErrors, Validator};
use crate::models::Tag;

static COLOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("Invalid color regex pattern"));
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Invalid slug regex pattern"));

pub const TAG_NAME_MAX: usize = 150;
pub const TAG_SLUG_MAX: usize = 50;

/// Tag creation payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

/// Validates a new tag. The service reports which unique fields are taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagValidator {
    pub name_taken: bool,
    pub slug_taken: bool,
}

impl Validator<TagInput> for TagValidator {
    type Output = Tag;

    fn validate(&self, input: TagInput) -> Result<Tag, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required_text(&mut errors, "name", input.name, TAG_NAME_MAX);
        if name.is_some() && self.name_taken {
            errors.add("name", "A tag with this name already exists.");
        }

        let color = required_text(&mut errors, "color", input.color, 7);
        if let Some(color) = &color {
            if !COLOR_REGEX.is_match(color) {
                errors.add("color", "The color must be a hex code such as #49B64E.");
            }
        }

        let slug = required_text(&mut errors, "slug", input.slug, TAG_SLUG_MAX);
        if let Some(slug) = &slug {
            if !SLUG_REGEX.is_match(slug) {
                errors.add(
                    "slug",
                    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
                );
            } else if self.slug_taken {
                errors.add("slug", "A tag with this slug already exists.");
            }
        }

        match (name, color, slug) {
            (Some(name), Some(color), Some(slug)) if errors.is_empty() => {
                Ok(Tag::new(name, color, slug))
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(name: &str, color: &str, slug: &str) -> TagInput {
        TagInput {
            name: Some(name.to_string()),
            color: Some(color.to_string()),
            slug: Some(slug.to_string()),
        }
    }

    #[test]
    fn test_valid_tag() {
        let tag = TagValidator::default()
            .validate(input("Breakfast", "#49B64E", "breakfast"))
            .unwrap();
        assert_eq!(tag.slug, "breakfast");
    }

    #[test]
    fn test_invalid_color_and_slug() {
        let errors = TagValidator::default()
            .validate(input("Breakfast", "green", "break fast"))
            .unwrap_err();
        assert!(errors.contains("color"));
        assert!(errors.contains("slug"));
        assert!(!errors.contains("name"));
    }

    #[test]
    fn test_taken_fields() {
        let validator = TagValidator {
            name_taken: true,
            slug_taken: true,
        };
        let errors = validator.validate(input("Breakfast", "#49B64E", "breakfast")).unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("slug"));
    }

    #[test]
    fn test_missing_fields() {
        let errors = TagValidator::default().validate(TagInput::default()).unwrap_err();
        for field in ["name", "color", "slug"] {
            assert!(errors.contains(field));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_hex_colors_accepted(color in "#[0-9a-fA-F]{6}") {
            let result = TagValidator::default().validate(input("Tag", &color, "tag"));
            prop_assert!(result.is_ok());
        }

        #[test]
        fn property_non_hex_colors_rejected(color in "#[g-zG-Z]{6}|[0-9a-f]{6}|#[0-9a-f]{3}") {
            let errors = TagValidator::default().validate(input("Tag", &color, "tag")).unwrap_err();
            prop_assert!(errors.contains("color"));
        }
    }
}
