//! Ingredient write validation

use serde::Deserialize;

use super::{required_text, FieldErrors, Validator};
use crate::models::Ingredient;

pub const INGREDIENT_NAME_MAX: usize = 100;
pub const MEASUREMENT_UNIT_MAX: usize = 40;

/// Ingredient creation payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientInput {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

/// Validates a new ingredient; `pair_taken` reports an existing `(name, unit)` row
#[derive(Debug, Clone, Copy, Default)]
pub struct IngredientValidator {
    pub pair_taken: bool,
}

impl Validator<IngredientInput> for IngredientValidator {
    type Output = Ingredient;

    fn validate(&self, input: IngredientInput) -> Result<Ingredient, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required_text(&mut errors, "name", input.name, INGREDIENT_NAME_MAX);
        let unit = required_text(
            &mut errors,
            "measurement_unit",
            input.measurement_unit,
            MEASUREMENT_UNIT_MAX,
        );

        match (name, unit) {
            (Some(name), Some(unit)) if errors.is_empty() => {
                if self.pair_taken {
                    return Err(FieldErrors::single(
                        "non_field_errors",
                        "This ingredient already exists with the same measurement unit.",
                    ));
                }
                Ok(Ingredient::new(name, unit))
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, unit: &str) -> IngredientInput {
        IngredientInput {
            name: Some(name.to_string()),
            measurement_unit: Some(unit.to_string()),
        }
    }

    #[test]
    fn test_valid_ingredient() {
        let ingredient = IngredientValidator::default().validate(input("flour", "g")).unwrap();
        assert_eq!(ingredient.measurement_unit, "g");
    }

    #[test]
    fn test_length_limits() {
        let errors = IngredientValidator::default()
            .validate(input(&"a".repeat(101), &"g".repeat(41)))
            .unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("measurement_unit"));
    }

    #[test]
    fn test_duplicate_pair() {
        let errors = IngredientValidator { pair_taken: true }
            .validate(input("flour", "g"))
            .unwrap_err();
        assert!(errors.contains("non_field_errors"));
    }
}
