//! Ingredient model

use serde::{Deserialize, Serialize};

/// Ingredient entity. `(name, measurement_unit)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    /// Create a new Ingredient; the ID is assigned by the database
    pub fn new(name: String, measurement_unit: String) -> Self {
        Self {
            id: 0,
            name,
            measurement_unit,
        }
    }
}

/// An ingredient as used by one recipe, with its amount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// One line of an aggregated shopping list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}
