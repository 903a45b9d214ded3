//! Admin presentation layer
//!
//! Declarative list configuration per entity: which columns to show, which
//! fields `q` searches, which query parameters filter, and what to print for
//! empty cells. `ModelAdmin::listing` turns a request into a `ListingQuery`
//! for the admin repository; `ModelAdmin::render` labels the returned cells.
//!
//! Search splits `q` on whitespace; every term must match at least one search
//! field (case-insensitive substring).

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::db::repositories::admin::{Condition, ListingQuery, ListingRows};
use crate::db::repositories::ingredient::escape_like;

/// A displayed column
#[derive(Debug, Serialize)]
pub struct Column {
    pub label: &'static str,
    #[serde(skip)]
    pub expr: &'static str,
}

/// A field searched by `q`; the predicate has one `?` for the pattern
#[derive(Debug, Serialize)]
pub struct SearchField {
    pub label: &'static str,
    #[serde(skip)]
    pub predicate: &'static str,
}

/// A query parameter filtering by exact value; the predicate has one `?`
#[derive(Debug, Serialize)]
pub struct ListFilter {
    pub param: &'static str,
    #[serde(skip)]
    pub predicate: &'static str,
}

/// List configuration for one entity
#[derive(Debug, Serialize)]
pub struct ModelAdmin {
    pub name: &'static str,
    pub verbose_name: &'static str,
    pub list_display: &'static [Column],
    pub search_fields: &'static [SearchField],
    pub list_filter: &'static [ListFilter],
    pub empty_value_display: &'static str,
    #[serde(skip)]
    pub from: &'static str,
    #[serde(skip)]
    pub ordering: &'static str,
}

/// Recipe column counting how many users favourited it
const FAVORITE_COUNT: &str = "(SELECT COUNT(*) FROM favourites fv WHERE fv.recipe_id = r.id)";

const RECIPE_HAS_TAG: &str = "EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.name LIKE ? ESCAPE '\\')";
const RECIPE_HAS_TAG_SLUG: &str = "EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ?)";

/// Every registered entity
pub static MODEL_ADMINS: &[ModelAdmin] = &[
    ModelAdmin {
        name: "users",
        verbose_name: "Users",
        list_display: &[
            Column { label: "email", expr: "u.email" },
            Column { label: "first_name", expr: "u.first_name" },
            Column { label: "last_name", expr: "u.last_name" },
        ],
        search_fields: &[],
        list_filter: &[
            ListFilter { param: "username", predicate: "u.username = ?" },
            ListFilter { param: "email", predicate: "u.email = ?" },
        ],
        empty_value_display: "-",
        from: "users u",
        ordering: "u.id",
    },
    ModelAdmin {
        name: "follows",
        verbose_name: "Subscriptions",
        list_display: &[
            Column { label: "user", expr: "fu.username" },
            Column { label: "author", expr: "fa.username" },
        ],
        search_fields: &[],
        list_filter: &[],
        empty_value_display: "пусто",
        from: "follows f INNER JOIN users fu ON fu.id = f.user_id INNER JOIN users fa ON fa.id = f.author_id",
        ordering: "f.id DESC",
    },
    ModelAdmin {
        name: "recipes",
        verbose_name: "Recipes",
        list_display: &[
            Column { label: "name", expr: "r.name" },
            Column { label: "author", expr: "u.username" },
            Column { label: "favorite_count", expr: FAVORITE_COUNT },
        ],
        search_fields: &[
            SearchField { label: "name", predicate: "r.name LIKE ? ESCAPE '\\'" },
            SearchField { label: "author__username", predicate: "u.username LIKE ? ESCAPE '\\'" },
            SearchField { label: "tags", predicate: RECIPE_HAS_TAG },
        ],
        list_filter: &[
            ListFilter { param: "name", predicate: "r.name = ?" },
            ListFilter { param: "author__username", predicate: "u.username = ?" },
            ListFilter { param: "tags", predicate: RECIPE_HAS_TAG_SLUG },
        ],
        empty_value_display: "-пусто-",
        from: "recipes r INNER JOIN users u ON u.id = r.author_id",
        ordering: "r.pub_date DESC, r.id DESC",
    },
    ModelAdmin {
        name: "tags",
        verbose_name: "Tags",
        list_display: &[
            Column { label: "name", expr: "t.name" },
            Column { label: "color", expr: "t.color" },
            Column { label: "slug", expr: "t.slug" },
        ],
        search_fields: &[SearchField { label: "name", predicate: "t.name LIKE ? ESCAPE '\\'" }],
        list_filter: &[ListFilter { param: "name", predicate: "t.name = ?" }],
        empty_value_display: "пусто",
        from: "tags t",
        ordering: "t.id DESC",
    },
    ModelAdmin {
        name: "ingredients",
        verbose_name: "Ingredients",
        list_display: &[
            Column { label: "id", expr: "i.id" },
            Column { label: "name", expr: "i.name" },
            Column { label: "measurement_unit", expr: "i.measurement_unit" },
        ],
        search_fields: &[
            SearchField { label: "name", predicate: "i.name LIKE ? ESCAPE '\\'" },
            SearchField { label: "measurement_unit", predicate: "i.measurement_unit LIKE ? ESCAPE '\\'" },
        ],
        list_filter: &[
            ListFilter { param: "name", predicate: "i.name = ?" },
            ListFilter { param: "measurement_unit", predicate: "i.measurement_unit = ?" },
        ],
        empty_value_display: "пусто",
        from: "ingredients i",
        ordering: "i.id DESC",
    },
    ModelAdmin {
        name: "favourites",
        verbose_name: "Favourite recipes",
        list_display: &[
            Column { label: "id", expr: "b.id" },
            Column { label: "user", expr: "u.username" },
            Column { label: "recipe", expr: "r.name" },
        ],
        search_fields: &[
            SearchField { label: "user__username", predicate: "u.username LIKE ? ESCAPE '\\'" },
            SearchField { label: "recipe__name", predicate: "r.name LIKE ? ESCAPE '\\'" },
        ],
        list_filter: &[
            ListFilter { param: "user__username", predicate: "u.username = ?" },
            ListFilter { param: "recipe__name", predicate: "r.name = ?" },
        ],
        empty_value_display: "-пусто-",
        from: "favourites b INNER JOIN users u ON u.id = b.user_id INNER JOIN recipes r ON r.id = b.recipe_id",
        ordering: "b.date_added DESC, b.id DESC",
    },
    ModelAdmin {
        name: "shopping_carts",
        verbose_name: "Shopping carts",
        list_display: &[
            Column { label: "user", expr: "u.username" },
            Column { label: "recipe", expr: "r.name" },
        ],
        search_fields: &[
            SearchField { label: "user__username", predicate: "u.username LIKE ? ESCAPE '\\'" },
            SearchField { label: "recipe__name", predicate: "r.name LIKE ? ESCAPE '\\'" },
        ],
        list_filter: &[
            ListFilter { param: "user__username", predicate: "u.username = ?" },
            ListFilter { param: "recipe__name", predicate: "r.name = ?" },
        ],
        empty_value_display: "-пусто-",
        from: "shopping_carts b INNER JOIN users u ON u.id = b.user_id INNER JOIN recipes r ON r.id = b.recipe_id",
        ordering: "b.id DESC",
    },
];

/// Look up an entity's configuration by name
pub fn find(name: &str) -> Option<&'static ModelAdmin> {
    MODEL_ADMINS.iter().find(|admin| admin.name == name)
}

impl ModelAdmin {
    /// Build the list query for a search string and filter parameters.
    ///
    /// Parameters that are not configured filters are ignored.
    pub fn listing(&self, search: Option<&str>, params: &HashMap<String, String>) -> ListingQuery {
        let mut conditions = Vec::new();

        if !self.search_fields.is_empty() {
            for term in search.unwrap_or_default().split_whitespace() {
                conditions.push(Condition {
                    predicates: self.search_fields.iter().map(|f| f.predicate).collect(),
                    value: format!("%{}%", escape_like(term)),
                });
            }
        }

        for filter in self.list_filter {
            if let Some(value) = params.get(filter.param) {
                conditions.push(Condition {
                    predicates: vec![filter.predicate],
                    value: value.clone(),
                });
            }
        }

        ListingQuery {
            columns: self.list_display.iter().map(|c| c.expr).collect(),
            from: self.from,
            conditions,
            order_by: self.ordering,
        }
    }

    /// Label cells by column, replacing empty values
    pub fn render(&self, rows: ListingRows) -> Vec<Map<String, Value>> {
        rows.into_iter()
            .map(|cells| {
                self.list_display
                    .iter()
                    .zip(cells)
                    .map(|(column, cell)| {
                        let text = match cell {
                            Some(text) if !text.is_empty() => text,
                            _ => self.empty_value_display.to_string(),
                        };
                        (column.label.to_string(), Value::String(text))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_unique() {
        let mut names: Vec<_> = MODEL_ADMINS.iter().map(|a| a.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), MODEL_ADMINS.len());
        assert!(find("recipes").is_some());
        assert!(find("sessions").is_none());
    }

    #[test]
    fn test_predicates_have_one_placeholder() {
        for admin in MODEL_ADMINS {
            for field in admin.search_fields {
                assert_eq!(field.predicate.matches('?').count(), 1, "{}", field.label);
            }
            for filter in admin.list_filter {
                assert_eq!(filter.predicate.matches('?').count(), 1, "{}", filter.param);
            }
        }
    }

    #[test]
    fn test_listing_search_and_filters() {
        let recipes = find("recipes").unwrap();
        let mut params = HashMap::new();
        params.insert("author__username".to_string(), "chef".to_string());
        params.insert("unknown".to_string(), "ignored".to_string());

        let query = recipes.listing(Some("borscht  beet"), &params);

        assert_eq!(query.columns.len(), 3);
        assert_eq!(query.conditions.len(), 3);
        assert_eq!(query.conditions[0].value, "%borscht%");
        assert_eq!(query.conditions[0].predicates.len(), 3);
        assert_eq!(query.conditions[2].value, "chef");
    }

    #[test]
    fn test_search_ignored_without_search_fields() {
        let users = find("users").unwrap();
        let query = users.listing(Some("ann"), &HashMap::new());
        assert!(query.conditions.is_empty());
    }

    #[test]
    fn test_render_uses_empty_value_display() {
        let recipes = find("recipes").unwrap();
        let rows = vec![vec![Some("Soup".to_string()), None, Some("2".to_string())]];

        let rendered = recipes.render(rows);
        assert_eq!(rendered[0]["name"], "Soup");
        assert_eq!(rendered[0]["author"], "-пусто-");
        assert_eq!(rendered[0]["favorite_count"], "2");
    }

    #[test]
    fn test_config_serializes_without_sql() {
        let json = serde_json::to_value(find("tags").unwrap()).unwrap();
        assert_eq!(json["list_display"][0]["label"], "name");
        assert!(json.get("from").is_none());
        assert!(json["search_fields"][0].get("predicate").is_none());
    }
}
