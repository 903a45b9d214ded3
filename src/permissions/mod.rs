//! Permission checks
//!
//! Authorization predicates evaluated per request (`has_permission`) and per
//! target object (`has_object_permission`). Handlers run the request-level
//! check first, load the object, then run the object-level check.

use axum::http::Method;
use thiserror::Error;

use crate::models::{Recipe, User};

/// Whether a request may change state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// GET, HEAD, OPTIONS
    Safe,
    /// Everything else
    Unsafe,
}

impl Action {
    pub fn from_method(method: &Method) -> Self {
        if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
            Action::Safe
        } else {
            Action::Unsafe
        }
    }

    pub fn is_safe(self) -> bool {
        self == Action::Safe
    }
}

/// Why a check denied the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermissionDenied {
    #[error("Authentication credentials were not provided")]
    NotAuthenticated,
    #[error("You do not have permission to perform this action")]
    Forbidden,
}

/// An authorization policy over targets of type `T`
pub trait AuthorizationCheck<T: ?Sized> {
    fn has_permission(&self, requester: Option<&User>, action: Action) -> bool;

    fn has_object_permission(&self, requester: Option<&User>, action: Action, target: &T) -> bool;
}

fn denial(requester: Option<&User>) -> PermissionDenied {
    match requester {
        Some(_) => PermissionDenied::Forbidden,
        None => PermissionDenied::NotAuthenticated,
    }
}

/// Run the request-level check
pub fn authorize<T: ?Sized, C: AuthorizationCheck<T>>(
    check: &C,
    requester: Option<&User>,
    action: Action,
) -> Result<(), PermissionDenied> {
    if check.has_permission(requester, action) {
        Ok(())
    } else {
        Err(denial(requester))
    }
}

/// Run both the request-level and the object-level check
pub fn authorize_object<T: ?Sized, C: AuthorizationCheck<T>>(
    check: &C,
    requester: Option<&User>,
    action: Action,
    target: &T,
) -> Result<(), PermissionDenied> {
    authorize::<T, C>(check, requester, action)?;
    if check.has_object_permission(requester, action, target) {
        Ok(())
    } else {
        Err(denial(requester))
    }
}

/// Recipes: anyone reads, authenticated users write, only the author
/// changes an existing recipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipeAccess;

impl AuthorizationCheck<Recipe> for RecipeAccess {
    fn has_permission(&self, requester: Option<&User>, action: Action) -> bool {
        action.is_safe() || requester.is_some()
    }

    fn has_object_permission(&self, requester: Option<&User>, action: Action, target: &Recipe) -> bool {
        action.is_safe() || requester.is_some_and(|user| user.id == target.author_id)
    }
}

/// Anyone reads; writes need an authenticated staff account.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminOrReadOnly;

impl<T: ?Sized> AuthorizationCheck<T> for AdminOrReadOnly {
    fn has_permission(&self, requester: Option<&User>, action: Action) -> bool {
        action.is_safe() || requester.is_some()
    }

    fn has_object_permission(&self, requester: Option<&User>, action: Action, _target: &T) -> bool {
        action.is_safe() || requester.is_some_and(User::is_staff)
    }
}

/// Authenticated users acting on their own account only.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentUserOnly;

impl AuthorizationCheck<User> for CurrentUserOnly {
    fn has_permission(&self, requester: Option<&User>, _action: Action) -> bool {
        requester.is_some()
    }

    fn has_object_permission(&self, requester: Option<&User>, _action: Action, target: &User) -> bool {
        requester.is_some_and(|user| user.id == target.id)
    }
}
