//! User write validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{required_text, FieldErrors, Validator, REQUIRED};
use crate::models::CreateUserInput;

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("Invalid username regex pattern"));
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex pattern")
});

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const NAME_MAX: usize = 150;
pub const PASSWORD_MAX: usize = 128;

/// Registration payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserCreateInput {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Password change payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPasswordInput {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Validates a registration. The service reports which unique fields are taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserCreateValidator {
    pub email_taken: bool,
    pub username_taken: bool,
}

impl Validator<UserCreateInput> for UserCreateValidator {
    type Output = CreateUserInput;

    fn validate(&self, input: UserCreateInput) -> Result<CreateUserInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = required_text(&mut errors, "username", input.username, USERNAME_MAX);
        if let Some(username) = &username {
            if !USERNAME_REGEX.is_match(username) {
                errors.add(
                    "username",
                    "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            } else if self.username_taken {
                errors.add("username", "A user with that username already exists.");
            }
        }

        let email = required_text(&mut errors, "email", input.email, EMAIL_MAX);
        if let Some(email) = &email {
            if !EMAIL_REGEX.is_match(email) {
                errors.add("email", "Enter a valid email address.");
            } else if self.email_taken {
                errors.add("email", "A user with this email already exists.");
            }
        }

        let first_name = name_field(&mut errors, "first_name", input.first_name, "The first name is too long.");
        let last_name = name_field(&mut errors, "last_name", input.last_name, "The last name is too long.");
        let password = password_field(&mut errors, "password", input.password);

        match (username, email, first_name, last_name, password) {
            (Some(username), Some(email), Some(first_name), Some(last_name), Some(password))
                if errors.is_empty() =>
            {
                Ok(CreateUserInput {
                    username,
                    email,
                    first_name,
                    last_name,
                    password,
                    role: None,
                })
            }
            _ => Err(errors),
        }
    }
}

fn name_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    too_long: &str,
) -> Option<String> {
    match value {
        Some(value) if value.chars().count() > NAME_MAX => {
            errors.add(field, too_long);
            None
        }
        other => required_text(errors, field, other, NAME_MAX),
    }
}

/// A password must be present and non-empty; whitespace is significant
pub(crate) fn password_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some(value) if value.is_empty() => {
            errors.add(field, super::BLANK);
            None
        }
        Some(value) if value.chars().count() > PASSWORD_MAX => {
            errors.add(
                field,
                format!("Ensure this field has no more than {} characters.", PASSWORD_MAX),
            );
            None
        }
        Some(value) => Some(value),
    }
}
