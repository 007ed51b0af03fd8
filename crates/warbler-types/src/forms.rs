use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// Longest message body accepted, in characters.
pub const MAX_MESSAGE_LEN: u64 = 140;

/// Minimum password length for signup and login.
pub const MIN_PASSWORD_LEN: u64 = 6;

/// Upper bound for the free-text profile fields.
pub const MAX_PROFILE_FIELD_LEN: u64 = 255;

// -- Errors --

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = match &err.message {
                    Some(message) => message.to_string(),
                    None => err.code.to_string(),
                };
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// Run the derived rules, then build the cleaned value.
fn clean_with<F, T>(form: &F, build: impl FnOnce() -> T) -> Result<T, FormErrors>
where
    F: Validate,
{
    form.validate().map_err(FormErrors::from)?;
    Ok(build())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message(Cow::Borrowed("This field is required.")));
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// -- Message --

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct MessageForm {
    #[validate(
        custom(function = "not_blank"),
        length(max = MAX_MESSAGE_LEN, message = "Field cannot be longer than 140 characters.")
    )]
    pub text: String,
}

impl MessageForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        clean_with(self, || self.text.trim().to_string())
    }
}

// -- Signup --

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserAddForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"), email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Field must be at least 6 characters long."))]
    pub password: String,
    pub image_url: String,
}

/// Cleaned signup input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupData {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

impl UserAddForm {
    pub fn clean(&self) -> Result<SignupData, FormErrors> {
        clean_with(self, || SignupData {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            image_url: optional(&self.image_url),
        })
    }
}

// -- Login --

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Field must be at least 6 characters long."))]
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(String, String), FormErrors> {
        clean_with(self, || (self.username.trim().to_string(), self.password.clone()))
    }
}

// -- Profile --

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserProfileForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"), email(message = "Invalid email address."))]
    pub email: String,
    /// Current password, required to confirm the edit.
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    pub image_url: String,
    #[validate(length(max = MAX_PROFILE_FIELD_LEN, message = "Field cannot be longer than 255 characters."))]
    pub header_image_url: String,
    #[validate(length(max = MAX_PROFILE_FIELD_LEN, message = "Field cannot be longer than 255 characters."))]
    pub bio: String,
    #[validate(length(max = MAX_PROFILE_FIELD_LEN, message = "Field cannot be longer than 255 characters."))]
    pub location: String,
}

/// Cleaned profile edit. Empty optional fields come through as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileData {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl UserProfileForm {
    pub fn clean(&self) -> Result<ProfileData, FormErrors> {
        clean_with(self, || ProfileData {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            image_url: optional(&self.image_url),
            header_image_url: optional(&self.header_image_url),
            bio: optional(&self.bio),
            location: optional(&self.location),
        })
    }
}
