// src/models/user.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Gender identity choices offered by the details form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub const ALL: [Gender; 5] = [
        Gender::Male,
        Gender::Female,
        Gender::NonBinary,
        Gender::Other,
        Gender::PreferNotToSay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non-binary",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer-not-to-say",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == raw.trim())
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated profile details, ready to become a 'users' row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetails {
    pub full_name: String,
    pub email: String,
    pub gender: Gender,
    pub age: i32,
}

/// Raw form fields exactly as the user typed them.
/// Age stays a string until the whole form is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsFields {
    pub full_name: String,
    pub email: String,
    pub gender: String,
    pub age: String,
}

/// DTO for a partial, field-by-field update of the details form.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    #[validate(length(max = 200, message = "Full name must be at most 200 characters."))]
    pub full_name: Option<String>,
    #[validate(length(max = 320, message = "Email must be at most 320 characters."))]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(length(max = 8))]
    pub age: Option<String>,
}
