// src/flow/details.rs

use validator::ValidateEmail;

use crate::{
    config::{MAX_AGE, MIN_AGE},
    models::user::{DetailsFields, Gender, UpdateDetailsRequest, UserDetails},
};

use super::FlowError;

/// True when every field is filled, the gender is known and the age is 18 or over.
pub fn is_valid(fields: &DetailsFields) -> bool {
    parse(fields).is_ok()
}

/// Turns the raw form into typed details, naming the first offending field.
pub fn parse(fields: &DetailsFields) -> Result<UserDetails, FlowError> {
    let full_name = fields.full_name.trim();
    let email = fields.email.trim();

    if full_name.is_empty() || email.is_empty() || fields.gender.trim().is_empty() {
        return Err(FlowError::Validation(
            "Please fill in all user details".to_string(),
        ));
    }

    if !email.validate_email() {
        return Err(FlowError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    let gender = Gender::parse(&fields.gender)
        .ok_or_else(|| FlowError::Validation("Please select a gender identity".to_string()))?;

    let age = fields
        .age
        .trim()
        .parse::<i32>()
        .map_err(|_| FlowError::Validation("Please enter your age".to_string()))?;

    if age < MIN_AGE {
        return Err(FlowError::Validation(
            "You must be at least 18 years old".to_string(),
        ));
    }
    if age > MAX_AGE {
        return Err(FlowError::Validation("Please enter a realistic age".to_string()));
    }

    Ok(UserDetails {
        full_name: full_name.to_string(),
        email: email.to_string(),
        gender,
        age,
    })
}

/// Form state for the details step, edited one field at a time.
#[derive(Debug, Clone, Default)]
pub struct DetailsForm {
    fields: DetailsFields,
}

impl DetailsForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &DetailsFields {
        &self.fields
    }

    /// Applies only the fields present in the update.
    pub fn apply(&mut self, update: UpdateDetailsRequest) {
        if let Some(full_name) = update.full_name {
            self.fields.full_name = full_name;
        }
        if let Some(email) = update.email {
            self.fields.email = email;
        }
        if let Some(gender) = update.gender {
            self.fields.gender = gender;
        }
        if let Some(age) = update.age {
            self.fields.age = age;
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid(&self.fields)
    }

    pub fn parse(&self) -> Result<UserDetails, FlowError> {
        parse(&self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str, email: &str, gender: &str, age: &str) -> DetailsFields {
        DetailsFields {
            full_name: name.to_string(),
            email: email.to_string(),
            gender: gender.to_string(),
            age: age.to_string(),
        }
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(!is_valid(&fields("", "a@b.com", "male", "25")));
        assert!(!is_valid(&fields("   ", "a@b.com", "male", "25")));
    }

    #[test]
    fn under_age_is_invalid() {
        let err = parse(&fields("Jo", "a@b.com", "male", "17")).unwrap_err();
        assert!(matches!(err, FlowError::Validation(msg) if msg.contains("18")));
    }

    #[test]
    fn complete_form_is_valid() {
        let details = parse(&fields("Jo", "a@b.com", "male", "25")).unwrap();
        assert_eq!(details.age, 25);
        assert_eq!(details.gender, Gender::Male);
        assert!(is_valid(&fields("Jo", "a@b.com", "prefer-not-to-say", "18")));
    }

    #[test]
    fn unknown_gender_and_bad_age_are_invalid() {
        assert!(!is_valid(&fields("Jo", "a@b.com", "robot", "25")));
        assert!(!is_valid(&fields("Jo", "a@b.com", "female", "twenty")));
        assert!(!is_valid(&fields("Jo", "a@b.com", "female", "")));
        assert!(!is_valid(&fields("Jo", "a@b.com", "female", "121")));
    }

    #[test]
    fn malformed_email_is_invalid() {
        assert!(!is_valid(&fields("Jo", "not-an-email", "other", "30")));
    }

    #[test]
    fn fields_are_trimmed() {
        let details = parse(&fields("  Jo Doe ", " jo@example.com ", " non-binary ", " 41 ")).unwrap();
        assert_eq!(details.full_name, "Jo Doe");
        assert_eq!(details.email, "jo@example.com");
        assert_eq!(details.gender, Gender::NonBinary);
        assert_eq!(details.age, 41);
    }

    #[test]
    fn apply_updates_only_given_fields() {
        let mut form = DetailsForm::new();
        form.apply(UpdateDetailsRequest {
            full_name: Some("Jo".to_string()),
            email: Some("a@b.com".to_string()),
            ..Default::default()
        });
        assert!(!form.is_valid());

        form.apply(UpdateDetailsRequest {
            gender: Some("female".to_string()),
            age: Some("25".to_string()),
            ..Default::default()
        });
        assert!(form.is_valid());
        assert_eq!(form.fields().full_name, "Jo");
    }
}
