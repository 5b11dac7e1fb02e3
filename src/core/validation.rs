//! Input validation helpers
//!
//! Request DTOs derive [`validator::Validate`] for lengths, ranges and email
//! syntax. Checks the derive cannot express (blank strings, slug and ISBN
//! formats) go through [`FieldErrors`], which merges both sources into one
//! [`CatalogError::ValidationFailed`].

use crate::core::error::{CatalogError, FieldValidationError};
use crate::core::field::FieldFormat;
use validator::{Validate, ValidationErrors};

/// Flatten `validator` output into sorted field errors
pub fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldValidationError> {
    let mut collected: Vec<FieldValidationError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", err.code));
                FieldValidationError::new(field.clone(), message)
            })
        })
        .collect();
    collected.sort_by(|a, b| a.field.cmp(&b.field));
    collected
}

/// Accumulates field errors across several checks
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldValidationError>,
}

impl FieldErrors {
    /// Start from the derive-based checks of `input`
    pub fn of<T: Validate>(input: &T) -> Self {
        let errors = match input.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => collect_field_errors(&errors),
        };
        Self { errors }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldValidationError::new(field, message));
    }

    /// Reject empty or whitespace-only strings
    pub fn not_blank(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "must not be blank");
        }
        self
    }

    /// Like [`not_blank`](Self::not_blank) for optional values; `None` passes
    pub fn not_blank_opt(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.not_blank(field, value);
        }
        self
    }

    pub fn format(&mut self, field: &str, value: &str, format: &FieldFormat) -> &mut Self {
        if !format.validate(value) {
            let message = match format {
                FieldFormat::Slug => "must be lowercase words separated by single dashes",
                FieldFormat::Isbn => "must be a valid ISBN-10 or ISBN-13",
            };
            self.push(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok` when no check failed, otherwise every collected error at once
    pub fn finish(&mut self) -> Result<(), CatalogError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::ValidationFailed(std::mem::take(
                &mut self.errors,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 1, max = 5))]
        username: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_collects_derive_errors() {
        let input = Signup {
            username: "far-too-long".into(),
            email: "not-an-email".into(),
        };

        let errors = collect_field_errors(&input.validate().unwrap_err());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "username"]);
    }

    #[test]
    fn test_merges_manual_checks() {
        let input = Signup {
            username: "   ".into(),
            email: "a@b.io".into(),
        };

        let result = FieldErrors::of(&input)
            .not_blank("username", &input.username)
            .format("slug", "Not A Slug", &FieldFormat::Slug)
            .finish();

        match result {
            Err(CatalogError::ValidationFailed(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "username");
                assert_eq!(errors[1].field, "slug");
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_input_passes() {
        let input = Signup {
            username: "ann".into(),
            email: "ann@example.com".into(),
        };
        let mut checks = FieldErrors::of(&input);
        checks.not_blank_opt("nickname", None);
        assert!(checks.is_empty());
        assert!(checks.finish().is_ok());
    }
}
