use itertools::Itertools;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in one submitted form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }

    /// Trimmed `value`, recording an error when it is blank.
    pub fn required(&mut self, field: &'static str, label: &str, value: &str) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, format!("{label} is required"));
        }
        value.to_owned()
    }

    pub fn max_chars(&mut self, field: &'static str, label: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(
                field,
                format!("{label} must be no more than {max} characters in length"),
            );
        }
    }

    pub fn email(&mut self, field: &'static str, label: &str, value: &str) {
        if !value.is_empty() && !email_address::EmailAddress::is_valid(value) {
            self.push(field, format!("{label} is not a valid e-mail address"));
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().map(|e| &e.message).join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Trimmed `value`, or `None` when blank.
pub fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_records_blank_values_and_trims_the_rest() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.required("name", "Name", "  Alice "), "Alice");
        assert!(errors.is_empty());
        errors.required("phone", "Phone", "   ");
        assert!(errors.contains("phone"));
        assert_eq!(errors.to_string(), "Phone is required");
    }

    #[test]
    fn email_is_only_checked_when_present() {
        let mut errors = FieldErrors::new();
        errors.email("email", "E-mail", "");
        errors.email("email", "E-mail", "alice@x.com");
        assert!(errors.is_empty());
        errors.email("email", "E-mail", "alice.x.com");
        assert!(errors.contains("email"));
    }

    #[test]
    fn optional_treats_whitespace_as_absent() {
        assert_eq!(optional("  "), None);
        assert_eq!(optional(" IL "), Some("IL".to_owned()));
    }
}
