//! Input checks run before a request is sent.
//!
//! Request types derive [`validator::Validate`]; this module turns the
//! derive's report into [`ValidationErrors`], keeping one message per field.

use crate::api::endpoints::{InviteRequest, PayoutRequest};
use std::borrow::Cow;
use std::fmt;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrorsKind};

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

const PASSWORD_SPECIALS: &str = "@$!%*?&#";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.violations
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.message.as_str())
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn collect(&mut self, report: &validator::ValidationErrors) {
        for (field, kind) in report.errors() {
            match kind {
                ValidationErrorsKind::Field(errors) => {
                    // a missing value also fails the format rules; report it as missing
                    let first = errors.iter().min_by_key(|e| match &*e.code {
                        "length" | "range" => 0,
                        _ => 1,
                    });
                    if let Some(error) = first {
                        self.add(field.to_string(), message_of(error));
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(nested),
                ValidationErrorsKind::List(items) => {
                    for nested in items.values() {
                        self.collect(nested);
                    }
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(report: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::default();
        errors.collect(&report);
        errors.violations.sort_by(|a, b| a.field.cmp(&b.field));
        errors
    }
}

fn message_of(error: &ValidationError) -> String {
    error
        .message
        .as_deref()
        .map(str::to_string)
        .unwrap_or_else(|| error.code.to_string())
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Runs the derived rules of a request.
pub fn check<T: Validate>(request: &T) -> Result<(), ValidationErrors> {
    request.validate().map_err(ValidationErrors::from)
}

pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// Character classes a new password needs, reported in this order.
pub fn password_strength(password: &str) -> Result<(), ValidationError> {
    let classes: [(fn(&char) -> bool, &'static str, &'static str); 4] = [
        (char::is_ascii_uppercase, "password_uppercase", "Must contain one uppercase letter"),
        (char::is_ascii_lowercase, "password_lowercase", "Must contain one lowercase letter"),
        (char::is_ascii_digit, "password_digit", "Must contain one number"),
        (
            |c: &char| PASSWORD_SPECIALS.contains(*c),
            "password_special",
            "Must contain one special character",
        ),
    ];

    for (matches, code, message) in classes {
        if !password.chars().any(|c| matches(&c)) {
            return Err(rule(code, message));
        }
    }
    Ok(())
}

pub fn every_email(emails: &[String]) -> Result<(), ValidationError> {
    if emails.iter().all(|e| e.validate_email()) {
        Ok(())
    } else {
        Err(rule("email", "Invalid email"))
    }
}

#[derive(Validate)]
struct OtpInput {
    #[validate(
        length(equal = 6, message = "OTP must be 6 digits"),
        custom(function = "ascii_digits")
    )]
    otp: String,
}

fn ascii_digits(code: &str) -> Result<(), ValidationError> {
    if code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(rule("otp_digits", "OTP must be 6 digits"))
    }
}

/// Parses a six-digit one-time code.
pub fn otp(code: &str) -> Result<u32, ValidationErrors> {
    let code = code.trim();
    check(&OtpInput {
        otp: code.to_string(),
    })?;

    code.parse().map_err(|_| {
        let mut errors = ValidationErrors::default();
        errors.add("otp", "OTP must be 6 digits");
        errors
    })
}

/// Splits pasted text on whitespace and commas, keeping valid addresses not
/// already present in `existing`.
pub fn parse_invite_emails(input: &str, existing: &[String]) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();
    for candidate in input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if is_valid_email(candidate)
            && !existing.iter().any(|e| e == candidate)
            && !emails.iter().any(|e| e == candidate)
        {
            emails.push(candidate.to_string());
        }
    }
    emails
}

pub fn invite(request: &InviteRequest) -> Result<(), ValidationErrors> {
    check(request)
}

/// Derived rules plus the balance ceiling, which is only known at runtime.
pub fn payout(request: &PayoutRequest, balance: f64) -> Result<(), ValidationErrors> {
    let mut errors = match check(request) {
        Ok(()) => ValidationErrors::default(),
        Err(errors) => errors,
    };

    if errors.message_for("amount").is_none() {
        if !request.amount.is_finite() {
            errors.add("amount", "Amount is required");
        } else if request.amount > balance {
            errors.add("amount", "Cannot pay more than balance");
        }
    }
    errors.into_result()
}
