//! crates/mentorship_core/src/validation.rs
//!
//! Client-side checks that run before any backend call.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// The youngest age accepted at sign-up and onboarding.
pub const MINIMUM_AGE: u32 = 13;

/// Largest resume upload accepted, in bytes.
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

/// Throwaway-mail providers refused at sign-up.
pub const DISPOSABLE_EMAIL_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "10minutemail.com",
    "tempmail.com",
    "temp-mail.org",
    "yopmail.com",
    "throwawaymail.com",
    "trashmail.com",
    "sharklasers.com",
    "getnada.com",
    "dispostable.com",
    "maildrop.cc",
    "fakeinbox.com",
];

const RESUME_EXTENSIONS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Disposable email addresses from {0} are not allowed")]
    DisposableEmail(String),
    #[error("You must be at least {minimum} years old (age {age})")]
    Underage { age: u32, minimum: u32 },
    #[error("Date of birth cannot be in the future")]
    BirthDateInFuture,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("File is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// Checks syntax and refuses disposable domains. Returns the trimmed address.
pub fn validate_signup_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if !email_pattern().is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    let domain = email
        .rsplit_once('@')
        .map(|(_, d)| d.to_ascii_lowercase())
        .unwrap_or_default();
    if DISPOSABLE_EMAIL_DOMAINS.contains(&domain.as_str()) {
        return Err(ValidationError::DisposableEmail(domain));
    }
    Ok(email.to_string())
}

/// Whole years elapsed between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if date_of_birth > today {
        return None;
    }
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

pub fn validate_age(date_of_birth: NaiveDate, today: NaiveDate) -> Result<u32, ValidationError> {
    let age = age_on(date_of_birth, today).ok_or(ValidationError::BirthDateInFuture)?;
    if age < MINIMUM_AGE {
        return Err(ValidationError::Underage {
            age,
            minimum: MINIMUM_AGE,
        });
    }
    Ok(age)
}

pub fn require(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn content_type_for(
    file_name: &str,
    table: &[(&str, &'static str)],
) -> Result<&'static str, ValidationError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    table
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, ct)| *ct)
        .ok_or_else(|| ValidationError::UnsupportedFileType(file_name.to_string()))
}

/// Checks a resume upload and returns the content type to store it with.
pub fn validate_resume_file(file_name: &str, size: usize) -> Result<&'static str, ValidationError> {
    let content_type = content_type_for(file_name, RESUME_EXTENSIONS)?;
    if size > MAX_RESUME_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_RESUME_BYTES,
        });
    }
    Ok(content_type)
}

/// Content type of a blog cover image.
pub fn validate_image_file(file_name: &str) -> Result<&'static str, ValidationError> {
    content_type_for(file_name, IMAGE_EXTENSIONS)
}

/// Lowercase, dash-separated URL slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
