//! Multipart form parsing and field validation shared by handlers.
//!
//! Temple and artifact writes arrive as `multipart/form-data` carrying text
//! fields plus an optional image part. `collect` drains the stream once;
//! handlers then pull typed values out with the `require_*`/`optional_*`
//! helpers, which accumulate field-level errors instead of failing on the
//! first bad input.

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, FieldError, Result};
use crate::services::UploadedImage;

/// Text fields and file parts drained from a multipart body.
#[derive(Debug, Default)]
pub struct FormBody {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedImage>,
}

impl FormBody {
    /// Read a text field, treating blank values as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Take a file part out of the form.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedImage> {
        self.files.remove(name)
    }
}

/// Drain a multipart stream into a [`FormBody`]. Parts carrying a filename
/// are kept as files; everything else is read as UTF-8 text.
pub async fn collect(mut multipart: Multipart) -> Result<FormBody> {
    let mut form = FormBody::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if let Some(file_name) = field.file_name() {
            let file_name = file_name.to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                AppError::Validation(format!("Failed to read file part '{}': {}", name, e))
            })?;
            if !bytes.is_empty() {
                form.files.insert(
                    name,
                    UploadedImage {
                        bytes,
                        content_type,
                        file_name,
                    },
                );
            }
        } else {
            let value = field.text().await.map_err(|e| {
                AppError::Validation(format!("Failed to read field '{}': {}", name, e))
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Turn accumulated field errors into a response error, or pass through.
pub fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Invalid(errors))
    }
}

/// Required text field with a minimum length.
pub fn require_str(
    value: Option<&str>,
    field: &str,
    min_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() >= min_len => Some(v.to_string()),
        Some(_) => {
            errors.push(FieldError::new(
                field,
                format!("{} must be at least {} characters", field, min_len),
            ));
            None
        }
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            None
        }
    }
}

/// Optional text field; validated only when present.
pub fn optional_str(
    value: Option<&str>,
    field: &str,
    min_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let v = value.map(str::trim).filter(|v| !v.is_empty())?;
    if v.chars().count() >= min_len {
        Some(v.to_string())
    } else {
        errors.push(FieldError::new(
            field,
            format!("{} must be at least {} characters", field, min_len),
        ));
        None
    }
}

fn looks_like_url(value: &str) -> bool {
    (value.starts_with("http://") || value.starts_with("https://"))
        && value.len() > "https://".len()
        && !value.contains(char::is_whitespace)
}

fn check_url(value: &str, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    if !looks_like_url(value) {
        errors.push(FieldError::new(field, format!("{} must be a valid URL", field)));
        return None;
    }
    if value.len() > 500 {
        errors.push(FieldError::new(
            field,
            format!("{} must be at most 500 characters", field),
        ));
        return None;
    }
    Some(value.to_string())
}

/// Required URL field (http/https, at most 500 characters).
pub fn require_url(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => check_url(v, field, errors),
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            None
        }
    }
}

/// Optional URL field; validated only when present.
pub fn optional_url(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let v = value.map(str::trim).filter(|v| !v.is_empty())?;
    check_url(v, field, errors)
}

/// Required UUID field.
pub fn require_uuid(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Uuid> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => match Uuid::parse_str(v) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new(field, format!("{} must be a valid id", field)));
                None
            }
        },
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            None
        }
    }
}

/// Optional UUID field; validated only when present.
pub fn optional_uuid(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Uuid> {
    let v = value.map(str::trim).filter(|v| !v.is_empty())?;
    match Uuid::parse_str(v) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(FieldError::new(field, format!("{} must be a valid id", field)));
            None
        }
    }
}

fn check_price(value: &str, field: &str, errors: &mut Vec<FieldError>) -> Option<Decimal> {
    match value.parse::<Decimal>() {
        Ok(price) if price >= Decimal::ZERO => Some(price),
        Ok(_) => {
            errors.push(FieldError::new(
                field,
                format!("{} must be a non-negative number", field),
            ));
            None
        }
        Err(_) => {
            errors.push(FieldError::new(field, format!("{} must be a number", field)));
            None
        }
    }
}

/// Required non-negative decimal field.
pub fn require_price(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Decimal> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => check_price(v, field, errors),
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            None
        }
    }
}

/// Optional non-negative decimal field; validated only when present.
pub fn optional_price(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Decimal> {
    let v = value.map(str::trim).filter(|v| !v.is_empty())?;
    check_price(v, field, errors)
}

/// Required ISO calendar date that is not in the past (day granularity).
pub fn require_future_date(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    let v = match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            return None;
        }
    };
    let date = match NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            errors.push(FieldError::new(
                field,
                format!("{} must be an ISO date (YYYY-MM-DD)", field),
            ));
            return None;
        }
    };
    if date < Utc::now().date_naive() {
        errors.push(FieldError::new(
            field,
            format!("{} must not be in the past", field),
        ));
        return None;
    }
    Some(date)
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

fn check_email(value: &str, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    if looks_like_email(value) {
        Some(value.to_lowercase())
    } else {
        errors.push(FieldError::new(
            field,
            format!("{} must be a valid email address", field),
        ));
        None
    }
}

/// Required email field; normalized to lowercase.
pub fn require_email(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => check_email(v, field, errors),
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            None
        }
    }
}

/// Optional email field; validated only when present.
pub fn optional_email(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let v = value.map(str::trim).filter(|v| !v.is_empty())?;
    check_email(v, field, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_str_enforces_presence_and_length() {
        let mut errors = Vec::new();
        assert_eq!(
            require_str(Some("Borobudur"), "title", 3, &mut errors),
            Some("Borobudur".to_string())
        );
        assert!(errors.is_empty());

        assert_eq!(require_str(Some("ab"), "title", 3, &mut errors), None);
        assert_eq!(require_str(None, "title", 3, &mut errors), None);
        assert_eq!(require_str(Some("   "), "title", 3, &mut errors), None);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn optional_str_is_silent_when_absent() {
        let mut errors = Vec::new();
        assert_eq!(optional_str(None, "title", 3, &mut errors), None);
        assert!(errors.is_empty());

        assert_eq!(optional_str(Some("ab"), "title", 3, &mut errors), None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn url_validation_accepts_http_schemes_only() {
        let mut errors = Vec::new();
        assert_eq!(
            require_url(Some("https://maps.app.goo.gl/abc"), "locationUrl", &mut errors),
            Some("https://maps.app.goo.gl/abc".to_string())
        );
        assert!(errors.is_empty());

        assert_eq!(require_url(Some("not a url"), "locationUrl", &mut errors), None);
        assert_eq!(require_url(Some("ftp://x.y/z"), "locationUrl", &mut errors), None);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn url_validation_caps_length_at_500() {
        let mut errors = Vec::new();
        let long = format!("https://example.com/{}", "a".repeat(500));
        assert_eq!(require_url(Some(&long), "locationUrl", &mut errors), None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn price_validation_rejects_negatives_and_garbage() {
        let mut errors = Vec::new();
        assert_eq!(
            require_price(Some("50000"), "price", &mut errors),
            Some(Decimal::new(50000, 0))
        );
        assert_eq!(
            require_price(Some("125.50"), "price", &mut errors),
            Some(Decimal::new(12550, 2))
        );
        assert!(errors.is_empty());

        assert_eq!(require_price(Some("-1"), "price", &mut errors), None);
        assert_eq!(require_price(Some("cheap"), "price", &mut errors), None);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn future_date_rejects_yesterday_and_accepts_today() {
        let mut errors = Vec::new();
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        assert_eq!(
            require_future_date(Some(&today.to_string()), "validDate", &mut errors),
            Some(today)
        );
        assert!(errors.is_empty());

        assert_eq!(
            require_future_date(Some(&yesterday.to_string()), "validDate", &mut errors),
            None
        );
        assert_eq!(
            require_future_date(Some("22-08-2026"), "validDate", &mut errors),
            None
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn email_validation_normalizes_case() {
        let mut errors = Vec::new();
        assert_eq!(
            require_email(Some("Tour@Example.COM"), "email", &mut errors),
            Some("tour@example.com".to_string())
        );
        assert!(errors.is_empty());

        assert_eq!(require_email(Some("nope"), "email", &mut errors), None);
        assert_eq!(require_email(Some("a@b"), "email", &mut errors), None);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn finish_collects_into_invalid() {
        assert!(finish(Vec::new()).is_ok());

        let errors = vec![FieldError::new("title", "title is required")];
        match finish(errors) {
            Err(AppError::Invalid(fields)) => assert_eq!(fields.len(), 1),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }
}
