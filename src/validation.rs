use std::collections::HashMap;
use std::fmt::Display;

use crate::error::ApiError;

/// Collects per-field messages so a form reports every problem at once
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// First message per field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Length in characters, so accented text is not penalized
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            if min == 1 {
                self.add(field, "Este campo es obligatorio");
            } else {
                self.add(field, format!("Debe tener al menos {} caracteres", min));
            }
        } else if len > max {
            self.add(field, format!("Debe tener máximo {} caracteres", max));
        }
    }

    pub fn check_range<T: PartialOrd + Display>(&mut self, field: &str, value: T, min: T, max: T) {
        if value < min || value > max {
            self.add(field, format!("Debe estar entre {} y {}", min, max));
        }
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Datos inválidos", Some(self.errors)))
        }
    }
}

/// Trimmed value, `None` when blank
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub fn validate_email_format(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("El correo es obligatorio".to_string());
    }
    if email.chars().count() > 254 || email.chars().any(char::is_whitespace) {
        return Err("Correo inválido".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Correo inválido".to_string());
    };
    if local.is_empty() || domain.contains('@') {
        return Err("Correo inválido".to_string());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err("Correo inválido".to_string());
    }

    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("La contraseña debe tener al menos 8 caracteres".to_string());
    }
    if password.len() > 72 {
        // bcrypt ignores everything past 72 bytes
        return Err("La contraseña debe tener máximo 72 bytes".to_string());
    }
    Ok(())
}

/// Digits with optional leading `+`, spaces and dashes allowed
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || c == ' ' || c == '-' || (i == 0 && c == '+'));
    if !allowed || !(7..=20).contains(&digits) {
        return Err("Teléfono inválido".to_string());
    }
    Ok(())
}

/// Absolute http(s) URL with a host
pub fn validate_http_url(value: &str) -> Result<(), String> {
    match url::Url::parse(value.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() => Ok(()),
        _ => Err("Debe ser una URL válida (http o https)".to_string()),
    }
}
