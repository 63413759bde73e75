use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{RegisterRequest, UpdateProfileRequest};
use crate::{db::UserType, error::ApiError};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex");
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9\s\-()]{5,19}$").expect("phone regex");
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_name(value: &str, field: &str) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if !(2..=50).contains(&len) {
        return Err(ApiError::validation(format!(
            "{field} must be between 2 and 50 characters"
        )));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        return Err(ApiError::validation(
            "Password must contain at least one lowercase letter, one uppercase letter, and one number",
        ));
    }
    Ok(())
}

/// Validates a registration payload (email already normalized) and returns
/// the requested account type. Only customers and providers can sign up.
pub(crate) fn validate_registration(req: &RegisterRequest) -> Result<UserType, ApiError> {
    check_name(&req.first_name, "First name")?;
    check_name(&req.last_name, "Last name")?;
    if !is_valid_email(&req.email) {
        return Err(ApiError::validation("Please provide a valid email address"));
    }
    check_password(&req.password)?;
    if let Some(phone) = req.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if !is_valid_phone(phone) {
            return Err(ApiError::validation("Please provide a valid phone number"));
        }
    }
    match UserType::parse(&req.user_type) {
        Some(t @ (UserType::Customer | UserType::Provider)) => Ok(t),
        _ => Err(ApiError::validation(
            "User type must be either customer or provider",
        )),
    }
}

pub(crate) fn validate_profile_update(req: &UpdateProfileRequest) -> Result<(), ApiError> {
    if let Some(first) = &req.first_name {
        check_name(first, "First name")?;
    }
    if let Some(last) = &req.last_name {
        check_name(last, "Last name")?;
    }
    if let Some(phone) = req.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if !is_valid_phone(phone) {
            return Err(ApiError::validation("Please provide a valid phone number"));
        }
    }
    if matches!(req.hourly_rate, Some(r) if !r.is_finite() || r < 0.0) {
        return Err(ApiError::validation("Hourly rate must be a positive number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RegisterRequest {
        RegisterRequest {
            first_name: "Sarah".into(),
            last_name: "Johnson".into(),
            email: "sarah@example.com".into(),
            password: "Passw0rd".into(),
            phone: Some("+1234567890".into()),
            user_type: "provider".into(),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        assert_eq!(validate_registration(&valid()).unwrap(), UserType::Provider);
        let mut customer = valid();
        customer.user_type = "CUSTOMER".into();
        customer.phone = None;
        assert_eq!(validate_registration(&customer).unwrap(), UserType::Customer);
    }

    #[test]
    fn rejects_admin_signup() {
        let mut req = valid();
        req.user_type = "admin".into();
        assert!(matches!(validate_registration(&req), Err(ApiError::Validation(_))));
    }

    #[test]
    fn rejects_weak_password() {
        for pw in ["Ab1", "password1", "PASSWORD1", "Password"] {
            let mut req = valid();
            req.password = pw.into();
            assert!(validate_registration(&req).is_err(), "{pw} should be rejected");
        }
    }

    #[test]
    fn rejects_short_name_and_bad_email() {
        let mut req = valid();
        req.first_name = "S".into();
        assert!(validate_registration(&req).is_err());

        let mut req = valid();
        req.email = "not-an-email".into();
        assert!(validate_registration(&req).is_err());
    }

    #[test]
    fn email_helpers() {
        assert_eq!(normalize_email("  Sarah@Example.COM "), "sarah@example.com");
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(is_valid_phone("+1 (234) 567-890"));
        assert!(!is_valid_phone("call me"));
    }

    #[test]
    fn profile_update_rejects_negative_rate() {
        let req = UpdateProfileRequest {
            hourly_rate: Some(-5.0),
            ..Default::default()
        };
        assert!(validate_profile_update(&req).is_err());
        assert!(validate_profile_update(&UpdateProfileRequest::default()).is_ok());
    }
}
