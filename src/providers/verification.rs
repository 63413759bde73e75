//! Decisions over a provider's verification flags.
//!
//! The handlers load the provider, ask these functions whether the
//! transition is allowed and only then write. Nothing here touches the
//! database.

use serde::Serialize;

use crate::{db::Provider, error::ApiError};

pub const MIN_REASON_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    Verified,
    Pending,
    Rejected,
    Unrequested,
}

impl VerificationState {
    pub fn of(provider: &Provider) -> Self {
        if provider.verified {
            Self::Verified
        } else if provider.verification_requested {
            Self::Pending
        } else if provider.verification_rejected_reason.is_some() {
            Self::Rejected
        } else {
            Self::Unrequested
        }
    }
}

/// A provider may ask for verification unless already verified.
pub fn check_request(provider: &Provider) -> Result<(), ApiError> {
    match VerificationState::of(provider) {
        VerificationState::Verified => Err(ApiError::validation("Provider is already verified")),
        _ => Ok(()),
    }
}

pub fn check_verify(provider: &Provider) -> Result<(), ApiError> {
    match VerificationState::of(provider) {
        VerificationState::Verified => Err(ApiError::validation("Provider is already verified")),
        VerificationState::Pending => Ok(()),
        VerificationState::Rejected | VerificationState::Unrequested => Err(ApiError::validation(
            "Provider has not requested verification",
        )),
    }
}

pub fn check_reject(provider: &Provider) -> Result<(), ApiError> {
    match VerificationState::of(provider) {
        VerificationState::Verified => {
            Err(ApiError::validation("Cannot reject a verified provider"))
        }
        _ => Ok(()),
    }
}

/// Returns the trimmed reason, which must be at least ten characters.
pub fn validate_reason(reason: Option<&str>) -> Result<&str, ApiError> {
    let reason = reason.map(str::trim).unwrap_or_default();
    if reason.chars().count() < MIN_REASON_LEN {
        return Err(ApiError::validation(format!(
            "Rejection reason is required (min {MIN_REASON_LEN} characters)"
        )));
    }
    Ok(reason)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    pub(crate) fn provider(verified: bool, requested: bool, reason: Option<&str>) -> Provider {
        let now = OffsetDateTime::now_utc();
        Provider {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            experience: "5 years".into(),
            location: "Austin, TX".into(),
            hourly_rate: Some(45.0),
            bio: None,
            rating: 4.8,
            reviews: 12,
            verified,
            verification_requested: requested,
            verification_requested_at: requested.then_some(now),
            verification_rejected_reason: reason.map(Into::into),
            verified_at: verified.then_some(now),
            verified_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn state_from_flags() {
        assert_eq!(VerificationState::of(&provider(true, false, None)), VerificationState::Verified);
        assert_eq!(VerificationState::of(&provider(false, true, None)), VerificationState::Pending);
        assert_eq!(
            VerificationState::of(&provider(false, false, Some("Missing license"))),
            VerificationState::Rejected
        );
        assert_eq!(
            VerificationState::of(&provider(false, false, None)),
            VerificationState::Unrequested
        );
        // A rejected provider who asks again is pending again.
        assert_eq!(
            VerificationState::of(&provider(false, true, Some("Missing license"))),
            VerificationState::Pending
        );
    }

    #[test]
    fn verify_requires_pending_request() {
        assert!(check_verify(&provider(false, true, None)).is_ok());

        let err = check_verify(&provider(true, false, None)).unwrap_err();
        assert_eq!(err.to_string(), "Provider is already verified");

        let err = check_verify(&provider(false, false, None)).unwrap_err();
        assert_eq!(err.parts().0, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Provider has not requested verification");

        assert!(check_verify(&provider(false, false, Some("Blurry documents"))).is_err());
    }

    #[test]
    fn reject_refuses_verified_provider() {
        let err = check_reject(&provider(true, false, None)).unwrap_err();
        assert_eq!(err.parts().0, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Cannot reject a verified provider");
        assert!(check_reject(&provider(false, true, None)).is_ok());
        assert!(check_reject(&provider(false, false, None)).is_ok());
    }

    #[test]
    fn request_refused_once_verified() {
        assert!(check_request(&provider(true, false, None)).is_err());
        assert!(check_request(&provider(false, false, Some("Blurry documents"))).is_ok());
        assert!(check_request(&provider(false, true, None)).is_ok());
    }

    #[test]
    fn reason_is_trimmed_and_length_checked() {
        assert!(validate_reason(None).is_err());
        assert!(validate_reason(Some("   short   ")).is_err());
        assert!(validate_reason(Some("123456789")).is_err());
        assert_eq!(validate_reason(Some("  1234567890  ")).unwrap(), "1234567890");
        assert_eq!(
            validate_reason(Some("License number could not be confirmed")).unwrap(),
            "License number could not be confirmed"
        );
    }
}
