use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, db::UserType, error::ApiError, state::AppState};

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub admin_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

fn minutes(m: i64) -> Duration {
    Duration::from_secs(m.max(0) as u64 * 60)
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: minutes(cfg.ttl_minutes),
            admin_ttl: minutes(cfg.admin_ttl_minutes),
            refresh_ttl: minutes(cfg.refresh_ttl_minutes),
        }
    }

    fn sign(
        &self,
        user_id: Uuid,
        role: UserType,
        kind: TokenKind,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            role,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, role = role.as_str(), "jwt signed");
        Ok(token)
    }

    /// Session token for customers and providers.
    pub fn sign_access(&self, user_id: Uuid, role: UserType) -> anyhow::Result<String> {
        self.sign(user_id, role, TokenKind::Access, self.access_ttl)
    }

    /// Short lived admin console token.
    pub fn sign_admin_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign(user_id, UserType::Admin, TokenKind::Access, self.admin_ttl)
    }

    pub fn sign_refresh(&self, user_id: Uuid, role: UserType) -> anyhow::Result<String> {
        self.sign(user_id, role, TokenKind::Refresh, self.refresh_ttl)
    }

    /// Seconds until an admin access token expires, as reported to clients.
    pub fn admin_expires_in(&self) -> u64 {
        self.admin_ttl.as_secs()
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(ApiError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60 * 24 * 7,
            admin_ttl_minutes: 480,
            refresh_ttl_minutes: 60 * 24 * 7,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id, UserType::Customer).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.role, UserType::Customer);
    }

    #[test]
    fn admin_token_lives_eight_hours() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_admin_access(Uuid::new_v4()).expect("sign admin");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.role, UserType::Admin);
        assert_eq!(claims.exp - claims.iat, 8 * 60 * 60);
        assert_eq!(keys.admin_expires_in(), 28_800);
    }

    #[test]
    fn refresh_token_lives_seven_days() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id, UserType::Admin).expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_admin_access(Uuid::new_v4()).expect("sign access");
        assert!(matches!(keys.verify_refresh(&token), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys
            .sign_access(Uuid::new_v4(), UserType::Provider)
            .expect("sign access");
        assert!(matches!(bad_keys.verify(&token), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.verify("invalid.token.here"), Err(ApiError::InvalidToken)));
    }
}
