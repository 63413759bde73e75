//! Append-only record of admin actions.
//!
//! Writes are best effort: a failed insert is logged and dropped, never
//! retried and never surfaced to the client that triggered it.

mod repo;

use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

pub use repo::{count, list, recent, AuditAdmin, AuditLogView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    LoginAttempt,
    LoginSuccess,
    Logout,
    DashboardAccess,
    UserUpdated,
    UserStatusChanged,
    UserDeleted,
    ProviderVerified,
    ProviderVerificationRejected,
    ServiceCreated,
    ServiceUpdated,
    ServiceDeleted,
    CategoryRenamed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginAttempt => "LOGIN_ATTEMPT",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::Logout => "LOGOUT",
            Self::DashboardAccess => "DASHBOARD_ACCESS",
            Self::UserUpdated => "USER_UPDATED",
            Self::UserStatusChanged => "USER_STATUS_CHANGED",
            Self::UserDeleted => "USER_DELETED",
            Self::ProviderVerified => "PROVIDER_VERIFIED",
            Self::ProviderVerificationRejected => "PROVIDER_VERIFICATION_REJECTED",
            Self::ServiceCreated => "SERVICE_CREATED",
            Self::ServiceUpdated => "SERVICE_UPDATED",
            Self::ServiceDeleted => "SERVICE_DELETED",
            Self::CategoryRenamed => "CATEGORY_RENAMED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Auth,
    Dashboard,
    User,
    Provider,
    Service,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Dashboard => "DASHBOARD",
            Self::User => "USER",
            Self::Provider => "PROVIDER",
            Self::Service => "SERVICE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub admin_id: Option<Uuid>,
    pub action: AuditAction,
    pub target_type: TargetType,
    pub target_id: Option<Uuid>,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(action: AuditAction, target_type: TargetType) -> Self {
        Self {
            admin_id: None,
            action,
            target_type,
            target_id: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn by(mut self, admin_id: Uuid) -> Self {
        self.admin_id = Some(admin_id);
        self
    }

    pub fn target(mut self, id: Uuid) -> Self {
        self.target_id = Some(id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Inserts the entry and waits for it; errors are logged and swallowed.
pub async fn write(db: &PgPool, entry: AuditEntry) {
    match repo::insert(db, &entry).await {
        Ok(()) => debug!(action = entry.action.as_str(), "audit log written"),
        Err(e) => error!(
            error = %e,
            action = entry.action.as_str(),
            target_type = entry.target_type.as_str(),
            "audit log write failed"
        ),
    }
}

/// Fire-and-forget variant: the response does not wait for the insert.
pub fn record(db: &PgPool, entry: AuditEntry) -> JoinHandle<()> {
    let db = db.clone();
    tokio::spawn(async move { write(&db, entry).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use serde_json::json;

    #[test]
    fn action_names_match_serde() {
        for action in [
            AuditAction::LoginAttempt,
            AuditAction::ProviderVerificationRejected,
            AuditAction::CategoryRenamed,
        ] {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, action.as_str());
        }
        assert_eq!(serde_json::to_value(TargetType::Provider).unwrap(), "PROVIDER");
    }

    #[test]
    fn builder_sets_fields() {
        let admin = Uuid::new_v4();
        let target = Uuid::new_v4();
        let entry = AuditEntry::new(AuditAction::ServiceDeleted, TargetType::Service)
            .by(admin)
            .target(target)
            .details(json!({ "name": "Plumbing" }));
        assert_eq!(entry.admin_id, Some(admin));
        assert_eq!(entry.target_id, Some(target));
        assert_eq!(entry.details["name"], "Plumbing");
    }

    #[tokio::test]
    async fn record_swallows_database_failures() {
        let state = AppState::fake();
        let handle = record(
            &state.db,
            AuditEntry::new(AuditAction::Logout, TargetType::Auth),
        );
        // The task completes without panicking even though the insert fails.
        handle.await.expect("audit task should not panic");
    }
}
