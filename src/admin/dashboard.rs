use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{self, DayCount};
use crate::{
    audit::{self, AuditAction, AuditAdmin, AuditEntry, AuditLogView, TargetType},
    auth::AdminUser,
    error::ApiResult,
    state::AppState,
};

const RECENT_ACTIVITY_LIMIT: i64 = 20;
const COMPLETION_WINDOW_DAYS: i64 = 30;
const REGISTRATION_WINDOW_DAYS: i64 = 7;

/// Rounded percentage of closed bookings that completed; 0 when none closed.
pub fn completion_rate(completed: i64, closed: i64) -> i64 {
    if closed <= 0 {
        return 0;
    }
    (completed as f64 / closed as f64 * 100.0).round() as i64
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedBookings {
    pub count: i64,
    pub completion_rate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_users: i64,
    pub total_providers: i64,
    pub active_bookings: i64,
    pub completed_bookings: CompletedBookings,
    pub pending_verifications: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub admin: Option<AuditAdmin>,
}

impl From<AuditLogView> for Activity {
    fn from(v: AuditLogView) -> Self {
        Self {
            id: v.id,
            action: v.action,
            target_type: v.target_type,
            target_id: v.target_id,
            details: v.details,
            timestamp: v.created_at,
            admin: v.admin,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub user_registrations: Vec<DayCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: Overview,
    pub recent_activities: Vec<Activity>,
    pub trends: Trends,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(dashboard_stats))
}

#[instrument(skip(state, admin))]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    admin: AdminUser,
) -> ApiResult<Json<DashboardStats>> {
    let now = OffsetDateTime::now_utc();
    let window_start = now - Duration::days(COMPLETION_WINDOW_DAYS);
    let registrations_since = now - Duration::days(REGISTRATION_WINDOW_DAYS);
    let db = &state.db;

    let (
        total_users,
        total_providers,
        active_bookings,
        completed,
        pending_verifications,
        recent,
        closed,
        registrations,
    ) = tokio::try_join!(
        repo::count_active_members(db),
        repo::count_verified_providers(db),
        repo::count_active_bookings(db),
        repo::count_completed_since(db, window_start),
        repo::count_pending_verifications(db),
        audit::recent(db, RECENT_ACTIVITY_LIMIT),
        repo::count_closed_since(db, window_start),
        repo::registrations_per_day(db, registrations_since),
    )?;

    audit::record(
        db,
        AuditEntry::new(AuditAction::DashboardAccess, TargetType::Dashboard)
            .by(admin.admin_id)
            .details(json!({
                "stats": {
                    "users": total_users,
                    "providers": total_providers,
                    "activeBookings": active_bookings,
                    "pendingVerifications": pending_verifications,
                }
            })),
    );
    info!(admin_id = %admin.admin_id, "dashboard stats served");

    Ok(Json(DashboardStats {
        overview: Overview {
            total_users,
            total_providers,
            active_bookings,
            completed_bookings: CompletedBookings {
                count: completed,
                completion_rate: format!("{}%", completion_rate(completed, closed)),
            },
            pending_verifications,
        },
        recent_activities: recent.into_iter().map(Activity::from).collect(),
        trends: Trends {
            user_registrations: registrations,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(5, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(1, 200), 1);
        assert_eq!(completion_rate(10, 10), 100);
    }

    #[test]
    fn stats_shape() {
        let stats = DashboardStats {
            overview: Overview {
                total_users: 12,
                total_providers: 4,
                active_bookings: 3,
                completed_bookings: CompletedBookings {
                    count: 2,
                    completion_rate: format!("{}%", completion_rate(2, 3)),
                },
                pending_verifications: 1,
            },
            recent_activities: vec![],
            trends: Trends {
                user_registrations: vec![DayCount {
                    date: "2024-05-01".into(),
                    count: 2,
                }],
            },
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["overview"]["totalUsers"], 12);
        assert_eq!(json["overview"]["completedBookings"]["completionRate"], "67%");
        assert_eq!(json["trends"]["userRegistrations"][0]["date"], "2024-05-01");
    }
}
