use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::instrument;

use super::{
    dashboard::completion_rate,
    repo::{self, BookingDay, DayCount, RevenueItem},
};
use crate::{
    auth::AdminUser,
    dates::parse_instant,
    error::{ApiError, ApiResult},
    state::AppState,
};

const DEFAULT_TREND_DAYS: i64 = 30;
const MAX_TREND_DAYS: i64 = 365;

#[derive(Debug, Serialize)]
pub struct Totals {
    pub users: i64,
    pub providers: i64,
    pub customers: i64,
    pub bookings: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOutcomes {
    pub completed: i64,
    pub cancelled: i64,
    pub completion_rate: i64,
}

#[derive(Debug, Serialize)]
pub struct Revenue {
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsOverview {
    pub totals: Totals,
    pub bookings: BookingOutcomes,
    pub revenue: Revenue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrendsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookingBucket {
    pub total: i64,
    pub completed: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub registrations: BTreeMap<String, i64>,
    pub bookings: BTreeMap<String, BookingBucket>,
}

impl TrendsResponse {
    pub fn from_rows(registrations: Vec<DayCount>, bookings: Vec<BookingDay>) -> Self {
        Self {
            registrations: registrations.into_iter().map(|d| (d.date, d.count)).collect(),
            bookings: bookings
                .into_iter()
                .map(|d| {
                    (
                        d.date,
                        BookingBucket {
                            total: d.total,
                            completed: d.completed,
                            revenue: d.revenue,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RevenueQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub total: f64,
    pub count: usize,
    pub items: Vec<RevenueItem>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/overview", get(overview))
        .route("/analytics/trends", get(trends))
        .route("/analytics/revenue", get(revenue))
}

/// Clamps the requested window to 1..=365 days.
pub fn trend_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_TREND_DAYS).clamp(1, MAX_TREND_DAYS)
}

fn parse_bound(raw: Option<&str>, name: &str) -> ApiResult<Option<OffsetDateTime>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_instant(s)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("Invalid '{name}' date, expected YYYY-MM-DD"))),
    }
}

#[instrument(skip(state, _admin))]
pub async fn overview(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<AnalyticsOverview>> {
    let (users, bookings) =
        tokio::try_join!(repo::user_totals(&state.db), repo::booking_totals(&state.db))?;

    Ok(Json(AnalyticsOverview {
        totals: Totals {
            users: users.users,
            providers: users.providers,
            customers: users.customers,
            bookings: bookings.bookings,
        },
        bookings: BookingOutcomes {
            completed: bookings.completed,
            cancelled: bookings.cancelled,
            completion_rate: completion_rate(bookings.completed, bookings.bookings),
        },
        revenue: Revenue {
            total: bookings.revenue,
        },
    }))
}

#[instrument(skip(state, _admin))]
pub async fn trends(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<TrendsQuery>,
) -> ApiResult<Json<TrendsResponse>> {
    let since = OffsetDateTime::now_utc() - Duration::days(trend_days(q.days));
    let (registrations, bookings) = tokio::try_join!(
        repo::all_registrations_per_day(&state.db, since),
        repo::bookings_per_day(&state.db, since),
    )?;
    Ok(Json(TrendsResponse::from_rows(registrations, bookings)))
}

#[instrument(skip(state, _admin))]
pub async fn revenue(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<RevenueQuery>,
) -> ApiResult<Json<RevenueResponse>> {
    let from = parse_bound(q.from.as_deref(), "from")?.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let to = parse_bound(q.to.as_deref(), "to")?.unwrap_or_else(OffsetDateTime::now_utc);
    if from > to {
        return Err(ApiError::validation("'from' must not be after 'to'"));
    }

    let items = repo::completed_between(&state.db, from, to).await?;
    let total = items.iter().filter_map(|i| i.total_price).sum();
    Ok(Json(RevenueResponse {
        total,
        count: items.len(),
        items,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_window_defaults_and_clamps() {
        assert_eq!(trend_days(None), 30);
        assert_eq!(trend_days(Some(7)), 7);
        assert_eq!(trend_days(Some(0)), 1);
        assert_eq!(trend_days(Some(-5)), 1);
        assert_eq!(trend_days(Some(10_000)), 365);
    }

    #[test]
    fn bounds_parse_or_reject() {
        assert_eq!(parse_bound(None, "from").unwrap(), None);
        assert_eq!(parse_bound(Some("  "), "from").unwrap(), None);
        assert!(parse_bound(Some("2024-02-01"), "from").unwrap().is_some());
        let err = parse_bound(Some("yesterday"), "to").unwrap_err();
        assert_eq!(err.to_string(), "Invalid 'to' date, expected YYYY-MM-DD");
    }

    #[test]
    fn trends_are_keyed_by_day() {
        let res = TrendsResponse::from_rows(
            vec![
                DayCount {
                    date: "2024-05-02".into(),
                    count: 1,
                },
                DayCount {
                    date: "2024-05-01".into(),
                    count: 3,
                },
            ],
            vec![BookingDay {
                date: "2024-05-01".into(),
                total: 4,
                completed: 2,
                revenue: 150.0,
            }],
        );
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["registrations"]["2024-05-01"], 3);
        assert_eq!(json["bookings"]["2024-05-01"]["completed"], 2);
        assert_eq!(json["bookings"]["2024-05-01"]["revenue"], 150.0);
        assert_eq!(res.registrations.keys().next().map(String::as_str), Some("2024-05-01"));
    }
}
