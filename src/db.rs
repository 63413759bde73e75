//! Row types shared by the feature modules.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Customer,
    Provider,
    Admin,
}

impl UserType {
    /// Case-insensitive parse of `customer`, `PROVIDER`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Some(Self::Customer),
            "PROVIDER" => Some(Self::Provider),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Provider => "PROVIDER",
            Self::Admin => "ADMIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Prefixes every column of a column list with a table alias.
pub fn qualified(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `ILIKE` pattern matching `term` anywhere, with `\`, `%` and `_` taken
/// literally. Pair it with `ESCAPE '\'`.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, phone, user_type, is_active, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub const PROVIDER_COLUMNS: &str = "id, user_id, experience, location, hourly_rate, bio, rating, reviews, \
     verified, verification_requested, verification_requested_at, verification_rejected_reason, \
     verified_at, verified_by, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub experience: String,
    pub location: String,
    pub hourly_rate: Option<f64>,
    pub bio: Option<String>,
    pub rating: f64,
    pub reviews: i32,
    pub verified: bool,
    pub verification_requested: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verification_requested_at: Option<OffsetDateTime>,
    pub verification_rejected_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    pub verified_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub const SERVICE_COLUMNS: &str =
    "id, name, description, category, average_price, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub average_price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub const BOOKING_COLUMNS: &str = "id, customer_id, provider_id, service_id, status, scheduled_date, \
     scheduled_time, notes, total_price, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub status: BookingStatus,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub scheduled_date: OffsetDateTime,
    #[serde(rename = "time")]
    pub scheduled_time: Option<String>,
    pub notes: Option<String>,
    pub total_price: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_prefixes_columns() {
        assert_eq!(qualified("id, name,category", "s"), "s.id, s.name, s.category");
        assert!(qualified(PROVIDER_COLUMNS, "p").starts_with("p.id, p.user_id, p.experience"));
    }

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(contains_pattern("plumb"), "%plumb%");
        assert_eq!(contains_pattern("%"), r"%\%%");
        assert_eq!(contains_pattern("a_b"), r"%a\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }

    #[test]
    fn user_type_parse_is_case_insensitive() {
        assert_eq!(UserType::parse("customer"), Some(UserType::Customer));
        assert_eq!(UserType::parse(" Provider "), Some(UserType::Provider));
        assert_eq!(UserType::parse("ADMIN"), Some(UserType::Admin));
        assert_eq!(UserType::parse("guest"), None);
    }

    #[test]
    fn booking_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&BookingStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(BookingStatus::parse("in_progress"), Some(BookingStatus::InProgress));
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Sarah".into(),
            last_name: "Johnson".into(),
            email: "sarah@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone: None,
            user_type: UserType::Provider,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userType"], "PROVIDER");
        assert_eq!(json["firstName"], "Sarah");
        assert!(json.get("passwordHash").is_none());
    }
}
