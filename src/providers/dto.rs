use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Booking, Provider, Service};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Directory entry: provider fields plus owner summary and offered services.
#[derive(Debug, Serialize)]
pub struct ProviderView {
    #[serde(flatten)]
    pub provider: Provider,
    pub user: UserSummary,
    pub services: Vec<Service>,
}

#[derive(Debug, Serialize)]
pub struct ProviderDetail {
    #[serde(flatten)]
    pub provider: Provider,
    pub user: UserSummary,
    pub services: Vec<Service>,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProviderRequest {
    pub experience: String,
    pub location: String,
    pub hourly_rate: Option<f64>,
    pub bio: Option<String>,
    pub service_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProviderRequest {
    pub experience: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderMessage {
    pub message: &'static str,
    pub provider: Provider,
}
