use serde::{Deserialize, Serialize};

use crate::db::{Booking, Customer, Provider, Service, User};

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub user_type: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub bio: Option<String>,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerProfile {
    #[serde(flatten)]
    pub customer: Customer,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize)]
pub struct ProviderProfile {
    #[serde(flatten)]
    pub provider: Provider,
    pub services: Vec<Service>,
    pub bookings: Vec<Booking>,
}

/// Current user with whichever side (customer or provider) applies.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub customer: Option<CustomerProfile>,
    pub provider: Option<ProviderProfile>,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdatedResponse {
    pub message: &'static str,
    pub user: ProfileResponse,
}
