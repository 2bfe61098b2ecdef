use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gating::Tier;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub tier: Tier,
    pub is_admin: bool,
}

impl From<super::repo::User> for PublicUser {
    fn from(u: super::repo::User) -> Self {
        Self {
            tier: u.tier(),
            id: u.id,
            email: u.email,
            is_admin: u.is_admin,
        }
    }
}
