use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    #[serde(rename = "attendee")]
    Attendee,
    #[serde(rename = "organizer")]
    Organizer,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Attendee => write!(f, "attendee"),
            UserRole::Organizer => write!(f, "organizer"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub points: i64, // 缓存的可用积分，由积分对账任务维护
    pub referral_code: String,
    pub referrer_id: Option<i64>,
    pub is_verified: bool,
    pub registration_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "Password123")]
    pub password: String,
    #[schema(example = "organizer")]
    pub role: Option<UserRole>,
    /// 推荐人的推荐码，可选
    #[schema(example = "1A2B3C4D5E")]
    pub referral: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
    #[schema(example = "alice")]
    pub username: Option<String>,
    #[schema(example = "Password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "alice2")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub points: i64,
    pub referral_code: String,
    pub is_verified: bool,
    pub registration_date: DateTime<Utc>,
}

/// 积分账本汇总：缓存余额与按记录实算余额可能短暂不一致
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointsSummary {
    pub cached_points: i64,
    pub ledger_points: i64,
    pub active_referrals: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
            points: user.points,
            referral_code: user.referral_code,
            is_verified: user.is_verified,
            registration_date: user.registration_date,
        }
    }
}
