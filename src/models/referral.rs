use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// 每条记录同时是积分来源（points_earned/points_used）和一张代金券（voucher_code）
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReferralHistory {
    pub id: i64,
    pub referrer_id: i64,
    pub referee_id: i64,
    pub referral_code: String,
    pub points_earned: i64,
    pub points_used: i64, // 单调递增，不超过 points_earned
    pub voucher_code: String,
    pub voucher_used: bool,
    pub discount_value: i64, // 百分比
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
}

impl ReferralHistory {
    pub fn points_remaining(&self) -> i64 {
        self.points_earned - self.points_used
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReferralHistoryResponse {
    pub id: i64,
    pub referee_id: i64,
    pub points_earned: i64,
    pub points_used: i64,
    pub points_remaining: i64,
    pub voucher_code: String,
    pub voucher_used: bool,
    pub discount_value: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_expired: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReferralQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<ReferralHistory> for ReferralHistoryResponse {
    fn from(history: ReferralHistory) -> Self {
        let points_remaining = history.points_remaining();
        Self {
            id: history.id,
            referee_id: history.referee_id,
            points_earned: history.points_earned,
            points_used: history.points_used,
            points_remaining,
            voucher_code: history.voucher_code,
            voucher_used: history.voucher_used,
            discount_value: history.discount_value,
            valid_from: history.valid_from,
            valid_to: history.valid_to,
            is_expired: history.is_expired,
        }
    }
}
