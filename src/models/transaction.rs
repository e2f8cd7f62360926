use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// 一次报名的不可变记录，三种优惠各占独立的可空字段
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i64,
    pub attendee_id: i64,
    pub event_id: i64,
    pub ticket_id: i64,
    pub quantity: i64,
    pub promotion_discount: Option<i64>,
    pub voucher_discount: Option<i64>,
    pub points_redeemed: Option<i64>,
    pub total_price: i64,
    pub transaction_date: DateTime<Utc>,
    pub is_completed: bool, // 所属活动结束后由定时任务翻转
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterEventRequest {
    pub ticket_id: i64,
    #[schema(example = 2)]
    pub quantity: i64,
    pub promotion_id: Option<i64>,
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub use_points: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// asc 或 desc，按交易时间排序
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i64,
    pub event_id: i64,
    pub ticket_id: i64,
    pub quantity: i64,
    pub promotion_discount: Option<i64>,
    pub voucher_discount: Option<i64>,
    pub points_redeemed: Option<i64>,
    pub total_price: i64,
    pub transaction_date: DateTime<Utc>,
    pub is_completed: bool,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            event_id: tx.event_id,
            ticket_id: tx.ticket_id,
            quantity: tx.quantity,
            promotion_discount: tx.promotion_discount,
            voucher_discount: tx.voucher_discount,
            points_redeemed: tx.points_redeemed,
            total_price: tx.total_price,
            transaction_date: tx.transaction_date,
            is_completed: tx.is_completed,
        }
    }
}
