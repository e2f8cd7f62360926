use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Event {
    pub id: i64,
    pub organizer_id: i64,
    pub event_name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub event_type_id: Option<i64>,
    pub is_ended: bool, // 单向标志，由定时任务根据场次结束时间翻转
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Schedule {
    pub id: i64,
    pub event_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Location {
    pub id: i64,
    pub event_id: i64,
    pub country: String,
    pub city: String,
    pub address: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub ticket_name: String,
    pub price: i64, // 最小货币单位
    pub available_seat: i64,
    pub is_sold_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Promotion {
    pub id: i64,
    pub event_id: i64,
    pub discount: i64, // 固定减免金额
    pub usage_limit: i64,
    pub is_used: i64, // 已使用次数
    pub valid_to: DateTime<Utc>,
    pub is_invalid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: i64,
    pub event_id: i64,
    pub attendee_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub review_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduleInput {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationInput {
    pub country: String,
    pub city: String,
    pub address: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Rust Meetup Jakarta")]
    pub event_name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub event_type_id: Option<i64>,
    pub schedules: Vec<ScheduleInput>,
    pub locations: Vec<LocationInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub event_name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub event_type_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddTicketRequest {
    #[schema(example = "Early Bird")]
    pub ticket_name: String,
    pub price: i64,
    pub available_seat: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddPromotionRequest {
    pub discount: i64,
    pub usage_limit: i64,
    pub valid_to: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GiveReviewRequest {
    pub rating: Option<i32>, // 必填，缺失时返回校验错误
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventListQuery {
    pub category_id: Option<i64>,
    pub event_type_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrowseEventQuery {
    pub q: Option<String>,
}

/// 活动详情：参加者视角只包含未售罄门票与仍有效的促销
#[derive(Debug, Serialize, ToSchema)]
pub struct EventDetailResponse {
    pub event: Event,
    pub organizer_name: String,
    pub schedules: Vec<Schedule>,
    pub locations: Vec<Location>,
    pub tickets: Vec<Ticket>,
    pub promotions: Vec<Promotion>,
    pub reviews: Vec<Review>,
}
