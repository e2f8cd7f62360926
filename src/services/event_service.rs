use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::PgPool;

const EVENT_COLUMNS: &str = r#"
    id, organizer_id, event_name, description, category_id, event_type_id,
    is_ended, created_at, updated_at
"#;

#[derive(Clone)]
pub struct EventService {
    pool: PgPool,
}

impl EventService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建活动及其场次与地点，一个事务内完成
    pub async fn create_event(
        &self,
        organizer_id: i64,
        request: CreateEventRequest,
    ) -> AppResult<Event> {
        self.require_organizer(organizer_id).await?;

        if request.event_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Event name is required".to_string(),
            ));
        }
        for schedule in &request.schedules {
            if schedule.end_time <= schedule.start_time {
                return Err(AppError::ValidationError(
                    "Schedule end time must be after start time".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (organizer_id, event_name, description, category_id, event_type_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(organizer_id)
        .bind(&request.event_name)
        .bind(&request.description)
        .bind(request.category_id)
        .bind(request.event_type_id)
        .fetch_one(&mut *tx)
        .await?;

        for schedule in &request.schedules {
            sqlx::query("INSERT INTO schedules (event_id, start_time, end_time) VALUES ($1, $2, $3)")
                .bind(event.id)
                .bind(schedule.start_time)
                .bind(schedule.end_time)
                .execute(&mut *tx)
                .await?;
        }

        for location in &request.locations {
            sqlx::query(
                "INSERT INTO locations (event_id, country, city, address, postal_code) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(event.id)
            .bind(&location.country)
            .bind(&location.city)
            .bind(&location.address)
            .bind(&location.postal_code)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(event)
    }

    pub async fn update_event(
        &self,
        organizer_id: i64,
        event_id: i64,
        request: UpdateEventRequest,
    ) -> AppResult<Event> {
        self.require_ownership(organizer_id, event_id).await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET event_name = COALESCE($1, event_name),
                description = COALESCE($2, description),
                category_id = COALESCE($3, category_id),
                event_type_id = COALESCE($4, event_type_id),
                updated_at = NOW()
            WHERE id = $5
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.event_name)
        .bind(request.description)
        .bind(request.category_id)
        .bind(request.event_type_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    pub async fn delete_event(&self, organizer_id: i64, event_id: i64) -> AppResult<()> {
        self.require_ownership(organizer_id, event_id).await?;

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn add_ticket(
        &self,
        organizer_id: i64,
        event_id: i64,
        request: AddTicketRequest,
    ) -> AppResult<Ticket> {
        self.require_ownership(organizer_id, event_id).await?;

        if request.price < 0 {
            return Err(AppError::ValidationError(
                "Ticket price must not be negative".to_string(),
            ));
        }
        if request.available_seat <= 0 {
            return Err(AppError::ValidationError(
                "Ticket must have at least one seat".to_string(),
            ));
        }

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (event_id, ticket_name, price, available_seat)
            VALUES ($1, $2, $3, $4)
            RETURNING id, event_id, ticket_name, price, available_seat, is_sold_out
            "#,
        )
        .bind(event_id)
        .bind(&request.ticket_name)
        .bind(request.price)
        .bind(request.available_seat)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    pub async fn add_promotion(
        &self,
        organizer_id: i64,
        event_id: i64,
        request: AddPromotionRequest,
    ) -> AppResult<Promotion> {
        self.require_ownership(organizer_id, event_id).await?;

        if request.discount < 0 {
            return Err(AppError::ValidationError(
                "Promotion discount must not be negative".to_string(),
            ));
        }
        if request.usage_limit <= 0 {
            return Err(AppError::ValidationError(
                "Promotion usage limit must be positive".to_string(),
            ));
        }

        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            INSERT INTO promotions (event_id, discount, usage_limit, valid_to)
            VALUES ($1, $2, $3, $4)
            RETURNING id, event_id, discount, usage_limit, is_used, valid_to, is_invalid
            "#,
        )
        .bind(event_id)
        .bind(request.discount)
        .bind(request.usage_limit)
        .bind(request.valid_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(promotion)
    }

    /// 进行中的活动列表，可按分类与类型过滤
    pub async fn get_events_list(&self, query: &EventListQuery) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE is_ended = FALSE
              AND ($1::BIGINT IS NULL OR category_id = $1)
              AND ($2::BIGINT IS NULL OR event_type_id = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(query.category_id)
        .bind(query.event_type_id)
        .fetch_all(&self.pool)
        .await?;

        if events.is_empty() {
            return Err(AppError::NotFound("No events found".to_string()));
        }

        Ok(events)
    }

    /// 按名称子串搜索进行中的活动
    pub async fn browse_events(&self, search_query: &str) -> AppResult<Vec<Event>> {
        if search_query.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Search query is required".to_string(),
            ));
        }

        let pattern = format!("%{}%", search_query);
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE is_ended = FALSE AND event_name ILIKE $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        if events.is_empty() {
            return Err(AppError::NotFound("No events found".to_string()));
        }

        Ok(events)
    }

    /// 参加者视角的活动详情：只带未售罄门票与仍有效的促销
    pub async fn view_event(&self, event_id: i64) -> AppResult<EventDetailResponse> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND is_ended = FALSE"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let organizer_name: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
            .bind(event.organizer_id)
            .fetch_one(&self.pool)
            .await?;

        let schedules = sqlx::query_as::<_, Schedule>(
            "SELECT id, event_id, start_time, end_time FROM schedules WHERE event_id = $1 ORDER BY start_time",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, event_id, country, city, address, postal_code FROM locations WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, event_id, ticket_name, price, available_seat, is_sold_out
            FROM tickets
            WHERE event_id = $1 AND is_sold_out = FALSE
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let promotions = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT id, event_id, discount, usage_limit, is_used, valid_to, is_invalid
            FROM promotions
            WHERE event_id = $1 AND is_invalid = FALSE
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, event_id, attendee_id, rating, comment, review_date
            FROM reviews
            WHERE event_id = $1
            ORDER BY review_date DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(EventDetailResponse {
            event,
            organizer_name,
            schedules,
            locations,
            tickets,
            promotions,
            reviews,
        })
    }

    pub async fn give_review(
        &self,
        attendee_id: i64,
        event_id: i64,
        request: GiveReviewRequest,
    ) -> AppResult<Review> {
        // 评分必填
        let rating = request
            .rating
            .ok_or_else(|| AppError::ValidationError("Rating is required".to_string()))?;

        if !(1..=5).contains(&rating) {
            return Err(AppError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (event_id, attendee_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, event_id, attendee_id, rating, comment, review_date
            "#,
        )
        .bind(event_id)
        .bind(attendee_id)
        .bind(rating)
        .bind(&request.comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn require_organizer(&self, user_id: i64) -> AppResult<()> {
        let role: Option<UserRole> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match role {
            Some(UserRole::Organizer) => Ok(()),
            Some(_) => Err(AppError::Forbidden),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }

    /// 只有活动属主可以修改活动及其票种与促销
    async fn require_ownership(&self, organizer_id: i64, event_id: i64) -> AppResult<()> {
        let owner: Option<i64> = sqlx::query_scalar("SELECT organizer_id FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        match owner {
            Some(id) if id == organizer_id => Ok(()),
            Some(_) => Err(AppError::Forbidden),
            None => Err(AppError::NotFound("Event not found".to_string())),
        }
    }
}
