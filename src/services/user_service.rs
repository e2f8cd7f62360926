use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::PgPool;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 用户资料带积分账本汇总。缓存余额与账本实算之间允许短暂偏差，
    /// 对账任务会定期覆盖缓存值。
    pub async fn get_user_profile(&self, user_id: i64) -> AppResult<(UserResponse, PointsSummary)> {
        let user = self.get_user_by_id(user_id).await?;

        let ledger_points: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(points_earned - points_used), 0)::BIGINT
            FROM referral_histories
            WHERE referrer_id = $1 AND is_expired = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let active_referrals: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM referral_histories WHERE referrer_id = $1 AND is_expired = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let summary = PointsSummary {
            cached_points: user.points,
            ledger_points,
            active_referrals,
        };

        Ok((UserResponse::from(user), summary))
    }

    pub async fn update_user_profile(
        &self,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        // 确认用户存在
        self.get_user_by_id(user_id).await?;

        if let Some(username) = &request.username {
            if username.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Username must not be empty".to_string(),
                ));
            }

            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
            )
            .bind(username)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            if taken {
                return Err(AppError::ValidationError(
                    "User with this username already exists".to_string(),
                ));
            }
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($1, username), updated_at = NOW()
            WHERE id = $2
            RETURNING id, email, username, password_hash, role, points, referral_code,
                      referrer_id, is_verified, registration_date, updated_at
            "#,
        )
        .bind(request.username)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserResponse::from(user))
    }

    pub async fn delete_user(&self, user_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Delete account failed, user doesn't exist".to_string(),
            ));
        }

        Ok(())
    }

    /// 当前用户作为推荐人的全部推荐记录
    pub async fn get_referrals(
        &self,
        user_id: i64,
        query: &ReferralQuery,
    ) -> AppResult<PaginatedResponse<ReferralHistoryResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset();
        let limit = params.get_limit();

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM referral_histories WHERE referrer_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let histories = sqlx::query_as::<_, ReferralHistory>(
            r#"
            SELECT id, referrer_id, referee_id, referral_code, points_earned, points_used,
                   voucher_code, voucher_used, discount_value, valid_from, valid_to,
                   is_expired, created_at
            FROM referral_histories
            WHERE referrer_id = $1
            ORDER BY valid_to ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<ReferralHistoryResponse> = histories
            .into_iter()
            .map(ReferralHistoryResponse::from)
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(20),
            total,
        ))
    }

    async fn get_user_by_id(&self, user_id: i64) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, role, points, referral_code,
                   referrer_id, is_verified, registration_date, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
