use crate::error::AppResult;
use sqlx::PgPool;

// 单行更新失败时的最大尝试次数，超过后跳过该行等待下一轮
const MAX_ROW_ATTEMPTS: u32 = 2;

/// 一致性扫描：六个互不依赖的维护动作，全部幂等，只做单向状态翻转。
/// 由 tasks::spawn_sweeper 的驱动循环按固定顺序调用。
#[derive(Clone)]
pub struct SweeperService {
    pool: PgPool,
}

impl SweeperService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 以推荐记录账本为准重算每个用户的缓存积分。
    /// 某个用户失败只记录日志并跳过，不阻塞整个扫描。
    pub async fn reconcile_user_points(&self) -> AppResult<u64> {
        let user_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut updated = 0u64;
        for user_id in user_ids {
            let mut attempts = 0;
            loop {
                attempts += 1;
                match self.reconcile_single_user(user_id).await {
                    Ok(changed) => {
                        if changed {
                            updated += 1;
                        }
                        break;
                    }
                    Err(e) if attempts < MAX_ROW_ATTEMPTS => {
                        log::warn!("Retrying points reconciliation for user {user_id}: {e:?}");
                    }
                    Err(e) => {
                        log::error!("Skipping points reconciliation for user {user_id}: {e:?}");
                        break;
                    }
                }
            }
        }

        Ok(updated)
    }

    async fn reconcile_single_user(&self, user_id: i64) -> AppResult<bool> {
        // 单条语句完成读与写，只有实际发生变化才计数
        let result = sqlx::query(
            r#"
            UPDATE users
            SET points = COALESCE((
                    SELECT SUM(points_earned - points_used)
                    FROM referral_histories
                    WHERE referrer_id = users.id AND is_expired = FALSE
                ), 0)::BIGINT,
                updated_at = NOW()
            WHERE id = $1
              AND points IS DISTINCT FROM COALESCE((
                    SELECT SUM(points_earned - points_used)
                    FROM referral_histories
                    WHERE referrer_id = users.id AND is_expired = FALSE
                ), 0)::BIGINT
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 过了有效期的推荐记录标记为已过期
    pub async fn expire_referral_histories(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE referral_histories SET is_expired = TRUE WHERE is_expired = FALSE AND valid_to < NOW()",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 任一场次已过结束时间的活动标记为已结束
    pub async fn end_finished_events(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET is_ended = TRUE, updated_at = NOW()
            WHERE is_ended = FALSE
              AND EXISTS (
                  SELECT 1 FROM schedules s
                  WHERE s.event_id = events.id AND s.end_time < NOW()
              )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 余座为零的门票标记为售罄
    pub async fn flag_sold_out_tickets(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE tickets SET is_sold_out = TRUE WHERE is_sold_out = FALSE AND available_seat = 0",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 过期或用满的促销标记为失效
    pub async fn invalidate_promotions(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE promotions
            SET is_invalid = TRUE
            WHERE is_invalid = FALSE AND (valid_to < NOW() OR is_used >= usage_limit)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 所属活动已结束的交易标记为已完成
    pub async fn complete_transactions(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET is_completed = TRUE
            WHERE is_completed = FALSE
              AND EXISTS (
                  SELECT 1 FROM events e
                  WHERE e.id = transactions.event_id AND e.is_ended = TRUE
              )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
