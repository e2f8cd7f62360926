use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::PgPool;

/// 单条积分消耗计划：从哪条推荐记录扣多少
#[derive(Debug, PartialEq)]
pub struct PointsDraw {
    pub history_id: i64,
    pub amount: i64,
}

/// 固定减免，超出部分限幅为零；返回 (新价格, 实际减免)
fn apply_flat_discount(price: i64, discount: i64) -> (i64, i64) {
    let applied = discount.min(price);
    (price - applied, applied)
}

/// 百分比减免金额（整数运算，向下取整）
fn percentage_discount(price: i64, percent: i64) -> i64 {
    price * percent / 100
}

fn ticket_available(ticket: &Ticket, event_id: i64, quantity: i64) -> bool {
    ticket.event_id == event_id && !ticket.is_sold_out && ticket.available_seat >= quantity
}

fn promotion_usable(promotion: &Promotion, event_id: i64) -> bool {
    promotion.event_id == event_id
        && !promotion.is_invalid
        && promotion.is_used < promotion.usage_limit
}

fn voucher_usable(voucher: &ReferralHistory) -> bool {
    !voucher.is_expired && !voucher.voucher_used
}

/// 按 valid_to 升序（先过期先用）规划积分抵扣。
/// 每条记录最多抵扣其剩余积分，总额不超过当前价格。
fn plan_points_redemption(histories: &[ReferralHistory], price: i64) -> (Vec<PointsDraw>, i64) {
    let mut remaining_price = price;
    let mut draws = Vec::new();

    for history in histories {
        if remaining_price <= 0 {
            break;
        }

        let available = history.points_remaining();
        if available <= 0 {
            continue;
        }

        let amount = available.min(remaining_price);
        remaining_price -= amount;
        draws.push(PointsDraw {
            history_id: history.id,
            amount,
        });
    }

    let total = price - remaining_price;
    (draws, total)
}

#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
}

impl RegistrationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 报名一个活动：校验 -> 计价（促销 -> 代金券 -> 积分，顺序固定）-> 落库。
    /// 整个读改写序列跑在一个数据库事务里，所有计数器更新都带条件，
    /// 并发竞争者拿不到行时返回 Conflict 而不是超卖或重复抵扣。
    pub async fn register_for_event(
        &self,
        event_id: i64,
        attendee_id: i64,
        request: RegisterEventRequest,
    ) -> AppResult<Transaction> {
        if request.quantity <= 0 {
            return Err(AppError::ValidationError(
                "Quantity must be a positive integer".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // 活动必须存在且未结束
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, organizer_id, event_name, description, category_id, event_type_id,
                   is_ended, created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if event.is_ended {
            return Err(AppError::EventEnded("Event has already ended".to_string()));
        }

        // 门票必须属于该活动、未售罄且余座足够
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, event_id, ticket_name, price, available_seat, is_sold_out
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(request.ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        let ticket = match ticket {
            Some(t) if ticket_available(&t, event.id, request.quantity) => t,
            _ => {
                return Err(AppError::TicketUnavailable(
                    "Ticket is not available or sold out".to_string(),
                ));
            }
        };

        // 促销（可选）：未失效且未达使用上限
        let promotion = if let Some(promotion_id) = request.promotion_id {
            let promotion = sqlx::query_as::<_, Promotion>(
                r#"
                SELECT id, event_id, discount, usage_limit, is_used, valid_to, is_invalid
                FROM promotions
                WHERE id = $1
                "#,
            )
            .bind(promotion_id)
            .fetch_optional(&mut *tx)
            .await?;

            match promotion {
                Some(p) if promotion_usable(&p, event.id) => Some(p),
                _ => {
                    return Err(AppError::PromotionInvalid(
                        "Promotion is not valid or has reached its limit".to_string(),
                    ));
                }
            }
        } else {
            None
        };

        // 代金券（可选）：未过期且未被消费
        let voucher = if let Some(voucher_code) = &request.voucher_code {
            let voucher = sqlx::query_as::<_, ReferralHistory>(
                r#"
                SELECT id, referrer_id, referee_id, referral_code, points_earned, points_used,
                       voucher_code, voucher_used, discount_value, valid_from, valid_to,
                       is_expired, created_at
                FROM referral_histories
                WHERE voucher_code = $1
                "#,
            )
            .bind(voucher_code)
            .fetch_optional(&mut *tx)
            .await?;

            match voucher {
                Some(v) if voucher_usable(&v) => Some(v),
                _ => {
                    return Err(AppError::VoucherInvalid(
                        "Voucher is not valid or has been used".to_string(),
                    ));
                }
            }
        } else {
            None
        };

        // 计价：促销 -> 代金券 -> 积分，每一步都不把价格打到负数
        let mut total_price = ticket.price * request.quantity;

        let promotion_discount = promotion.as_ref().map(|p| {
            let (new_price, applied) = apply_flat_discount(total_price, p.discount);
            total_price = new_price;
            applied
        });

        let voucher_discount = voucher.as_ref().map(|v| {
            let discount = percentage_discount(total_price, v.discount_value);
            total_price -= discount;
            discount
        });

        let (draws, points_redeemed) = if request.use_points {
            // 先过期先用：按 valid_to 升序取可用积分记录
            let histories = sqlx::query_as::<_, ReferralHistory>(
                r#"
                SELECT id, referrer_id, referee_id, referral_code, points_earned, points_used,
                       voucher_code, voucher_used, discount_value, valid_from, valid_to,
                       is_expired, created_at
                FROM referral_histories
                WHERE referrer_id = $1 AND is_expired = FALSE AND points_used < points_earned
                ORDER BY valid_to ASC
                "#,
            )
            .bind(attendee_id)
            .fetch_all(&mut *tx)
            .await?;

            let (draws, total) = plan_points_redemption(&histories, total_price);
            total_price -= total;
            (draws, Some(total))
        } else {
            (Vec::new(), None)
        };

        // 占座：余座不足时说明有并发报名抢先
        let result = sqlx::query(
            "UPDATE tickets SET available_seat = available_seat - $1 WHERE id = $2 AND available_seat >= $1",
        )
        .bind(request.quantity)
        .bind(ticket.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Ticket seats were taken by a concurrent registration".to_string(),
            ));
        }

        // 促销用量 +1，带上限守卫
        if let Some(p) = &promotion {
            let result = sqlx::query(
                "UPDATE promotions SET is_used = is_used + 1 WHERE id = $1 AND is_invalid = FALSE AND is_used < usage_limit",
            )
            .bind(p.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Conflict(
                    "Promotion limit was reached by a concurrent registration".to_string(),
                ));
            }
        }

        // 代金券一次性消费
        if let Some(v) = &voucher {
            let result = sqlx::query(
                "UPDATE referral_histories SET voucher_used = TRUE WHERE id = $1 AND voucher_used = FALSE AND is_expired = FALSE",
            )
            .bind(v.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Conflict(
                    "Voucher was consumed by a concurrent registration".to_string(),
                ));
            }
        }

        // 按计划扣减各条推荐记录的积分，守卫 points_used 不超过 points_earned
        for draw in &draws {
            let result = sqlx::query(
                r#"
                UPDATE referral_histories
                SET points_used = points_used + $1
                WHERE id = $2 AND is_expired = FALSE AND points_used + $1 <= points_earned
                "#,
            )
            .bind(draw.amount)
            .bind(draw.history_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Conflict(
                    "Referral points were redeemed by a concurrent registration".to_string(),
                ));
            }
        }

        // 扣减缓存余额；对账任务会以账本为准重算
        if let Some(total) = points_redeemed
            && total > 0
        {
            sqlx::query(
                "UPDATE users SET points = GREATEST(points - $1, 0), updated_at = NOW() WHERE id = $2",
            )
            .bind(total)
            .bind(attendee_id)
            .execute(&mut *tx)
            .await?;
        }

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                attendee_id, event_id, ticket_id, quantity,
                promotion_discount, voucher_discount, points_redeemed, total_price
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, attendee_id, event_id, ticket_id, quantity,
                      promotion_discount, voucher_discount, points_redeemed,
                      total_price, transaction_date, is_completed
            "#,
        )
        .bind(attendee_id)
        .bind(event.id)
        .bind(ticket.id)
        .bind(request.quantity)
        .bind(promotion_discount)
        .bind(voucher_discount)
        .bind(points_redeemed)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Registration completed: attendee={} event={} ticket={} total_price={}",
            attendee_id,
            event.id,
            ticket.id,
            transaction.total_price
        );

        Ok(transaction)
    }

    pub async fn get_registration_history(
        &self,
        attendee_id: i64,
        query: &TransactionQuery,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset();
        let limit = params.get_limit();

        let order = match query.sort.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE attendee_id = $1")
                .bind(attendee_id)
                .fetch_one(&self.pool)
                .await?;

        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT id, attendee_id, event_id, ticket_id, quantity,
                   promotion_discount, voucher_discount, points_redeemed,
                   total_price, transaction_date, is_completed
            FROM transactions
            WHERE attendee_id = $1
            ORDER BY transaction_date {order}
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(attendee_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<TransactionResponse> = transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(20),
            total,
        ))
    }

    /// 已报名且尚未结束的活动
    pub async fn get_upcoming_events(&self, attendee_id: i64) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT DISTINCT e.id, e.organizer_id, e.event_name, e.description, e.category_id,
                   e.event_type_id, e.is_ended, e.created_at, e.updated_at
            FROM events e
            JOIN transactions t ON t.event_id = e.id
            WHERE t.attendee_id = $1 AND e.is_ended = FALSE
            "#,
        )
        .bind(attendee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// 已报名且已结束的活动
    pub async fn get_attended_events(&self, attendee_id: i64) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT DISTINCT e.id, e.organizer_id, e.event_name, e.description, e.category_id,
                   e.event_type_id, e.is_ended, e.created_at, e.updated_at
            FROM events e
            JOIN transactions t ON t.event_id = e.id
            WHERE t.attendee_id = $1 AND e.is_ended = TRUE
            "#,
        )
        .bind(attendee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn history(id: i64, earned: i64, used: i64, expires_in_days: i64) -> ReferralHistory {
        let now = Utc::now();
        ReferralHistory {
            id,
            referrer_id: 1,
            referee_id: 2,
            referral_code: "AABBCCDDEE".to_string(),
            points_earned: earned,
            points_used: used,
            voucher_code: format!("VOUCHER{:07}", id),
            voucher_used: false,
            discount_value: 10,
            valid_from: now - Duration::days(30),
            valid_to: now + Duration::days(expires_in_days),
            is_expired: false,
            created_at: now - Duration::days(30),
        }
    }

    fn ticket(event_id: i64, available_seat: i64, is_sold_out: bool) -> Ticket {
        Ticket {
            id: 1,
            event_id,
            ticket_name: "Regular".to_string(),
            price: 100,
            available_seat,
            is_sold_out,
        }
    }

    fn promotion(event_id: i64, usage_limit: i64, is_used: i64, is_invalid: bool) -> Promotion {
        Promotion {
            id: 1,
            event_id,
            discount: 30,
            usage_limit,
            is_used,
            valid_to: Utc::now() + Duration::days(7),
            is_invalid,
        }
    }

    #[test]
    fn test_ticket_availability_checks() {
        assert!(ticket_available(&ticket(5, 10, false), 5, 2));
        // 属于别的活动
        assert!(!ticket_available(&ticket(6, 10, false), 5, 2));
        // 已售罄
        assert!(!ticket_available(&ticket(5, 10, true), 5, 2));
        // 余座不足
        assert!(!ticket_available(&ticket(5, 1, false), 5, 2));
    }

    // 促销用满即不可用，即使定时任务还没来得及标记失效
    #[test]
    fn test_promotion_at_limit_rejected() {
        assert!(promotion_usable(&promotion(5, 10, 9, false), 5));
        assert!(!promotion_usable(&promotion(5, 10, 10, false), 5));
        assert!(!promotion_usable(&promotion(5, 10, 0, true), 5));
        assert!(!promotion_usable(&promotion(6, 10, 0, false), 5));
    }

    #[test]
    fn test_voucher_usability_checks() {
        let mut voucher = history(1, 10000, 0, 30);
        assert!(voucher_usable(&voucher));

        voucher.voucher_used = true;
        assert!(!voucher_usable(&voucher));

        let mut expired = history(2, 10000, 0, 30);
        expired.is_expired = true;
        assert!(!voucher_usable(&expired));
    }

    #[test]
    fn test_flat_discount_clamped_at_zero() {
        assert_eq!(apply_flat_discount(200, 30), (170, 30));
        assert_eq!(apply_flat_discount(20, 30), (0, 20));
        assert_eq!(apply_flat_discount(0, 30), (0, 0));
    }

    #[test]
    fn test_percentage_discount_rounds_down() {
        assert_eq!(percentage_discount(170, 10), 17);
        assert_eq!(percentage_discount(99, 10), 9);
        assert_eq!(percentage_discount(0, 10), 0);
    }

    // 票价100 x2，促销减30，代金券10%：200-30=170，170-17=153
    #[test]
    fn test_fixed_discount_order() {
        let mut price = 100 * 2;
        let (new_price, applied) = apply_flat_discount(price, 30);
        price = new_price;
        assert_eq!(applied, 30);
        assert_eq!(price, 170);

        let voucher = percentage_discount(price, 10);
        price -= voucher;
        assert_eq!(voucher, 17);
        assert_eq!(price, 153);
    }

    // 剩余积分 40 和 80（先过期的在前），价格100：先扣40再扣60，共100
    #[test]
    fn test_points_redemption_spans_rows() {
        let histories = vec![history(1, 100, 60, 10), history(2, 80, 0, 20)];
        let (draws, total) = plan_points_redemption(&histories, 100);

        assert_eq!(total, 100);
        assert_eq!(
            draws,
            vec![
                PointsDraw {
                    history_id: 1,
                    amount: 40
                },
                PointsDraw {
                    history_id: 2,
                    amount: 60
                },
            ]
        );
    }

    #[test]
    fn test_points_redemption_partial_when_short() {
        let histories = vec![history(1, 50, 20, 5)];
        let (draws, total) = plan_points_redemption(&histories, 100);

        assert_eq!(total, 30);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].amount, 30);
    }

    #[test]
    fn test_points_redemption_skips_exhausted_rows() {
        let histories = vec![history(1, 100, 100, 5), history(2, 100, 0, 10)];
        let (draws, total) = plan_points_redemption(&histories, 50);

        assert_eq!(total, 50);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].history_id, 2);
    }

    #[test]
    fn test_points_redemption_stops_at_zero_price() {
        let histories = vec![history(1, 100, 0, 5), history(2, 100, 0, 10)];
        let (draws, total) = plan_points_redemption(&histories, 60);

        assert_eq!(total, 60);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].amount, 60);
    }

    #[test]
    fn test_points_redemption_zero_price() {
        let histories = vec![history(1, 100, 0, 5)];
        let (draws, total) = plan_points_redemption(&histories, 0);

        assert!(draws.is_empty());
        assert_eq!(total, 0);
    }

    // 组合全部步骤后的价格恒等式：总价 = 原价 - 促销 - 代金券 - 积分，且不为负
    #[test]
    fn test_price_identity_holds() {
        let base = 100 * 2;
        let (after_promo, promo_applied) = apply_flat_discount(base, 30);
        let voucher = percentage_discount(after_promo, 10);
        let after_voucher = after_promo - voucher;

        let histories = vec![history(1, 100, 60, 10), history(2, 80, 0, 20)];
        let (_, redeemed) = plan_points_redemption(&histories, after_voucher);
        let total = after_voucher - redeemed;

        assert_eq!(total, base - promo_applied - voucher - redeemed);
        assert!(total >= 0);
    }

    // 促销额超过票价时限幅，后续步骤在零价格上不再产生负数
    #[test]
    fn test_oversized_promotion_never_goes_negative() {
        let (price, applied) = apply_flat_discount(50, 500);
        assert_eq!(price, 0);
        assert_eq!(applied, 50);

        let voucher = percentage_discount(price, 10);
        assert_eq!(voucher, 0);

        let histories = vec![history(1, 100, 0, 5)];
        let (draws, total) = plan_points_redemption(&histories, price);
        assert!(draws.is_empty());
        assert_eq!(total, 0);
    }
}
