use crate::error::AppResult;
use crate::utils::{generate_referral_code, generate_voucher_code};
use sqlx::PgPool;

/// 生成未被任何用户占用的推荐码，碰撞则重新生成
pub async fn generate_unique_referral_code(pool: &PgPool) -> AppResult<String> {
    loop {
        let code = generate_referral_code();

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = $1)")
                .bind(&code)
                .fetch_one(pool)
                .await?;

        if !exists {
            return Ok(code);
        }
    }
}

/// 生成未被任何推荐记录占用的代金券码，碰撞则重新生成
pub async fn generate_unique_voucher_code(pool: &PgPool) -> AppResult<String> {
    loop {
        let code = generate_voucher_code();

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM referral_histories WHERE voucher_code = $1)",
        )
        .bind(&code)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Ok(code);
        }
    }
}
