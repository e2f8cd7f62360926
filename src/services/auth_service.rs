use crate::error::{AppError, AppResult};
use crate::external::MailerService;
use crate::models::*;
use crate::utils::*;
use chrono::Months;
use sqlx::PgPool;

// 每次成功推荐给推荐人记入的积分，三个月内有效
const REFERRAL_POINTS: i64 = 10_000;
// 推荐产生的代金券折扣（百分比）
const REFERRAL_VOUCHER_DISCOUNT: i64 = 10;

const USER_COLUMNS: &str = r#"
    id, email, username, password_hash, role, points, referral_code,
    referrer_id, is_verified, registration_date, updated_at
"#;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt_service: JwtService,
    mailer_service: MailerService,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_service: JwtService, mailer_service: MailerService) -> Self {
        Self {
            pool,
            jwt_service,
            mailer_service,
        }
    }

    pub async fn register(&self, request: CreateUserRequest) -> AppResult<AuthResponse> {
        // 验证输入参数
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        if request.username.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Username is required".to_string(),
            ));
        }

        // 检查邮箱与用户名是否已注册
        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&request.email)
                .fetch_one(&self.pool)
                .await?;
        if email_taken {
            return Err(AppError::ValidationError(
                "User with this email already exists".to_string(),
            ));
        }

        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(&request.username)
                .fetch_one(&self.pool)
                .await?;
        if username_taken {
            return Err(AppError::ValidationError(
                "User with this username already exists".to_string(),
            ));
        }

        // 密码哈希
        let password_hash = hash_password(&request.password)?;

        // 每个新用户拿到一个自己的唯一推荐码
        let referral_code = generate_unique_referral_code(&self.pool).await?;

        let role = request.role.unwrap_or(UserRole::Attendee);

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, password_hash, role, referral_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&request.email)
        .bind(&request.username)
        .bind(&password_hash)
        .bind(&role)
        .bind(&referral_code)
        .fetch_one(&self.pool)
        .await?;

        // 带推荐码注册：给推荐人记积分并生成代金券
        if let Some(referral) = &request.referral
            && !referral.is_empty()
        {
            self.create_referral_history(&user, referral).await?;
        }

        // 发送验证邮件，不等待投递结果
        {
            let mailer = self.mailer_service.clone();
            let jwt = self.jwt_service.clone();
            let email = user.email.clone();
            let username = user.username.clone();
            let user_id = user.id;
            let role_str = user.role.to_string();
            tokio::spawn(async move {
                let token = match jwt.generate_access_token(user_id, &role_str) {
                    Ok(t) => t,
                    Err(e) => {
                        log::error!("Failed to sign verification token: {e:?}");
                        return;
                    }
                };
                if let Err(e) = mailer
                    .send_verification_email(&email, &username, &token)
                    .await
                {
                    log::error!("Failed to send verification email: {e:?}");
                }
            });
        }

        self.build_auth_response(user)
    }

    /// 推荐码有效时创建一条推荐记录：积分 10000，代金券 10%，
    /// 有效期从被推荐人注册时间起三个月。无效推荐码静默忽略，注册照常成功。
    async fn create_referral_history(
        &self,
        referee: &User,
        referral: &str,
    ) -> AppResult<Option<ReferralHistory>> {
        // 查找推荐码属主
        let referrer_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE referral_code = $1")
                .bind(referral)
                .fetch_optional(&self.pool)
                .await?;

        let Some(referrer_id) = referrer_id else {
            log::debug!("Unknown referral code, skipping accrual: {referral}");
            return Ok(None);
        };

        // 记录推荐关系
        sqlx::query("UPDATE users SET referrer_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(referrer_id)
            .bind(referee.id)
            .execute(&self.pool)
            .await?;

        let valid_from = referee.registration_date;
        let valid_to = valid_from + Months::new(3);
        let voucher_code = generate_unique_voucher_code(&self.pool).await?;

        let history = sqlx::query_as::<_, ReferralHistory>(
            r#"
            INSERT INTO referral_histories (
                referrer_id, referee_id, referral_code, points_earned,
                voucher_code, discount_value, valid_from, valid_to
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, referrer_id, referee_id, referral_code, points_earned, points_used,
                      voucher_code, voucher_used, discount_value, valid_from, valid_to,
                      is_expired, created_at
            "#,
        )
        .bind(referrer_id)
        .bind(referee.id)
        .bind(referral)
        .bind(REFERRAL_POINTS)
        .bind(&voucher_code)
        .bind(REFERRAL_VOUCHER_DISCOUNT)
        .bind(valid_from)
        .bind(valid_to)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "Referral accrued: referrer={} referee={} voucher={}",
            referrer_id,
            referee.id,
            voucher_code
        );

        Ok(Some(history))
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        // 支持邮箱或用户名登录
        let user = if let Some(email) = &request.email {
            self.find_user("email", email).await?
        } else if let Some(username) = &request.username {
            self.find_user("username", username).await?
        } else {
            return Err(AppError::ValidationError(
                "Email or username is required".to_string(),
            ));
        };

        let user = user.ok_or_else(|| {
            AppError::AuthError("User does not exist or password is incorrect".to_string())
        })?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::AuthError(
                "User does not exist or password is incorrect".to_string(),
            ));
        }

        self.build_auth_response(user)
    }

    pub async fn refresh_token(&self, token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let user = self.get_user_by_id(user_id).await?;

        self.build_auth_response(user)
    }

    /// 账号验证：单向翻转，重复调用无副作用
    pub async fn verify(&self, token: &str) -> AppResult<()> {
        let claims = self.jwt_service.verify_token(token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        sqlx::query(
            "UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1 AND is_verified = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_user(&self, column: &str, value: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: i64) -> AppResult<User> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        user.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn build_auth_response(&self, user: User) -> AppResult<AuthResponse> {
        let role = user.role.to_string();
        let access_token = self.jwt_service.generate_access_token(user.id, &role)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id, &role)?;
        let expires_in = self.jwt_service.get_access_token_expires_in();

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in,
        })
    }
}
