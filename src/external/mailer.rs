use crate::config::MailerConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: String,
}

/// 邮件发送客户端。调用方负责 fire-and-forget（tokio::spawn），
/// 不要在数据库事务内等待发送结果。
#[derive(Clone)]
pub struct MailerService {
    client: Client,
    config: MailerConfig,
}

impl MailerService {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send_verification_email(
        &self,
        email: &str,
        username: &str,
        verify_token: &str,
    ) -> AppResult<()> {
        let verify_url = format!("{}/verify?token={}", self.config.frontend_url, verify_token);
        let html = format!(
            "<p>Hi {username},</p>\
             <p>Welcome to our event platform. Click <a href=\"{verify_url}\">here</a> to verify your account.</p>"
        );

        self.send(email, "Welcome to our Event Management Platform!", html)
            .await
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> AppResult<()> {
        // 未配置邮件网关时静默跳过（本地开发）
        if self.config.api_url.is_empty() {
            log::debug!("Mailer not configured, skipping email to {}", to);
            return Ok(());
        }

        let body = SendMailRequest {
            from: &self.config.from_email,
            to,
            subject,
            html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Email sent successfully: {}", to);
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Email failed to send: {}, Error: {}", to, error_text);
            Err(AppError::ExternalApiError(format!(
                "Email sending failed: {}",
                error_text
            )))
        }
    }
}
