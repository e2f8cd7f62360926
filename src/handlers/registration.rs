use crate::models::*;
use crate::services::RegistrationService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/events/{event_id}/register",
    tag = "registration",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = RegisterEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "报名成功", body = Transaction),
        (status = 404, description = "活动或门票不存在"),
        (status = 409, description = "门票售罄、促销或代金券不可用、或并发冲突"),
        (status = 410, description = "活动已结束")
    )
)]
pub async fn register_for_event(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<RegisterEventRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service
        .register_for_event(path.into_inner(), user_id, request.into_inner())
        .await
    {
        Ok(transaction) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": transaction
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/registrations",
    tag = "registration",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("sort" = Option<String>, Query, description = "按交易时间排序：asc 或 desc")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取报名历史成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_registration_history(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service
        .get_registration_history(user_id, &query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/registrations/upcoming",
    tag = "registration",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取待参加活动成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_upcoming_events(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service.get_upcoming_events(user_id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/registrations/attended",
    tag = "registration",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取已参加活动成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_attended_events(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service.get_attended_events(user_id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

// 报名入口挂在 /events/{event_id}/register 下，见 handlers::event::event_config
pub fn registration_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/registrations")
            .route("", web::get().to(get_registration_history))
            .route("/upcoming", web::get().to(get_upcoming_events))
            .route("/attended", web::get().to(get_attended_events)),
    );
}
