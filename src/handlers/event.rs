use crate::models::*;
use crate::services::EventService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "event",
    request_body = CreateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建活动成功", body = Event),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "非主办方账号")
    )
)]
pub async fn create_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    request: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service
        .create_event(user_id, request.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "event",
    params(
        ("category_id" = Option<i64>, Query, description = "分类过滤"),
        ("event_type_id" = Option<i64>, Query, description = "类型过滤")
    ),
    responses(
        (status = 200, description = "获取活动列表成功"),
        (status = 404, description = "没有符合条件的活动")
    )
)]
pub async fn list_events(
    event_service: web::Data<EventService>,
    query: web::Query<EventListQuery>,
) -> Result<HttpResponse> {
    match event_service.get_events_list(&query).await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/browse",
    tag = "event",
    params(
        ("q" = String, Query, description = "活动名称搜索关键字")
    ),
    responses(
        (status = 200, description = "搜索活动成功"),
        (status = 400, description = "缺少搜索关键字"),
        (status = 404, description = "没有符合条件的活动")
    )
)]
pub async fn browse_events(
    event_service: web::Data<EventService>,
    query: web::Query<BrowseEventQuery>,
) -> Result<HttpResponse> {
    match event_service
        .browse_events(query.q.as_deref().unwrap_or(""))
        .await
    {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{event_id}",
    tag = "event",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动详情成功", body = EventDetailResponse),
        (status = 404, description = "活动不存在或已结束")
    )
)]
pub async fn view_event(
    event_service: web::Data<EventService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match event_service.view_event(path.into_inner()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/events/{event_id}",
    tag = "event",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = UpdateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新活动成功", body = Event),
        (status = 403, description = "不是该活动的主办方"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn update_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service
        .update_event(user_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/events/{event_id}",
    tag = "event",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除活动成功"),
        (status = 403, description = "不是该活动的主办方"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn delete_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service.delete_event(user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Event deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{event_id}/tickets",
    tag = "event",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = AddTicketRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "添加门票成功", body = Ticket),
        (status = 403, description = "不是该活动的主办方")
    )
)]
pub async fn add_ticket(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AddTicketRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service
        .add_ticket(user_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(ticket) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ticket
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{event_id}/promotions",
    tag = "event",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = AddPromotionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "添加促销成功", body = Promotion),
        (status = 403, description = "不是该活动的主办方")
    )
)]
pub async fn add_promotion(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AddPromotionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service
        .add_promotion(user_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{event_id}/reviews",
    tag = "event",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = GiveReviewRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "提交评价成功", body = Review),
        (status = 400, description = "缺少评分"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn give_review(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<GiveReviewRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service
        .give_review(user_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(review) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": review
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn event_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::post().to(create_event))
            .route("", web::get().to(list_events))
            .route("/browse", web::get().to(browse_events))
            .route("/{event_id}", web::get().to(view_event))
            .route("/{event_id}", web::put().to(update_event))
            .route("/{event_id}", web::delete().to(delete_event))
            .route("/{event_id}/tickets", web::post().to(add_ticket))
            .route("/{event_id}/promotions", web::post().to(add_promotion))
            .route("/{event_id}/reviews", web::post().to(give_review))
            .route(
                "/{event_id}/register",
                web::post().to(crate::handlers::registration::register_for_event),
            ),
    );
}
