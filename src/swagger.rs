use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::verify,
        handlers::user::get_profile,
        handlers::user::update_profile,
        handlers::user::delete_profile,
        handlers::user::get_referrals,
        handlers::event::create_event,
        handlers::event::list_events,
        handlers::event::browse_events,
        handlers::event::view_event,
        handlers::event::update_event,
        handlers::event::delete_event,
        handlers::event::add_ticket,
        handlers::event::add_promotion,
        handlers::event::give_review,
        handlers::registration::register_for_event,
        handlers::registration::get_registration_history,
        handlers::registration::get_upcoming_events,
        handlers::registration::get_attended_events,
    ),
    components(
        schemas(
            User,
            UserRole,
            UserResponse,
            PointsSummary,
            CreateUserRequest,
            LoginRequest,
            UpdateUserRequest,
            AuthResponse,
            Event,
            Schedule,
            Location,
            Ticket,
            Promotion,
            Review,
            ScheduleInput,
            LocationInput,
            CreateEventRequest,
            UpdateEventRequest,
            AddTicketRequest,
            AddPromotionRequest,
            GiveReviewRequest,
            EventDetailResponse,
            ReferralHistory,
            ReferralHistoryResponse,
            Transaction,
            RegisterEventRequest,
            TransactionResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "user", description = "User profile and referral API"),
        (name = "event", description = "Event management API"),
        (name = "registration", description = "Event registration API"),
    ),
    info(
        title = "Evently Backend API",
        version = "1.0.0",
        description = "Ticketed event marketplace REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
