pub mod auth_service;
pub mod event_service;
pub mod registration_service;
pub mod sweeper_service;
pub mod user_service;

pub use auth_service::*;
pub use event_service::*;
pub use registration_service::*;
pub use sweeper_service::*;
pub use user_service::*;
