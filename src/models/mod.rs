pub mod common;
pub mod event;
pub mod pagination;
pub mod referral;
pub mod transaction;
pub mod user;

pub use common::*;
pub use event::*;
pub use pagination::*;
pub use referral::*;
pub use transaction::*;
pub use user::*;
