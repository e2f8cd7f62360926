pub mod code_generator;
pub mod email;
pub mod jwt;
pub mod password;
pub mod unique_code;

pub use code_generator::*;
pub use email::*;
pub use jwt::*;
pub use password::*;
pub use unique_code::{generate_unique_referral_code, generate_unique_voucher_code};
