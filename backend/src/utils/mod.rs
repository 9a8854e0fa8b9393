pub mod cookies;
pub mod jwt;
pub mod password;

pub use jwt::*;
pub use password::*;
