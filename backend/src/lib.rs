//! Budgetbook backend: the authentication and session-consistency core of a
//! personal budgeting application.
//!
//! Budget, category, and expense handlers live downstream of the identity
//! resolver in [`middleware::auth`] and only ever see a fully resolved
//! [`models::auth::AuthUser`].

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod router;
pub mod services;
pub mod utils;
