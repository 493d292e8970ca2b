//! HTTP recommendation service: collaborative filtering over user interaction
//! history with a trending fallback, fronted by an invalidating cache.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::{create_router, AppState};
