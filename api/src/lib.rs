pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rest;
pub mod store;

use std::sync::Arc;

use auth::JwtKeys;
use store::{ProductStore, UserStore};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub keys: JwtKeys,
    pub page_size: u64,
}
