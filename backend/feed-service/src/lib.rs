//! Nova Pulse feed service
//!
//! Accounts, post creation with live WebSocket fan-out, and logout
//! revocation, served by actix-web.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod security;
pub mod services;
pub mod state;
pub mod validators;
pub mod websocket;

pub use state::AppState;
