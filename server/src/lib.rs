pub mod artifact;
pub mod auth;
pub mod clock;
pub mod config;
pub mod handlers;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod store;
pub mod time_window;
pub mod utils;
