//! HTTP handlers for the file-transfer API

pub mod auth;
pub mod files;
pub mod routes;

pub use routes::create_routes;
