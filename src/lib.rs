pub mod api;
pub mod arbitration;
pub mod auth;
pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod retry;
pub mod server;
pub mod store;
