pub mod auth;
pub mod bot;
pub mod commands;
pub mod comments;
pub mod config;
pub mod error;
pub mod handler;
pub mod outcome;
pub mod reply;
pub mod telemetry;
pub mod utils;
pub mod validate;
pub mod youtube;
