pub mod attachments;
pub mod auth;
pub mod cases;
pub mod config;
pub mod downloads;
pub mod health;
pub mod payload;
pub mod users;
