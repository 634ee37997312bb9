pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod notifications;
pub mod reminders;
pub mod reports;
pub mod routes;
pub mod schema;
pub mod state;
pub mod workers;
pub mod workflow;

pub use workers::{default_handlers, Worker};
