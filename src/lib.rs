#![doc = "The `taskmanager` library crate."]
#![doc = ""]
#![doc = "Domain models, the document store, token authentication, avatar processing,"]
#![doc = "account emails and the HTTP routes of the task manager. The binary (`main.rs`)"]
#![doc = "reads the configuration, picks a store and mailer, and serves `routes::config`."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod email;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
