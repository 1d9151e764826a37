//! Bearer-token access guard and dead-letter failure recorder for axum services.
//!
//! - [`services::auth::AccessController`] validates `Authorization: Bearer` credentials
//!   and checks route role requirements.
//! - [`services::dead_letter::FailureRecorder`] observes error responses and writes
//!   unexpected ones to a [`services::dead_letter::DeadLetterSink`].
//! - [`middleware`] wires both into an axum `Router`.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;
