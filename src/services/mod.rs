pub mod auth;
pub mod dead_letter;
