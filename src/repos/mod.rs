pub mod dead_letter_repo;
pub mod error;
