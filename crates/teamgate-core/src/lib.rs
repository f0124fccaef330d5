//! Teamgate Core: domain models, error taxonomy, repository traits and
//! the role hierarchy shared by every other crate.

pub mod error;
pub mod models;
pub mod notify;
pub mod repository;
