//! Domain models for team access.
//!
//! These are plain data types; persistence lives behind the traits in
//! [`crate::repository`].

pub mod access;
pub mod actor;
pub mod audit;
pub mod group;
pub mod role;
pub mod team;
