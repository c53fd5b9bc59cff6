//! SeaORM entity definitions for the toprepos schema.

pub mod activity;
pub mod prelude;
pub mod top_repository;
