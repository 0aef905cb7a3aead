//! Database repositories, one per persisted entity.

pub mod metric_repository;
pub mod pending_user_repository;
pub mod user_repository;
