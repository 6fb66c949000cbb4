//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer for reads and account creation
//!
//! Balance-mutating writes live in [`crate::ledger`], not here.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
