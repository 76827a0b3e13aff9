//! Playout-DB: schedule store, programme catalog, and coverage analysis.
//!
//! This crate provides persistence for playout using SQLite with rusqlite
//! and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//! - `islands` - Gap and island detection over a channel's timeline
//!
//! # Example
//!
//! ```no_run
//! use playout_db::pool::{get_conn, init_pool};
//! use playout_db::queries::schedule_entries;
//!
//! let pool = init_pool("/var/lib/playout/playout.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let health = schedule_entries::health(&conn, &"news".into()).unwrap();
//! println!("{} gaps", health.gaps.len());
//! ```

pub mod islands;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use pool::{get_conn, init_memory_pool, init_pool, DbPool, PooledConnection};
