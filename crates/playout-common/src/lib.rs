//! Playout-Common: Shared types, IDs, and errors.
//!
//! This crate provides common functionality used across the playout workspace:
//!
//! - **Typed IDs**: newtypes for channels, programmes, and schedule entries
//! - **Core Types**: enums for ingest protocols, output types, codecs, and
//!   channel lifecycle
//! - **Error Handling**: the error taxonomy shared by the store, the planner,
//!   and the HTTP surface
//!
//! # Examples
//!
//! ```
//! use playout_common::{ChannelId, Error, OutputType, Result};
//!
//! let channel = ChannelId::from("cooking");
//! assert_eq!(channel.as_str(), "cooking");
//!
//! let kind: OutputType = "hls".parse().unwrap();
//! assert_eq!(kind, OutputType::Hls);
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("channel", "cooking"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use ids::*;
pub use types::*;
