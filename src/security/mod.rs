//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (target + Origin):
//!     → access_control.rs (blacklist / whitelist decision)
//!     → limits.rs (buffer body within the size limit)
//!     → headers.rs (strip client-identifying headers)
//!     → Forward upstream
//! ```
//!
//! # Design Decisions
//! - Policy rejections are responses (403), never errors
//! - Patterns compiled once; no per-request allocation for matching

pub mod access_control;
pub mod headers;
pub mod limits;

pub use access_control::{AccessPolicy, PatternList};
