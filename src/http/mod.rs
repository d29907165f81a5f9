//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, per-request span)
//!     → target.rs (query string → decoded target URL)
//!     → classify.rs (info / forbidden / preflight / forward)
//!     → request.rs (strip headers, send upstream)
//!     → response.rs (add CORS headers, stream body back)
//!     → Send to client
//! ```

pub mod classify;
pub mod request;
pub mod response;
pub mod server;
pub mod target;

pub use classify::{classify, Disposition};
pub use request::Forwarder;
pub use server::{AppState, HttpServer, ServerError};
pub use target::extract_target;
