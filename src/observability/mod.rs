//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler produces:
//!     → logging.rs (structured log events, one span per request)
//!     → metrics.rs (counters and latency histogram)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Each request span carries a generated request ID
//! - Metrics are cheap and disabled unless configured

pub mod logging;
pub mod metrics;
