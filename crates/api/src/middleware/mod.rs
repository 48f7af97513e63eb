//! Request middleware.
//!
//! - [`rate_limit::rate_limit`] -- fixed-window request budget per client IP.

pub mod rate_limit;
