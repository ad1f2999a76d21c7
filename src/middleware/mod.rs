//! Request middleware.
//!
//! The logging middleware wraps every API handler: one span, one access
//! record, and one metrics observation per completed request.

pub mod access_log;

pub use access_log::RequestLogger;
