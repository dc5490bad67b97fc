//! Core types for the request/response lifecycle.
//!
//! This module provides the types the router builds for every dispatch:
//!
//! - [`Request`] - inbound request abstraction with lazy body parsing
//! - [`Reply`] - outcome descriptor produced by handlers
//! - [`Responder`] - one-shot terminal write (redirect / template / JSON)
//! - [`Error`] - core error types

mod error;
pub mod request;
mod response;

pub use error::{Error, Result};
pub use request::{Request, RequestBody, METHOD_OVERRIDE_FIELD};
pub use response::{Reply, Responder};
