//! Teleflow Core
//!
//! Core types for the Teleflow computer-automation platform.
//!
//! This crate contains:
//! - Domain types: Workflow and Computer value objects with fixed wire formats
//! - Message taxonomy: the typed progress events streamed during a run
//! - Input validation: user-input checks performed before any network effect

pub mod domain;
pub mod error;
pub mod message;
pub mod validate;

pub use error::{InputValidationError, SchemaError};
pub use message::RunMessage;
