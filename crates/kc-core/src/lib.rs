//! # kc-core
//!
//! Core event model and error handling for the Keycloak event broker.
//!
//! This crate provides the event types that the host hands to event
//! listeners: [`UserEvent`] for actions performed by or against an end user,
//! and [`AdminEvent`] for actions performed through the admin API.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - AU-2: Event logging framework
//! - AU-3: Content of audit records

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod event;

pub use error::{Error, Result};
pub use event::{AdminEvent, AuthDetails, EventType, OperationType, UserEvent};
