//! Application layer orchestrating validation, lifecycle and persistence.
//!
//! This module defines the `PaymentsService`, the single entry point through
//! which payments are created, settled, cancelled and queried.

pub mod service;
