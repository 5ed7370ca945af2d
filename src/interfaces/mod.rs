//! Outer adapters translating between external formats and the domain.

pub mod csv;
