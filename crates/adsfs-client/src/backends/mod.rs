//! Transport backends.
//!
//! Backends implement [`AdsTransport`](crate::AdsTransport). The in-memory
//! target stands in for a device in tests and offline tooling.

mod memory;

pub use memory::{Call, CallKind, Fault, MemoryTarget};
