//! Core domain types
//!
//! These types describe the jobs owned by the remote service. They are
//! observed, never mutated, by the client and the poller.

pub mod job;
