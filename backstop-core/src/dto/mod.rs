//! Data Transfer Objects for the TSM job API
//!
//! Request bodies and response envelopes exchanged with the remote
//! service. Every envelope names the fields it expects so a missing
//! field fails decoding instead of yielding an absent value.

pub mod auth;
pub mod job;
