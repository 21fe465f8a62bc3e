//! Backstop Core
//!
//! Core types and abstractions shared by the Backstop crates.
//!
//! This crate contains:
//! - Domain types: remote backup jobs and their progress notes
//! - DTOs: request and response envelopes of the TSM job API
//! - Configuration: the typed configuration record read at startup
//! - Command building and outcome policy

pub mod command;
pub mod config;
pub mod domain;
pub mod dto;
pub mod outcome;
