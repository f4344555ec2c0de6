//! Taiga harvesting library
//!
//! This library provides a minimal client for the Taiga project-management
//! API (token auth, rate-limit recovery, cursor pagination) and a backend
//! layer that serves a fixed set of categories as JSON record sequences.

pub mod backend;
pub mod cli;
pub mod color;
pub mod commands;
pub mod taiga;
