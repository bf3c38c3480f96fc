//! Bar-by-bar trade generation for a single instrument.
//!
//! Hexagonal architecture: the trade engine and its policy families live in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
