//! Core domain types and logic.

pub mod bar;
pub mod config;
pub mod config_validation;
pub mod engine;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod exit;
pub mod fixed_exit;
pub mod metrics;
pub mod numeric;
pub mod open_positions;
pub mod position;
pub mod signal;
pub mod stop;
pub mod strategy;
pub mod trail;
