//! Alert rule definitions and the filesystem rule loader.
//!
//! This crate provides:
//! - serde schema for per-rule JSON definition files
//! - schema-level validation (operators, intervals, aggregation pairing)
//! - a directory loader with `${ENV_VAR}` placeholder resolution and
//!   per-file load reporting

pub mod loader;
pub mod schema;

pub use loader::RuleLoader;
pub use schema::AlertRule;
