//! Credit Bureau API Library
//!
//! This library provides the core functionality for the credit bureau
//! service: profile and record storage, the scoring engine, the dispute
//! workflow, report snapshot generation, and HTTP handlers.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `disputes`: Dispute state machine and workflow service.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `recalc`: Score recalculation coordinator.
//! - `reports`: Report snapshot service.
//! - `scoring`: The scoring engine.
//! - `store`: Record store over Postgres.

pub mod config;
pub mod db;
pub mod disputes;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod recalc;
pub mod reports;
pub mod scoring;
pub mod store;
