//! # Salon Reminders Library
//!
//! Birthday and anniversary reminder notifications for a multi-tenant salon
//! backend: the daily cycle, its messaging gateway and ledger, and the thin
//! HTTP surface that manages templates and triggers runs.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod reminders;
pub mod repositories;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub use migration;
