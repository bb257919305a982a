//! Orderhub server library.
//!
//! Order import and reconciliation, order attachments, the shared material
//! library and the storage drivers behind them.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
