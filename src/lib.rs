//! linktracker - trackable short links with click analytics
//!
//! # Architecture
//! - `storage`: SeaORM backed persistence (links, clicks, security log)
//! - `services`: link management, redirect policy, click recording, aggregation
//! - `api`: HTTP handlers, middleware and rate limiting
//! - `config`: Configuration management
//! - `runtime`: Server startup
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
