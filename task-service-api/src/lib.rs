//! # Task Service API Server Library
//!
//! HTTP surface of the task service.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration loading
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Rate limiting
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
