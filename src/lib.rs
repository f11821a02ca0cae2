//! # SQLGuard
//!
//! **Request-inspection guard that blocks SQL-injection probes.**
//!
//! SQLGuard sits in front of an HTTP application. Every inbound request's path,
//! raw query string and body are checked against a fixed set of
//! case-insensitive patterns; a match short-circuits with `403 Forbidden` and
//! the application never sees the request. Clean requests are passed through
//! untouched.
//!
//! ## Architecture
//!
//! - **[`guard`]** — pattern registry, request sampler, scanner and interceptor
//! - **[`server`]** — axum middleware, listener and upstream relay
//! - **[`config`]** — TOML configuration with environment substitution
//! - **[`cli`]** — Command-line interface (clap)
//! - **[`error`]** — Unified error types using `thiserror`
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default sqlguard.toml
//! sqlguard init
//!
//! # Guard the application running on :8000
//! sqlguard start --upstream http://127.0.0.1:8000
//!
//! # Try a request offline
//! sqlguard check --path /search --query "q=' OR 1=1"
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod server;
