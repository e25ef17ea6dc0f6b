//! # Webring API Server Library
//!
//! HTTP boundary for the webring backend: JSON endpoints over the services in
//! `webring-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and session authentication
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Json/Path/Query extractors rejecting with `ApiError`
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
