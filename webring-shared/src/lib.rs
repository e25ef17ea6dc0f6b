//! # Webring Shared Library
//!
//! Domain types, persistence and business rules for the webring backend. The
//! HTTP server (`webring-api`) is a thin layer over the services defined here.
//!
//! ## Module Organization
//!
//! - `validation`: normalisation and format rules for user-supplied text
//! - `services`: user and webring operations
//! - `store`: the `Store` persistence seam (PostgreSQL and in-memory)
//! - `models`: database rows and queries
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, session tokens and the access policy
//! - `mail`: registration email delivery
//! - `error`: the `DomainError` type

pub mod auth;
pub mod db;
pub mod error;
pub mod mail;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

/// Current version of the webring shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
