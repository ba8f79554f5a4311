//! Bocado server library.
//!
//! The JSON API behind the Bocado client, exposed as a library so the
//! binary, the CLI and the tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
