//! Video catalog API server library.
//!
//! Exposes the building blocks (config, state, error handling, request
//! extraction, the video transaction coordinator and routes) so integration
//! tests and the binary entrypoint can both access them.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
