//! Authentication gateway for the asesorias API.
//!
//! Every request passes one middleware that answers CORS preflight, classifies the
//! route, verifies the bearer credential with the configured verifier and hands the
//! resulting identity to handlers through request extensions.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
