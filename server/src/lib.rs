//! HTTP front end that answers questions about a single document by streaming
//! Gemini output back to the caller on word boundaries.

pub mod config;
pub mod http_server;
pub mod relay;
pub mod startup;
