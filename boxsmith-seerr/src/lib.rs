//! Jellyseerr as the request service for titles missing from the library.

pub mod client;
pub mod error;
pub mod types;

pub use client::SeerrClient;
pub use error::SeerrError;
