//! Jellyfin as the library service: movies, BoxSet groupings, membership
//! and grouping artwork.

pub mod client;
pub mod error;
pub mod types;

pub use client::JellyfinClient;
pub use error::JellyfinError;
