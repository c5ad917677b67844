//! # Innertube Provider
//!
//! Implements the `MetadataProvider` seam against the catalog's player
//! endpoint.
//!
//! ## Overview
//!
//! This module provides:
//! - Player-metadata lookups by track identifier
//! - Translation of the JSON wire format (playability status string plus
//!   itag-tagged adaptive formats) into the core's provider contract
//! - Connect/read timeout enforcement
//! - Rate limiting and exponential backoff

pub mod connector;
pub mod error;
pub mod types;

pub use connector::InnertubeConnector;
pub use error::{InnertubeError, Result};
