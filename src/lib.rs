pub mod admin;
pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod geocoding;
pub mod messaging;
pub mod registration;
pub mod security;
pub mod services;

// Re-export main components for easier use
pub use config::Config;
pub use error::Error;
pub use geo::{Distance, LatLng};
