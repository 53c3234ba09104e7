//! Common utilities and types shared across vmbox crates.

pub mod error;
pub mod hash;
pub mod platform;

pub use error::{Error, Result};
pub use platform::HostPlatform;
