//! logferry Core - shared types, constants, configuration, and error handling

pub mod addr;
pub mod config;
pub mod constants;
pub mod error;

pub use addr::*;
pub use config::*;
pub use constants::*;
pub use error::{Error, Result};
