pub mod config;
pub mod error;
pub mod types;

pub use config::AdmitConfig;
pub use error::{AdmitError, Result};
pub use types::*;
