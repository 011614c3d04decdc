pub mod config;
pub mod error;
pub mod types;

pub use config::MemobotConfig;
pub use error::{MemobotError, Result};
pub use types::*;
