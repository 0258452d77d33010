pub mod config;
pub mod dispatch;
pub mod error;
pub mod rows;
pub mod types;

pub use config::Config;
pub use dispatch::*;
pub use error::BrigadeError;
pub use types::*;
