pub mod build_log;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod retry;
pub mod traits;

pub use build_log::*;
pub use config::*;
pub use config_loader::*;
pub use error::*;
pub use retry::*;
pub use traits::*;
