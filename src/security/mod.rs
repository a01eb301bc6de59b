pub mod command_executor;
pub mod credentials;
pub mod secret_masker;

pub use command_executor::CommandExecutor;
pub use credentials::{AccessKey, ScannerEnvironment};
pub use secret_masker::{MaskedLog, SecretMasker};
