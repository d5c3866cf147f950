//! Configuration
//!
//! `DeployConfig` is the library-facing configuration value; `EnvConfig`
//! loads it (plus listener and mailer settings) from the environment for
//! the binary.

pub mod deploy;
pub mod env;

pub use deploy::{DeployConfig, PostDeployHook};
pub use env::EnvConfig;
