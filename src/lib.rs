//! Azure Toolkit Library
//!
//! Container registry browsing with `Link` header pagination, and Spark batch
//! submission with streaming log tailing over Livy.

pub mod cli;
pub mod config;
pub mod error;
pub mod livy;
pub mod logging;
pub mod registry;

pub use config::{AuthConfig, ClusterConfig, HttpConfig, RegistryConfig};
pub use error::{Result, ToolkitError};
pub use logging::Logger;
