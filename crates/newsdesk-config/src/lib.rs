//! Configuration, filesystem paths and logging setup for newsdesk tools.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_IN_QUERY_LIMIT, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
