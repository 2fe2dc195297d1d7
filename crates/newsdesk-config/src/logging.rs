//! Logging initialization.
//!
//! Thin wrapper over the observability package: JSONL goes to
//! `<base>/logs/newsdesk.jsonl`, compact output to stderr.

use crate::{CoreResult, Paths};

const SERVICE_NAME: &str = "newsdesk";

/// Initialize tracing for a newsdesk binary.
///
/// `level` is the default filter; `RUST_LOG` overrides it.
pub fn init_logging(level: &str, paths: &Paths) -> CoreResult<()> {
    paths.ensure_dirs()?;
    observability::init_with_config(observability::LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file(SERVICE_NAME)),
        also_stderr: true,
    })?;
    Ok(())
}
