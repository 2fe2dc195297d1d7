//! Seeds the in-memory store from a JSON file.
//!
//! The file maps collection path to document id to document fields:
//!
//! ```json
//! { "articles": { "a1": { "title": "Open day", "published": true } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use doc_store::{Fields, MemoryStore};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Fixture {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

/// Loads every document in `path` into `store`. Returns the document count.
pub fn load(store: &MemoryStore, path: &Path) -> Result<usize, FixtureError> {
    let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let collections: Collections =
        serde_json::from_str(&content).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut count = 0;
    for (collection, documents) in collections {
        for (id, fields) in documents {
            store.seed(&collection, &id, fields);
            count += 1;
        }
        debug!(%collection, "fixture collection seeded");
    }
    Ok(count)
}
