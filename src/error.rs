// Error types module

use thiserror::Error;

use crate::fetch::FetchError;
use crate::store::StoreError;

/// Why precaching failed.
///
/// Installation is all-or-nothing: the first bad manifest entry aborts the
/// run and the manager reports exactly which entry sank it.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("manifest entry '{url}' could not be fetched: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("manifest entry '{url}' answered status {status}")]
    Status { url: String, status: u16 },

    #[error("manifest entry '{entry}' is not a usable URL: {source}")]
    BadEntry {
        entry: String,
        #[source]
        source: url::ParseError,
    },

    #[error("store write failed for '{url}': {source}")]
    Store {
        url: String,
        #[source]
        source: StoreError,
    },
}

/// Resolution failure surfaced to the host.
///
/// Strategies absorb store trouble (a broken store reads as a miss) and
/// navigation failures (those become the offline page), so the only thing
/// left to report is a request that is both unreachable and unstored.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("'{url}' is unreachable and has no stored copy: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: FetchError,
    },
}
