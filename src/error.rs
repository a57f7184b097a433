use thiserror::Error;

/// A search-result node is missing a required field. Always recovered by
/// skipping that one listing; the rest of the page keeps going.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("listing node has no pid attribute")]
    MissingPid,

    #[error("listing {0} has no result-info node")]
    MissingInfo(String),

    #[error("listing {0} has no posting timestamp")]
    MissingTimestamp(String),

    #[error("listing {0} has no permalink")]
    MissingPermalink(String),

    #[error("listing {0} has no title")]
    MissingTitle(String),

    #[error("listing {pid} has a malformed timestamp {raw:?}: {source}")]
    BadTimestamp {
        pid: String,
        raw: String,
        source: chrono::ParseError,
    },
}

/// A page fetch or a detail-page parse failed. On a detail page this is
/// listing-level (skip the listing); on a search-results page it ends the
/// region.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page has no {0} node")]
    MissingNode(&'static str),
}

impl FetchError {
    /// Only a timeout on the search page earns the one retry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Http(e) if e.is_timeout())
    }
}

/// Configuration-level failures that a region cannot recover from;
/// surfaced to the driver.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("domain url {0:?} has no recognizable region name")]
    BadDomain(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}
