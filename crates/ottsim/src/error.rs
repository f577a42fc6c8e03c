use thiserror::Error;
use url::Url;

use crate::player::PlayerState;

#[derive(Error, Debug)]
pub enum OttError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Failed to fetch manifest from {0}: {1}")]
    ManifestFetchError(Url, #[source] Box<OttError>),

    #[error("Invalid manifest: {0}")]
    ManifestParseError(#[from] quick_xml::DeError),

    #[error("Manifest is not valid UTF-8: {0}")]
    ManifestEncodingError(#[from] std::str::Utf8Error),

    #[error("Unknown manifest protocol for {0}")]
    UnknownProtocol(String),

    #[error("Unable to determine stream type: {0}")]
    UnknownStreamType(String),

    #[error("Timeline expands to more than {0} chunks")]
    TimelineTooLong(usize),

    #[error("Failed to fetch chunk {index} from {url}: {source}")]
    ChunkFetchError {
        index: usize,
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} can not be called while player is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: PlayerState,
    },

    #[error("Playback task failed: {0}")]
    PlaybackTaskFailed(#[from] tokio::task::JoinError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClientError(#[source] reqwest::Error),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),
}

pub type OttResult<T> = Result<T, OttError>;
