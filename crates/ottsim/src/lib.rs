pub mod dash;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod player;
pub mod scheduler;
pub mod select;
pub mod smooth;
pub mod stream;
pub mod template;
pub mod timeline;
pub mod util;

pub use error::{OttError, OttResult};
pub use manifest::{Manifest, Protocol};
pub use player::{PlaybackReport, Player, PlayerState, StreamReport};
pub use scheduler::{FailurePolicy, PlaybackOptions};
pub use stream::{Chunk, Stream, StreamType};
pub use util::http::{HttpClient, HttpConfig};

/// ┌──────────────────────┐                 ┌──────────────────────┐
/// │                      │   Stream video  │                      ├───┐
/// │                      ├─────────────────►   task [MPSC]        │   │fetch_chunk, sleep
/// │                      │                 │                      ◄───┘
/// │   Manifest (MPD or   │   Stream audio  ├──────────────────────┤
/// │   SmoothStreaming)   ├─────────────────►   task [MPSC]        ├───┐
/// │                      │                 │                      │   │fetch_chunk, sleep
/// │                      │   Stream text   ├──────────────────────┤◄──┘
/// │                      ├─────────────────►   task [MPSC]        │
/// └──────────────────────┘                 └──────────────────────┘
///
/// Turns a decoded manifest into its playable streams. `manifest_url` is the
/// url the manifest was fetched from, every chunk url is resolved against it.
pub trait StreamTimeline {
    fn streams(&self, manifest_url: &url::Url) -> OttResult<Vec<Stream>>;
}
