use std::{fmt, sync::Arc, time::Duration};

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Video,
    Trickmode,
    Audio,
    Text,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Trickmode => "trickmode",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fetchable media segment of a [`Stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the stream, starts from 0
    pub index: usize,
    /// Absolute chunk url
    pub url: Url,
    /// Decode timestamp in protocol-native ticks
    pub dts: u64,
    pub duration: Duration,
}

/// One encoded rendition with its complete chunk timeline.
///
/// Streams are immutable once built. Cloning is cheap: the chunk list is shared.
#[derive(Debug, Clone)]
pub struct Stream {
    stream_type: StreamType,
    bitrate: u64,
    chunks: Arc<[Chunk]>,
}

impl Stream {
    pub fn new(stream_type: StreamType, bitrate: u64, chunks: Vec<Chunk>) -> Self {
        Self {
            stream_type,
            bitrate,
            chunks: chunks.into(),
        }
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Sum of all chunk durations.
    pub fn duration(&self) -> Duration {
        self.chunks.iter().map(|c| c.duration).sum()
    }
}
