use std::fmt;

use url::Url;

use crate::{
    dash::model::{self as mpd, Mpd},
    error::{OttError, OttResult},
    smooth::model::{self as ism, SmoothStreamingMedia},
    stream::Stream,
    StreamTimeline,
};

const SMOOTH_SIGNATURE: &[u8] = b"<SmoothStreamingMedia";
const DASH_SIGNATURE: &[u8] = b"<MPD";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Dash,
    Smooth,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dash => "dash",
            Self::Smooth => "smooth",
        })
    }
}

/// A decoded manifest of either protocol.
#[derive(Debug, Clone)]
pub enum Manifest {
    Dash(Mpd),
    Smooth(SmoothStreamingMedia),
}

impl Manifest {
    /// Sniffs the protocol of a raw manifest.
    ///
    /// Smooth Streaming is checked first, so a document carrying both
    /// signatures is a Smooth manifest.
    pub fn detect(bytes: &[u8]) -> OttResult<Protocol> {
        if contains(bytes, SMOOTH_SIGNATURE) {
            Ok(Protocol::Smooth)
        } else if contains(bytes, DASH_SIGNATURE) {
            Ok(Protocol::Dash)
        } else {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(64)]);
            Err(OttError::UnknownProtocol(format!("manifest starting with {head:?}")))
        }
    }

    pub fn parse(bytes: &[u8]) -> OttResult<Self> {
        let protocol = Self::detect(bytes)?;
        let xml = std::str::from_utf8(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))?;

        Ok(match protocol {
            Protocol::Dash => Self::Dash(mpd::parse(xml)?),
            Protocol::Smooth => Self::Smooth(ism::parse(xml)?),
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Dash(_) => Protocol::Dash,
            Self::Smooth(_) => Protocol::Smooth,
        }
    }
}

impl StreamTimeline for Manifest {
    fn streams(&self, manifest_url: &Url) -> OttResult<Vec<Stream>> {
        match self {
            Self::Dash(mpd) => mpd.streams(manifest_url),
            Self::Smooth(ism) => ism.streams(manifest_url),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
