//! Structural decode of a Smooth Streaming client manifest.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmoothStreamingMedia {
    #[serde(rename = "@MajorVersion")]
    pub major_version: Option<u32>,
    #[serde(rename = "@MinorVersion")]
    pub minor_version: Option<u32>,
    #[serde(rename = "@TimeScale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@Duration")]
    pub duration: Option<u64>,
    /// Kept as text, servers disagree on the casing of booleans
    #[serde(rename = "@IsLive")]
    pub is_live: Option<String>,
    #[serde(rename = "StreamIndex", default)]
    pub stream_indexes: Vec<StreamIndex>,
}

impl SmoothStreamingMedia {
    pub fn is_live(&self) -> bool {
        self.is_live
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamIndex {
    #[serde(rename = "@Type", default)]
    pub stream_type: String,
    #[serde(rename = "@Name")]
    pub name: Option<String>,
    #[serde(rename = "@Url")]
    pub url: Option<String>,
    #[serde(rename = "@TimeScale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@Chunks")]
    pub num_chunks: Option<u64>,
    #[serde(rename = "QualityLevel", default)]
    pub quality_levels: Vec<QualityLevel>,
    #[serde(rename = "c", default)]
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityLevel {
    #[serde(rename = "@Index")]
    pub index: Option<u32>,
    #[serde(rename = "@Bitrate", default)]
    pub bitrate: u64,
    #[serde(rename = "@FourCC")]
    pub four_cc: Option<String>,
}

/// One `c` element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fragment {
    #[serde(rename = "@t")]
    pub t: Option<u64>,
    #[serde(rename = "@d")]
    pub d: Option<u64>,
    #[serde(rename = "@r")]
    pub r: Option<u64>,
}

pub fn parse(xml: &str) -> Result<SmoothStreamingMedia, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}
