//! Structural decode of the parts of an MPD the timeline builder reads.
//!
//! Element and attribute names follow ISO/IEC 23009-1. Anything else in the
//! document is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mpd {
    #[serde(rename = "@type")]
    pub mpd_type: Option<String>,
    #[serde(rename = "BaseURL", default)]
    pub base_urls: Vec<BaseUrl>,
    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseUrl {
    #[serde(rename = "$text", default)]
    pub base: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Period {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "BaseURL", default)]
    pub base_urls: Vec<BaseUrl>,
    #[serde(rename = "AdaptationSet", default)]
    pub adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdaptationSet {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "@contentType")]
    pub content_type: Option<String>,
    #[serde(rename = "@lang")]
    pub lang: Option<String>,
    #[serde(rename = "BaseURL", default)]
    pub base_urls: Vec<BaseUrl>,
    #[serde(rename = "Role", default)]
    pub roles: Vec<Descriptor>,
    #[serde(rename = "EssentialProperty", default)]
    pub essential_properties: Vec<Descriptor>,
    #[serde(rename = "SegmentTemplate")]
    pub segment_template: Option<SegmentTemplate>,
    #[serde(rename = "Representation", default)]
    pub representations: Vec<Representation>,
}

/// `DescriptorType`, used by `Role` and `EssentialProperty`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "@schemeIdUri", default)]
    pub scheme_id_uri: String,
    #[serde(rename = "@value")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Representation {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@bandwidth", default)]
    pub bandwidth: u64,
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "BaseURL", default)]
    pub base_urls: Vec<BaseUrl>,
    #[serde(rename = "SegmentTemplate")]
    pub segment_template: Option<SegmentTemplate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentTemplate {
    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@media")]
    pub media: Option<String>,
    #[serde(rename = "@initialization")]
    pub initialization: Option<String>,
    #[serde(rename = "@startNumber")]
    pub start_number: Option<u64>,
    #[serde(rename = "SegmentTimeline")]
    pub segment_timeline: Option<SegmentTimeline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentTimeline {
    #[serde(rename = "S", default)]
    pub segments: Vec<S>,
}

/// One `SegmentTimeline/S` run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S {
    #[serde(rename = "@t")]
    pub t: Option<u64>,
    #[serde(rename = "@d")]
    pub d: u64,
    /// Negative values mean "repeat until the next `S` or the end of the period"
    #[serde(rename = "@r")]
    pub r: Option<i64>,
}

pub fn parse(xml: &str) -> Result<Mpd, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}
