//! # MPEG-DASH timelines
//!
//! Builds [`Stream`]s from the first `Period` of an MPD whose adaptation sets
//! address their segments with `SegmentTemplate` + `SegmentTimeline`.
//!
//! Each adaptation set is classified into a [`StreamType`] from its mime type
//! and descriptors. Sets that can not be classified are dropped, as are sets
//! without a timeline template. Every `Representation` of a kept set becomes
//! one stream whose chunk urls substitute `$Bandwidth$`, `$Time$`,
//! `$Number$` and `$RepresentationID$` into the `media` template.

pub mod model;

use std::borrow::Cow;

use url::Url;

use crate::{
    error::{OttError, OttResult},
    stream::{Stream, StreamType},
    template::Template,
    timeline::{build_chunks, RunEntry, Timescale},
    util::url::merge_baseurls,
    StreamTimeline,
};
use model::{AdaptationSet, BaseUrl, Mpd, Representation, SegmentTemplate, S};

const TRICKMODE_SCHEME: &str = "http://dashif.org/guide-lines/trickmode";
const ROLE_SCHEME: &str = "urn:mpeg:dash:role:2011";

impl StreamTimeline for Mpd {
    fn streams(&self, manifest_url: &Url) -> OttResult<Vec<Stream>> {
        let base_url = with_base_url(Cow::Borrowed(manifest_url), &self.base_urls)?;

        let Some(period) = self.periods.first() else {
            tracing::warn!("MPD has no Period, no stream available");
            return Ok(Vec::new());
        };
        let base_url = with_base_url(base_url, &period.base_urls)?;

        let mut streams = Vec::new();
        for adaptation_set in period.adaptation_sets.iter() {
            let stream_type = match stream_type(adaptation_set) {
                Ok(stream_type) => stream_type,
                Err(e) => {
                    tracing::warn!("Dropping adaptation set {:?}: {e}", adaptation_set.id);
                    continue;
                }
            };
            let base_url = match with_base_url(base_url.clone(), &adaptation_set.base_urls) {
                Ok(base_url) => base_url,
                Err(e) => {
                    tracing::warn!(
                        "Dropping adaptation set {:?}, unusable BaseURL: {e}",
                        adaptation_set.id
                    );
                    continue;
                }
            };

            for representation in adaptation_set.representations.iter() {
                match representation_stream(stream_type, adaptation_set, representation, &base_url)
                {
                    Ok(Some(stream)) => streams.push(stream),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        "Dropping representation {:?} ({} bps): {e}",
                        representation.id,
                        representation.bandwidth
                    ),
                }
            }
        }

        Ok(streams)
    }
}

/// Classifies an adaptation set.
///
/// Returns [`OttError::UnknownStreamType`] when the set is not playable by this client.
pub fn stream_type(adaptation_set: &AdaptationSet) -> OttResult<StreamType> {
    let mime_type = adaptation_set
        .mime_type
        .as_deref()
        .or(adaptation_set.content_type.as_deref())
        .unwrap_or_default();
    let unknown = || OttError::UnknownStreamType(format!("mime type {mime_type:?}"));

    if mime_type.starts_with("video") {
        if adaptation_set.essential_properties.is_empty() {
            Ok(StreamType::Video)
        } else if adaptation_set
            .essential_properties
            .iter()
            .any(|p| p.scheme_id_uri == TRICKMODE_SCHEME)
        {
            Ok(StreamType::Trickmode)
        } else {
            // an essential property this client does not understand
            Err(unknown())
        }
    } else if mime_type.starts_with("audio") {
        Ok(StreamType::Audio)
    } else if mime_type == "application/mp4" {
        let is_subtitle = adaptation_set.roles.iter().any(|role| {
            role.scheme_id_uri == ROLE_SCHEME
                && matches!(role.value.as_deref(), Some("subtitle" | "caption"))
        });
        if is_subtitle {
            Ok(StreamType::Text)
        } else {
            Err(unknown())
        }
    } else if mime_type.starts_with("text") {
        Ok(StreamType::Text)
    } else {
        Err(unknown())
    }
}

fn representation_stream(
    stream_type: StreamType,
    adaptation_set: &AdaptationSet,
    representation: &Representation,
    base_url: &Url,
) -> OttResult<Option<Stream>> {
    let Some(segment_template) = segment_template(adaptation_set, representation) else {
        tracing::warn!(
            "Representation {:?} has no SegmentTemplate, skipped",
            representation.id
        );
        return Ok(None);
    };
    let (Some(media), Some(timeline)) = (
        segment_template.media.as_deref(),
        segment_template.segment_timeline.as_ref(),
    ) else {
        tracing::warn!(
            "Representation {:?} is not addressed by a SegmentTimeline, skipped",
            representation.id
        );
        return Ok(None);
    };

    let base_url = with_base_url(Cow::Borrowed(base_url), &representation.base_urls)?;
    let timescale = Timescale::new(segment_template.timescale, Timescale::DASH_DEFAULT);
    let start_number = segment_template.start_number.unwrap_or(1);

    let mut template = Template::dash();
    template.insert(Template::BANDWIDTH, representation.bandwidth);
    if let Some(id) = &representation.id {
        template.insert(Template::REPRESENTATION_ID, id);
    }

    let runs = timeline.segments.iter().map(run_entry);
    let chunks = build_chunks(runs, timescale, |index, dts| {
        template.insert(Template::TIME, dts);
        template.insert(Template::NUMBER, start_number + index as u64);
        merge_baseurls(&base_url, &template.resolve(media))
    })?;

    Ok(Some(Stream::new(
        stream_type,
        representation.bandwidth,
        chunks,
    )))
}

/// The template of a representation, inheriting every attribute it leaves out
/// from the one of its adaptation set.
fn segment_template<'a>(
    adaptation_set: &'a AdaptationSet,
    representation: &'a Representation,
) -> Option<Cow<'a, SegmentTemplate>> {
    match (
        representation.segment_template.as_ref(),
        adaptation_set.segment_template.as_ref(),
    ) {
        (Some(own), Some(inherited)) => Some(Cow::Owned(SegmentTemplate {
            timescale: own.timescale.or(inherited.timescale),
            media: own.media.clone().or_else(|| inherited.media.clone()),
            initialization: own
                .initialization
                .clone()
                .or_else(|| inherited.initialization.clone()),
            start_number: own.start_number.or(inherited.start_number),
            segment_timeline: own
                .segment_timeline
                .clone()
                .or_else(|| inherited.segment_timeline.clone()),
        })),
        (Some(template), None) | (None, Some(template)) => Some(Cow::Borrowed(template)),
        (None, None) => None,
    }
}

fn run_entry(s: &S) -> RunEntry {
    let repeat = match s.r {
        Some(r) if r < 0 => {
            tracing::warn!("Open-ended repeat r={r} is not supported, playing a single segment");
            0
        }
        Some(r) => r as u64,
        None => 0,
    };
    RunEntry {
        time: s.t,
        duration: s.d,
        repeat,
    }
}

fn with_base_url<'a>(current: Cow<'a, Url>, base_urls: &[BaseUrl]) -> OttResult<Cow<'a, Url>> {
    match base_urls.first() {
        Some(base_url) => Ok(Cow::Owned(merge_baseurls(&current, &base_url.base)?)),
        None => Ok(current),
    }
}
