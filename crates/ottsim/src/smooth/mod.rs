//! # Smooth Streaming timelines
//!
//! Every `StreamIndex` of a known `Type` is a group, every `QualityLevel` in
//! it becomes one [`Stream`]. Chunk urls are the `StreamIndex@Url` template
//! with `{bitrate}` and `{start time}` substituted, resolved against the
//! manifest url.

pub mod model;

use url::Url;

use crate::{
    error::{OttError, OttResult},
    stream::{Stream, StreamType},
    template::Template,
    timeline::{build_chunks, RunEntry, Timescale},
    util::url::merge_baseurls,
    StreamTimeline,
};
use model::{Fragment, QualityLevel, SmoothStreamingMedia, StreamIndex};

impl StreamTimeline for SmoothStreamingMedia {
    fn streams(&self, manifest_url: &Url) -> OttResult<Vec<Stream>> {
        if self.is_live() {
            tracing::warn!("Live Smooth Streaming manifest, only the advertised window is played");
        }
        let timescale = Timescale::new(self.timescale, Timescale::SMOOTH_DEFAULT);

        let mut streams = Vec::new();
        for stream_index in self.stream_indexes.iter() {
            let stream_type = match stream_type(stream_index) {
                Ok(stream_type) => stream_type,
                Err(e) => {
                    tracing::warn!("Dropping StreamIndex {:?}: {e}", stream_index.name);
                    continue;
                }
            };
            let Some(url_template) = stream_index.url.as_deref() else {
                tracing::warn!("StreamIndex {:?} has no Url, skipped", stream_index.name);
                continue;
            };
            let timescale = Timescale::new(stream_index.timescale, timescale);
            let runs = run_entries(&stream_index.fragments);

            for quality_level in stream_index.quality_levels.iter() {
                match quality_level_stream(
                    stream_type,
                    quality_level,
                    url_template,
                    &runs,
                    timescale,
                    manifest_url,
                ) {
                    Ok(stream) => streams.push(stream),
                    Err(e) => tracing::warn!(
                        "Dropping {stream_type} QualityLevel {} bps: {e}",
                        quality_level.bitrate
                    ),
                }
            }
        }

        Ok(streams)
    }
}

/// Classifies a `StreamIndex` by its `Type`, ignoring case.
pub fn stream_type(stream_index: &StreamIndex) -> OttResult<StreamType> {
    match stream_index.stream_type.to_ascii_lowercase().as_str() {
        "video" => Ok(StreamType::Video),
        "audio" => Ok(StreamType::Audio),
        "text" => Ok(StreamType::Text),
        _ => Err(OttError::UnknownStreamType(format!(
            "StreamIndex type {:?}",
            stream_index.stream_type
        ))),
    }
}

fn quality_level_stream(
    stream_type: StreamType,
    quality_level: &QualityLevel,
    url_template: &str,
    runs: &[RunEntry],
    timescale: Timescale,
    manifest_url: &Url,
) -> OttResult<Stream> {
    let mut template = Template::smooth();
    template.insert(Template::BANDWIDTH, quality_level.bitrate);

    let chunks = build_chunks(runs.iter().copied(), timescale, |_, dts| {
        template.insert(Template::TIME, dts);
        merge_baseurls(manifest_url, &template.resolve(url_template))
    })?;

    Ok(Stream::new(stream_type, quality_level.bitrate, chunks))
}

/// Converts `c` elements into run entries.
///
/// `r` counts every fragment of the run, so `r="3"` is one fragment repeated twice.
/// A missing `d` is the gap to the next explicit `t`.
fn run_entries(fragments: &[Fragment]) -> Vec<RunEntry> {
    let mut runs = Vec::with_capacity(fragments.len());
    let mut cursor = 0u64;

    for (i, fragment) in fragments.iter().enumerate() {
        if let Some(t) = fragment.t.filter(|t| *t != 0) {
            cursor = t;
        }
        let repeat = fragment.r.unwrap_or(1).saturating_sub(1);

        let duration = match fragment.d {
            Some(d) => d,
            None => match fragments.get(i + 1).and_then(|next| next.t) {
                Some(next) if next > cursor && repeat == 0 => next - cursor,
                _ => {
                    tracing::warn!("Fragment {i} has no duration, assuming 0");
                    0
                }
            },
        };

        runs.push(RunEntry {
            time: fragment.t,
            duration,
            repeat,
        });
        cursor = cursor.saturating_add(duration.saturating_mul(repeat + 1));
    }

    runs
}
