//! Run-length chunk timelines shared by both manifest protocols.
//!
//! DASH `SegmentTimeline/S` and Smooth Streaming `StreamIndex/c` describe the
//! same thing: a list of runs, each with a duration, a repeat count and an
//! optional explicit start time. [`build_chunks`] expands such a list into
//! the canonical [`Chunk`] sequence of one rendition.

use std::{num::NonZeroU64, time::Duration};

use url::Url;

use crate::{
    error::{OttError, OttResult},
    stream::Chunk,
};

/// Most chunks one rendition may expand to. A day of one second chunks fits.
pub const MAX_CHUNKS: usize = 1 << 20;

/// One entry of a run-length segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunEntry {
    /// Explicit start time in ticks. Zero is treated as absent.
    pub time: Option<u64>,
    /// Duration of every chunk of this run, in ticks
    pub duration: u64,
    /// Number of additional chunks after the first one
    pub repeat: u64,
}

/// Ticks per second of a timeline. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timescale(NonZeroU64);

impl Timescale {
    pub const DASH_DEFAULT: Timescale = Timescale(NonZeroU64::MIN);
    pub const SMOOTH_DEFAULT: Timescale = match NonZeroU64::new(10_000_000) {
        Some(ts) => Timescale(ts),
        None => unreachable!(),
    };

    /// Uses `ticks` when it is present and non-zero, `fallback` otherwise.
    pub fn new(ticks: Option<u64>, fallback: Timescale) -> Self {
        ticks.and_then(NonZeroU64::new).map(Self).unwrap_or(fallback)
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.0.get()
    }

    pub fn to_duration(&self, ticks: u64) -> Duration {
        let nanos = ticks as u128 * 1_000_000_000 / self.0.get() as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Expands `runs` into chunks.
///
/// `chunk_url` receives the chunk index and its dts and returns the absolute
/// url of that chunk. The first url error aborts the whole rendition, as does
/// a timeline of more than [`MAX_CHUNKS`] chunks.
pub fn build_chunks<I, F>(runs: I, timescale: Timescale, mut chunk_url: F) -> OttResult<Vec<Chunk>>
where
    I: IntoIterator<Item = RunEntry>,
    F: FnMut(usize, u64) -> OttResult<Url>,
{
    let mut chunks = Vec::new();
    let mut dts = 0u64;

    for run in runs {
        if let Some(time) = run.time.filter(|t| *t != 0) {
            dts = time;
        }

        let run_length = run.repeat.saturating_add(1);
        if run_length > (MAX_CHUNKS - chunks.len()) as u64 {
            return Err(OttError::TimelineTooLong(MAX_CHUNKS));
        }

        let duration = timescale.to_duration(run.duration);
        for _ in 0..run_length {
            let index = chunks.len();
            chunks.push(Chunk {
                index,
                url: chunk_url(index, dts)?,
                dts,
                duration,
            });
            dts = dts.saturating_add(run.duration);
        }
    }

    Ok(chunks)
}
