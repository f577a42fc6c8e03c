//! # Real-time chunk playback
//!
//! One task per stream requests the chunks of that stream in order, each one
//! no earlier than the summed durations of the chunks before it:
//!
//! ```text
//! video  |c0 2s    |c1 2s    |c2 2s    |
//! audio  |c0 1s|c1 1s|c2 1s|c3 1s|...
//!        ^ task start
//! ```
//!
//! A request that takes longer than its chunk lasts delays the next one, the
//! task never skips ahead to catch up. Every request produces one item in the
//! bounded result queue of its stream.

use std::{sync::Arc, time::Duration};

use reqwest::StatusCode;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    error::OttResult,
    fetch::ChunkFetcher,
    stream::{Stream, StreamType},
};

/// What happens to the rest of the session when a chunk request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Only the failing stream stops
    #[default]
    StopStream,
    /// Every stream of the session stops
    AbortSession,
}

#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    /// Wait for the previous chunks to elapse before each request. Disabled, every chunk
    /// is requested as soon as the previous one is received.
    pub real_time: bool,
    pub failure_policy: FailurePolicy,
    /// Capacity of the result queue of each stream
    pub queue_capacity: usize,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            real_time: true,
            failure_policy: FailurePolicy::default(),
            queue_capacity: 16,
        }
    }
}

/// A chunk request that got a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub index: usize,
    pub url: Url,
    pub status: StatusCode,
    pub content_length: u64,
    pub dispatched_at: Instant,
    /// Time between the first request of the stream and this one
    pub offset: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every chunk after the start index was requested
    Completed { dispatched: usize },
    /// Stopped by the session token, or because the results were no longer read
    Cancelled { dispatched: usize },
    /// Stopped by a failed chunk request
    Failed { dispatched: usize },
}

impl StreamOutcome {
    pub fn dispatched(&self) -> usize {
        match self {
            Self::Completed { dispatched }
            | Self::Cancelled { dispatched }
            | Self::Failed { dispatched } => *dispatched,
        }
    }
}

/// The running playback of one stream.
pub struct StreamPlayback {
    stream_type: StreamType,
    bitrate: u64,
    results: mpsc::Receiver<OttResult<ChunkResult>>,
    handle: JoinHandle<StreamOutcome>,
}

impl StreamPlayback {
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    /// Next request result, `None` once the stream task has finished.
    pub async fn recv(&mut self) -> Option<OttResult<ChunkResult>> {
        self.results.recv().await
    }

    /// Waits for the stream task. Unread results are discarded.
    pub async fn finish(self) -> OttResult<StreamOutcome> {
        drop(self.results);
        Ok(self.handle.await?)
    }
}

pub struct PlaybackScheduler<F> {
    fetcher: Arc<F>,
    options: PlaybackOptions,
}

impl<F> PlaybackScheduler<F>
where
    F: ChunkFetcher + Send + Sync + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            options: PlaybackOptions::default(),
        }
    }

    pub fn options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    /// Starts one task per stream, beginning at chunk `start_index`.
    ///
    /// Cancelling `cancel` stops every task before its next request. Under
    /// [`FailurePolicy::AbortSession`] a failed request cancels it.
    pub fn play(
        &self,
        streams: &[Stream],
        start_index: usize,
        cancel: &CancellationToken,
    ) -> Vec<StreamPlayback> {
        tracing::debug!(
            "Starting playback of {} stream(s) from chunk {start_index}",
            streams.len()
        );

        streams
            .iter()
            .map(|stream| {
                let (sender, results) = mpsc::channel(self.options.queue_capacity.max(1));
                let handle = tokio::spawn(play_stream(
                    self.fetcher.clone(),
                    stream.clone(),
                    start_index,
                    self.options.clone(),
                    cancel.clone(),
                    sender,
                ));

                StreamPlayback {
                    stream_type: stream.stream_type(),
                    bitrate: stream.bitrate(),
                    results,
                    handle,
                }
            })
            .collect()
    }
}

async fn play_stream<F>(
    fetcher: Arc<F>,
    stream: Stream,
    start_index: usize,
    options: PlaybackOptions,
    cancel: CancellationToken,
    results: mpsc::Sender<OttResult<ChunkResult>>,
) -> StreamOutcome
where
    F: ChunkFetcher,
{
    let mut dispatched = 0;
    let mut accumulated = Duration::ZERO;
    let mut task_start = None;

    for chunk in stream.chunks().iter().filter(|c| c.index >= start_index) {
        if cancel.is_cancelled() {
            return StreamOutcome::Cancelled { dispatched };
        }

        let start = *task_start.get_or_insert_with(Instant::now);
        if options.real_time {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamOutcome::Cancelled { dispatched },
                _ = tokio::time::sleep_until(start + accumulated) => {}
            }
        }

        let dispatched_at = Instant::now();
        dispatched += 1;
        let result = fetcher.fetch_chunk(chunk).await.map(|response| {
            accumulated += chunk.duration;
            ChunkResult {
                index: chunk.index,
                url: response.url,
                status: response.status,
                content_length: response.content_length,
                dispatched_at,
                offset: dispatched_at - start,
            }
        });

        let failed = result.is_err();
        if results.send(result).await.is_err() {
            tracing::debug!("Results of {} stream dropped, stopping", stream.stream_type());
            return StreamOutcome::Cancelled { dispatched };
        }
        if failed {
            if options.failure_policy == FailurePolicy::AbortSession {
                cancel.cancel();
            }
            return StreamOutcome::Failed { dispatched };
        }
    }

    StreamOutcome::Completed { dispatched }
}
