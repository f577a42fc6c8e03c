use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    error::{OttError, OttResult},
    fetch::fetch,
    manifest::{Manifest, Protocol},
    scheduler::{
        FailurePolicy, PlaybackOptions, PlaybackScheduler, StreamOutcome, StreamPlayback,
    },
    select::default_streams,
    stream::{Stream, StreamType},
    util::http::HttpClient,
    StreamTimeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    NotLoaded,
    Loaded,
    Playing,
}

/// Request statistics of one played stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub stream_type: StreamType,
    pub bitrate: u64,
    /// Requests that got a response
    pub requested: usize,
    /// Responses with a non-2xx status
    pub unsuccessful: usize,
    /// Requests that got no response
    pub failed: usize,
    pub bytes: u64,
    pub outcome: StreamOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub streams: Vec<StreamReport>,
}

impl PlaybackReport {
    pub fn requested(&self) -> usize {
        self.streams.iter().map(|s| s.requested).sum()
    }

    pub fn unsuccessful(&self) -> usize {
        self.streams.iter().map(|s| s.unsuccessful).sum()
    }

    pub fn bytes(&self) -> u64 {
        self.streams.iter().map(|s| s.bytes).sum()
    }
}

struct Session {
    state: PlayerState,
    cancel: Option<CancellationToken>,
}

/// An emulated client of a single manifest.
///
/// ```text
/// NotLoaded --load--> Loaded --play--> Playing --+--> Loaded     (finished, stopped, failed chunk)
///                                                +--> NotLoaded  (playback task died)
/// ```
///
/// `play` blocks until every stream is played. `stop` can be called from
/// another task while `play` runs.
pub struct Player {
    client: HttpClient,
    manifest_url: Url,
    options: PlaybackOptions,
    parent: CancellationToken,

    protocol: Option<Protocol>,
    streams: Vec<Stream>,
    session: Mutex<Session>,
}

impl Player {
    pub fn new(client: HttpClient, manifest_url: Url) -> Self {
        Self {
            client,
            manifest_url,
            options: PlaybackOptions::default(),
            parent: CancellationToken::new(),
            protocol: None,
            streams: Vec::new(),
            session: Mutex::new(Session {
                state: PlayerState::NotLoaded,
                cancel: None,
            }),
        }
    }

    /// Every playback of this player is cancelled along with `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.parent = token;
        self
    }

    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> PlayerState {
        self.session().state
    }

    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    /// Protocol of the loaded manifest.
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Every stream of the loaded manifest, in manifest order.
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn default_streams(&self) -> Vec<Stream> {
        default_streams(&self.streams)
    }

    /// Fetches the manifest and builds its streams.
    pub async fn load(&mut self) -> OttResult<()> {
        self.expect_state("load", PlayerState::NotLoaded)?;

        tracing::debug!("Fetching manifest {}", self.manifest_url);
        let bytes = fetch(&self.client, self.manifest_url.clone())
            .await
            .map_err(|e| OttError::ManifestFetchError(self.manifest_url.clone(), Box::new(e)))?;

        self.load_manifest(&bytes)
    }

    /// Builds the streams of an already fetched manifest.
    pub fn load_manifest(&mut self, bytes: &[u8]) -> OttResult<()> {
        self.expect_state("load", PlayerState::NotLoaded)?;

        let manifest = Manifest::parse(bytes)?;
        let streams = manifest.streams(&self.manifest_url)?;
        tracing::info!(
            "Loaded {} manifest {} with {} stream(s)",
            manifest.protocol(),
            self.manifest_url,
            streams.len()
        );

        self.protocol = Some(manifest.protocol());
        self.streams = streams;
        self.session().state = PlayerState::Loaded;
        Ok(())
    }

    /// Plays `streams` from chunk `position` until every one of them is done.
    ///
    /// Under [`FailurePolicy::AbortSession`] the first failed chunk request is
    /// returned instead of the report.
    pub async fn play(&self, streams: &[Stream], position: usize) -> OttResult<PlaybackReport> {
        let cancel = {
            let mut session = self.session();
            if session.state != PlayerState::Loaded {
                return Err(OttError::InvalidState {
                    operation: "play",
                    state: session.state,
                });
            }
            let cancel = self.parent.child_token();
            session.state = PlayerState::Playing;
            session.cancel = Some(cancel.clone());
            cancel
        };
        let _playing = PlayingGuard {
            player: self,
            cancel: cancel.clone(),
        };

        let scheduler =
            PlaybackScheduler::new(self.client.clone()).options(self.options.clone());
        let playbacks = scheduler.play(streams, position, &cancel);
        let results = futures::future::join_all(playbacks.into_iter().map(drain)).await;

        let mut session = self.session();
        session.cancel = None;

        let mut report = PlaybackReport::default();
        let mut first_error = None;
        for result in results {
            match result {
                Ok((stream_report, error)) => {
                    report.streams.push(stream_report);
                    if first_error.is_none() {
                        first_error = error;
                    }
                }
                Err(e) => {
                    tracing::error!("{e}");
                    session.state = PlayerState::NotLoaded;
                    return Err(e);
                }
            }
        }
        session.state = PlayerState::Loaded;

        match first_error {
            Some(e) if self.options.failure_policy == FailurePolicy::AbortSession => Err(e),
            _ => Ok(report),
        }
    }

    /// Cancels the running `play`.
    pub fn stop(&self) -> OttResult<()> {
        let session = self.session();
        if session.state != PlayerState::Playing {
            return Err(OttError::InvalidState {
                operation: "stop",
                state: session.state,
            });
        }
        if let Some(cancel) = &session.cancel {
            tracing::info!("Stopping playback of {}", self.manifest_url);
            cancel.cancel();
        }
        Ok(())
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expect_state(&self, operation: &'static str, expected: PlayerState) -> OttResult<()> {
        let state = self.state();
        if state != expected {
            return Err(OttError::InvalidState { operation, state });
        }
        Ok(())
    }
}

/// Ends a session whose `play` future is dropped before it completes.
///
/// Declared before the session lock in `play`, so it runs after that lock is
/// released on every return path.
struct PlayingGuard<'a> {
    player: &'a Player,
    cancel: CancellationToken,
}

impl Drop for PlayingGuard<'_> {
    fn drop(&mut self) {
        self.cancel.cancel();

        let mut session = self.player.session();
        if session.state == PlayerState::Playing {
            tracing::debug!("Playback of {} dropped", self.player.manifest_url);
            session.state = PlayerState::Loaded;
            session.cancel = None;
        }
    }
}

/// Reads every result of a stream, then waits for its task.
async fn drain(mut playback: StreamPlayback) -> OttResult<(StreamReport, Option<OttError>)> {
    let stream_type = playback.stream_type();
    let mut report = StreamReport {
        stream_type,
        bitrate: playback.bitrate(),
        requested: 0,
        unsuccessful: 0,
        failed: 0,
        bytes: 0,
        outcome: StreamOutcome::Completed { dispatched: 0 },
    };
    let mut first_error = None;

    while let Some(result) = playback.recv().await {
        match result {
            Ok(chunk) => {
                report.requested += 1;
                report.bytes += chunk.content_length;
                if chunk.status.is_success() {
                    tracing::debug!(
                        "{stream_type} - [GET {}] {} {}",
                        chunk.status.as_u16(),
                        chunk.url,
                        chunk.content_length
                    );
                } else {
                    report.unsuccessful += 1;
                    tracing::warn!(
                        "{stream_type} - [GET {}] {} {}",
                        chunk.status.as_u16(),
                        chunk.url,
                        chunk.content_length
                    );
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!("{stream_type} - {e}");
                first_error.get_or_insert(e);
            }
        }
    }

    report.outcome = playback.finish().await?;
    Ok((report, first_error))
}
