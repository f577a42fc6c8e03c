use std::{str::FromStr, time::Duration};

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use ottsim::{FailurePolicy, HttpClient, HttpConfig, PlaybackOptions};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

mod load;
mod play;

#[derive(Subcommand, Clone)]
pub enum OttsimCommand {
    Load(load::LoadCommand),
    Play(play::PlayCommand),
}

impl OttsimCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Load(command) => command.run().await,
            Self::Play(command) => command.run().await,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct HttpOptions {
    /// Additional HTTP headers, `Name: value`
    #[clap(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Cookies sent to the origin, `name=value`
    #[clap(long = "cookie")]
    pub cookies: Vec<String>,

    /// HTTP timeout of a single request, in seconds
    #[clap(short, long, default_value = "10", env = "OTTSIM_TIMEOUT")]
    pub timeout: u64,

    /// Idle connections kept per host
    #[clap(long, default_value = "1024")]
    pub max_idle_per_host: usize,
}

impl HttpOptions {
    pub fn into_client(self) -> anyhow::Result<(HttpClient, Vec<String>)> {
        let mut headers = HeaderMap::new();
        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header {header:?}"))?;
            headers.insert(
                HeaderName::from_str(key.trim())
                    .with_context(|| format!("Invalid header name {key:?}"))?,
                HeaderValue::from_str(value.trim())
                    .with_context(|| format!("Invalid header value {value:?}"))?,
            );
        }

        let client = HttpClient::new(&HttpConfig {
            timeout: Duration::from_secs(self.timeout),
            pool_max_idle_per_host: self.max_idle_per_host,
            headers,
            ..Default::default()
        })?;
        Ok((client, self.cookies))
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FailurePolicyArg {
    /// Stop only the stream whose chunk failed
    #[default]
    StopStream,
    /// Stop every stream of the playout
    AbortSession,
}

impl From<FailurePolicyArg> for FailurePolicy {
    fn from(value: FailurePolicyArg) -> Self {
        match value {
            FailurePolicyArg::StopStream => FailurePolicy::StopStream,
            FailurePolicyArg::AbortSession => FailurePolicy::AbortSession,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct PlaybackArgs {
    /// Request chunks back to back instead of in real time
    #[clap(long)]
    pub burst: bool,

    /// What a failed chunk request stops
    #[clap(long, value_enum, default_value_t)]
    pub failure_policy: FailurePolicyArg,

    /// Chunk results buffered per stream
    #[clap(long, default_value = "16")]
    pub queue_capacity: usize,
}

impl From<PlaybackArgs> for PlaybackOptions {
    fn from(args: PlaybackArgs) -> Self {
        PlaybackOptions {
            real_time: !args.burst,
            failure_policy: args.failure_policy.into(),
            queue_capacity: args.queue_capacity,
        }
    }
}

pub fn add_cookies(client: &HttpClient, cookies: &[String], url: &Url) {
    if cookies.is_empty() {
        return;
    }
    if let Err(e) = client.add_cookies(cookies.to_vec(), url.clone()) {
        tracing::warn!("Failed to add cookies for {url}: {e}");
    }
}

/// The first Ctrl-C cancels `cancel`, the second one exits.
pub fn handle_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("Ctrl-C received, stopping playouts.");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("Ctrl-C received again, force exit.");
        std::process::exit(1);
    })
}
