use std::time::Duration;

use clap::Parser;
use ottsim::PlaybackOptions;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

use super::{add_cookies, handle_ctrl_c, HttpOptions, PlaybackArgs};
use crate::playout::{run_playout, Playout};

/// Play a single manifest once, or relaunch it periodically
#[derive(Parser, Clone, Debug)]
#[clap(name = "play", short_flag = 'P')]
pub struct PlayCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    #[clap(flatten)]
    pub playback: PlaybackArgs,

    /// Manifest url
    pub url: Url,

    /// Chunk to start playing from
    #[clap(short, long, default_value = "0")]
    pub position: usize,

    /// Launch a new playout every this many seconds, until Ctrl-C
    #[clap(long)]
    pub interval: Option<u64>,
}

impl PlayCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        let (client, cookies) = self.http.into_client()?;
        add_cookies(&client, &cookies, &self.url);

        let options = PlaybackOptions::from(self.playback);
        let playout = Playout {
            url: self.url,
            position: self.position,
        };

        let cancel = CancellationToken::new();
        let ctrlc_handler = handle_ctrl_c(cancel.clone());

        let Some(interval) = self.interval else {
            run_playout(client, playout, options, Some(1), cancel).await;
            ctrlc_handler.abort();
            return Ok(());
        };

        let mut playouts = JoinSet::new();
        let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
        let mut idx = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    idx += 1;
                    let span = tracing::info_span!("playout", idx);
                    playouts.spawn(
                        run_playout(
                            client.clone(),
                            playout.clone(),
                            options.clone(),
                            Some(1),
                            cancel.clone(),
                        )
                        .instrument(span),
                    );
                }
                // reap finished playouts
                Some(_) = playouts.join_next(), if !playouts.is_empty() => {}
            }
        }

        while playouts.join_next().await.is_some() {}
        ctrlc_handler.abort();
        Ok(())
    }
}
