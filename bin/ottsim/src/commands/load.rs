use std::{path::PathBuf, time::Duration};

use clap::Parser;
use futures::future::join_all;
use ottsim::PlaybackOptions;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{add_cookies, handle_ctrl_c, HttpOptions, PlaybackArgs};
use crate::playout::{parse_playouts, run_playout};

/// Play every manifest of a playout list concurrently, in a loop
#[derive(Parser, Clone, Debug)]
#[clap(name = "load", short_flag = 'L')]
pub struct LoadCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    #[clap(flatten)]
    pub playback: PlaybackArgs,

    /// Playout list, one `url;position` per line
    #[clap(short, long)]
    pub input: PathBuf,

    /// Delay between the start of two playouts, in milliseconds
    #[clap(long, default_value = "1000")]
    pub interval: u64,

    /// Cycles of each playout, unlimited when absent
    #[clap(long)]
    pub loops: Option<u64>,
}

impl LoadCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        let input = tokio::fs::read_to_string(&self.input).await?;
        let playouts = parse_playouts(&input)?;
        tracing::info!("{} playout(s) loaded from {}", playouts.len(), self.input.display());

        let (client, cookies) = self.http.into_client()?;
        let options = PlaybackOptions::from(self.playback);
        let interval = Duration::from_millis(self.interval);

        let cancel = CancellationToken::new();
        let ctrlc_handler = handle_ctrl_c(cancel.clone());

        let mut handles = Vec::with_capacity(playouts.len());
        for (idx, playout) in playouts.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            add_cookies(&client, &cookies, &playout.url);

            let span = tracing::info_span!("playout", idx = idx + 1);
            handles.push(tokio::spawn(
                run_playout(
                    client.clone(),
                    playout,
                    options.clone(),
                    self.loops,
                    cancel.clone(),
                )
                .instrument(span),
            ));

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Playout task failed: {e}");
            }
        }

        ctrlc_handler.abort();
        Ok(())
    }
}
