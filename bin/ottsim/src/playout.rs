use anyhow::{bail, Context};
use ottsim::{HttpClient, PlaybackOptions, Player};
use tokio_util::sync::CancellationToken;
use url::Url;

/// One line of a playout list: a manifest and the chunk to start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playout {
    pub url: Url,
    pub position: usize,
}

/// Parses a playout list.
///
/// One `url;position` per line. Empty lines and lines starting with `#` are
/// skipped, a missing position is 0.
pub fn parse_playouts(input: &str) -> anyhow::Result<Vec<Playout>> {
    let mut playouts = Vec::new();

    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (url, position) = line.split_once(';').unwrap_or((line, ""));
        let url = Url::parse(url.trim())
            .with_context(|| format!("line {}: invalid url {url:?}", number + 1))?;
        let position = match position.trim() {
            "" => 0,
            position => position
                .parse()
                .with_context(|| format!("line {}: invalid position {position:?}", number + 1))?,
        };
        playouts.push(Playout { url, position });
    }

    if playouts.is_empty() {
        bail!("no playout found");
    }
    Ok(playouts)
}

/// Loads and plays `playout` again and again, until it fails, `cycles` are
/// done or `cancel` is cancelled.
pub async fn run_playout(
    client: HttpClient,
    playout: Playout,
    options: PlaybackOptions,
    cycles: Option<u64>,
    cancel: CancellationToken,
) {
    let mut cycle = 0;
    while !cancel.is_cancelled() && cycles.map_or(true, |cycles| cycle < cycles) {
        cycle += 1;
        tracing::info!(
            "Starting playout of {} at chunk {} (cycle {cycle})",
            playout.url,
            playout.position
        );

        let mut player = Player::new(client.clone(), playout.url.clone())
            .with_options(options.clone())
            .with_cancellation(cancel.clone());
        if let Err(e) = player.load().await {
            tracing::error!("{e}");
            break;
        }

        let streams = player.default_streams();
        if streams.is_empty() {
            tracing::error!("No playable stream in {}", playout.url);
            break;
        }

        match player.play(&streams, playout.position).await {
            Ok(report) => tracing::info!(
                "Playout finished: {} requests, {} unsuccessful, {} bytes",
                report.requested(),
                report.unsuccessful(),
                report.bytes()
            ),
            Err(e) => {
                tracing::error!("{e}");
                break;
            }
        }
    }
}
