use clap::Parser;

mod commands;
mod playout;

#[derive(Parser, Clone)]
#[clap(name = "ottsim", version, about)]
struct OttsimArgs {
    /// Log every chunk request, not only the unsuccessful ones
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: commands::OttsimCommand,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = OttsimArgs::parse();

    let default_filter = if args.verbose {
        "info,ottsim=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .try_from_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    args.command.run().await
}
