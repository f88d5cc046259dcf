use clap::Parser;
use otter_logger::{
    app::{App, load_config},
    cli::Cli,
};
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.tracing_level_filter())
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    debug!(config = ?cli);

    let config = load_config(&cli)?;
    let app = App::new(config, cli.conffile.clone())?;
    app.run(cli.command).await
}
