use clap::Parser;
use std::error::Error;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use wordrush::config::{Config, ConfigStore, FileConfigStore};
use wordrush::display::StdoutDisplay;
use wordrush::judge::HttpJudge;
use wordrush::runtime::{
    run_session, spawn_stdin_reader, ChannelEventSource, JudgeDispatcher, TickHandle,
};
use wordrush::session::Session;
use wordrush::TICK_INTERVAL_MS;

/// terminal session client for a timed letter-grid word game
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Plays one timed round against a word-judge service: type words, \
one per line, before the clock runs out. The judge decides validity; \
score is the summed length of accepted words."
)]
struct Cli {
    /// base URL of the word-judge service
    #[clap(short = 'j', long)]
    judge_url: Option<String>,

    /// game length in seconds
    #[clap(short = 's', long)]
    secs: Option<u32>,

    /// write the resolved options back to the config file
    #[clap(long)]
    save_config: bool,
}

fn resolve_config(cli: &Cli) -> Config {
    let mut config = FileConfigStore::new().load();
    if let Some(url) = &cli.judge_url {
        config.judge_url = url.clone();
    }
    if let Some(secs) = cli.secs {
        config.game_secs = secs;
    }
    config
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli);
    if cli.save_config {
        FileConfigStore::new().save(&config)?;
    }

    let judge = Arc::new(HttpJudge::new(&config.judge_url)?);
    let session = Session::new(StdoutDisplay::new(), config.game_secs)?;

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone());
    let dispatcher = JudgeDispatcher::new(judge, tx.clone());
    let ticks = TickHandle::spawn(tx, Duration::from_millis(TICK_INTERVAL_MS));

    run_session(session, ChannelEventSource::new(rx), dispatcher, ticks);
    Ok(())
}
