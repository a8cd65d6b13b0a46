use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use triple_ma::{
    Bar, BarGenerator, Config, HistoryProvider, MarketEvent, PaperSession, Strategy, SyntheticFeed,
};

/// Run the triple moving-average strategy against a synthetic feed and a paper venue
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to $CONFIG_FILE, then config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of live ticks to replay
    #[arg(long)]
    ticks: Option<usize>,

    /// Feed RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Wall-clock delay between ticks in milliseconds
    #[arg(long, default_value = "0")]
    pace_ms: u64,
}

/// Warm-up history drawn from the same random walk as the live feed
struct SyntheticHistory {
    start_price: Decimal,
    end_time: DateTime<Utc>,
    seed: u64,
    volatility: f64,
}

impl HistoryProvider for SyntheticHistory {
    fn load_bars(&mut self, symbol: &str, days: u32) -> anyhow::Result<Vec<Bar>> {
        let minutes = u64::from(days) * 24 * 60;
        let start = self.end_time - chrono::Duration::minutes(minutes as i64);

        // Four ticks a minute, folded into one-minute bars
        let ticks = SyntheticFeed::new(symbol, self.start_price, start, self.seed)
            .with_tick_interval(Duration::from_secs(15))
            .with_tick_count(minutes as usize * 4)
            .with_volatility(self.volatility)
            .generate();

        let mut bg = BarGenerator::new(1)?;
        let mut bars: Vec<Bar> = ticks.iter().flat_map(|t| bg.update_tick(t)).collect();
        bars.extend(bg.flush());
        Ok(bars)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load().unwrap_or_default(),
    };
    triple_ma::utils::init_from_config(&config.logging)?;

    info!("Triple MA paper trader | {} | env {}", config.general.symbol, config.general.environment);
    info!("Parameters: {:?}", config.strategy);

    let symbol = config.general.symbol.clone();
    let seed = args.seed.unwrap_or(config.paper.seed);
    let ticks = args.ticks.unwrap_or(config.paper.ticks);

    let mut session = PaperSession::new(symbol.clone(), config.strategy.clone(), config.paper.slippage_bps)?;

    let live_start = Utc::now();
    let mut history = SyntheticHistory {
        start_price: config.paper.start_price,
        end_time: live_start,
        seed: seed.wrapping_add(1),
        volatility: config.paper.volatility,
    };
    session.strategy_mut().on_init(&mut history)?;
    session.strategy_mut().on_start();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let feed = SyntheticFeed::new(symbol.clone(), config.paper.start_price, live_start, seed)
        .with_tick_count(ticks)
        .with_tick_interval(Duration::from_millis(config.paper.tick_interval_ms))
        .with_volatility(config.paper.volatility)
        .with_pace(Duration::from_millis(args.pace_ms));
    let feed_handle = tokio::spawn(feed.run(event_tx));

    loop {
        let event = tokio::select! {
            event = event_rx.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, shutting down");
                break;
            }
        };

        let Some(event) = event else { break };

        match event {
            MarketEvent::Connected => info!("Feed connected"),
            MarketEvent::Disconnected => {
                info!("Feed finished after {} ticks", session.tick_count());
                break;
            }
            // Fills are settled inside the session before the next event is read
            MarketEvent::Tick(tick) => session.on_tick(&tick),
            MarketEvent::MinuteBar(bar) => session.on_bar(&bar),
        }
    }

    session.finish();
    feed_handle.abort();

    let snapshot = session.strategy().snapshot();
    info!(
        "Ticks: {} | Fills: {} | Decision bars: {}",
        session.tick_count(),
        session.fill_count(),
        snapshot.bars_seen
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
