//! Interactive console punter.
//!
//! Connects to a game behind the relay and reads moves from stdin:
//!
//! ```text
//! claim <site> <site>   claim a river
//! pass                  pass this turn
//! disconnect            leave the game
//! quit                  exit
//! ```
//!
//! Usage: cargo run --example console -- --port 9001 --name alice [--host 127.0.0.1] [--debug]

// ============================================================================
// Imports
// ============================================================================

use punter_client::{
    Client, Endpoint, LogCategory, Map, PunterId, Renderer, Result, Score, SiteId, punter_colour,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    host: String,
    port: u16,
    name: String,
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };

        Self {
            host: value_of("--host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: value_of("--port")
                .and_then(|p| p.parse().ok())
                .unwrap_or(9001),
            name: value_of("--name").unwrap_or_else(|| "console".to_string()),
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

/// Prints everything to stdout.
struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn on_init(&mut self, map: &Map) {
        println!(
            "[map] {} sites, {} rivers, mines {:?}",
            map.sites.len(),
            map.rivers.len(),
            map.mines
        );
        for river in &map.rivers {
            println!("       {} -- {}", river.source, river.target);
        }
    }

    fn on_edge_owned(&mut self, punter: PunterId, source: SiteId, target: SiteId) {
        println!("[edge] {source} -- {target} -> {punter} ({})", punter_colour(punter));
    }

    fn on_turn_changed(&mut self, is_ours: bool) {
        if is_ours {
            println!("[turn] your move: claim <a> <b> | pass");
        }
    }

    fn on_game_over(&mut self, scores: &[Score]) {
        println!("[over] final scores:");
        for score in scores {
            println!("       {}: {}", score.punter, score.score);
        }
    }

    fn on_log_line(&mut self, category: LogCategory, text: &str) {
        println!("[{category}] {text}");
    }

    fn on_status(&mut self, status: &str) {
        println!("[status] {status}");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        "punter_client=debug"
    } else {
        "punter_client=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let (client, handle) = Client::builder().build()?;
    handle.request_connect(Endpoint::new(args.host.clone(), args.port), args.name.clone())?;

    let game = tokio::spawn(async move {
        let mut renderer = ConsoleRenderer;
        client.run(&mut renderer).await
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["claim", a, b] => match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(a), Ok(b)) => handle.request_claim(SiteId::new(a), SiteId::new(b))?,
                _ => println!("usage: claim <site> <site>"),
            },
            ["pass"] => handle.request_pass()?,
            ["disconnect"] => handle.request_disconnect()?,
            ["connect"] => {
                handle.request_connect(Endpoint::new(args.host.clone(), args.port), args.name.clone())?;
            }
            ["quit"] => break,
            [] => {}
            _ => println!("commands: claim <a> <b> | pass | connect | disconnect | quit"),
        }
    }

    drop(handle);
    if let Ok(session) = game.await
        && let Some(scores) = session.scores()
    {
        println!("[done] {} scores recorded", scores.len());
    }

    Ok(())
}
