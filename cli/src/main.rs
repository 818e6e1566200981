use bossfall_cli::commands;
use bossfall_cli::logging;
use bossfall_cli::readline;
use bossfall_cli::tasks;
use bossfall_cli::CliContext;
use bossfall_core::ZoneConfig;
use clap::{Parser, Subcommand};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), String> {
    logging::init();
    let ctx = CliContext::new();

    {
        let mut background = ctx.tasks.lock().await;
        background.ticker = Some(tasks::start_ticker(&ctx));
        background.watcher = tasks::start_catalog_watcher(&ctx);
    }

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    ctx.tasks.lock().await.abort_all();
    Ok(())
}

#[derive(Parser)]
#[command(version, about = "bossfall")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List spawn zones
    Zones,
    /// Register a spawn zone
    ZoneAdd {
        id: String,
        world: String,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 64.0)]
        y: f64,
        #[arg(long, default_value_t = 0.0)]
        z: f64,
        #[arg(long)]
        max_concurrent: Option<u32>,
        #[arg(long)]
        spawn_rate: Option<f64>,
        /// Also write the zone to the configuration file
        #[arg(long)]
        save: bool,
    },
    /// Evaluate every zone now
    Tick,
    /// Record damage against a boss
    Hit {
        boss: u64,
        participant: u64,
        amount: f64,
    },
    /// Finish a boss as killed and hand out rewards
    Kill { boss: u64 },
    /// Finish a boss without rewards
    Despawn { boss: u64 },
    /// Show a boss's damage ranking
    Ranking { boss: u64, limit: Option<usize> },
    /// List live bosses
    Active,
    /// Finished encounters, newest first
    History {
        #[arg(short, long)]
        participant: Option<u64>,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    Stats,
    /// Re-read the catalog files
    Reload,
    Config,
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "bossfall".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::Zones) => commands::list_zones(ctx).await,
        Some(Commands::ZoneAdd {
            id,
            world,
            x,
            y,
            z,
            max_concurrent,
            spawn_rate,
            save,
        }) => {
            let mut zone = ZoneConfig::new(id, world, x, y, z);
            if let Some(max) = max_concurrent {
                zone.max_concurrent_bosses = max;
            }
            if let Some(rate) = spawn_rate {
                zone.spawn_rate = rate;
            }
            commands::add_zone(zone, save, ctx).await
        }
        Some(Commands::Tick) => commands::tick(ctx).await,
        Some(Commands::Hit {
            boss,
            participant,
            amount,
        }) => commands::hit(boss, participant, amount, ctx).await,
        Some(Commands::Kill { boss }) => commands::kill(boss, ctx).await,
        Some(Commands::Despawn { boss }) => commands::despawn(boss, ctx).await,
        Some(Commands::Ranking { boss, limit }) => commands::ranking(boss, limit, ctx).await,
        Some(Commands::Active) => commands::show_active(ctx).await,
        Some(Commands::History { participant, limit }) => {
            commands::history(participant, limit, ctx).await
        }
        Some(Commands::Stats) => commands::show_stats(ctx).await,
        Some(Commands::Reload) => commands::reload(ctx).await,
        Some(Commands::Config) => commands::show_settings(ctx).await,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
