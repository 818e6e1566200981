use bossfall_core::context::EngineConfigExt;
use bossfall_core::{
    BossId, EncounterOutcome, EncounterStore, FinalizedLedger, Page, ParticipantId, RankingEntry,
    ReloadSummary, SpawnEvent, ZoneConfig,
};
use std::io::Write;
use std::sync::Arc;

use crate::CliContext;
use crate::observer::RandomObserver;
use crate::tasks;

// ─────────────────────────────────────────────────────────────────────────────
// Zones and Spawning
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_zones(ctx: &CliContext) {
    let zones = ctx.engine.scheduler().zones();
    if zones.is_empty() {
        println!("No zones configured");
        return;
    }

    println!(
        "{:<16} {:<12} {:>24} {:>8} {:>10}",
        "Zone", "World", "Center", "Bosses", "Rate"
    );
    println!("{}", "-".repeat(74));
    for zone in zones {
        let center = format!("{:.0}, {:.0}, {:.0}", zone.center.x, zone.center.y, zone.center.z);
        println!(
            "{:<16} {:<12} {:>24} {:>8} {:>10.2}",
            zone.id,
            zone.world(),
            center,
            format!("{}/{}", zone.live_boss_count, zone.max_concurrent_bosses),
            zone.spawn_rate
        );
    }
}

pub async fn add_zone(zone: ZoneConfig, save: bool, ctx: &CliContext) {
    if let Err(e) = ctx.engine.create_zone(&zone) {
        println!("Error: {e}");
        return;
    }
    println!("Zone {} added in {}", zone.id, zone.world);

    if save {
        let mut config = ctx.config.write().await;
        config.zones.push(zone);
        match config.save() {
            Ok(()) => println!("Configuration saved"),
            Err(e) => println!("Failed to save configuration: {e}"),
        }
    }
}

/// Run one scheduler pass right now instead of waiting for the clock.
pub async fn tick(ctx: &CliContext) {
    let observer = RandomObserver::new(bossfall_core::SharedRng::from_entropy());
    let events = ctx.engine.tick_all(&observer);
    if events.is_empty() {
        println!("No bosses spawned");
    }
    for event in &events {
        print_spawn(event);
    }
}

pub fn print_spawn(event: &SpawnEvent) {
    println!(
        "[{}] {} (id {}, tier {}, {} hp) spawned in {} at {:.0}, {:.0}, {:.0}",
        event.spawned_at.format("%H:%M:%S"),
        event.boss.display_name(),
        event.boss_id,
        event.boss.tier,
        event.boss.health.round(),
        event.zone_id,
        event.location.x,
        event.location.y,
        event.location.z,
    );
}

pub async fn show_active(ctx: &CliContext) {
    let active = ctx.engine.scheduler().all_active_bosses();
    if active.is_empty() {
        println!("No active bosses");
        return;
    }

    println!("{:<8} {:<28} {:<16} {:>6} {:>12}", "Id", "Boss", "Zone", "Tier", "Damage");
    println!("{}", "-".repeat(74));
    for event in active {
        let damage = ctx.engine.ledger().total_damage(event.boss_id).unwrap_or(0.0);
        println!(
            "{:<8} {:<28} {:<16} {:>6} {:>12.1}",
            event.boss_id,
            event.boss.display_name(),
            event.zone_id,
            event.boss.tier,
            damage
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Combat
// ─────────────────────────────────────────────────────────────────────────────

pub async fn hit(boss: BossId, participant: ParticipantId, amount: f64, ctx: &CliContext) {
    if !ctx.engine.record_damage(boss, participant, amount) {
        println!("Damage ignored (invalid amount or encounter already over)");
    }
}

pub async fn ranking(boss: BossId, limit: Option<usize>, ctx: &CliContext) {
    let entries = match limit {
        Some(limit) => ctx.engine.ledger().get_damage_ranking(boss, limit),
        None => ctx.engine.top_damagers(boss),
    };
    if entries.is_empty() {
        println!("No damage recorded for boss {boss}");
        return;
    }
    print_ranking(&entries);
}

fn print_ranking(entries: &[RankingEntry]) {
    println!("{:<6} {:<14} {:>12} {:>8} {:>8}", "Rank", "Participant", "Damage", "Hits", "Share");
    println!("{}", "-".repeat(52));
    for entry in entries {
        println!(
            "{:<6} {:<14} {:>12.1} {:>8} {:>7.1}%",
            entry.rank,
            entry.participant,
            entry.damage,
            entry.hits,
            entry.percentage * 100.0
        );
    }
}

pub async fn kill(boss: BossId, ctx: &CliContext) {
    match ctx.engine.boss_killed(boss) {
        Some(outcome) => {
            print_outcome(&outcome);
            persist(ctx, outcome.ledger).await;
        }
        None => println!("Boss {boss} is not an active encounter"),
    }
}

pub async fn despawn(boss: BossId, ctx: &CliContext) {
    match ctx.engine.boss_despawned(boss) {
        Some(outcome) => {
            println!(
                "Boss {boss} despawned after {:.0}s ({} participants, no rewards)",
                outcome.ledger.duration_secs(),
                outcome.ledger.participant_count()
            );
            persist(ctx, outcome.ledger).await;
        }
        None => println!("Boss {boss} is not an active encounter"),
    }
}

fn print_outcome(outcome: &EncounterOutcome) {
    let name = outcome
        .event
        .as_ref()
        .map(|e| e.boss.display_name())
        .unwrap_or_else(|| format!("Boss {}", outcome.ledger.boss_id));
    println!(
        "{name} defeated in {:.0}s, {:.1} total damage",
        outcome.ledger.duration_secs(),
        outcome.ledger.total_damage
    );
    print_ranking(&outcome.ledger.ranking);

    for reward in &outcome.rewards {
        if reward.rewards.is_empty() {
            continue;
        }
        let labels: Vec<String> = reward.rewards.iter().map(|r| r.display_label()).collect();
        println!("  #{} {}: {}", reward.rank, reward.participant, labels.join(", "));
    }
}

/// Append the finalized ledger to the history file on a blocking thread.
async fn persist(ctx: &CliContext, ledger: FinalizedLedger) {
    let Some(store) = ctx.store.as_ref().map(Arc::clone) else {
        return;
    };
    match tokio::task::spawn_blocking(move || store.save(&ledger)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Failed to save encounter"),
        Err(e) => tracing::error!(error = %e, "Encounter save task failed"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

pub async fn history(participant: Option<ParticipantId>, limit: usize, ctx: &CliContext) {
    let Some(store) = ctx.store.as_ref().map(Arc::clone) else {
        println!("Encounter history is disabled");
        return;
    };

    let page = Page::new(limit, 0);
    let result = tokio::task::spawn_blocking(move || match participant {
        Some(p) => store.by_participant(p, page),
        None => store.all(page),
    })
    .await;

    let records = match result {
        Ok(Ok(records)) => records,
        Ok(Err(e)) => {
            println!("Failed to read history: {e}");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "History task failed");
            return;
        }
    };

    if records.is_empty() {
        println!("No encounters recorded");
        return;
    }

    println!("{:<8} {:<20} {:<20} {:>12} {:>8}", "Boss", "Type", "Finished", "Damage", "Players");
    println!("{}", "-".repeat(72));
    for record in records {
        println!(
            "{:<8} {:<20} {:<20} {:>12.1} {:>8}",
            record.boss_id,
            record.boss_type.as_deref().unwrap_or("unknown"),
            record.finalized_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.total_damage,
            record.participant_count()
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

pub async fn show_stats(ctx: &CliContext) {
    let stats = ctx.engine.stats();
    println!("Zones:               {}", stats.scheduler.zones);
    println!("Active bosses:       {}", stats.scheduler.active_bosses);
    println!("Spawn events:        {}", stats.scheduler.total_events);
    match stats.scheduler.average_lifetime_secs {
        Some(secs) => println!("Average lifetime:    {secs:.0}s"),
        None => println!("Average lifetime:    -"),
    }
    println!("Templates:           {}", stats.catalog.total_templates);
    for (rarity, count) in &stats.catalog.by_rarity {
        println!("  {:<18} {count}", rarity.as_str());
    }
    println!("Reward pools:        {}", stats.reward_pools);
    println!("Live ledgers:        {}", stats.tracked_ledgers);
    println!("Finished encounters: {}", stats.finalized_encounters);
    println!("Occupied locations:  {}", stats.occupied_locations);
}

pub async fn reload(ctx: &CliContext) {
    if ctx.engine.catalog_paths().is_empty() {
        println!("No catalog files configured");
        return;
    }
    tasks::reload(Arc::clone(&ctx.engine)).await;
}

pub fn print_reload(summary: &ReloadSummary) {
    match summary.templates {
        Some(count) => println!("Loaded {count} boss templates"),
        None => println!("Boss templates unchanged"),
    }
    match summary.reward_pools {
        Some(count) => println!("Loaded {count} reward pools"),
        None => println!("Reward pools unchanged"),
    }
}

pub async fn show_settings(ctx: &CliContext) {
    let config = ctx.config.read().await;
    match bossfall_core::EngineConfig::config_path() {
        Ok(path) => println!("Config file:         {}", path.display()),
        Err(e) => println!("Config file:         unavailable ({e})"),
    }
    println!("Base rate:           {}", config.spawn.base_rate);
    println!("Tick interval:       {}s", config.spawn.tick_interval_secs);
    println!("Placement attempts:  {}", config.spawn.location_attempts);
    println!(
        "World:               {} x {} (floor {})",
        config.world.width, config.world.height, config.world.spawn_floor
    );
    println!(
        "Rewards:             {} (currency {}, top {} ranks)",
        on_off(config.rewards.enabled),
        on_off(config.rewards.currency_enabled),
        config.rewards.max_reward_ranks
    );
    println!(
        "Ledger:              top {} damagers, {} finished kept in memory",
        config.ledger.top_damagers, config.ledger.history_limit
    );
    let path_or_builtin = |p: &Option<std::path::PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    };
    println!("Templates file:      {}", path_or_builtin(&config.catalog.templates_path));
    println!("Rewards file:        {}", path_or_builtin(&config.catalog.rewards_path));
    println!("Watch catalogs:      {}", on_off(config.catalog.watch));
    if let Some(store) = &ctx.store {
        println!("History file:        {}", store.path().display());
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

pub fn exit() {
    let _ = write!(std::io::stdout(), "quitting...");
    let _ = std::io::stdout().flush();
}
