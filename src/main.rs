//! habits-combat - Habits & Adventure combat client

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use habits_combat::backend::BackendClient;
use habits_combat::combat::{self, Character, CharacterSnapshot, CombatPhase};
use habits_combat::{load_catalog, CombatEngine, CombatSession, DicePool, Settings};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Habits & Adventure combat client
#[derive(Parser, Debug)]
#[command(name = "habits-combat", version, about = "Roll dice and fight encounters")]
struct Args {
    /// Config file (defaults to ./habits.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll a dice notation like "3d4+2d6+1"
    Roll {
        notation: String,
        /// Seed for reproducible rolls
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show min/max/average of a dice notation
    Analyze { notation: String },
    /// Show a character's attribute dice and combat pool
    Pool {
        #[command(flatten)]
        character: CharacterArgs,
    },
    /// List the enemy catalog
    Enemies,
    /// Fight an enemy from the catalog
    Fight {
        /// Enemy key, e.g. "goblin"
        enemy: String,
        #[command(flatten)]
        character: CharacterArgs,
        /// Resolve rounds without waiting for input
        #[arg(long)]
        auto: bool,
        /// Seed for reproducible fights
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args, Debug)]
struct CharacterArgs {
    /// Character snapshot JSON file
    #[arg(long, conflicts_with = "character_id")]
    character: Option<PathBuf>,

    /// Character id to fetch from the backend
    #[arg(long)]
    character_id: Option<String>,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "habits_combat=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn read_character_file(path: &Path) -> Result<Character> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot: CharacterSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("invalid character snapshot in {}", path.display()))?;
    Ok(Character::from_snapshot(snapshot))
}

/// No safe default character exists, so a failed load stops the command
async fn load_character(
    args: &CharacterArgs,
    backend: Option<&BackendClient>,
) -> Result<Character> {
    match (&args.character, &args.character_id) {
        (Some(path), _) => read_character_file(path),
        (None, Some(id)) => {
            let client = backend.ok_or_else(|| {
                anyhow!("--character-id needs backend_url (set HABITS_BACKEND_URL)")
            })?;
            client.fetch_character(id).await.map_err(|e| {
                anyhow!("could not load character {}: {}; check the backend and retry", id, e)
            })
        }
        (None, None) => bail!("pass --character <file> or --character-id <id>"),
    }
}

fn print_pool(engine: &CombatEngine, character: &Character) {
    let pool = engine.character_dice_pool(character);
    println!(
        "{} (level {}, HP {}/{})",
        character.name,
        character.level,
        character.current_hp(),
        character.max_hp()
    );
    for (name, attribute) in character.attributes.iter() {
        println!(
            "  {:<13} score {:>3}  level {:>2}  {}",
            name,
            attribute.effective_score(),
            attribute.level(),
            attribute.dice_notation()
        );
    }
    let stats = pool.pool.analyze();
    println!(
        "Combat pool: {} ({} dice, {}-{}, avg {:.1})",
        pool.notation, pool.total_dice_count, stats.min, stats.max, stats.average
    );
}

async fn fight(
    settings: &Settings,
    backend: Option<&BackendClient>,
    engine: Arc<CombatEngine>,
    character: Character,
    enemy: &str,
    auto: bool,
    seed: Option<u64>,
) -> Result<()> {
    let mut session = CombatSession::with_dice(engine.clone(), character, rng_for(seed));

    match session.start_combat(enemy) {
        Ok(true) => {}
        Ok(false) => bail!("{} has no HP left to fight with", session.character().name),
        Err(e) => {
            let known: Vec<&str> = engine.catalog().keys().collect();
            bail!("{} (known enemies: {})", e, known.join(", "));
        }
    }

    if let Some(working) = session.working_state() {
        println!(
            "{} (HP {}, pool {}) vs {} (HP {}, pool {})",
            session.character().name,
            working.character_hp,
            session.character_pool(),
            working.enemy.name(),
            working.enemy.current_hp,
            working.enemy.pool
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while session.phase() == CombatPhase::Active {
        if auto {
            if session.round() >= settings.max_auto_rounds as usize {
                println!("No winner after {} rounds; retreating.", session.round());
                session.reset();
                return Ok(());
            }
        } else {
            println!("[Enter] to roll, q to flee");
            match lines.next_line().await? {
                Some(line) if line.trim().eq_ignore_ascii_case("q") => {
                    println!("You flee.");
                    session.reset();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    println!("You flee.");
                    session.reset();
                    return Ok(());
                }
            }
        }

        if session.execute_round().is_some() {
            if let Some(line) = session.log_lines().last() {
                println!("{}", line);
            }
        }
    }

    let Some(summary) = session.summary() else {
        return Ok(());
    };

    match session.phase() {
        CombatPhase::Victory => println!("Victory! +{} XP", summary.xp_gained),
        _ => println!("Defeat."),
    }
    for item in &summary.loot {
        println!("  loot: {}", item);
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(client) = backend {
        // A failed submit leaves the local result as-is
        if let Err(e) = client.submit_combat_result(&summary).await {
            warn!(error = %e, "could not save combat result");
            eprintln!("Could not save combat result: {}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let settings = Settings::load(args.config.as_deref())?;
    let backend = if settings.is_online() {
        Some(BackendClient::from_settings(&settings)?)
    } else {
        None
    };

    match args.command {
        Command::Roll { notation, seed } => {
            let outcome = combat::evaluate(&notation, &mut rng_for(seed));
            println!("{}: {}", DicePool::parse(&notation), outcome);
        }
        Command::Analyze { notation } => {
            let stats = combat::analyze(&notation);
            println!(
                "{}: min {}, max {}, average {:.1}",
                DicePool::parse(&notation),
                stats.min,
                stats.max,
                stats.average
            );
        }
        Command::Pool { character } => {
            let character = load_character(&character, backend.as_ref()).await?;
            print_pool(&CombatEngine::default(), &character);
        }
        Command::Enemies => {
            let catalog = load_catalog(&settings, backend.as_ref()).await;
            for enemy in catalog.iter() {
                println!(
                    "{:<10} {:<16} lvl {:>2}  HP {:>3}  {:<12} {:>4} XP  {}",
                    enemy.enemy_id,
                    enemy.name,
                    enemy.level,
                    enemy.max_hp,
                    enemy.dice_pool,
                    enemy.xp_reward,
                    enemy.difficulty
                );
            }
        }
        Command::Fight {
            enemy,
            character,
            auto,
            seed,
        } => {
            let character = load_character(&character, backend.as_ref()).await?;
            let catalog = load_catalog(&settings, backend.as_ref()).await;
            let engine = Arc::new(CombatEngine::new(catalog));
            fight(
                &settings,
                backend.as_ref(),
                engine,
                character,
                &enemy,
                auto,
                seed,
            )
            .await?;
        }
    }

    Ok(())
}
