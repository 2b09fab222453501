//! Mana engine command-line tool
//!
//! Parse costs, list a board's mana sources and run auto-pay against a board
//! described in JSON.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mtg_mana_engine::{
    board::{Battlefield, BoardIntent, Permanent},
    config::EngineConfig,
    core::{CardFace, ManaPool, ParsedCost, PlayerId, RuleBook},
    game::{ManaEngine, ManaSource, VerbosityLevel},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Verbosity level for engine output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for VerbosityLevel {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Parser)]
#[command(name = "mana")]
#[command(about = "Mana accounting for a shared tabletop", long_about = None)]
struct Cli {
    /// Engine config (JSON)
    #[arg(long, global = true, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (0=silent, 1=minimal, 2=normal, 3=verbose)
    #[arg(long, short = 'v', global = true)]
    verbosity: Option<VerbosityArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a cost string and show its pips
    Parse {
        /// Cost in bracketed form, e.g. "{2}{W/U}{G}"
        cost: String,

        /// Value for each {X}
        #[arg(long, default_value_t = 0)]
        x: u32,
    },

    /// List a player's mana sources on a board
    Sources {
        /// Board file (JSON)
        #[arg(value_name = "BOARD_FILE")]
        board: PathBuf,

        /// Mana rule overrides (JSON)
        #[arg(long, value_name = "RULES_FILE")]
        rules: Option<PathBuf>,
    },

    /// Auto-pay a cost from a board and show the result
    Pay {
        /// Board file (JSON)
        #[arg(value_name = "BOARD_FILE")]
        board: PathBuf,

        /// Cost in bracketed form
        cost: String,

        /// Value for each {X}
        #[arg(long, default_value_t = 0)]
        x: u32,

        /// Mana rule overrides (JSON)
        #[arg(long, value_name = "RULES_FILE")]
        rules: Option<PathBuf>,

        /// Print the plan and intents as JSON
        #[arg(long)]
        json: bool,
    },
}

/// A board as the CLI reads it
#[derive(Debug, Deserialize)]
struct BoardFile {
    /// Whose sources to use
    player: PlayerId,

    /// Mana already floating
    #[serde(default)]
    pool: ManaPool,

    #[serde(default)]
    commander: Option<CardFace>,

    #[serde(default)]
    permanents: Vec<Permanent>,
}

impl BoardFile {
    fn battlefield(&self) -> Battlefield {
        let mut battlefield = Battlefield::new();
        for permanent in &self.permanents {
            battlefield.add(permanent.clone());
        }
        if let Some(commander) = &self.commander {
            battlefield.set_commander(self.player, commander.clone());
        }
        battlefield
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json(&read_file(path).await?)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(verbosity) = cli.verbosity {
        config.verbosity = verbosity.into();
    }

    match cli.command {
        Commands::Parse { cost, x } => run_parse(&cost, x),
        Commands::Sources { board, rules } => run_sources(config, &board, rules.as_deref()).await,
        Commands::Pay {
            board,
            cost,
            x,
            rules,
            json,
        } => run_pay(config, &board, &cost, x, rules.as_deref(), json).await,
    }
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

async fn load_board(path: &Path) -> anyhow::Result<BoardFile> {
    let text = read_file(path).await?;
    serde_json::from_str(&text).with_context(|| format!("invalid board {}", path.display()))
}

async fn load_engine(config: EngineConfig, board: &BoardFile, rules: Option<&Path>) -> anyhow::Result<ManaEngine> {
    let mut engine = ManaEngine::new(board.player, config).with_pool(board.pool);
    if let Some(path) = rules {
        let rules = RuleBook::from_json(&read_file(path).await?)
            .with_context(|| format!("invalid rules {}", path.display()))?;
        engine = engine.with_rules(rules);
    }
    Ok(engine)
}

fn run_parse(cost: &str, x: u32) -> anyhow::Result<()> {
    let parsed = ParsedCost::parse(cost).with_x(x);
    println!("cost:      {parsed}");
    println!("generic:   {}", parsed.generic_amount());
    for pip in parsed.symbols() {
        println!("pip:       {pip:?}");
    }
    println!("value:     {}", parsed.total_converted_value());
    let identity: Vec<String> = parsed.color_identity().iter().map(|c| c.to_string()).collect();
    println!("identity:  {}", identity.join(""));
    Ok(())
}

fn describe(source: &ManaSource) -> String {
    let mut line = format!(
        "{:>4}  {:<24} priority {:>2}",
        source.object_id, source.card_name, source.auto_tap_priority
    );
    if let Some(yields) = source.yields() {
        let options: Vec<String> = yields.options().iter().map(|c| c.to_string()).collect();
        line.push_str(&format!("  makes {}x {}", yields.mana_count(), options.join("/")));
    }
    if source.charges > 1 {
        line.push_str(&format!("  ({} copies)", source.charges));
    }
    if let Some(cost) = &source.activation_cost {
        line.push_str(&format!("  costs {cost}"));
    }
    line
}

async fn run_sources(config: EngineConfig, path: &Path, rules: Option<&Path>) -> anyhow::Result<()> {
    let board = load_board(path).await?;
    let engine = load_engine(config, &board, rules).await?;
    let catalog = engine.compute_sources(&board.battlefield());

    println!("Available ({}):", catalog.available.len());
    for source in &catalog.available {
        println!("{}", describe(source));
    }
    println!("Unavailable ({}):", catalog.potential.len());
    for source in &catalog.potential {
        println!("{}", describe(source));
    }
    let capacity = catalog.capacity().with_pool(engine.pool());
    println!("Capacity: {} total", capacity.total);
    Ok(())
}

async fn run_pay(
    config: EngineConfig,
    path: &Path,
    cost: &str,
    x: u32,
    rules: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let board = load_board(path).await?;
    let mut engine = load_engine(config, &board, rules).await?;
    let mut battlefield = board.battlefield();

    if !engine.can_pay(&battlefield, cost, x) {
        bail!("cannot pay {cost} from {}", path.display());
    }
    let outcome = engine.auto_pay(&battlefield, cost, x)?;
    battlefield.apply(&outcome.intents);

    if json {
        let value = serde_json::json!({
            "plan": outcome.plan,
            "intents": outcome.intents,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for intent in &outcome.intents {
        if let BoardIntent::SetTapState {
            object_id,
            rotation,
            tapped_quantity,
        } = intent
        {
            println!("tap {object_id}: {rotation:?} ({tapped_quantity} tapped)");
        }
    }
    println!("floating: {}", engine.pool());
    if let Some(prompt) = engine.choices().current() {
        println!(
            "choose a color for {} ({} more queued)",
            prompt.card_name,
            engine.choices().queued()
        );
    }
    Ok(())
}
