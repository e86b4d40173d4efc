use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use hanzidr::config::Config;
use hanzidr::content::source::HttpContentSource;
use hanzidr::content::{Difficulty, Scheme};
use hanzidr::session::controller::{RefreshStatus, SessionController};
use hanzidr::store::content_store::ContentStore;
use hanzidr::store::json_store::JsonStore;
use hanzidr::store::schema::{HistoryData, StoredSets};
use hanzidr::telemetry::init_tracing;

#[derive(Parser)]
#[command(name = "hanzidr", version, about = "Chinese character typing drills with pinyin or wubi codes")]
struct Cli {
    #[arg(short, long, global = true, help = "Code scheme (phonetic/pinyin, structural/wubi)")]
    scheme: Option<Scheme>,

    #[arg(short, long, global = true, help = "Difficulty (beginner, intermediate, advanced)")]
    difficulty: Option<Difficulty>,

    #[arg(long, global = true, help = "Advance at most one character per input")]
    stepped: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Practice a set line by line on the terminal
    Practice,
    /// Inspect or edit the local practice library
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Fetch fresh sets for every difficulty from the content endpoint
    Refresh,
    /// Show recent session results
    History {
        #[arg(short = 'n', long, default_value_t = 10)]
        last: usize,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Number of stored sets per difficulty
    Count,
    /// Remove every stored set
    Clear,
    /// Add sets from a JSON file (one set or an array of sets)
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if !Config::config_path().exists() {
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "could not write default config");
        }
    }
    if let Some(scheme) = cli.scheme {
        config.scheme = scheme;
    }
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }
    if cli.stepped {
        config.continuous_mode = false;
    }

    let json_store = JsonStore::with_base_dir(PathBuf::from(&config.data_dir))?;
    let history = json_store.load_history().sessions;
    let store = ContentStore::new(json_store, config.cache_capacity);
    let mut controller = SessionController::new(store, &config).with_history(history);

    match cli.command.unwrap_or(Command::Practice) {
        Command::Practice => run_practice(&mut controller),
        Command::Cache { action } => run_cache(&mut controller, action),
        Command::Refresh => run_refresh(&mut controller, &config),
        Command::History { last } => {
            print_history(&controller, last);
            Ok(())
        }
    }
}

fn run_practice(controller: &mut SessionController<JsonStore>) -> Result<()> {
    controller.start();
    let Some(set) = controller.active_set().cloned() else {
        bail!("no practice set available");
    };

    println!(
        "{} / {} · {} characters{}",
        controller.scheme(),
        controller.difficulty(),
        set.len(),
        if set.is_builtin() { " (built-in)" } else { "" }
    );
    if let Some(translation) = &set.translation {
        println!("{translation}");
    }
    println!("Type the code for each character; a space skips. :r restarts, :q quits.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let progress = controller.progress();
        if progress.is_finished() {
            break;
        }
        if let Some(unit) = set.units.get(progress.current_index) {
            print!(
                "[{}/{}] {}  > {}",
                progress.current_index + 1,
                set.len(),
                unit.glyph,
                progress.residual_input
            );
            io::stdout().flush()?;
        }

        let Some(line) = lines.next() else {
            controller.abandon();
            return Ok(());
        };
        let line = line?;
        match line.trim() {
            ":q" => {
                controller.abandon();
                return Ok(());
            }
            ":r" => {
                controller.restart();
                continue;
            }
            _ => {}
        }

        let raw = format!("{}{}", controller.progress().residual_input, line);
        controller.on_input_change(&raw, false);
    }

    if let Some(result) = controller.last_result() {
        println!(
            "Done: {} characters, {} errors, accuracy {:.0}%, {:.1} chars/min in {:.0}s",
            result.attempted, result.errors, result.accuracy, result.cpm, result.elapsed_secs
        );
    }
    let history = HistoryData::new(controller.history().to_vec());
    controller
        .store()
        .backend()
        .save_history(&history)
        .context("failed to save session history")?;
    Ok(())
}

fn run_cache(controller: &mut SessionController<JsonStore>, action: CacheAction) -> Result<()> {
    let scheme = controller.scheme();
    match action {
        CacheAction::Count => {
            let counts = controller.store().counts(scheme);
            let total: usize = counts.iter().map(|(_, n)| n).sum();
            for (difficulty, count) in counts {
                println!("{scheme} {difficulty}: {count}");
            }
            println!("total: {total}");
        }
        CacheAction::Clear => {
            controller.store_mut().clear();
            println!("practice library cleared");
        }
        CacheAction::Import { path } => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let sets: StoredSets = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a practice set file", path.display()))?;
            let difficulty = controller.difficulty();
            let mut added = 0;
            for set in sets.into_vec() {
                if controller.store_mut().save(scheme, difficulty, set) {
                    added += 1;
                }
            }
            println!("{added} set(s) added to {scheme} {difficulty}");
        }
    }
    Ok(())
}

fn run_refresh(controller: &mut SessionController<JsonStore>, config: &Config) -> Result<()> {
    let source = Arc::new(HttpContentSource::new(config.content_endpoint.clone()));
    controller.request_refresh(source);
    match controller.wait_refresh(Duration::from_secs(120)) {
        Some(RefreshStatus::Saved { added }) => {
            println!("refresh complete, {added} new set(s)");
            Ok(())
        }
        Some(RefreshStatus::Failed {
            consecutive_failures,
        }) => bail!("refresh failed ({consecutive_failures} in a row); built-in sets remain available"),
        Some(RefreshStatus::Discarded) | None => bail!("refresh did not complete"),
    }
}

fn print_history(controller: &SessionController<JsonStore>, last: usize) {
    let history = controller.history();
    if history.is_empty() {
        println!("no sessions yet");
        return;
    }
    let start = history.len().saturating_sub(last);
    for result in &history[start..] {
        println!(
            "{}  {:<10} {:<12} {:>5.1} chars/min  {:>5.1}%  {} errors",
            result.timestamp.format("%Y-%m-%d %H:%M"),
            result.scheme.as_str(),
            result.difficulty.as_str(),
            result.cpm,
            result.accuracy,
            result.errors
        );
    }
    println!("{} session(s) total", history.len());
}
