use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use surveyfill_core::config::HelperConfig;
use surveyfill_core::output::{self, FillReport};
use surveyfill_core::overrides::scan_markers;
use surveyfill_core::session::{HelperSession, Key, NavigationTarget, PageEvent};
use surveyfill_core::storage::{FileStore, Stores};
use surveyfill_core::{classify, load_page};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "surveyfill", about = "Dummy-answer engine for survey regression testing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the widget kind and semantic context of a saved page
    Classify {
        /// The HTML file to read (use - for stdin)
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the force/avoid markers found on a saved page
    Markers {
        /// The HTML file to read (use - for stdin)
        file: String,
    },
    /// Load a saved page, answer it and report the result
    Run {
        /// The HTML file to read (use - for stdin)
        file: String,

        /// Key to press after loading, by name or key code (repeatable)
        #[arg(long = "key")]
        keys: Vec<Key>,

        /// Directory holding the persisted stores (default: in memory)
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Output as JSON instead of compact format
        #[arg(long)]
        json: bool,

        /// RNG seed for reproducible answers
        #[arg(long)]
        seed: Option<u64>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Simulate the survey's validation dialog appearing
        #[arg(long)]
        dialog_visible: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { file, json } => {
            let html = read_input(&file)?;
            let page = load_page(&html, &HelperConfig::default())?;
            let widget = classify::classify_widget(&page);
            let context = classify::classify_page_context(&page);
            if json {
                let value = serde_json::json!({ "widget": widget, "context": context });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let widget = widget
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("widget: {}", widget);
                println!("context: {:?}", context);
            }
        }
        Commands::Markers { file } => {
            let html = read_input(&file)?;
            let page = load_page(&html, &HelperConfig::default())?;
            let scanned = scan_markers(&page);
            if !scanned.found {
                println!("no markers");
            }
            println!("{}", serde_json::to_string_pretty(&scanned.table)?);
        }
        Commands::Run {
            file,
            keys,
            state_dir,
            json,
            seed,
            config,
            dialog_visible,
        } => {
            let mut config = match config {
                Some(path) => HelperConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => HelperConfig::default(),
            };
            if seed.is_some() {
                config.seed = seed;
            }

            let html = read_input(&file)?;
            let page = load_page(&html, &config)?;
            let stores = open_stores(state_dir.as_deref())?;
            let mut session = HelperSession::initialize(page, config, stores)?;

            std::thread::sleep(session.auto_run_delay());
            let mut navigation = settle(session.auto_run())?;
            for key in keys {
                if let Some(nav) = settle(session.handle_key(key))? {
                    navigation = Some(nav);
                }
            }

            let mut dismissed = None;
            if dialog_visible {
                dismissed = session.handle_event(PageEvent::DialogVisibilityChanged { visible: true })?;
            }

            let mut report = FillReport::from_session(&session, navigation);
            report.dismissed_dialog = dismissed;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", output::to_compact_string(&report));
            }
        }
    }

    Ok(())
}

/// Alert errors are already on the overlay; only environment errors abort.
fn settle(
    result: Result<Option<NavigationTarget>, surveyfill_core::error::HelperError>,
) -> Result<Option<NavigationTarget>> {
    match result {
        Ok(nav) => Ok(nav),
        Err(e) if e.is_alert() => {
            eprintln!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn open_stores(state_dir: Option<&Path>) -> Result<Stores> {
    let Some(dir) = state_dir else {
        return Ok(Stores::in_memory());
    };
    let local = FileStore::open(dir.join("local.json"))
        .with_context(|| format!("failed to open local store in {}", dir.display()))?;
    let session = FileStore::open(dir.join("session.json"))
        .with_context(|| format!("failed to open session store in {}", dir.display()))?;
    Ok(Stores::new(local, session))
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file))
    }
}
