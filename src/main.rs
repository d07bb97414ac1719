use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use webnav_lib::advanced::{self, DEFAULT_SEARCH_SITES};
use webnav_lib::agent::classifier::classify;
use webnav_lib::agent::llm::{self, LLMClient};
use webnav_lib::config::{self, AppConfig};
use webnav_lib::WebNavigator;

#[derive(Parser)]
#[command(name = "webnav", version, about = "Task-driven web automation agent")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// LLM to use, as provider_id:model_name
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one task and print the result
    Run {
        task: String,

        /// Also print an AI summary report
        #[arg(long)]
        report: bool,
    },

    /// Read tasks from stdin, one per line
    Repl,

    /// Print the intent a task would be classified as
    Classify { text: String },

    /// Ask the LLM to break a task into browser actions
    Plan { task: String },

    /// Search a query on several sites
    Search {
        query: String,

        #[arg(long = "site")]
        sites: Vec<String>,
    },

    /// Open several sites and compare what each returns
    Compare {
        #[arg(required = true)]
        sites: Vec<String>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::get_config_path);

    match &cli.command {
        Commands::Classify { text } => println!("{}", classify(text)),
        Commands::Config { action } => config_command(action, &config_path)?,
        Commands::Plan { task } => {
            let config = load(&cli, &config_path)?;
            let provider = LLMClient::new(config.ai).get_default_llm()?;
            let raw = llm::parse_task(provider.as_ref(), task).await?;
            let actions = llm::parse_planned_actions(&raw);
            if actions.is_empty() {
                println!("{}", raw);
            } else {
                print_json(&actions)?;
            }
        }
        Commands::Run { task, report } => {
            let navigator = navigator(&cli, &config_path)?;
            let result = navigator.process_request(task).await;
            print_json(&result)?;
            if *report {
                let report = advanced::generate_report(navigator.llm().as_ref(), task, &result).await;
                print_json(&report)?;
            }
        }
        Commands::Search { query, sites } => {
            let navigator = navigator(&cli, &config_path)?;
            let sites = if sites.is_empty() {
                DEFAULT_SEARCH_SITES.iter().map(|s| s.to_string()).collect()
            } else {
                sites.clone()
            };
            print_json(&advanced::smart_search(&navigator, query, &sites).await)?;
        }
        Commands::Compare { sites } => {
            let navigator = navigator(&cli, &config_path)?;
            print_json(&advanced::website_comparison(&navigator, sites).await)?;
        }
        Commands::Repl => repl(navigator(&cli, &config_path)?).await?,
    }

    Ok(())
}

fn load(cli: &Cli, path: &Path) -> anyhow::Result<AppConfig> {
    let mut config = config::load_config_from(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(model) = &cli.model {
        config.ai.default_llm = Some(model.clone());
    }
    config::validate_ai_config(&config.ai)?;
    Ok(config)
}

fn navigator(cli: &Cli, path: &Path) -> anyhow::Result<WebNavigator> {
    let config = load(cli, path)?;
    if let Err(e) = config::validate_chrome_path(&config.chrome_path) {
        tracing::warn!("{}", e);
    }
    Ok(WebNavigator::from_config(&config)?)
}

fn config_command(action: &ConfigAction, path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let config = config::load_config_from(path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            config::init_config_at(path)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

async fn repl(navigator: WebNavigator) -> anyhow::Result<()> {
    eprintln!("Enter a task per line. Commands: history [n], clear, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            ("quit", "") | ("exit", "") => break,
            ("clear", "") => {
                navigator.clear_history();
                eprintln!("History cleared");
            }
            ("history", count) if count.is_empty() || count.trim().parse::<usize>().is_ok() => {
                let count = count.trim().parse().unwrap_or(5);
                print_json(&navigator.get_task_history(count))?;
            }
            _ => print_json(&navigator.process_request(line).await)?,
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
