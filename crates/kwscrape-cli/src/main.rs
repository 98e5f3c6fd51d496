use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kwscrape::core::{KeywordSet, KeywordSource, Preferences, PrefsStore, SearchQuery, Session};
use kwscrape::local::{http_client, Endpoints, FsPrefs, RetryPolicy, ScrapeSource, WorkerClient};
use kwscrape::render::{self, ViewContext};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOG_FILTER: &str = "kwscrape=info,kwscrape_local=info,kwscrape_core=info";

#[derive(Parser, Debug)]
#[command(name = "kwscrape")]
#[command(about = "Browse, search, and curate scraped search keywords", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory holding `prefs.json` (dark mode, search history).
    #[arg(long, global = true, env = "KWSCRAPE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Override the remote store load endpoint.
    #[arg(long, global = true)]
    worker_get_url: Option<String>,

    /// Override the remote store save endpoint.
    #[arg(long, global = true)]
    worker_save_url: Option<String>,

    /// Override the page keywords are scraped from.
    #[arg(long, global = true)]
    blog_url: Option<String>,

    /// Override the CORS proxy prefix (empty fetches the page directly).
    #[arg(long, global = true)]
    proxy_url: Option<String>,

    #[arg(long, global = true, env = "KWSCRAPE_RETRY_ATTEMPTS", default_value_t = 3)]
    retry_attempts: u32,

    #[arg(long, global = true, env = "KWSCRAPE_RETRY_BACKOFF_MS", default_value_t = 1000)]
    retry_backoff_ms: u64,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the merged keyword view, optionally narrowed by a search query.
    List {
        #[arg(long, default_value = "")]
        query: String,
        /// Select this category (marked in the output) if it exists.
        #[arg(long)]
        category: Option<String>,
        /// Record the query in the search history.
        #[arg(long, default_value_t = false)]
        record: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Scrape the keyword page only and print the parsed set.
    Scrape {
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
    /// Add a user keyword to a category and save the user set.
    Add {
        #[arg(long)]
        category: String,
        keyword: String,
    },
    /// Remove a user keyword and save the user set.
    Remove {
        #[arg(long)]
        category: String,
        keyword: String,
    },
    /// Push the current user set to the remote store.
    Save,
    /// Show (or prune) the search history.
    History {
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long)]
        remove: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Show or toggle the dark mode preference.
    Theme {
        #[arg(long, default_value_t = false)]
        toggle: bool,
    },
    /// Run the CORS passthrough proxy.
    Proxy {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8787)]
        port: u16,
    },
    /// Print version information.
    Version {
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
}

/// Optional `KEY=VALUE` file named by `KWSCRAPE_ENV_FILE`. Never overrides variables
/// already set in the process environment.
fn load_env_file() {
    let Ok(p) = std::env::var("KWSCRAPE_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

impl GlobalArgs {
    fn endpoints(&self) -> Endpoints {
        let mut e = Endpoints::from_env();
        if let Some(u) = &self.worker_get_url {
            e.worker_get_url = u.clone();
        }
        if let Some(u) = &self.worker_save_url {
            e.worker_save_url = u.clone();
        }
        if let Some(u) = &self.blog_url {
            e.blog_url = u.clone();
        }
        if let Some(u) = &self.proxy_url {
            e.proxy_url = u.trim().to_string();
        }
        e
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    fn prefs(&self) -> Result<FsPrefs> {
        let root = match &self.state_dir {
            Some(p) => p.clone(),
            None => dirs::data_local_dir()
                .map(|d| d.join("kwscrape"))
                .context("no platform data directory; pass --state-dir")?,
        };
        Ok(FsPrefs::new(root))
    }
}

/// Network-facing pieces shared by the commands that need the keyword data.
struct Backends {
    source: ScrapeSource,
    worker: WorkerClient,
}

impl Backends {
    fn new(global: &GlobalArgs) -> Result<Self> {
        let endpoints = global.endpoints();
        endpoints.validate()?;
        let client = http_client()?;
        let retry = global.retry();
        let source = ScrapeSource::new(client.clone(), &endpoints).with_retry(retry);
        tracing::debug!(scrape_url = %source.url(), "endpoints resolved");
        Ok(Self {
            source,
            worker: WorkerClient::new(client, &endpoints).with_retry(retry),
        })
    }

    async fn session(&self, prefs: &dyn PrefsStore) -> Result<Session> {
        Session::initialize(&self.source, &self.worker, prefs)
            .await
            .map_err(|e| {
                anyhow::anyhow!("initialization failed: {e}\nCheck the network connection and run the command again to retry.")
            })
    }
}

fn select(session: &mut Session, category: &str) -> Result<()> {
    if session.select_category(category) {
        return Ok(());
    }
    anyhow::bail!(
        "unknown category {category:?} (available: {})",
        session.categories().join(", ")
    )
}

fn print_set_text(set: &KeywordSet) {
    for (name, keywords) in set.iter() {
        println!("{name} ({})", keywords.len());
        for k in keywords {
            println!("    {k}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    let global = &cli.global;

    match cli.command {
        Commands::Version { output } => {
            let name = env!("CARGO_PKG_NAME");
            let version = env!("CARGO_PKG_VERSION");
            match output {
                OutputFormat::Text => println!("{name} {version}"),
                OutputFormat::Json => {
                    let v = serde_json::json!({
                        "schema_version": 1,
                        "kind": "version",
                        "name": name,
                        "version": version,
                    });
                    println!("{}", serde_json::to_string_pretty(&v)?);
                }
            }
        }
        Commands::List {
            query,
            category,
            record,
            output,
        } => {
            let prefs = global.prefs()?;
            let backends = Backends::new(global)?;
            let mut session = backends.session(&prefs).await?;
            if let Some(c) = category.as_deref() {
                select(&mut session, c)?;
            }
            let query = if record {
                session.submit_search(&prefs, &query)?
            } else {
                SearchQuery::new(&query)
            };
            let view = session.view(&query);
            let rendered = render::build(
                &view,
                &ViewContext {
                    store: session.store(),
                    query: &query,
                    selected: session.selected_category(),
                    dark_mode: session.dark_mode(),
                    diagnostic: session.diagnostic(),
                },
            );
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rendered)?),
                OutputFormat::Text => {
                    print!("{}", render::to_text(&rendered));
                    println!();
                    println!("remote store:");
                    println!("{}", rendered.diagnostic);
                }
            }
        }
        Commands::Scrape { output } => {
            let backends = Backends::new(global)?;
            let set = backends.source.fetch_keywords().await?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&set)?),
                OutputFormat::Text => print_set_text(&set),
            }
        }
        Commands::Add { category, keyword } => {
            let prefs = global.prefs()?;
            let backends = Backends::new(global)?;
            let mut session = backends.session(&prefs).await?;
            select(&mut session, &category)?;
            if session.add_keyword(&backends.worker, &keyword).await? {
                println!("added {:?} to {category}", keyword.trim());
            } else {
                println!("unchanged: {:?} is empty or already in {category}", keyword.trim());
            }
        }
        Commands::Remove { category, keyword } => {
            let prefs = global.prefs()?;
            let backends = Backends::new(global)?;
            let mut session = backends.session(&prefs).await?;
            if session
                .remove_keyword(&backends.worker, &category, &keyword)
                .await?
            {
                println!("removed {keyword:?} from {category}");
            } else {
                println!("unchanged: {keyword:?} is not a user keyword in {category}");
            }
        }
        Commands::Save => {
            let prefs = global.prefs()?;
            let backends = Backends::new(global)?;
            let session = backends.session(&prefs).await?;
            session.save(&backends.worker).await?;
            println!(
                "saved {} user keywords",
                session.store().user().keyword_count()
            );
        }
        Commands::History {
            prefix,
            remove,
            output,
        } => {
            let prefs = global.prefs()?;
            let mut session = Session::new(Preferences::load(&prefs)?);
            if let Some(q) = remove.as_deref() {
                if !session.remove_history(&prefs, q)? {
                    tracing::warn!("{q:?} is not in the search history");
                }
            }
            let entries = session.history(&prefix);
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                OutputFormat::Text => {
                    for e in entries {
                        println!("{e}");
                    }
                }
            }
        }
        Commands::Theme { toggle } => {
            let prefs = global.prefs()?;
            let mut session = Session::new(Preferences::load(&prefs)?);
            let dark = if toggle {
                session.toggle_dark_mode(&prefs)?
            } else {
                session.dark_mode()
            };
            println!("{}", if dark { "dark" } else { "light" });
        }
        Commands::Proxy { host, port } => {
            let addr: std::net::SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address {host}:{port}"))?;
            kwscrape::proxy::serve(addr, http_client()?).await?;
        }
    }

    Ok(())
}
