use acmedash::config::DnsCheckMode;
use acmedash::error::Error;
use acmedash::model::ServerStatus;
use acmedash::verify::{DynDelegationChecker, RemoteChecker, ResolverChecker};
use acmedash::{
    export, Config, CredentialStore, DomainCache, DomainRecord, DynDomainApi, HttpDomainApi,
    ListingOrigin, SessionGate, Shared,
};
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Manage ACME-DNS registrations and the credentials they were issued with.
#[derive(Parser, Debug)]
#[command(name = "acmedash")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON).
    #[arg(short, long, env = "ACMEDASH_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a dashboard session.
    Login { username: String, password: String },
    /// End the dashboard session.
    Logout,
    /// Show server health and session state.
    Status,
    #[command(flatten)]
    Dashboard(DashboardCommand),
}

/// Commands that need a logged-in session.
#[derive(Subcommand, Debug)]
enum DashboardCommand {
    /// List registrations, refreshed from the server when it is reachable.
    List {
        /// Print JSON even on a terminal.
        #[arg(long)]
        json: bool,
    },
    /// Register a new challenge subdomain.
    Register {
        /// Local display name.
        #[arg(long)]
        name: Option<String>,
        /// Network allowed to update the record, in CIDR form. May be repeated.
        #[arg(long = "allow-from", value_name = "CIDR")]
        allow_from: Vec<String>,
    },
    /// Print a registration's credentials.
    Show {
        fulldomain: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// The domain the credentials are used for.
        #[arg(long)]
        domain: Option<String>,
    },
    /// Change a registration's local display name. An empty name clears it.
    Rename { fulldomain: String, name: String },
    /// Forget a registration locally. It stays registered on the server.
    Delete { fulldomain: String },
    /// Publish a DNS-01 challenge TXT value.
    Update { fulldomain: String, txt: String },
    /// Check that `_acme-challenge.<domain>` is a CNAME for the registration.
    Check { fulldomain: String, domain: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportFormat {
    Json,
    AcmeDnsAuth,
    Certbot,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_init();

    let args = Args::parse();
    let config = config_init(&args.config)?;
    let storage = config.storage().await?;
    let mut gate = SessionGate::restore(config.dashboard.clone(), storage.clone()).await?;
    let api: DynDomainApi = Arc::new(HttpDomainApi::new(&config)?);
    let cache = DomainCache::new(api.clone(), CredentialStore::open(storage).await?.shared());
    let json_output = !std::io::stdout().is_terminal();

    match args.command {
        Command::Login { username, password } => {
            if !gate.login(&username, &password).await? {
                bail!("invalid username or password");
            }
            println!("logged in as {username}");
        }
        Command::Logout => {
            gate.logout().await?;
            println!("logged out");
        }
        Command::Status => {
            let health = cache.health().await;
            let server = ServerStatus::from(&health);
            let authenticated = gate.is_authenticated().await?;
            if json_output {
                println!(
                    "{}",
                    serde_json::json!({
                        "server": server.to_string(),
                        "health": health,
                        "authenticated": authenticated,
                    })
                );
            } else {
                println!("server:        {server}");
                if let Some(message) = &health.message {
                    println!("               {message}");
                }
                println!(
                    "session:       {}",
                    if authenticated { "logged in" } else { "logged out" }
                );
            }
        }
        Command::Dashboard(command) => {
            if !gate.is_authenticated().await? {
                bail!("not logged in, run `acmedash login` first");
            }
            return run_authenticated(command, &config, &cache, api, json_output).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_authenticated(
    command: DashboardCommand,
    config: &Config,
    cache: &DomainCache,
    api: DynDomainApi,
    json_output: bool,
) -> Result<ExitCode> {
    match command {
        DashboardCommand::List { json } => {
            let listing = cache.list_domains().await?;
            if let ListingOrigin::Cache { reason } = &listing.origin {
                eprintln!("server unavailable ({reason}), showing cached domains");
            }
            if json || json_output {
                println!("{}", serde_json::to_string_pretty(&listing.domains)?);
            } else if listing.domains.is_empty() {
                println!("no domains registered");
            } else {
                for record in &listing.domains {
                    print_summary(record);
                }
            }
        }
        DashboardCommand::Register { name, allow_from } => {
            let record = cache
                .register_domain(name.as_deref().unwrap_or_default(), &allow_from)
                .await?;
            eprintln!("save these credentials, the password is not shown by the server again");
            println!("{}", export::credentials_json(&record)?);
        }
        DashboardCommand::Show {
            fulldomain,
            format,
            domain,
        } => {
            let record = find(cache, &fulldomain).await?;
            let output = match (format, domain) {
                (ExportFormat::Json, _) => export::credentials_json(&record)?,
                (ExportFormat::AcmeDnsAuth, Some(domain)) => {
                    export::acme_dns_auth_json(&domain, &record)?
                }
                (ExportFormat::AcmeDnsAuth, None) => {
                    bail!("--domain is required for the acme-dns-auth format")
                }
                (ExportFormat::Certbot, domain) => {
                    export::certbot_hint(domain.as_deref().unwrap_or_default(), &record)
                }
            };
            println!("{output}");
        }
        DashboardCommand::Rename { fulldomain, name } => {
            let record = cache.rename_domain(&fulldomain, &name).await?;
            println!("renamed {} to \"{}\"", record.fulldomain, record.label());
        }
        DashboardCommand::Delete { fulldomain } => {
            if cache.delete_domain(&fulldomain).await? {
                println!("removed {fulldomain} (it remains registered on the server)");
            } else {
                println!("{fulldomain} was not stored");
            }
        }
        DashboardCommand::Update { fulldomain, txt } => {
            let record = find(cache, &fulldomain).await?;
            let record = cache.submit_challenge_value(&record, &txt).await?;
            println!(
                "updated {} at {}",
                record.fulldomain,
                timestamp(record.updated_at)
            );
        }
        DashboardCommand::Check { fulldomain, domain } => {
            let record = find(cache, &fulldomain).await?;
            let checker: DynDelegationChecker = match config.dns_check {
                DnsCheckMode::Resolver => Arc::new(ResolverChecker::from_config(config)?),
                DnsCheckMode::Remote => Arc::new(RemoteChecker::new(api)),
            };
            let result = checker
                .check_delegation(&domain, &record.subdomain, &record.fulldomain)
                .await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.message);
                for address in &result.records {
                    println!("  {address}");
                }
            }
            if !result.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn find(cache: &DomainCache, fulldomain: &str) -> Result<DomainRecord, Error> {
    cache
        .get_domain(fulldomain)
        .await
        .ok_or_else(|| Error::NotFound(fulldomain.to_string()))
}

fn print_summary(record: &DomainRecord) {
    println!("{}", record.label());
    println!("  fulldomain:  {}", record.fulldomain);
    println!("  username:    {}", record.username);
    println!(
        "  password:    {}",
        if record.has_password() {
            "stored"
        } else {
            "not stored"
        }
    );
    if !record.allowfrom.is_empty() {
        println!("  allowfrom:   {}", record.allowfrom.join(", "));
    }
    println!("  created:     {}", timestamp(record.created_at));
    println!("  last active: {}", timestamp(record.last_active_at));
}

fn timestamp(at: Option<OffsetDateTime>) -> String {
    at.and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| "never".to_string())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmedash=info".into()),
        )
        .init();
}

fn config_init(config_file: &Path) -> Result<Shared> {
    let config = Config::try_from_file(config_file)
        .map_err(|err| anyhow!("loading {}: {err}", config_file.display()))?;
    tracing::debug!("loaded config from {}", config_file.display());
    Ok(Arc::new(config))
}
