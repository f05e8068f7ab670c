//! acme-auth - command-line client for the acme auth service.

mod commands;
mod output;

use acme_config::{Config, Paths};
use clap::{Parser, Subcommand};
use tracing::debug;

/// acme-auth - Log in, inspect the session and call protected APIs.
#[derive(Parser)]
#[command(name = "acme-auth")]
#[command(about = "Command-line client for the acme auth service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ACME_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Auth service base URL, e.g. http://localhost:8081/api/auth
    #[arg(long, env = "ACME_AUTH_URL", global = true)]
    auth_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long, env = "ACME_EMAIL")]
        email: Option<String>,
    },

    /// Create an account and log in
    Signup {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Tenant slug to join or create
        #[arg(short, long)]
        tenant: String,
        /// Account email (prompted when omitted)
        #[arg(short, long, env = "ACME_EMAIL")]
        email: Option<String>,
    },

    /// Logout and clear the stored session
    Logout,

    /// Check authentication status
    Status {
        /// Shorthand for --format json
        #[arg(long)]
        json: bool,
    },

    /// Show the logged-in user
    Whoami,

    /// Get a new access token using the stored refresh token
    Refresh,

    /// GET a protected URL with the session's access token
    Get {
        /// Absolute URL to request
        url: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let paths = Paths::new()?;
    let mut config = Config::load(&paths)?;
    if let Some(url) = &cli.auth_url {
        config.auth_url = Some(url.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    debug!(config = ?config, "Loaded configuration");

    let session = commands::open_session(&config)?;
    let format = cli.format;

    let result = match cli.command {
        Commands::Login { email } => commands::login(session.clone(), email, &format).await,
        Commands::Signup {
            name,
            tenant,
            email,
        } => commands::signup(session.clone(), name, tenant, email, &format).await,
        Commands::Logout => commands::logout(session.clone(), &format).await,
        Commands::Status { json } => {
            let format = if json {
                output::OutputFormat::Json
            } else {
                format
            };
            commands::status(session.clone(), &format).await
        }
        Commands::Whoami => commands::whoami(session.clone(), &format).await,
        Commands::Refresh => commands::refresh(session.clone(), &format).await,
        Commands::Get { url } => commands::get(session.clone(), &url, &format).await,
    };

    session.shutdown();
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    acme_config::init_logging_for_service("acme-cli", &cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_signup() {
        let cli = Cli::try_parse_from([
            "acme-auth",
            "signup",
            "--name",
            "Ada Lovelace",
            "--tenant",
            "analytical-engines",
            "--email",
            "ada@example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Signup {
                name,
                tenant,
                email,
            } => {
                assert_eq!(name, "Ada Lovelace");
                assert_eq!(tenant, "analytical-engines");
                assert_eq!(email.as_deref(), Some("ada@example.com"));
            }
            _ => panic!("expected signup"),
        }
    }

    #[test]
    fn test_parse_status_json_and_global_format() {
        let cli = Cli::try_parse_from(["acme-auth", "status", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { json: true }));

        let cli = Cli::try_parse_from(["acme-auth", "whoami", "--format", "json"]).unwrap();
        assert_eq!(cli.format, output::OutputFormat::Json);
    }

    #[test]
    fn test_get_requires_url() {
        assert!(Cli::try_parse_from(["acme-auth", "get"]).is_err());

        let cli = Cli::try_parse_from(["acme-auth", "get", "https://api.acme.dev/tickets"]).unwrap();
        assert!(matches!(cli.command, Commands::Get { url } if url == "https://api.acme.dev/tickets"));
    }
}
