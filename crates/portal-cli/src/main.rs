//! HealthSwift CLI - Sign in to the partner portal and manage your role.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::Portal;
use portal_auth::Role;
use portal_config_and_utils::{init_logging, Config, Paths};
use tracing::debug;

/// HealthSwift CLI - Partner portal sign-in, roles and navigation.
#[derive(Parser)]
#[command(name = "healthswift")]
#[command(about = "HealthSwift partner portal CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Keep credentials in memory only for this invocation
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create a partner account
    Signup {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in account and its role
    Status,

    /// Choose the partner role for this account
    SetRole {
        /// doctor, diagnostic_center, physiotherapist or ecg_lab
        role: Role,
    },

    /// Open a portal page, following redirects
    Open {
        /// Portal path, e.g. /doctor/slots
        path: String,
    },

    /// List portal pages and who may open them
    Routes,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(&paths, log_level);
    debug!(log_level, "CLI starting");

    // Route listing never needs a session.
    if let Commands::Routes = cli.command {
        commands::portal::routes(&portal_router::RouteTable::portal(), &cli.format);
        return Ok(());
    }

    let portal = Portal::connect(&config, &paths, cli.ephemeral)?;
    let format = &cli.format;

    let result = match cli.command {
        Commands::Login { email } => commands::auth::login(&portal, email, format).await,
        Commands::Signup { email } => commands::auth::signup(&portal, email, format).await,
        Commands::Logout => commands::auth::logout(&portal, format).await,
        Commands::Status => commands::auth::status(&portal, format).await,
        Commands::SetRole { role } => commands::auth::set_role(&portal, role, format).await,
        Commands::Open { path } => commands::portal::open(&portal, &path, format).await,
        Commands::Routes => Ok(()),
    };

    portal.manager.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_role_parses_role_names() {
        let cli = Cli::try_parse_from(["healthswift", "set-role", "diagnostic-center"]).unwrap();
        match cli.command {
            Commands::SetRole { role } => assert_eq!(role, Role::DiagnosticCenter),
            _ => panic!("expected set-role"),
        }
    }

    #[test]
    fn test_set_role_rejects_unknown_role() {
        assert!(Cli::try_parse_from(["healthswift", "set-role", "surgeon"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "healthswift",
            "open",
            "/lab",
            "--format",
            "json",
            "--ephemeral",
        ])
        .unwrap();
        assert_eq!(cli.format, output::OutputFormat::Json);
        assert!(cli.ephemeral);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_login_email_flag() {
        let cli = Cli::try_parse_from(["healthswift", "login", "-e", "doc@clinic.in"]).unwrap();
        match cli.command {
            Commands::Login { email } => assert_eq!(email.as_deref(), Some("doc@clinic.in")),
            _ => panic!("expected login"),
        }
    }
}
