use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::info;

use linktracker::cli::{Cli, Commands};
use linktracker::config::{StaticConfig, init_config};
use linktracker::errors::LinkTrackerError;
use linktracker::runtime::run_server;
use linktracker::services::JwtIdentityVerifier;
use linktracker::system::logging::init_logging;

fn generate_config(output_path: Option<&str>) -> Result<(), LinkTrackerError> {
    let sample = StaticConfig::generate_sample_config();
    match output_path {
        Some(path) => {
            std::fs::write(path, sample)?;
            eprintln!("{} Sample configuration written to {}", "✓".green(), path);
        }
        None => print!("{}", sample),
    }
    Ok(())
}

fn issue_token(
    config: &StaticConfig,
    user: &str,
    email: Option<&str>,
    minutes: i64,
) -> Result<(), LinkTrackerError> {
    if config.auth.jwt_secret.is_empty() {
        return Err(LinkTrackerError::identity_provider(
            "auth.jwt_secret is empty; a token signed with a random secret would be useless",
        ));
    }
    let verifier = JwtIdentityVerifier::from_config(&config.auth);
    println!("{}", verifier.issue_token(user, email, minutes)?);
    Ok(())
}

#[actix_web::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::GenerateConfig { output_path } = cli.command() {
        return match generate_config(output_path.as_deref()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e.format_colored());
                ExitCode::FAILURE
            }
        };
    }

    let config = init_config(cli.config.as_deref());

    if let Commands::IssueToken {
        user,
        email,
        minutes,
    } = cli.command()
    {
        return match issue_token(&config, user, email.as_deref(), *minutes) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e.format_colored());
                ExitCode::FAILURE
            }
        };
    }

    // guard 必须存活到进程退出，否则缓冲中的日志会丢失
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return ExitCode::FAILURE;
        }
    };

    info!(
        "linktracker {} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.server.environment.as_ref()
    );

    match run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
