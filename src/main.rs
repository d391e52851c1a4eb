use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pos_invoices::application::context::{Collaborators, WorkflowContext};
use pos_invoices::application::coordinator::{AttemptOutcome, PaymentCoordinator};
use pos_invoices::application::registry::InvoiceRegistry;
use pos_invoices::config::{DEFAULT_CURRENCY, WorkflowConfig};
use pos_invoices::infrastructure::console::{LogCapturePage, LogNotifier};
use pos_invoices::infrastructure::in_memory::StaticAuthenticator;
use pos_invoices::infrastructure::sandbox::SandboxChargeService;
use pos_invoices::interfaces::csv::attempt_reader::{AttemptReader, PaymentAttempt};
use pos_invoices::interfaces::csv::invoice_reader::InvoiceReader;
use pos_invoices::interfaces::csv::invoice_writer::InvoiceWriter;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Payment attempts CSV file (position, method, token)
    attempts: PathBuf,

    /// Invoice list CSV file. Uses the built-in invoice list when omitted.
    #[arg(long)]
    invoices: Option<PathBuf>,

    /// Bearer token presented to the charge service
    #[arg(long, env = "POS_AUTH_TOKEN", default_value = "sandbox")]
    auth_token: String,

    /// Currency code sent with each charge
    #[arg(long, env = "POS_CURRENCY", default_value = DEFAULT_CURRENCY)]
    currency: String,

    /// Seconds to wait for the charge service before giving up
    #[arg(long, env = "POS_CHARGE_TIMEOUT_SECS", default_value_t = 30)]
    charge_timeout_secs: u64,

    /// Card tokens the sandbox charge service declines (repeatable)
    #[arg(long = "decline-token")]
    decline_tokens: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pos_invoices=info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    let registry = match &cli.invoices {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            let mut seeds = Vec::new();
            for seed in InvoiceReader::new(file).invoices() {
                match seed {
                    Ok(seed) => seeds.push(seed),
                    Err(e) => error!("Error reading invoice: {e}"),
                }
            }
            InvoiceRegistry::new(seeds)
        }
        None => InvoiceRegistry::with_default_seed(),
    };

    let charge_service = SandboxChargeService::new();
    for token in &cli.decline_tokens {
        charge_service.decline_token(token.as_str());
    }

    let config = WorkflowConfig::default()
        .with_currency(cli.currency)
        .with_charge_timeout(Duration::from_secs(cli.charge_timeout_secs));
    let collaborators = Collaborators {
        charge_service: Arc::new(charge_service),
        authenticator: Arc::new(StaticAuthenticator::new(cli.auth_token)),
        capture_page: Arc::new(LogCapturePage),
        notifier: Arc::new(LogNotifier),
    };
    let context = WorkflowContext::start(registry.clone(), collaborators, config);

    // Replay the scripted attempts
    let file = File::open(cli.attempts).into_diagnostic()?;
    let mut coordinator = context.coordinator();
    for attempt in AttemptReader::new(file).attempts() {
        match attempt {
            Ok(attempt) => {
                let position = attempt.position;
                match run_attempt(&mut coordinator, attempt).await {
                    Ok(AttemptOutcome::Completed(result)) => {
                        info!(position, charge_id = %result.charge_id, "payment completed");
                    }
                    Ok(AttemptOutcome::Cancelled) => info!(position, "payment cancelled"),
                    Err(e) => error!(position, "Error processing payment: {e}"),
                }
            }
            Err(e) => error!("Error reading attempt: {e}"),
        }
    }

    // Drain the result channel before reporting
    context.stop().await;

    let stdout = io::stdout();
    let mut writer = InvoiceWriter::new(stdout.lock());
    writer
        .write_invoices(registry.list_invoices().await)
        .into_diagnostic()?;

    Ok(())
}

async fn run_attempt(
    coordinator: &mut PaymentCoordinator,
    attempt: PaymentAttempt,
) -> pos_invoices::error::Result<AttemptOutcome> {
    coordinator.on_pay_requested(attempt.position).await?;
    let tokens = coordinator.choose_method(attempt.method)?;
    match attempt.token {
        Some(token) => tokens.send(token),
        None => tokens.dismiss(),
    }
    coordinator.await_token().await
}
