//! Main entry point for the Teller Queue service
//!
//! Runs the branch queue service (refresh loop plus HTTP endpoints) or a
//! single queue action against the remote API, with structured logging and
//! graceful shutdown.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use teller_queue::clock::{format_clock_time, format_duration, Clock, SystemClock};
use teller_queue::config::AppConfig;
use teller_queue::feedback::{list_feedback, submit_feedback, summarize};
use teller_queue::gateway::{HttpGateway, InMemoryGateway, QueueGateway};
use teller_queue::service::{AppState, HealthCheck};
use teller_queue::types::{CustomerStatus, FeedbackCategory, ServiceType};
use teller_queue::validation::{FeedbackRequest, RegistrationRequest};
use tokio::signal;
use tracing::{error, info, warn};

/// Teller Queue - bank-branch queue management
#[derive(Parser)]
#[command(
    name = "teller-queue",
    version,
    about = "Bank-branch queue management: tokens, teller dispatch and daily statistics",
    long_about = "Teller Queue mirrors a branch's remote queue API, issues per-day tokens, \
                 estimates wait times from the waiting queue, dispatches customers to qualified \
                 tellers and serves the day's queue statistics over HTTP."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Remote API override
    #[arg(long, value_name = "URL", help = "Override the remote queue API base URL")]
    api_url: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,

    /// Tellers on break
    #[arg(
        long,
        value_name = "TELLER",
        value_delimiter = ',',
        help = "Teller ids that are on break and must not be called (comma separated)"
    )]
    on_break: Vec<String>,

    /// Use an in-process queue instead of the remote API
    #[arg(long, help = "Run against an in-memory queue instead of the remote API")]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the service until interrupted (default)
    Serve,
    /// Print today's queue statistics
    Stats,
    /// Print today's waiting and serving customers
    Queue,
    /// Register a customer and print the issued token
    Register {
        name: String,
        phone: String,
        #[arg(value_name = "SERVICE", help = "international-transfer, domestic-transfer, forex or account-services")]
        service: ServiceType,
    },
    /// Call the next qualified customer to a teller
    Call { teller: String },
    /// Complete the teller's current customer
    Complete { teller: String },
    /// Cancel a waiting or serving customer
    Cancel { customer: String },
    /// Submit customer feedback
    Feedback {
        category: FeedbackCategory,
        rating: i64,
        #[arg(default_value = "")]
        comment: String,
    },
    /// Print the feedback summary
    FeedbackSummary,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig, offline: bool) {
    info!("🏦 Teller Queue Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP port: {}", config.service.http_port);
    if offline {
        info!("   Remote API: offline (in-memory queue)");
    } else {
        info!("   Remote API: {}", config.api.base_url);
    }
    info!("   Refresh interval: {}s", config.queue.refresh_interval_seconds);
    for teller in &config.roster {
        let services: Vec<&str> = teller.service_types.iter().map(|s| s.as_str()).collect();
        info!(
            "   Teller {} ({}): {}{}",
            teller.id,
            teller.name,
            services.join(", "),
            if teller.on_break { " [on break]" } else { "" }
        );
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    // Start with environment-based config
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(api_url) = &args.api_url {
        config.api.base_url = api_url.clone();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    config.set_on_break(&args.on_break)?;

    teller_queue::config::validate_config(&config)?;
    Ok(config)
}

fn build_gateway(
    config: &AppConfig,
    clock: &Arc<dyn Clock>,
    offline: bool,
) -> Result<Arc<dyn QueueGateway>> {
    if offline {
        return Ok(Arc::new(InMemoryGateway::new(clock.clone())));
    }
    Ok(Arc::new(HttpGateway::new(&config.api, clock.offset())?))
}

/// Run the service until a shutdown signal arrives
async fn serve(mut app_state: AppState) -> Result<()> {
    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Teller Queue Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;
    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    let shutdown_timeout = app_state.config().shutdown_timeout();
    match tokio::time::timeout(shutdown_timeout, app_state.shutdown()).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => warn!("Shutdown finished with errors: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Teller Queue Service stopped");
    Ok(())
}

async fn print_stats(app_state: &AppState) -> Result<()> {
    let store = app_state.store();
    let store = store.read().await;
    let stats = store.stats();

    println!("Today's queue");
    println!("  Customers: {}", stats.total_customers);
    println!("  Waiting: {}", stats.waiting_customers);
    println!("  Avg wait: {}", format_duration(stats.avg_wait_time));
    println!("  Avg service: {}", format_duration(stats.avg_service_time));

    println!("By service");
    for breakdown in store.service_breakdown() {
        println!(
            "  {:<24} {:>3} completed, avg {}",
            breakdown.service_type.label(),
            breakdown.completed,
            format_duration(breakdown.avg_service_time)
        );
    }

    println!("By teller");
    for performance in store.teller_performance() {
        println!(
            "  {:<16} {:>3} completed, avg {}",
            performance.name,
            performance.completed_today,
            format_duration(performance.avg_service_time)
        );
    }

    let monitor = app_state.monitor();
    drop(store);
    let health = HealthCheck::check(&monitor).await?;
    println!("Sync: {}", health.status);
    Ok(())
}

async fn print_queue(app_state: &AppState) {
    let store = app_state.store();
    let store = store.read().await;

    for status in [CustomerStatus::Serving, CustomerStatus::Waiting] {
        let customers = store.customers_by_status(status);
        println!("{} ({})", status, customers.len());
        for customer in customers {
            let checked_in = customer
                .check_in_time
                .map(|ts| format_clock_time(&ts, store.clock()))
                .unwrap_or_else(|| "--:--".to_string());
            println!(
                "  #{:<4} {:<24} {:<24} in {} est {}{}",
                customer.token_number,
                customer.name,
                customer.service_type.label(),
                checked_in,
                format_duration(i64::from(customer.estimated_wait_time)),
                customer
                    .teller_id
                    .as_ref()
                    .map(|teller| format!(" teller {}", teller))
                    .unwrap_or_default()
            );
        }
    }
    println!("Next token: {}", store.next_token());
}

/// Run a single queue action and exit
async fn run_command(app_state: &AppState, command: Command) -> Result<()> {
    if let Err(e) = app_state.refresh().await {
        warn!("Initial refresh failed, continuing with an empty queue: {}", e);
    }

    match command {
        Command::Serve => unreachable!("serve is handled by the caller"),
        Command::Stats => print_stats(app_state).await?,
        Command::Queue => print_queue(app_state).await,
        Command::Register {
            name,
            phone,
            service,
        } => {
            let customer = app_state
                .register(RegistrationRequest::new(name, phone, service))
                .await?;
            println!(
                "Token #{} for {} ({}), estimated wait {}",
                customer.token_number,
                customer.name,
                customer.service_type.label(),
                format_duration(i64::from(customer.estimated_wait_time))
            );
        }
        Command::Call { teller } => {
            let outcome = app_state.call_next(&teller).await?;
            println!("Call next at teller {}: {}", teller, outcome);
        }
        Command::Complete { teller } => {
            let outcome = app_state.complete_service(&teller).await?;
            println!("Complete at teller {}: {}", teller, outcome);
        }
        Command::Cancel { customer } => {
            let outcome = app_state
                .update_customer_status(&customer, CustomerStatus::Cancelled)
                .await?;
            println!("Cancel {}: {}", customer, outcome);
        }
        Command::Feedback {
            category,
            rating,
            comment,
        } => {
            let gateway = app_state.store().read().await.gateway();
            let feedback = submit_feedback(
                gateway.as_ref(),
                FeedbackRequest::new(category, rating, comment),
            )
            .await?;
            println!("Feedback {} recorded", feedback.id);
        }
        Command::FeedbackSummary => {
            let gateway = app_state.store().read().await.gateway();
            let summary = summarize(&list_feedback(gateway.as_ref()).await?);
            println!("Feedback entries: {}", summary.total);
            println!("Average rating: {:.1}", summary.average_rating);
            for (category, count) in &summary.by_category {
                println!("  {:<16} {}", category, count);
            }
            for (index, count) in summary.rating_histogram.iter().enumerate() {
                println!("  {} star: {}", index + 1, count);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config, args.offline);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::with_offset_minutes(
        config.queue.utc_offset_minutes,
    ));
    let gateway = build_gateway(&config, &clock, args.offline)?;

    info!("Initializing service components...");
    let app_state = match AppState::new(config.clone(), gateway, clock) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            display_startup_banner(&config, args.offline);
            serve(app_state).await
        }
        command => run_command(&app_state, command).await,
    }
}
