use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use deploypilot::config::DEFAULT_CONFIG_PATH;
use deploypilot::gitops::ShutdownHandle;
use deploypilot::{
    init_logging, load_config, ActivityBroadcaster, ActivityReporter, Config, DeployHandler,
    Executor, GitCheckout, GithubClient, LogFormat, PollLoop, ReconcileContext, Reconciler,
    RevisionSource, SecretResolver, SopsDecryptor, Workspace,
};

#[derive(Parser)]
#[command(
    name = "deploypilot",
    about = "Watch a GitHub repository and run a deployment script on every new commit",
    version
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short = 'c', env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format, overriding logging.format
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Validate the configuration, print the current revision and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(&config.logging)?;
    log::info!("Starting deploypilot v{}", env!("CARGO_PKG_VERSION"));

    let token = config.github_token()?;
    let age_key = config.age_key()?;
    let path_scope = config.path_scope();

    let source = Arc::new(GithubClient::with_base_url(
        &config.api_base_url,
        &config.owner,
        &config.repo,
        Some(token.clone()),
    )?);

    if cli.check {
        let revision = source
            .fetch_latest(&path_scope)
            .await
            .context("Failed to query the current revision")?;
        println!(
            "{}/{} is at {} by {}: {}",
            config.owner,
            config.repo,
            revision.id,
            revision.author_name,
            revision.summary()
        );
        return Ok(());
    }

    log_banner(&config, &path_scope, age_key.is_some());

    let reporter: Arc<dyn ActivityReporter> = Arc::new(ActivityBroadcaster::default());
    let timeout = config.command_timeout();

    let checkout = GitCheckout::new(Some(token))
        .with_git_binary(&config.git_binary)
        .with_base_url(&config.clone_base_url)
        .with_timeout(timeout);
    let resolver = SecretResolver::new(
        Arc::new(SopsDecryptor::new(&config.sops_binary, timeout)),
        Arc::clone(&reporter),
    );
    let executor = Executor::new(&config.shell, timeout, Arc::clone(&reporter));

    let reconciler = Reconciler::new(
        Workspace::new(config.data_dir.clone()),
        Arc::new(checkout),
        resolver,
        executor,
        Arc::clone(&reporter),
    )
    .with_settle_delay(config.settle_delay());

    let context = ReconcileContext {
        owner: config.owner.clone(),
        repo: config.repo.clone(),
        monitor_path: path_scope.clone(),
        decryption_key: age_key,
        script: config.script.clone(),
    };
    let handler = DeployHandler::new(Arc::new(reconciler), context, Arc::clone(&reporter));

    let mut poll_loop = PollLoop::new(
        source,
        Arc::new(handler),
        path_scope,
        config.interval(),
        reporter,
    );

    let shutdown = poll_loop.shutdown_handle();
    ctrlc::set_handler(move || {
        if request_shutdown(&shutdown) {
            eprintln!("Interrupted again, exiting immediately");
            std::process::exit(130);
        }
    })
    .context("Failed to install Ctrl+C handler")?;

    poll_loop.run().await?;
    Ok(())
}

/// First interrupt stops the loop after the current cycle. Returns `true`
/// on a repeated interrupt, when the process should exit without waiting
/// for a clone or script that may never finish.
fn request_shutdown(shutdown: &ShutdownHandle) -> bool {
    if shutdown.is_stopped() {
        return true;
    }
    log::info!("Shutdown requested, stopping after the current cycle (Ctrl+C again to exit now)");
    shutdown.stop();
    false
}

fn log_banner(config: &Config, path_scope: &str, decrypts: bool) {
    log::info!(
        "Repository: {}/{} (polling every {}s)",
        config.owner,
        config.repo,
        config.interval
    );
    if path_scope.is_empty() {
        log::info!("Monitoring entire repository");
    } else {
        log::info!("Monitoring path: {} (including subdirectories)", path_scope);
    }
    log::info!("Working directory: {}", config.data_dir.display());
    if !decrypts {
        log::info!("No age secret configured, files will be used as committed");
    }
}
