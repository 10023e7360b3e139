use colored::Colorize;
use screenkeeper::bridge::{
    CommandBridge, METHOD_START_SCREEN_SHARING, METHOD_STOP_SCREEN_SHARING, MethodCall,
    MethodOutcome,
};
use screenkeeper::cli::{Cli, Commands};
use screenkeeper::config::Config;
use screenkeeper::host::desktop::DesktopHost;
use screenkeeper::session::keeper::{SessionRegistry, SessionState};
use screenkeeper::{AppResult, init_logging};
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    // Handle config subcommand without starting the keeper
    if let Commands::Config { action } = cli.command() {
        Config::handle_command(&action, &cli.config_file)?;
        return Ok(());
    }

    // Load configuration
    let config = Config::load_or_default(&cli.config_file);

    // Initialize logging
    init_logging(&cli.effective_log_level(), &config.log)?;

    tracing::info!("ScreenKeeper starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    if cli.is_dry_run_mode() {
        println!();
        println!("Dry-run mode configuration:");
        println!("Config file: {}", cli.config_file);
        println!("Log level: {}", cli.effective_log_level());
        config.display()?;
        return Ok(());
    }

    // Build the host platform and the process-scoped session registry
    let host = Arc::new(DesktopHost::new(
        env!("CARGO_PKG_NAME"),
        &config.session.restart_marker_path,
    ));
    let pending = host.pending_command();
    let registry = SessionRegistry::new(config, host);
    let bridge = CommandBridge::new(registry.obtain());

    // Redeliver the command a killed previous run left behind
    if pending.is_some() {
        tracing::info!("Restart marker found, redelivering last command");
        if let Err(err) = bridge.redeliver(pending).await {
            tracing::error!("Redelivery failed: {}", err);
        }
    }

    run_console(&bridge).await?;

    tracing::info!("ScreenKeeper exiting");
    Ok(())
}

/// Line-driven console standing in for the controlling UI layer. Raw
/// input is forwarded to the bridge as a method name, so unknown methods
/// surface the not-implemented outcome directly.
async fn run_console(bridge: &CommandBridge) -> AppResult<()> {
    print_welcome();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "exit" | "q" => break,
            "help" | "?" => print_help(),
            "status" => print_status(bridge).await,
            "start" => dispatch(bridge, METHOD_START_SCREEN_SHARING).await,
            "stop" => dispatch(bridge, METHOD_STOP_SCREEN_SHARING).await,
            method => dispatch(bridge, method).await,
        }
    }

    Ok(())
}

async fn dispatch(bridge: &CommandBridge, method: &str) {
    match bridge.handle(&MethodCall::new(method)).await {
        Ok(MethodOutcome::Success(_)) => println!("{}", "ok".green()),
        Ok(MethodOutcome::NotImplemented) => {
            println!("{}", format!("not implemented: {}", method).yellow());
        }
        Err(err) => println!("{}", format!("error: {}", err).red()),
    }
}

async fn print_status(bridge: &CommandBridge) {
    let keeper = bridge.keeper();
    let status = keeper.lock().await.status();

    let state = match status.state {
        SessionState::Running => "running".green(),
        SessionState::Stopped => "stopped".yellow(),
    };

    println!("Session state: {}", state);
    println!("  channel registered: {}", status.channel_registered);
    println!("  indicator shown:    {}", status.indicator_shown);
    println!("  wake guard held:    {}", status.wake_guard_held);
    if let Some(started_at) = status.stats.started_at {
        println!("  started at:         {}", started_at.to_rfc3339());
    }
    println!(
        "  starts: {}  stops: {}  duplicates: {}  redeliveries: {}",
        status.stats.starts,
        status.stats.stops,
        status.stats.duplicate_commands,
        status.stats.redeliveries
    );
    if status.stats.guard_release_failures > 0 || status.stats.guard_expirations > 0 {
        println!(
            "{}",
            format!(
                "  wake guard leaks: {} release failures, {} expirations",
                status.stats.guard_release_failures, status.stats.guard_expirations
            )
            .red()
        );
    }
}

fn print_welcome() {
    println!();
    println!("ScreenKeeper session console");
    println!("Type 'help' for commands, 'quit' to exit.");
    println!();
}

fn print_help() {
    println!();
    println!("ScreenKeeper console commands:");
    println!("  start   - Start the screen-sharing session");
    println!("  stop    - Stop the screen-sharing session");
    println!("  status  - Show session state and diagnostics");
    println!("  help    - Show this help");
    println!("  quit    - Exit the console");
    println!();
    println!("Any other input is dispatched to the bridge as a raw method name.");
    println!();
}
