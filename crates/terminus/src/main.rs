use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use terminus::banner::{show_banner, APP_VERSION};
use terminus::config::UserConfig;
use terminus::guide::{load_guide, GUIDE_FILE_NAME};
use terminus::providers::{provider_from_env, system_instructions_from_env};
use terminus::runtime::spawn_input_pump;
use terminus::signals::SignalBridge;
use terminus::tools::{ToolEnv, ToolRegistry};
use terminus::{CommandAllowList, Repl, RequestController, Runtime, Session, WorkingDirectory};
use terminus_ui::logging::{init_logging, LoggingOptions};
use terminus_ui::{Console, ConsoleOptions, EnvConfig, ProcessTerminal};

#[derive(Debug, Parser)]
#[command(name = "terminus", about = "An agentic shell for your terminal", disable_version_flag = true)]
struct Cli {
    /// Show debug logs inline and enable /test.
    #[arg(long)]
    debug: bool,

    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("terminus v{APP_VERSION}");
        return Ok(());
    }

    let env_config = EnvConfig::from_env();
    let debug = cli.debug || env_config.debug;
    let terminal = ProcessTerminal::new();
    let interactive = terminus_ui::platform::stdout_is_tty();
    let console = Console::new(
        terminal,
        ConsoleOptions {
            color: interactive && !env_config.no_color,
            spinner: interactive && !env_config.no_spinner,
            ..ConsoleOptions::default()
        },
    );

    init_logging(
        &console,
        &LoggingOptions {
            debug,
            log_file: env_config.log_file.as_ref().map(PathBuf::from),
        },
    )
    .context("failed to initialise logging")?;

    let config = UserConfig::load().context("failed to load configuration")?;
    config.export_env();
    let provider = provider_from_env(&config).context("failed to initialise provider")?;
    let profile = provider.profile();
    tracing::debug!(provider = %profile.provider_id, model = %profile.model_id, "provider ready");

    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let working_directory = WorkingDirectory::new(cwd.clone());
    let allowed_commands = CommandAllowList::new(config.settings.allowed_commands.iter());

    show_banner(&console);
    let guide = load_guide(&cwd);
    if guide.is_some() {
        console.info(&format!("Loaded {GUIDE_FILE_NAME} guide"));
    }

    let session = Session::new(working_directory.clone(), profile.model_id)
        .with_allowed_commands(allowed_commands.clone())
        .with_project_guide(guide)
        .with_debug(debug);
    let tools = ToolRegistry::builtin(
        ToolEnv::new(working_directory, allowed_commands).with_command_timeout(config.command_timeout()),
    );
    let controller = RequestController::new(provider, tools, system_instructions_from_env());

    let runtime = Runtime::new();
    spawn_input_pump(BufReader::new(io::stdin()), runtime.handle())
        .context("failed to start the input reader")?;
    let bridge = SignalBridge::install(runtime.handle(), session.sigint_flag())
        .context("failed to install the interrupt handler")?;

    let mut repl = Repl::new(session, runtime, console, controller).with_signal_bridge(bridge);
    let exit = repl.run();
    tracing::debug!(?exit, "terminus exiting");
    Ok(())
}
