// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use config::Config;
use ledgerview_app::{AppState, QueryState};
use ledgerview_client::Client;
use ledgerview_tui::AppRuntime;
use logging::LogTarget;
use runtime::{DemoRuntime, HttpRuntime};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "ledgerview",
    version,
    about = "Terminal admin table for server-paginated transactions"
)]
struct Cli {
    /// Use a specific config path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the resolved config path and exit
    #[arg(long)]
    print_config_path: bool,

    /// Print a config template and exit
    #[arg(long)]
    print_example_config: bool,

    /// Browse seeded in-memory transactions instead of the service
    #[arg(long)]
    demo: bool,

    /// Validate config and startup dependencies, then exit
    #[arg(long)]
    check: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(error) = run(Cli::parse()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if cli.print_config_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if cli.print_example_config {
        print!("{}", Config::example_config(&config_path));
        return Ok(());
    }

    let config = Config::load(&config_path).with_context(|| {
        format!(
            "load config {}; run `ledgerview --print-example-config` to generate a template",
            config_path.display()
        )
    })?;

    let level = logging::resolve_level(cli.verbose, config.log_level())?;
    let target = if cli.check {
        LogTarget::Stderr
    } else {
        LogTarget::File(config.log_file()?)
    };
    logging::init_logging(level, &target)?;

    let options = config.view_options().with_context(|| {
        format!(
            "invalid [ui] config in {}; fix page_size/column_set/search_debounce values",
            config_path.display()
        )
    })?;

    if cli.demo {
        let mut runtime = DemoRuntime::seeded();
        if cli.check {
            let page = runtime.fetch_page(&QueryState::default())?;
            info!(total = page.total, "demo collection ready");
            return Ok(());
        }
        info!(config = %config_path.display(), "starting in demo mode");
        let mut state = AppState::new(options);
        return ledgerview_tui::run_app(&mut state, &mut runtime);
    }

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout values",
            config_path.display()
        )
    })?;
    if cli.check {
        info!(base_url = client.base_url(), "config ok");
        return Ok(());
    }

    info!(
        config = %config_path.display(),
        base_url = client.base_url(),
        "starting"
    );
    let mut state = AppState::new(options);
    let mut runtime = HttpRuntime::new(client);
    ledgerview_tui::run_app(&mut state, &mut runtime)
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_leave_every_flag_off() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["ledgerview"])?;
        assert_eq!(cli.config, None);
        assert!(!cli.print_config_path);
        assert!(!cli.print_example_config);
        assert!(!cli.demo);
        assert!(!cli.check);
        assert_eq!(cli.verbose, 0);
        Ok(())
    }

    #[test]
    fn config_override_and_flags_parse() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "ledgerview",
            "--config",
            "/custom/config.toml",
            "--demo",
            "--check",
            "-vv",
        ])?;
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(cli.demo);
        assert!(cli.check);
        assert_eq!(cli.verbose, 2);
        Ok(())
    }

    #[test]
    fn missing_config_value_is_an_error() {
        let error = Cli::try_parse_from(["ledgerview", "--config"])
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config"));
    }

    #[test]
    fn unknown_argument_is_an_error() {
        let error =
            Cli::try_parse_from(["ledgerview", "--wat"]).expect_err("unknown arg should fail");
        assert!(error.to_string().contains("--wat"));
    }
}
