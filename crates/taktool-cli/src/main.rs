use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taktool_core::config::{BundleConfig, Config};
use taktool_core::inventory::render_line;
use taktool_core::{Bundler, FileCallback, Result, TaktoolError};

mod args;
use args::{Cli, Commands, ConfigAction, Shell};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let workdir = match resolve_workdir(cli.dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let result = match cli.command {
        Some(Commands::PluginsPackage {
            rename_plugins_disabled,
            output,
            require_artifacts,
        }) => handle_plugins_package(
            &workdir,
            rename_plugins_disabled,
            output.as_deref(),
            require_artifacts,
            cli.quiet,
        ),
        Some(Commands::Inspect { artifact }) => handle_inspect(&workdir, &artifact),
        Some(Commands::Config { action }) => handle_config(action, &workdir),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            Ok(())
        }
        None => {
            Cli::command().print_help().ok();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn resolve_workdir(cli_dir: Option<PathBuf>) -> Result<PathBuf> {
    match cli_dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "taktool", &mut io::stdout());
}

/// `taktool.toml` with command line flags applied on top.
fn resolve_bundle_config(
    workdir: &Path,
    rename_disabled: bool,
    output: Option<&str>,
) -> Result<BundleConfig> {
    let mut config = Config::load(workdir)?;
    if rename_disabled {
        config.bundle.rename = false;
    }
    if let Some(output) = output {
        config.set("bundle.output", output)?;
    }
    debug!(
        workdir = %workdir.display(),
        rename = config.bundle.rename,
        output = %config.bundle.output,
        platform = %config.bundle.platform,
        "bundle settings"
    );
    Ok(config.bundle)
}

fn handle_plugins_package(
    workdir: &Path,
    rename_disabled: bool,
    output: Option<&str>,
    require_artifacts: bool,
    quiet: bool,
) -> Result<()> {
    let config = resolve_bundle_config(workdir, rename_disabled, output)?;
    let rename = config.rename;

    let bundler = Bundler::new(workdir.to_path_buf(), config);
    if require_artifacts && bundler.find_artifacts()?.is_empty() {
        return Err(TaktoolError::NoArtifacts {
            path: workdir.to_path_buf(),
        });
    }

    if !quiet {
        println!();
        println!("Directory: {}", workdir.display().to_string().cyan());
        if !rename {
            println!("{}", "(rename disabled)".yellow());
        }
        println!();
        println!("Bundling...");
    }

    let on_file = |status: &str, subject: &str| {
        let status_str = match status {
            "ADD" => format!("[{}]", status).green(),
            "ICON" => format!("[{}]", status).blue(),
            "CUSTOM" => format!("[{}]", status).cyan(),
            "RENAME" => format!("[{}]", status).yellow(),
            "PLACEHOLDER" => format!("[{}]", status).yellow().bold(),
            "REMOVE" => format!("[{}]", status).red(),
            _ => format!("[{}]", status).normal(),
        };
        println!("  {} {}", status_str, subject);
    };
    let callback: FileCallback<'_> = if quiet { None } else { Some(&on_file) };

    let report = bundler.bundle(callback)?;
    info!(output = %report.output.display(), "bundle written");

    if !quiet {
        println!();
        println!("Summary:");
        println!("  Included: {}", report.records.len());
        println!("  Removed: {}", report.removed.len());
        println!("  Renamed: {}", report.renamed);
        println!();
        println!(
            "{} {}",
            "Bundle created:".green(),
            report.output.display()
        );
    }

    Ok(())
}

fn handle_inspect(workdir: &Path, artifact: &Path) -> Result<()> {
    let config = Config::load(workdir)?;
    let bundler = Bundler::new(workdir.to_path_buf(), config.bundle);
    debug!(artifact = %artifact.display(), "inspecting");
    let record = bundler.inspect(artifact)?;

    println!();
    println!("{} = {}", "identity".cyan(), record.identity);
    println!("{} = {}", "kind".cyan(), record.kind);
    println!("{} = {}", "display_name".cyan(), record.display_name);
    println!("{} = {}", "version".cyan(), record.version);
    println!("{} = {}", "revision".cyan(), record.revision);
    println!("{} = {}", "icon".cyan(), record.icon_ref);
    println!("{} = {}", "plugin_api".cyan(), record.min_host_version);
    println!("{} = {}", "sha256".cyan(), record.digest);
    println!("{} = {}", "size".cyan(), record.size_bytes);
    println!();
    println!("{}", render_line(&record)?);

    Ok(())
}

fn handle_config(action: ConfigAction, workdir: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(workdir)?;
            match config.get(&key) {
                Some(value) => {
                    println!("{}", value);
                }
                None => {
                    return Err(TaktoolError::ConfigKeyNotFound { key });
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(workdir)?;
            config.set(&key, &value)?;
            config.save(workdir)?;
            info!(key = %key, value = %value, "config updated");
            println!("{} {} = {}", "Set:".green(), key, value);
        }
        ConfigAction::List => {
            let config = Config::load(workdir)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            let path = Config::path(workdir);
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            let path = Config::init(workdir)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
    }
    Ok(())
}
