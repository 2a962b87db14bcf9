use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "taktool")]
#[command(about = "Build TAK plugin bundles from a directory of APKs")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Working directory (default: current directory)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bundle every APK in the working directory into product.infz
    #[command(name = "pluginspackage", visible_alias = "pp")]
    PluginsPackage {
        /// Keep every artifact as is: no revision cleanup, no renaming
        #[arg(long)]
        rename_plugins_disabled: bool,

        /// Archive file name (default: product.infz)
        #[arg(short, long, value_name = "NAME")]
        output: Option<String>,

        /// Fail when the directory holds no APK
        #[arg(long)]
        require_artifacts: bool,
    },

    /// Show the inventory line extracted from one APK
    Inspect {
        /// APK file, relative to the working directory
        artifact: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Create taktool.toml with defaults
    Init,

    /// Get a config value
    Get {
        /// Config key (e.g., bundle.output)
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., bundle.rename)
        key: String,

        /// Value to set (e.g., "false" or "bundle.infz")
        value: String,
    },

    /// List all config values
    List,

    /// Show config file path
    Path,
}
