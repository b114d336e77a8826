use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

pub mod cim;
pub mod install;

/// Prefix override for a mod: `NAME=PREFIX`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixArg {
    /// Mod path or directory name
    pub name: String,
    /// Namespace prefix
    pub prefix: u32,
}

impl FromStr for PrefixArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, prefix)) = s.rsplit_once('=') else {
            return Err(format!("Invalid prefix '{s}'. Expected NAME=PREFIX, e.g. MoreItems=4242"));
        };
        let prefix = prefix
            .trim()
            .parse()
            .map_err(|_| format!("Invalid prefix '{prefix}' for '{name}'. Must be a positive integer"))?;
        Ok(PrefixArg {
            name: name.trim().to_string(),
            prefix,
        })
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install mods into a Space Haven game directory
    Install {
        /// Game install directory (containing library/)
        #[arg(short, long)]
        core: Option<PathBuf>,

        /// Mod directory, in install order (repeatable)
        #[arg(short, long = "mod")]
        mods: Vec<PathBuf>,

        /// Override a mod's namespace prefix: NAME=PREFIX (repeatable)
        #[arg(long = "prefix")]
        prefixes: Vec<PrefixArg>,

        /// havenloader.toml to read (defaults to the platform config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Do not save rebuilt atlas pages as PNGs into the mods
        #[arg(long)]
        no_debug_export: bool,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// CIM atlas page operations
    Cim {
        #[command(subcommand)]
        command: CimCommands,
    },
}

#[derive(Subcommand)]
pub enum CimCommands {
    /// Show dimensions and pixel format of a CIM file
    Info {
        /// Source .cim file
        #[arg(short, long)]
        source: PathBuf,
    },

    /// Convert a CIM file to PNG
    Export {
        /// Source .cim file
        #[arg(short, long)]
        source: PathBuf,

        /// Destination .png file
        #[arg(short, long)]
        destination: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Install {
                core,
                mods,
                prefixes,
                config,
                no_debug_export,
                format,
                quiet,
            } => install::execute(&install::InstallArgs {
                core: core.clone(),
                mods: mods.clone(),
                prefixes: prefixes.clone(),
                config: config.clone(),
                export_debug_pages: !*no_debug_export,
                format: *format,
                progress: !*quiet,
            }),
            Commands::Cim { command } => command.execute(),
        }
    }
}

impl CimCommands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            CimCommands::Info { source } => cim::info(source),
            CimCommands::Export { source, destination } => cim::export(source, destination),
        }
    }
}
