//! CLI command for installing mods

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;

use super::{OutputFormat, PrefixArg};
use crate::cli::progress::{describe, phase_emoji, print_done, print_step, simple_spinner};
use crate::config::{Config, expand_path};
use crate::install::{
    InstallOptions, InstallPhase, InstallReport, install_mods, install_mods_with_progress,
};

/// Install arguments from CLI flags
#[derive(Debug, Clone)]
pub struct InstallArgs {
    /// Game directory (--core)
    pub core: Option<PathBuf>,
    /// Mod directories (--mod)
    pub mods: Vec<PathBuf>,
    /// Prefix overrides (--prefix)
    pub prefixes: Vec<PrefixArg>,
    /// Config file (--config)
    pub config: Option<PathBuf>,
    /// Debug PNG export, off with --no-debug-export
    pub export_debug_pages: bool,
    /// Report format (--format)
    pub format: OutputFormat,
    /// Show progress, off with --quiet
    pub progress: bool,
}

fn load_config(args: &InstallArgs) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::load_default()?),
    }
}

pub fn execute(args: &InstallArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;

    let core = args
        .core
        .as_deref()
        .map(expand_path)
        .or_else(|| config.core_path.clone())
        .ok_or_else(|| anyhow::anyhow!("No game directory given. Pass --core or set core_path in havenloader.toml"))?;

    let mods: Vec<PathBuf> = if args.mods.is_empty() {
        config.mod_paths()
    } else {
        args.mods.iter().map(|m| expand_path(m)).collect()
    };
    if mods.is_empty() {
        println!("No mods to install");
        return Ok(());
    }

    let mut registry = config.registry();
    for arg in &args.prefixes {
        registry.set_override(arg.name.clone(), arg.prefix);
    }
    let options = InstallOptions {
        export_debug_pages: config.export_debug_pages && args.export_debug_pages,
    };

    let started = Instant::now();
    let report = if args.progress && args.format == OutputFormat::Text {
        println!("Installing {} mods into {}", mods.len(), core.display());
        let pb = simple_spinner("Loading core library");
        let result = install_mods_with_progress(&core, &mods, &registry, &options, &|progress| {
            pb.set_message(describe(progress));
        });
        pb.finish_and_clear();
        result?
    } else {
        install_mods(&core, &mods, &registry, &options)?
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print_report(&report);
            if args.progress {
                print_done(started.elapsed());
            }
        }
    }

    Ok(())
}

fn print_report(report: &InstallReport) {
    let total = report.mods.len();
    for (index, m) in report.mods.iter().enumerate() {
        let name = m
            .path
            .file_name()
            .map_or_else(|| m.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        print_step(
            index + 1,
            total,
            phase_emoji(InstallPhase::Installing),
            &format!(
                "{name}: {} merged, {} replaced, {} regions, {}/{} patches applied",
                m.merge.merged,
                m.merge.replaced,
                m.merge.regions_allocated,
                m.patches.applied,
                m.patches.applied + m.patches.missed,
            ),
        );
    }

    println!(
        "Atlas pages: {} created, {} updated, {} regions written",
        report.atlas.created_pages.len(),
        report.atlas.updated_pages.len(),
        report.atlas.regions_written
    );
    for asset in report.extra_assets() {
        println!("  extra asset: {asset}");
    }
}
