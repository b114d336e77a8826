//! CLI progress display utilities
//!
//! Step indicators and a spinner driven by install progress callbacks.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::install::{InstallPhase, InstallProgress};

/// Package - for merge operations
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
/// Gear - for patching operations
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Floppy disk - for writing/saving operations
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
/// Picture - for texture/atlas operations
pub static PICTURE: Emoji<'_, '_> = Emoji("🖼️  ", "");
/// Sparkles - for completion
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

/// Print a step indicator: `[1/3] 📦 Message...`
pub fn print_step(current: usize, total: usize, emoji: Emoji, msg: &str) {
    println!(
        "{} {}{}",
        style(format!("[{current}/{total}]")).bold().dim(),
        emoji,
        msg
    );
}

/// Print completion message: `✨ Done in 2s`
pub fn print_done(elapsed: Duration) {
    println!("{} Done in {}", SPARKLE, HumanDuration(elapsed));
}

/// Emoji shown for an install phase
#[must_use]
pub fn phase_emoji(phase: InstallPhase) -> Emoji<'static, 'static> {
    match phase {
        InstallPhase::Installing => PACKAGE,
        InstallPhase::Patching => GEAR,
        InstallPhase::UpdatingXml => DISK,
        InstallPhase::PackingTextures => PICTURE,
        InstallPhase::Complete => SPARKLE,
    }
}

/// One-line description of a progress update: `Installing MoreItems (1/2)`
#[must_use]
pub fn describe(progress: &InstallProgress) -> String {
    match &progress.current_mod {
        Some(name) => format!(
            "{} {} ({}/{})",
            progress.phase.as_str(),
            name,
            progress.current,
            progress.total
        ),
        None => progress.phase.as_str().to_string(),
    }
}

/// Create a simple spinner
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn simple_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
