//! Progress reporting for install runs

/// Progress callback type for install runs
pub type InstallProgressCallback<'a> = &'a (dyn Fn(&InstallProgress) + Sync + Send);

/// Progress information during an install run
#[derive(Debug, Clone)]
pub struct InstallProgress {
    /// Current phase
    pub phase: InstallPhase,
    /// Current step (1-indexed)
    pub current: usize,
    /// Total number of steps in this phase
    pub total: usize,
    /// Mod being processed (if applicable)
    pub current_mod: Option<String>,
}

impl InstallProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: InstallPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_mod: None,
        }
    }

    /// Create a progress update naming the mod being processed
    #[must_use]
    pub fn with_mod(phase: InstallPhase, current: usize, total: usize, name: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            current_mod: Some(name.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of an install run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// Merging a mod's library fragments
    Installing,
    /// Applying a mod's patch files
    Patching,
    /// Writing the core XML files
    UpdatingXml,
    /// Rebuilding atlas pages
    PackingTextures,
    /// Run complete
    Complete,
}

impl InstallPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installing => "Installing",
            Self::Patching => "Patching",
            Self::UpdatingXml => "Updating XML",
            Self::PackingTextures => "Packing textures",
            Self::Complete => "Complete",
        }
    }
}
