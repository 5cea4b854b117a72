use std::fmt;

/// Stage of one launch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchState {
    #[default]
    Fetching,
    Parsing,
    ResolvingPlatform,
    AcquiringResources,
    ExtractingNatives,
    AcquiringExtensions,
    UpdatingShortcuts,
    Launching,
    /// Process handed off.
    Running,
    /// Stopped on user request; not an error.
    Cancelled,
    Failed,
}

impl LaunchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LaunchState::Running | LaunchState::Cancelled | LaunchState::Failed
        )
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchState::Fetching => "fetching",
            LaunchState::Parsing => "parsing",
            LaunchState::ResolvingPlatform => "resolving platform",
            LaunchState::AcquiringResources => "acquiring resources",
            LaunchState::ExtractingNatives => "extracting natives",
            LaunchState::AcquiringExtensions => "acquiring extensions",
            LaunchState::UpdatingShortcuts => "updating shortcuts",
            LaunchState::Launching => "launching",
            LaunchState::Running => "running",
            LaunchState::Cancelled => "cancelled",
            LaunchState::Failed => "failed",
        };
        f.write_str(name)
    }
}
