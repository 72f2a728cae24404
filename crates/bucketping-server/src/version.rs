//! Build metadata embedded at compile time by `build.rs`

use serde::Serialize;
use std::fmt;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Agent identifier logged at startup
pub const USER_AGENT: &str = concat!("bucketping/", env!("CARGO_PKG_VERSION"));

/// Everything known about the running binary
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_branch: &'static str,
    pub git_commit_timestamp: &'static str,
    pub git_dirty: bool,
    pub build_timestamp: &'static str,
    pub rustc: &'static str,
    pub target: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_sha: env!("VERGEN_GIT_SHA"),
            git_branch: env!("VERGEN_GIT_BRANCH"),
            git_commit_timestamp: env!("VERGEN_GIT_COMMIT_TIMESTAMP"),
            git_dirty: env!("VERGEN_GIT_DIRTY") == "true",
            build_timestamp: env!("VERGEN_BUILD_TIMESTAMP"),
            rustc: env!("VERGEN_RUSTC_SEMVER"),
            target: env!("VERGEN_CARGO_TARGET_TRIPLE"),
        }
    }

    /// `<version> (<sha>[ dirty])`
    pub fn short(&self) -> String {
        let dirty = if self.git_dirty { " dirty" } else { "" };
        format!("{} ({}{dirty})", self.version, self.git_sha)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bucketping-server {}", self.version)?;
        writeln!(f, "commit: {} ({})", self.git_sha, self.git_commit_timestamp)?;
        writeln!(f, "branch: {}", self.git_branch)?;
        writeln!(f, "built:  {}", self.build_timestamp)?;
        writeln!(f, "rustc:  {}", self.rustc)?;
        write!(f, "target: {}", self.target)
    }
}

pub fn full_version() -> String {
    BuildInfo::current().short()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_version_starts_with_crate_version() {
        let info = BuildInfo::current();
        assert!(info.short().starts_with(VERSION));
        assert!(info.short().contains(info.git_sha));
    }

    #[test]
    fn test_display_names_binary() {
        let text = BuildInfo::current().to_string();
        assert!(text.starts_with("bucketping-server "));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn test_user_agent() {
        assert_eq!(USER_AGENT, format!("bucketping/{VERSION}"));
    }
}
