//! Utility functions for directory management
//!
//! Paths follow the XDG Base Directory specification:
//!
//! - Data: `~/.local/share/fireguard/` - Saved configuration
//! - State: `~/.local/state/fireguard/` - Monitor log, mail outbox
//!
//! # Example
//!
//! ```
//! use fireguard::utils::{get_data_dir, ensure_dirs};
//!
//! ensure_dirs().expect("Failed to create directories");
//!
//! if let Some(data_path) = get_data_dir() {
//!     // Load configuration from data_path
//! }
//! ```

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fireguard", "fireguard")
}

pub fn get_data_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| pd.data_dir().to_path_buf())
}

/// State directory; falls back to the data directory on platforms without one
pub fn get_state_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| {
        pd.state_dir()
            .unwrap_or_else(|| pd.data_dir())
            .to_path_buf()
    })
}

/// Creates the data and state directories (mode 0o700 on Unix).
pub fn ensure_dirs() -> std::io::Result<()> {
    for dir in [get_data_dir(), get_state_dir()].into_iter().flatten() {
        create_private_dir(&dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .mode(0o700)
        .recursive(true)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Shortens `s` to at most `max_len` bytes, ending in "..." when cut.
/// Never splits a multi-byte character.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let budget = max_len.saturating_sub(3);
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        if idx + c.len_utf8() > budget {
            break;
        }
        end = idx + c.len_utf8();
    }
    format!("{}...", &s[..end])
}

/// Pads or truncates `s` to exactly `width` columns (ASCII assumed)
pub fn fit(s: &str, width: usize) -> String {
    let truncated = truncate_string(s, width);
    format!("{truncated:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_short() {
        assert_eq!(truncate_string("Chrome", 10), "Chrome");
    }

    #[test]
    fn test_truncate_string_long() {
        let truncated = truncate_string("Suspicious File Download", 12);
        assert!(truncated.len() <= 12);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_string_multibyte() {
        let truncated = truncate_string("ééééééééé", 7);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 7);
    }

    #[test]
    fn test_fit_pads_and_truncates() {
        assert_eq!(fit("TCP", 6), "TCP   ");
        assert_eq!(fit("Operating System", 8).len(), 8);
    }
}
