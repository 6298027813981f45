//! Transient audio files: naming and cleanup.

use crate::config::SANITIZED_NAME_MAX_CHARS;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Characters that never appear in a sanitized file name
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '\'', '<', '>', '|', '"', '.'];

/// Make a title safe for use in a file name.
///
/// Each forbidden character becomes `_`, the result is cut to
/// [`SANITIZED_NAME_MAX_CHARS`] characters and surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use melody_bot::download::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name(" AC/DC: T.N.T. "), "AC_DC_ T_N_T_");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .take(SANITIZED_NAME_MAX_CHARS)
        .collect();
    replaced.trim().to_string()
}

/// File stem for a track's transient artifact.
///
/// The media ID is appended so two tracks with the same title never share
/// a file. The ID only ever names the file; it is not derived from the title.
#[must_use]
pub fn artifact_stem(title: &str, media_id: &str) -> String {
    let safe_title = sanitize_file_name(title);
    if safe_title.is_empty() {
        media_id.to_string()
    } else {
        format!("{safe_title}-{media_id}")
    }
}

/// Local file that is removed when dropped, on every exit path.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of a file on disk.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed transient artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove transient artifact"),
        }
    }
}

/// Remove whatever a failed fetch left behind for `stem` (partial downloads,
/// intermediate formats).
pub async fn remove_leftovers(dir: &Path, stem: &str) {
    let prefix = format!("{stem}.");
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(&prefix));
        if matches {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), error = %e, "Failed to remove leftover file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_replaces_each_forbidden_char() {
        assert_eq!(sanitize_file_name(r#"a/b\c:d*e?f'g<h>i|j"k.l"#), "a_b_c_d_e_f_g_h_i_j_k_l");
    }

    #[test]
    fn test_sanitize_truncates_then_trims() {
        let long = format!("{}   ", "x".repeat(48));
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized, "x".repeat(48));

        let sanitized = sanitize_file_name(&"ё".repeat(80));
        assert_eq!(sanitized.chars().count(), SANITIZED_NAME_MAX_CHARS);
    }

    #[test]
    fn test_artifact_stem() {
        assert_eq!(artifact_stem("Imagine", "abc"), "Imagine-abc");
        assert_eq!(artifact_stem("   ", "abc"), "abc");
    }

    #[test]
    fn test_temp_artifact_removed_on_drop() -> std::io::Result<()> {
        let path = std::env::temp_dir().join(format!("melody-{}.mp3", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"audio")?;

        drop(TempArtifact::new(path.clone()));
        assert!(!path.exists());

        // Already gone: dropping again is silent
        drop(TempArtifact::new(path));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_leftovers_only_touches_stem() -> std::io::Result<()> {
        let dir = std::env::temp_dir().join(format!("melody-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("song-id.webm.part"), b"x").await?;
        tokio::fs::write(dir.join("song-id.webm"), b"x").await?;
        tokio::fs::write(dir.join("other-id.mp3"), b"x").await?;

        remove_leftovers(&dir, "song-id").await;

        assert!(!dir.join("song-id.webm.part").exists());
        assert!(!dir.join("song-id.webm").exists());
        assert!(dir.join("other-id.mp3").exists());

        tokio::fs::remove_dir_all(&dir).await
    }

    proptest! {
        #[test]
        fn sanitized_names_are_safe(name in "\\PC*") {
            let sanitized = sanitize_file_name(&name);
            prop_assert!(!sanitized.contains(FORBIDDEN_CHARS));
            prop_assert!(sanitized.chars().count() <= SANITIZED_NAME_MAX_CHARS);
            prop_assert_eq!(sanitized.trim(), sanitized.as_str());
        }
    }
}
