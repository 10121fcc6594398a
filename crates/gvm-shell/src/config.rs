use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use crate::ShellError;
use crate::detect::ShellType;
use crate::script::{END_MARKER, START_MARKER};

/// A shell profile file held in memory while edits are prepared.
pub struct ShellConfig {
    pub shell_type: ShellType,
    pub config_path: PathBuf,
    pub content: String,
}

impl ShellConfig {
    pub fn load(shell_type: ShellType, config_path: PathBuf) -> Result<Self, ShellError> {
        let content = if config_path.exists() {
            fs::read_to_string(&config_path)?
        } else {
            String::new()
        };

        Ok(Self {
            shell_type,
            config_path,
            content,
        })
    }

    /// Whether a complete gvm block is present.
    #[must_use]
    pub fn has_init(&self) -> bool {
        self.block_range().is_some()
    }

    /// Append `block` unless a gvm block already exists.
    #[must_use]
    pub fn add_init(&self, block: &str) -> ShellConfigEdit {
        if self.has_init() {
            return ShellConfigEdit::unchanged(&self.content);
        }

        let mut modified = self.content.clone();
        if !modified.is_empty() && !modified.ends_with('\n') {
            modified.push('\n');
        }
        if !modified.is_empty() {
            modified.push('\n');
        }
        modified.push_str(block);
        if !block.ends_with('\n') {
            modified.push('\n');
        }

        ShellConfigEdit {
            modified,
            changes: vec![format!(
                "Add gvm initialization to {}",
                self.config_path.display()
            )],
        }
    }

    pub fn apply_edit(&mut self, edit: &ShellConfigEdit) -> Result<(), ShellError> {
        if !edit.has_changes() {
            return Ok(());
        }
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.config_path, &edit.modified)?;
        self.content.clone_from(&edit.modified);
        log::info!("Updated {}", self.config_path.display());

        Ok(())
    }

    /// Byte range from the start marker to the end of the end marker.
    fn block_range(&self) -> Option<(usize, usize)> {
        let start = self.content.find(START_MARKER)?;
        let end = self.content[start..].find(END_MARKER)? + start + END_MARKER.len();
        Some((start, end))
    }
}

pub struct ShellConfigEdit {
    pub modified: String,
    pub changes: Vec<String>,
}

impl ShellConfigEdit {
    fn unchanged(content: &str) -> Self {
        Self {
            modified: content.to_string(),
            changes: vec![],
        }
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    #[must_use]
    pub fn diff_preview(&self) -> String {
        if !self.has_changes() {
            return "No changes needed.".to_string();
        }

        let mut preview = String::new();
        for change in &self.changes {
            let _ = writeln!(preview, "+ {change}");
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str =
        "# >>> gvm initialize >>>\n. \"/root/.gvm/init-shell\"\n# <<< gvm initialize <<<\n";

    fn create_test_config(content: &str) -> ShellConfig {
        ShellConfig {
            shell_type: ShellType::Bash,
            config_path: PathBuf::from("/test/.bashrc"),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_has_init_requires_both_markers() {
        assert!(create_test_config(BLOCK).has_init());
        assert!(!create_test_config("# >>> gvm initialize >>>\n").has_init());
        assert!(
            !create_test_config("# <<< gvm initialize <<<\n# >>> gvm initialize >>>\n").has_init()
        );
        assert!(!create_test_config("export PATH=$PATH\n").has_init());
    }

    #[test]
    fn test_add_init_appends_block() {
        let config = create_test_config("export EDITOR=vim");
        let edit = config.add_init(BLOCK);

        assert!(edit.has_changes());
        assert_eq!(edit.modified, format!("export EDITOR=vim\n\n{BLOCK}"));
    }

    #[test]
    fn test_add_init_to_empty_file() {
        let edit = create_test_config("").add_init(BLOCK);
        assert_eq!(edit.modified, BLOCK);
    }

    #[test]
    fn test_add_init_is_idempotent() {
        let config = create_test_config(&format!("alias ll='ls -l'\n{BLOCK}"));
        let edit = config.add_init(BLOCK);

        assert!(!edit.has_changes());
        assert_eq!(edit.modified, config.content);
        assert_eq!(edit.diff_preview(), "No changes needed.");
    }

    #[test]
    fn test_diff_preview_lists_changes() {
        let edit = create_test_config("").add_init(BLOCK);
        assert_eq!(
            edit.diff_preview(),
            "+ Add gvm initialization to /test/.bashrc\n"
        );
    }
}
