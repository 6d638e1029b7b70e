// src/system/editor.rs

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command as StdCommand;
use thiserror::Error;

const FALLBACK_EDITOR: &str = "vi";

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Editor command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No editor command specified.")]
    EmptyCommand,
    #[error("Editor '{0}' could not be started: {1}")]
    LaunchFailed(String, std::io::Error),
    #[error("Editor '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    #[error("Could not prepare the file to edit: {0}")]
    Io(#[from] std::io::Error),
}

/// Picks the editor command: the configured one, then `$VISUAL`, `$EDITOR`, then `vi`.
pub fn resolve_editor(configured: Option<&str>, env: impl Fn(&str) -> Option<String>) -> String {
    configured
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| env("VISUAL").filter(|v| !v.trim().is_empty()))
        .or_else(|| env("EDITOR").filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_EDITOR.to_string())
}

/// Runs `editor` on `path` and waits for it to exit. The command line may carry
/// arguments (e.g. `code --wait`); the path is appended last.
pub fn edit_file(editor: &str, path: &Path) -> Result<(), EditorError> {
    let parts =
        shlex::split(editor.trim()).ok_or_else(|| EditorError::CommandParse(editor.to_string()))?;
    let (program, args) = parts.split_first().ok_or(EditorError::EmptyCommand)?;

    log::debug!("Launching editor '{}' on '{}'.", editor, path.display());
    let status = StdCommand::new(program)
        .args(args)
        .arg(path)
        .status()
        .map_err(|e| EditorError::LaunchFailed(editor.to_string(), e))?;

    if !status.success() {
        return Err(EditorError::NonZeroExitStatus(editor.to_string()));
    }
    Ok(())
}

/// Writes `initial` to a temporary file with `suffix`, lets the user edit it and
/// returns the edited text. The file is removed afterwards.
pub fn edit_text(editor: &str, initial: &str, suffix: &str) -> Result<String, EditorError> {
    let mut file = tempfile::Builder::new()
        .prefix("atlasman-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;

    edit_file(editor, file.path())?;
    Ok(fs::read_to_string(file.path())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_configured_editor_wins() {
        let env = env_of(&[("VISUAL", "code --wait"), ("EDITOR", "nano")]);
        assert_eq!(resolve_editor(Some("hx"), env), "hx");
    }

    #[test]
    fn test_environment_fallbacks() {
        assert_eq!(
            resolve_editor(Some("  "), env_of(&[("VISUAL", "code --wait"), ("EDITOR", "nano")])),
            "code --wait"
        );
        assert_eq!(resolve_editor(None, env_of(&[("EDITOR", "nano")])), "nano");
        assert_eq!(resolve_editor(None, env_of(&[])), "vi");
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = edit_file("   ", Path::new("/tmp/none")).unwrap_err();
        assert!(matches!(err, EditorError::EmptyCommand));
    }

    #[cfg(unix)]
    #[test]
    fn test_edit_text_returns_file_content() {
        // `true` leaves the file as written.
        let edited = edit_text("true", "<p>unchanged</p>", ".html").unwrap();
        assert_eq!(edited, "<p>unchanged</p>");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_editor_is_reported() {
        let err = edit_text("false", "x", ".txt").unwrap_err();
        assert!(matches!(err, EditorError::NonZeroExitStatus(ref cmd) if cmd == "false"));
    }
}
