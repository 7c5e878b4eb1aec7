// hand a JSON document to $EDITOR and read it back

use anyhow::{Context, Result};
use serde_json::Value;
use std::{env, fs, process::Command};

/// Open the record in the operator's editor. Returns the edited document and
/// whether anything changed.
pub fn edit_json(record: &Value) -> Result<(Value, bool)> {
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let original = serde_json::to_string_pretty(record)?;

    let path = env::temp_dir().join(format!(
        "racecli-edit-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ));
    fs::write(&path, &original).with_context(|| format!("writing {}", path.display()))?;

    let run = (|| -> Result<(Value, bool)> {
        let status = Command::new(&editor)
            .arg(&path)
            .status()
            .with_context(|| format!("launching editor {editor}"))?;
        if !status.success() {
            anyhow::bail!("editor exited with {status}");
        }

        let edited_text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        if edited_text.trim() == original.trim() {
            return Ok((record.clone(), false));
        }
        let edited: Value = serde_json::from_str(&edited_text).context("parsing edited JSON")?;
        Ok((edited, true))
    })();

    let _ = fs::remove_file(&path);
    run
}
