use std::io::Write as _;
use std::path::Path;

use tracing::{debug, info};

use super::{SavedWorkflow, ToolContext, WorkflowSection, cursor_frontmatter, document};
use crate::BridgeError;
use crate::util::excerpt;

const PREVIEW_CHARS: usize = 200;
const PROJECT_MARKERS: [&str; 4] = [".git", "Cargo.toml", "pyproject.toml", "package.json"];

/// Guess the AI tool from marker directories, walking up from `start` until a project root.
///
/// Also returns the directory the workflow file belongs under: the one holding the tool marker,
/// else the project root, else `start` itself.
pub fn detect_tool_context(start: &Path) -> (ToolContext, &Path) {
    for dir in start.ancestors() {
        if dir.join(".cursor").is_dir() || dir.join(".cursorrules").exists() {
            return (ToolContext::Cursor, dir);
        }
        if dir.join(".vscode").is_dir() || dir.join(".github").is_dir() {
            return (ToolContext::Vscode, dir);
        }
        if PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()) {
            return (ToolContext::Generic, dir);
        }
    }
    (ToolContext::Generic, start)
}

pub(super) fn save(
    base: &Path,
    section: WorkflowSection,
    tool_context: Option<ToolContext>,
) -> Result<SavedWorkflow, BridgeError> {
    let (tool_context, root) = match tool_context {
        Some(t) => (t, base),
        None => {
            let (detected, root) = detect_tool_context(base);
            debug!(
                tool_context = detected.as_str(),
                root = %root.display(),
                "detected tool context"
            );
            (detected, root)
        }
    };

    let mut content = document(section);
    if tool_context == ToolContext::Cursor {
        content.insert_str(0, &cursor_frontmatter(section));
    }

    let dir = root.join(tool_context.rules_dir());
    let path = dir.join(tool_context.file_name(section));
    write_atomic(&dir, &path, &content)?;

    let path = std::path::absolute(&path).unwrap_or(path);
    info!(
        path = %path.display(),
        section = section.as_str(),
        tool_context = tool_context.as_str(),
        "saved workflow document"
    );

    Ok(SavedWorkflow {
        section,
        tool_context,
        path,
        content_preview: excerpt(&content, PREVIEW_CHARS),
    })
}

/// Write through a temp file in `dir` and rename it over `path`, so readers only ever see the
/// old file or the complete new one. The temp file is removed on every failure path.
fn write_atomic(dir: &Path, path: &Path, content: &str) -> Result<(), BridgeError> {
    std::fs::create_dir_all(dir).map_err(|e| BridgeError::io(dir, &e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".casper-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| BridgeError::io(path, &e))?;

    tmp.write_all(content.as_bytes())
        .map_err(|e| BridgeError::io(path, &e))?;
    tmp.flush().map_err(|e| BridgeError::io(path, &e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BridgeError::io(path, &e))?;

    tmp.persist(path)
        .map_err(|e| BridgeError::io(path, &e.error))?;
    Ok(())
}
