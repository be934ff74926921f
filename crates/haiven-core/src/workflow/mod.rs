//! Casper workflow guidance documents.
//!
//! Reading a document ([`document`]) is pure. Writing one to disk ([`WorkflowDocuments::save`])
//! is the only filesystem side effect in the bridge and only happens in [`WorkflowMode::Save`].

mod save;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::BridgeError;

pub use save::detect_tool_context;

const EXPLORE: &str = include_str!("../../workflow/explore.md");
const CRAFT: &str = include_str!("../../workflow/craft.md");
const POLISH: &str = include_str!("../../workflow/polish.md");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSection {
    Explore,
    Craft,
    Polish,
    Full,
}

impl WorkflowSection {
    pub const ALL: [WorkflowSection; 4] = [
        WorkflowSection::Explore,
        WorkflowSection::Craft,
        WorkflowSection::Polish,
        WorkflowSection::Full,
    ];

    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        match raw {
            "explore" => Ok(WorkflowSection::Explore),
            "craft" => Ok(WorkflowSection::Craft),
            "polish" => Ok(WorkflowSection::Polish),
            "full" => Ok(WorkflowSection::Full),
            other => Err(BridgeError::NotFound(format!("workflow section '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowSection::Explore => "explore",
            WorkflowSection::Craft => "craft",
            WorkflowSection::Polish => "polish",
            WorkflowSection::Full => "full",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            WorkflowSection::Explore => "Explore",
            WorkflowSection::Craft => "Craft",
            WorkflowSection::Polish => "Polish",
            WorkflowSection::Full => "Full",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    #[default]
    Share,
    Save,
}

impl WorkflowMode {
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        match raw {
            "share" => Ok(WorkflowMode::Share),
            "save" => Ok(WorkflowMode::Save),
            other => Err(BridgeError::Protocol(format!(
                "invalid mode '{other}' (expected 'share' or 'save')"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowMode::Share => "share",
            WorkflowMode::Save => "save",
        }
    }
}

/// Which AI tool the saved document is meant for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolContext {
    Cursor,
    Vscode,
    Generic,
}

impl ToolContext {
    pub const ALL: [ToolContext; 3] = [
        ToolContext::Cursor,
        ToolContext::Vscode,
        ToolContext::Generic,
    ];

    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        match raw {
            "cursor" => Ok(ToolContext::Cursor),
            "vscode" => Ok(ToolContext::Vscode),
            "generic" => Ok(ToolContext::Generic),
            other => Err(BridgeError::Protocol(format!(
                "invalid tool_context '{other}' (expected cursor, vscode, or generic)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolContext::Cursor => "cursor",
            ToolContext::Vscode => "vscode",
            ToolContext::Generic => "generic",
        }
    }

    /// Directory, relative to the project base, where this tool looks for rule files.
    pub fn rules_dir(self) -> &'static Path {
        match self {
            ToolContext::Cursor => Path::new(".cursor/rules"),
            ToolContext::Vscode => Path::new(".github/instructions"),
            ToolContext::Generic => Path::new(""),
        }
    }

    pub fn file_name(self, section: WorkflowSection) -> String {
        let section = section.as_str();
        match self {
            ToolContext::Cursor => format!("casper-{section}.mdc"),
            ToolContext::Vscode => format!("casper-{section}.instructions.md"),
            ToolContext::Generic => format!("casper-{section}.md"),
        }
    }
}

/// Document body for `section`. `Full` concatenates every phase in order.
pub fn document(section: WorkflowSection) -> String {
    match section {
        WorkflowSection::Explore => EXPLORE.to_string(),
        WorkflowSection::Craft => CRAFT.to_string(),
        WorkflowSection::Polish => POLISH.to_string(),
        WorkflowSection::Full => [EXPLORE, CRAFT, POLISH].join("\n"),
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub section: WorkflowSection,
    pub mode: WorkflowMode,
    pub tool_context: Option<ToolContext>,
    /// Overrides the provider's base directory for this save.
    pub project_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Shared {
        section: WorkflowSection,
        content: String,
    },
    Saved(SavedWorkflow),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedWorkflow {
    pub section: WorkflowSection,
    pub tool_context: ToolContext,
    pub path: PathBuf,
    pub content_preview: String,
}

/// Serves workflow documents and saves them relative to a base directory
/// (normally the process working directory).
#[derive(Debug, Clone)]
pub struct WorkflowDocuments {
    base_dir: PathBuf,
}

impl WorkflowDocuments {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Blocking when `req.mode` is [`WorkflowMode::Save`]; callers on an async runtime should
    /// move the call onto the blocking pool.
    pub fn get(&self, req: &WorkflowRequest) -> Result<WorkflowOutcome, BridgeError> {
        match req.mode {
            WorkflowMode::Share => Ok(WorkflowOutcome::Shared {
                section: req.section,
                content: document(req.section),
            }),
            WorkflowMode::Save => {
                let base = req
                    .project_directory
                    .as_deref()
                    .unwrap_or(&self.base_dir);
                save::save(base, req.section, req.tool_context).map(WorkflowOutcome::Saved)
            }
        }
    }
}

fn cursor_frontmatter(section: WorkflowSection) -> String {
    format!(
        "---\ndescription: Casper workflow methodology - {} phase\nglobs: [\"**/*\"]\nalwaysApply: false\n---\n\n",
        section.display_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_parse_and_unknown_is_not_found() {
        for s in WorkflowSection::ALL {
            assert_eq!(WorkflowSection::parse(s.as_str()).unwrap(), s);
        }
        let err = WorkflowSection::parse("deploy").unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(ref m) if m.contains("deploy")));
    }

    #[test]
    fn invalid_mode_and_context_are_protocol_errors() {
        assert!(matches!(
            WorkflowMode::parse("print"),
            Err(BridgeError::Protocol(_))
        ));
        assert!(matches!(
            ToolContext::parse("emacs"),
            Err(BridgeError::Protocol(_))
        ));
    }

    #[test]
    fn each_section_has_its_own_heading() {
        let explore = document(WorkflowSection::Explore);
        let craft = document(WorkflowSection::Craft);
        let polish = document(WorkflowSection::Polish);
        assert!(explore.contains("Exploration Phase") && !explore.contains("Craft Phase"));
        assert!(craft.contains("Craft Phase") && !craft.contains("Polish Phase"));
        assert!(polish.contains("Polish Phase") && !polish.contains("Exploration Phase"));
    }

    #[test]
    fn full_is_phases_in_order() {
        let full = document(WorkflowSection::Full);
        let e = full.find("Exploration Phase").unwrap();
        let c = full.find("Craft Phase").unwrap();
        let p = full.find("Polish Phase").unwrap();
        assert!(e < c && c < p);
    }

    #[test]
    fn share_mode_touches_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let docs = WorkflowDocuments::new(dir.path());
        let out = docs
            .get(&WorkflowRequest {
                section: WorkflowSection::Craft,
                mode: WorkflowMode::Share,
                tool_context: Some(ToolContext::Cursor),
                project_directory: None,
            })
            .unwrap();
        match out {
            WorkflowOutcome::Shared { section, content } => {
                assert_eq!(section, WorkflowSection::Craft);
                assert!(!content.is_empty());
            }
            other => panic!("expected shared outcome, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn file_names_depend_on_tool() {
        assert_eq!(
            ToolContext::Cursor.file_name(WorkflowSection::Explore),
            "casper-explore.mdc"
        );
        assert_eq!(
            ToolContext::Vscode.file_name(WorkflowSection::Full),
            "casper-full.instructions.md"
        );
        assert_eq!(
            ToolContext::Generic.file_name(WorkflowSection::Polish),
            "casper-polish.md"
        );
    }
}
