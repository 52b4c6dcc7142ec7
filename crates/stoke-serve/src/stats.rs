//! Build cycle reports and failure extraction.
//!
//! A [`BuildStats`] snapshot is what the build engine hands to completion
//! hooks. It is serializable so CLI collaborators can dump it as JSON, and it
//! nests per-graph snapshots under `children` when the engine builds several
//! graphs in one cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Report of one completed build cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    /// Build graph name, when the snapshot belongs to a single graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Content hash of this cycle's output
    #[serde(default)]
    pub hash: String,

    /// Wall-clock duration of the cycle
    #[serde(default)]
    pub duration_ms: u64,

    /// Errors reported by the engine
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StatsMessage>,

    /// Warnings reported by the engine
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StatsMessage>,

    /// Emitted assets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<StatsAsset>,

    /// Per-graph snapshots for multi-graph builds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BuildStats>,
}

impl BuildStats {
    /// Whether this snapshot or any child reports an error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.children.iter().any(BuildStats::has_errors)
    }

    /// Whether this snapshot or any child reports a warning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty() || self.children.iter().any(BuildStats::has_warnings)
    }

    /// All errors, depth-first: own errors before children's.
    pub fn all_errors(&self) -> Vec<&StatsMessage> {
        let mut out: Vec<&StatsMessage> = self.errors.iter().collect();
        for child in &self.children {
            out.extend(child.all_errors());
        }
        out
    }

    /// All warnings, depth-first.
    pub fn all_warnings(&self) -> Vec<&StatsMessage> {
        let mut out: Vec<&StatsMessage> = self.warnings.iter().collect();
        for child in &self.children {
            out.extend(child.all_warnings());
        }
        out
    }

    /// All emitted assets, depth-first.
    pub fn all_assets(&self) -> Vec<&StatsAsset> {
        let mut out: Vec<&StatsAsset> = self.assets.iter().collect();
        for child in &self.children {
            out.extend(child.all_assets());
        }
        out
    }
}

/// A single error or warning attached to a build cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsMessage {
    /// Human-readable message
    pub message: String,

    /// Module identifier the message originates from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Source file the message originates from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// 1-based line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// 1-based column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl StatsMessage {
    /// Message with no location information.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// An emitted output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsAsset {
    /// Path relative to the output directory
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// Broad category of a build error, derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// An import could not be resolved
    ModuleNotFound,
    /// The source could not be parsed
    Syntax,
    /// A loader/transform step failed
    ModuleBuild,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Categorize an engine message.
    pub fn from_message(message: &str) -> Self {
        if message.contains("Module not found") || message.contains("Can't resolve") {
            ErrorCategory::ModuleNotFound
        } else if message.contains("SyntaxError") || message.contains("Unexpected token") {
            ErrorCategory::Syntax
        } else if message.contains("Module build failed") {
            ErrorCategory::ModuleBuild
        } else {
            ErrorCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ModuleNotFound => "module not found",
            ErrorCategory::Syntax => "syntax error",
            ErrorCategory::ModuleBuild => "module build failed",
            ErrorCategory::Other => "build error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured description of a failed build cycle.
///
/// Built from the first error of a [`BuildStats`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailure {
    /// First error message
    pub message: String,
    /// Originating file, if the engine reported one
    pub file: Option<PathBuf>,
    /// Originating module; for unresolved imports, the missing specifier
    pub module: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub category: ErrorCategory,
    /// Total number of errors in the cycle
    pub error_count: usize,
}

impl BuildFailure {
    /// Extract the failure description from a snapshot.
    ///
    /// Returns `None` when the snapshot has no errors.
    pub fn from_stats(stats: &BuildStats) -> Option<Self> {
        let errors = stats.all_errors();
        let first = errors.first()?;
        let category = ErrorCategory::from_message(&first.message);

        let module = first.module.clone().or_else(|| match category {
            ErrorCategory::ModuleNotFound => unresolved_specifier(&first.message),
            _ => None,
        });

        Some(Self {
            message: first_line(&first.message).to_string(),
            file: first.file.clone(),
            module,
            line: first.line,
            column: first.column,
            category,
            error_count: errors.len(),
        })
    }

    /// `file:line:column` when a file is known.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        Some(match (self.line, self.column) {
            (Some(line), Some(column)) => format!("{}:{}:{}", file.display(), line, column),
            (Some(line), None) => format!("{}:{}", file.display(), line),
            _ => file.display().to_string(),
        })
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "{} in {}: {}", self.category, location, self.message)?,
            None => write!(f, "{}: {}", self.category, self.message)?,
        }
        if self.error_count > 1 {
            write!(f, " (+{} more)", self.error_count - 1)?;
        }
        Ok(())
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message).trim_end()
}

/// Pull `x` out of "Can't resolve 'x' in '...'".
fn unresolved_specifier(message: &str) -> Option<String> {
    let start = message.find("Can't resolve '")? + "Can't resolve '".len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(message: &str) -> StatsMessage {
        StatsMessage::new(message)
    }

    #[test]
    fn test_has_errors_checks_children() {
        let mut stats = BuildStats::default();
        assert!(!stats.has_errors());

        stats.children.push(BuildStats {
            errors: vec![error("boom")],
            ..BuildStats::default()
        });
        assert!(stats.has_errors());
        assert!(!stats.has_warnings());
    }

    #[test]
    fn test_from_stats_without_errors() {
        assert!(BuildFailure::from_stats(&BuildStats::default()).is_none());
    }

    #[test]
    fn test_from_stats_takes_first_error_depth_first() {
        let stats = BuildStats {
            errors: vec![StatsMessage {
                message: "SyntaxError: Unexpected token (3:4)\n  at parser".to_string(),
                file: Some(PathBuf::from("src/app.js")),
                line: Some(3),
                column: Some(4),
                ..StatsMessage::default()
            }],
            children: vec![BuildStats {
                errors: vec![error("second")],
                ..BuildStats::default()
            }],
            ..BuildStats::default()
        };

        let failure = BuildFailure::from_stats(&stats).unwrap();
        assert_eq!(failure.category, ErrorCategory::Syntax);
        assert_eq!(failure.message, "SyntaxError: Unexpected token (3:4)");
        assert_eq!(failure.location().as_deref(), Some("src/app.js:3:4"));
        assert_eq!(failure.error_count, 2);
        assert!(failure.to_string().contains("(+1 more)"));
    }

    #[test]
    fn test_from_stats_extracts_unresolved_module() {
        let stats = BuildStats {
            children: vec![BuildStats {
                errors: vec![error(
                    "Module not found: Error: Can't resolve './missing' in '/project/src'",
                )],
                ..BuildStats::default()
            }],
            ..BuildStats::default()
        };

        let failure = BuildFailure::from_stats(&stats).unwrap();
        assert_eq!(failure.category, ErrorCategory::ModuleNotFound);
        assert_eq!(failure.module.as_deref(), Some("./missing"));
        assert!(failure.file.is_none());
    }

    #[test]
    fn test_category_from_message() {
        assert_eq!(
            ErrorCategory::from_message("Module build failed (from ./loader.js)"),
            ErrorCategory::ModuleBuild
        );
        assert_eq!(ErrorCategory::from_message("oops"), ErrorCategory::Other);
    }

    #[test]
    fn test_stats_serialization_is_camel_case() {
        let stats = BuildStats {
            duration_ms: 12,
            assets: vec![StatsAsset {
                name: "main.js".to_string(),
                size: 10,
            }],
            ..BuildStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["durationMs"], 12);
        assert!(json.get("errors").is_none());
        assert_eq!(json["assets"][0]["name"], "main.js");
    }
}
