//! One build cycle: run the configured command once per build graph and
//! turn its exit status, stderr and output directory into [`BuildStats`].

use crate::config::EngineConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Instant;
use stoke_serve::{BuildGraph, BuildStats, StatsAsset, StatsMessage};
use tokio::process::Command;
use walkdir::WalkDir;

/// Lines of stderr kept when the command fails without a recognizable error.
const STDERR_TAIL_LINES: usize = 20;

/// `src/app.js:3:14: error: Unexpected token`
static LOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^\s:][^:]*):(?P<line>\d+):(?P<column>\d+):\s*(?:(?i:(?P<level>error|warning))(?:\[[^\]]*\])?:\s*)?(?P<message>.+)$",
    )
    .expect("static regex is valid")
});

/// `error: Module not found` / `warning[W001]: unused import`
static LEVELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:(?P<level>error|warning))(?:\[[^\]]*\])?:\s*(?P<message>.+)$")
        .expect("static regex is valid")
});

/// `ERROR in ./src/index.js`, with the message on the following lines.
static ERROR_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ERROR in (?P<module>\S+)").expect("static regex is valid"));

/// Run every graph in order and aggregate the results.
///
/// Never fails: problems running the command are reported as errors in the
/// returned snapshot.
pub(crate) async fn run_cycle(
    settings: &EngineConfig,
    root: &Path,
    graphs: &[BuildGraph],
) -> BuildStats {
    let started = Instant::now();

    let mut children = Vec::with_capacity(graphs.len());
    for (index, graph) in graphs.iter().enumerate() {
        children.push(build_graph(settings, root, graph, index).await);
    }

    let mut stats = BuildStats {
        duration_ms: elapsed_ms(started),
        children,
        ..BuildStats::default()
    };
    stats.hash = stats_hash(&stats);
    stats
}

async fn build_graph(
    settings: &EngineConfig,
    root: &Path,
    graph: &BuildGraph,
    index: usize,
) -> BuildStats {
    let started = Instant::now();
    let label = graph.label(index);
    let out_dir = resolve_output_dir(root, &graph.output.path);

    let mut stats = BuildStats {
        name: Some(label.clone()),
        ..BuildStats::default()
    };

    tracing::debug!(graph = %label, command = %settings.command, "running build command");

    let graph_json = match serde_json::to_string(graph) {
        Ok(json) => json,
        Err(e) => {
            stats.errors.push(StatsMessage::new(format!(
                "Failed to serialize build graph '{}': {}",
                label, e
            )));
            stats.duration_ms = elapsed_ms(started);
            stats.hash = stats_hash(&stats);
            return stats;
        }
    };

    let output = Command::new(&settings.command)
        .args(&settings.args)
        .current_dir(root)
        .env("STOKE_BUILD_NAME", &label)
        .env("STOKE_BUILD_INDEX", index.to_string())
        .env("STOKE_BUILD_GRAPH", graph_json)
        .env("STOKE_OUT_DIR", &out_dir)
        .env(
            "STOKE_PUBLIC_PATH",
            graph.output.public_path.as_deref().unwrap_or("/"),
        )
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Err(e) => stats.errors.push(StatsMessage::new(format!(
            "Failed to run build command '{}': {}",
            settings.command, e
        ))),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let (errors, warnings) = parse_diagnostics(&stderr);
            stats.warnings = warnings;

            if !output.status.success() {
                stats.errors = if errors.is_empty() {
                    vec![exit_message(output.status, &stderr)]
                } else {
                    errors
                };
            } else if !errors.is_empty() {
                tracing::debug!(
                    graph = %label,
                    count = errors.len(),
                    "ignoring error lines from a successful build"
                );
            }
        }
    }

    if stats.errors.is_empty() {
        stats.assets = collect_assets(&out_dir);
    }

    stats.duration_ms = elapsed_ms(started);
    stats.hash = stats_hash(&stats);
    stats
}

pub(crate) fn resolve_output_dir(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Split build command stderr into errors and warnings.
pub(crate) fn parse_diagnostics(stderr: &str) -> (Vec<StatsMessage>, Vec<StatsMessage>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut lines = stderr.lines().map(str::trim_end).peekable();
    while let Some(line) = lines.next() {
        if let Some(caps) = ERROR_IN.captures(line) {
            let mut message = Vec::new();
            while let Some(next) = lines.next_if(|l| !l.trim().is_empty()) {
                message.push(next.trim());
            }
            errors.push(StatsMessage {
                message: if message.is_empty() {
                    line.to_string()
                } else {
                    message.join("\n")
                },
                module: Some(caps["module"].to_string()),
                ..StatsMessage::default()
            });
        } else if let Some(caps) = LOCATED.captures(line) {
            let entry = StatsMessage {
                message: caps["message"].trim().to_string(),
                file: Some(PathBuf::from(&caps["file"])),
                line: caps["line"].parse().ok(),
                column: caps["column"].parse().ok(),
                module: None,
            };
            match caps.name("level") {
                Some(level) if level.as_str().eq_ignore_ascii_case("warning") => {
                    warnings.push(entry)
                }
                _ => errors.push(entry),
            }
        } else if let Some(caps) = LEVELED.captures(line) {
            let entry = StatsMessage::new(caps["message"].trim());
            if caps["level"].eq_ignore_ascii_case("warning") {
                warnings.push(entry);
            } else {
                errors.push(entry);
            }
        }
    }

    (errors, warnings)
}

fn exit_message(status: ExitStatus, stderr: &str) -> StatsMessage {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];

    let mut message = format!("Build command failed ({})", status);
    if !tail.is_empty() {
        message.push('\n');
        message.push_str(&tail.join("\n"));
    }
    StatsMessage::new(message)
}

/// Files under `out_dir`, named relative to it with `/` separators.
pub(crate) fn collect_assets(out_dir: &Path) -> Vec<StatsAsset> {
    let mut assets: Vec<StatsAsset> = WalkDir::new(out_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(out_dir).ok()?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            Some(StatsAsset { name, size })
        })
        .collect();

    assets.sort_by(|a, b| a.name.cmp(&b.name));
    assets
}

/// Short hex digest over the graph name, messages, assets and child hashes.
pub(crate) fn stats_hash(stats: &BuildStats) -> String {
    let mut hasher = blake3::Hasher::new();

    if let Some(name) = &stats.name {
        hasher.update(name.as_bytes());
    }
    for message in stats.errors.iter().chain(&stats.warnings) {
        hasher.update(message.message.as_bytes());
        hasher.update(&[0]);
    }
    for asset in &stats.assets {
        hasher.update(asset.name.as_bytes());
        hasher.update(&asset.size.to_le_bytes());
    }
    for child in &stats.children {
        hasher.update(child.hash.as_bytes());
    }

    hasher.finalize().to_hex().as_str()[..16].to_string()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stoke_serve::{Entry, OutputRules};
    use tempfile::TempDir;

    #[test]
    fn test_parse_located_errors_and_warnings() {
        let stderr = "\
src/app.js:3:14: error: Unexpected token
src/util.js:10:1: warning: unused variable 'x'
src/other.js:1:1: Cannot find name 'y'
";
        let (errors, warnings) = parse_diagnostics(stderr);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Unexpected token");
        assert_eq!(errors[0].file.as_deref(), Some(Path::new("src/app.js")));
        assert_eq!(errors[0].line, Some(3));
        assert_eq!(errors[0].column, Some(14));
        assert_eq!(errors[1].message, "Cannot find name 'y'");

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "unused variable 'x'");
    }

    #[test]
    fn test_parse_leveled_lines() {
        let (errors, warnings) =
            parse_diagnostics("info: starting\nERROR: out of memory\nwarning[W1]: slow plugin\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "out of memory");
        assert!(errors[0].file.is_none());
        assert_eq!(warnings[0].message, "slow plugin");
    }

    #[test]
    fn test_parse_error_in_block() {
        let stderr = "\
ERROR in ./src/index.js
Module not found: Error: Can't resolve './missing' in '/project/src'

done
";
        let (errors, _) = parse_diagnostics(stderr);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].module.as_deref(), Some("./src/index.js"));
        assert!(errors[0].message.starts_with("Module not found"));
    }

    #[test]
    fn test_collect_assets_relative_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("js/main.js"), "console.log(1)").unwrap();

        let assets = collect_assets(dir.path());
        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["index.html", "js/main.js"]);
        assert_eq!(assets[1].size, 14);
    }

    #[test]
    fn test_collect_assets_missing_dir_is_empty() {
        assert!(collect_assets(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_hash_changes_with_assets() {
        let mut stats = BuildStats::default();
        let empty = stats_hash(&stats);
        assert_eq!(empty.len(), 16);

        stats.assets.push(StatsAsset {
            name: "main.js".to_string(),
            size: 1,
        });
        assert_ne!(stats_hash(&stats), empty);
    }

    #[test]
    fn test_exit_message_keeps_tail() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let status = std::process::Command::new("false")
            .status()
            .unwrap_or_else(|_| ExitStatus::default());
        let message = exit_message(status, &stderr);
        assert!(message.message.starts_with("Build command failed"));
        assert!(message.message.contains("line 29"));
        assert!(!message.message.contains("line 9\n"));
    }

    #[tokio::test]
    async fn test_missing_command_reports_error() {
        let root = TempDir::new().unwrap();
        let settings = EngineConfig {
            command: "stoke-no-such-command-xyz".to_string(),
            ..EngineConfig::default()
        };
        let graph = BuildGraph {
            name: Some("app".to_string()),
            entry: Entry::Single("src/index.js".to_string()),
            output: OutputRules {
                path: PathBuf::from("dist"),
                public_path: None,
                filename: None,
            },
            plugins: vec![],
        };

        let stats = run_cycle(&settings, root.path(), std::slice::from_ref(&graph)).await;
        assert!(stats.has_errors());
        assert_eq!(stats.children[0].name.as_deref(), Some("app"));
        assert!(
            stats.all_errors()[0]
                .message
                .contains("Failed to run build command")
        );
    }
}
