//! Formatting for sizes, durations and the per-cycle asset table.

use console::Term;
use owo_colors::OwoColorize;
use stoke_serve::StatsAsset;

/// Human-readable byte size: `512 B`, `1.50 KB`, `2.00 MB`.
///
/// ```
/// use stoke_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Human-readable duration from milliseconds: `85ms`, `1.25s`, `2m 5s`.
pub fn format_duration_ms(ms: u64) -> String {
    match ms {
        0..=999 => format!("{}ms", ms),
        1_000..=59_999 => format!("{:.2}s", ms as f64 / 1000.0),
        _ => {
            let secs = ms / 1000;
            format!("{}m {}s", secs / 60, secs % 60)
        }
    }
}

/// Print emitted assets as a table on stderr, largest first.
pub fn print_asset_table(assets: &[&StatsAsset]) {
    if assets.is_empty() {
        return;
    }

    let mut rows: Vec<&StatsAsset> = assets.to_vec();
    rows.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));

    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let name_width = rows.iter().map(|a| a.name.len()).max().unwrap_or(0).min(width - 12);
    let rule = "─".repeat(width);
    let total: u64 = rows.iter().map(|a| a.size).sum();

    if !super::colors_enabled() {
        eprintln!("{}", rule);
        for asset in &rows {
            eprintln!("  {:<name_width$}  {}", asset.name, format_size(asset.size));
        }
        eprintln!("{}", rule);
        eprintln!("  Total: {} in {} files", format_size(total), rows.len());
        return;
    }

    eprintln!("{}", rule.dimmed());
    for asset in &rows {
        eprintln!(
            "  {:<name_width$}  {}",
            asset.name.bright_white(),
            format_size(asset.size).dimmed(),
        );
    }
    eprintln!("{}", rule.dimmed());
    eprintln!(
        "  {} {} in {} files",
        "Total:".bold(),
        format_size(total).green(),
        rows.len()
    );
}
