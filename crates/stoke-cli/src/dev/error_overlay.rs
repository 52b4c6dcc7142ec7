//! Error page served in place of the app while the last build is broken.
//!
//! The page loads the reload client, so it replaces itself with the app as
//! soon as a build succeeds.

use crate::dev::RELOAD_SCRIPT_PATH;

/// Render the overlay page for `error`.
///
/// The message is HTML-escaped; nothing from it is ever executed.
pub fn generate_error_overlay(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Build Error</title>
  <style>
    body {{ margin: 0; background: #1e1e1e; color: #e6e6e6; font-family: ui-monospace, Menlo, Consolas, monospace; }}
    main {{ max-width: 960px; margin: 0 auto; padding: 32px; }}
    h1 {{ color: #ff5555; font-size: 20px; margin: 0 0 16px; }}
    pre {{ background: #2a2a2a; border-left: 4px solid #ff5555; padding: 16px; white-space: pre-wrap; word-break: break-word; line-height: 1.5; }}
    p {{ color: #9a9a9a; font-size: 13px; }}
  </style>
</head>
<body>
  <main>
    <h1>Build Error</h1>
    <pre>{}</pre>
    <p>Fix the error and save; this page reloads once the build succeeds.</p>
  </main>
  <script src="{}"></script>
</body>
</html>
"#,
        html_escape(error),
        RELOAD_SCRIPT_PATH
    )
}

/// Escape `& < > " '` for safe inclusion in HTML text and attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
