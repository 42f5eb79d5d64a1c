//! Monitor dashboard page

use chrono::{DateTime, Utc};
use taskq_core::application::{QueueStats, StoreStatus};

const HEALTHY_COLOR: &str = "#4CAF50";
const DEGRADED_COLOR: &str = "#F44336";

pub const HEALTHY_LABEL: &str = "System Healthy";
pub const DEGRADED_LABEL: &str = "Store Connection Error";

/// Render the status page for one snapshot
pub fn render_dashboard(stats: &QueueStats, now: DateTime<Utc>) -> String {
    let (label, color) = match stats.status {
        StoreStatus::Healthy => (HEALTHY_LABEL, HEALTHY_COLOR),
        StoreStatus::Degraded => (DEGRADED_LABEL, DEGRADED_COLOR),
    };
    let detail = stats
        .error
        .as_deref()
        .map(|e| format!("<p class=\"detail\">{}</p>", escape_html(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="2">
<title>taskq monitor</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; background: #fafafa; }}
.status {{ padding: 1rem; border-radius: 6px; color: {color}; background: {color}20; font-weight: bold; }}
.cards {{ display: flex; gap: 1rem; margin-top: 1.5rem; }}
.card {{ flex: 1; padding: 1rem; background: #fff; border-radius: 6px; box-shadow: 0 1px 3px #0002; }}
.count {{ font-size: 2.5rem; }}
.detail {{ font-weight: normal; font-size: 0.9rem; }}
footer {{ margin-top: 1.5rem; color: #777; }}
</style>
</head>
<body>
<h1>Task Queue Monitor</h1>
<div class="status">{label}{detail}</div>
<div class="cards">
<div class="card"><div>Pending</div><div class="count" id="pending">{pending}</div></div>
<div class="card"><div>Processing</div><div class="count" id="processing">{processing}</div></div>
<div class="card"><div>Dead Letter</div><div class="count" id="dead-letter">{dead_letter}</div></div>
</div>
<footer>Last updated: {updated}</footer>
</body>
</html>
"#,
        color = color,
        label = label,
        detail = detail,
        pending = stats.pending,
        processing = stats.processing,
        dead_letter = stats.dead_letter,
        updated = now.format("%H:%M:%S"),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
