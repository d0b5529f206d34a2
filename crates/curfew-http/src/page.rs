//! Server-rendered status page

use std::fmt::Write;

use crate::StatusView;

pub fn render(view: &StatusView) -> String {
    let mut rows = String::new();
    let mut row = |label: &str, value: &str| {
        let _ = writeln!(
            rows,
            "<tr><th>{}</th><td>{}</td></tr>",
            label,
            escape(value)
        );
    };

    row("TV", if view.is_on { "on" } else { "off" });
    row(
        "Enforcement",
        if view.enabled { "enabled" } else { "disabled" },
    );
    row("Used today", &format!("{} min", view.minutes_used));
    row(
        "Remaining",
        &format!(
            "{} of {} min",
            view.minutes_remaining, view.daily_budget_minutes
        ),
    );
    row("Blocked before", &view.blocked_before);
    let free_window = match &view.free_window_end {
        Some(end) => format!("{} - {}", view.free_window_start, end),
        None => format!("after {}", view.free_window_start),
    };
    row("Free window", &free_window);
    row(
        "Volume",
        &view
            .volume
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".into()),
    );
    if let (Some(cap), Some(until)) = (view.volume_cap, &view.volume_cap_until) {
        row("Volume cap", &format!("{} until {}", cap, until));
    }
    if let Some(decision) = &view.decision {
        row("Last decision", decision.reason.describe());
    }
    row(
        "Last checked",
        view.last_checked_at.as_deref().unwrap_or("never"),
    );
    if let Some(error) = &view.last_error {
        row("Error", error);
    }

    let toggle_label = if view.enabled {
        "Disable for today"
    } else {
        "Enable"
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta http-equiv="refresh" content="30">
<title>curfew</title>
</head>
<body>
<h1>curfew</h1>
<table>
{rows}</table>
<form method="post" action="/toggle"><button type="submit">{toggle_label}</button></form>
<form method="post" action="/volume/down"><button type="submit">Volume -</button></form>
<form method="post" action="/volume/up"><button type="submit">Volume +</button></form>
</body>
</html>
"#
    )
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
