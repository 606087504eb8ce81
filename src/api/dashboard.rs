use actix_web::{web, HttpResponse, Responder};
use std::fmt::Write;

use crate::models::StatusTable;
use crate::state::AppState;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Process Monitor Dashboard</title>
    <style>
        body { font-family: Arial, sans-serif; background-color: #f4f4f4; margin: 20px; }
        h1 { text-align: center; }
        table { border-collapse: collapse; margin: 0 auto; width: 70%; }
        th, td { padding: 10px; border: 1px solid #ddd; text-align: center; }
        th { background-color: #333; color: #fff; }
        tr:nth-child(even) { background-color: #eee; }
        .running { color: green; font-weight: bold; }
        .not-running { color: red; font-weight: bold; }
    </style>
</head>
<body>
    <h1>Process Monitor Dashboard</h1>
    <table>
        <tr>
            <th>Process</th>
            <th>Status</th>
            <th>CPU %</th>
            <th>Memory (MB)</th>
            <th>Threads</th>
            <th>Uptime</th>
        </tr>
"#;

const PAGE_TAIL: &str = r#"    </table>
</body>
</html>
"#;

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

/// 把秒数格式化为 1d 2h 3m 4s
fn format_uptime(secs: u64) -> String {
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn render_dashboard(status: &StatusTable) -> String {
    let mut html = String::from(PAGE_HEAD);

    if status.is_empty() {
        html.push_str("        <tr><td colspan=\"6\">No processes are being monitored</td></tr>\n");
    }

    for (name, metrics) in status {
        let (label, class) = if metrics.running {
            ("RUNNING", "running")
        } else {
            ("NOT RUNNING", "not-running")
        };
        let uptime = if metrics.running {
            format_uptime(metrics.lifetime_sec)
        } else {
            "-".to_string()
        };
        // String 的 fmt::Write 不会失败
        let _ = write!(
            html,
            "        <tr>\n            <td>{}</td>\n            <td class=\"{}\">{}</td>\n            \
             <td>{:.1}</td>\n            <td>{:.1}</td>\n            <td>{}</td>\n            <td>{}</td>\n        </tr>\n",
            escape_html(name.as_str()),
            class,
            label,
            metrics.cpu_percent,
            metrics.memory_mb,
            metrics.num_threads,
            uptime,
        );
    }

    html.push_str(PAGE_TAIL);
    html
}

pub async fn dashboard(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_dashboard(&data.get_status()))
}
