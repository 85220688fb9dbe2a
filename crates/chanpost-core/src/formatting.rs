//! Telegram HTML helpers and reply texts.

use chrono::{DateTime, Local};

use crate::ledger::{LedgerStats, PostRecord};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars < 3 {
        return s.chars().take(max_chars).collect();
    }
    let mut out = s.chars().take(max_chars - 3).collect::<String>();
    out.push_str("...");
    out
}

pub fn format_timestamp(ts: DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Statistics block shared by `/report`, `/admin` and the daily report.
pub fn stats_html(title: &str, stats: &LedgerStats) -> String {
    let last = stats
        .last_published_at
        .map(format_timestamp)
        .unwrap_or_else(|| "none yet".to_string());
    format!(
        "{title}\nPosts: {}\nLast post: {}\nLive in channel: {}",
        stats.post_count,
        escape_html(&last),
        stats.live_posts
    )
}

/// Live posts, newest first, cut to fit in `max_chars`.
pub fn posts_html(records: &[PostRecord], max_chars: usize) -> String {
    if records.is_empty() {
        return "📭 No live posts.".to_string();
    }

    let mut newest_first = records.to_vec();
    newest_first.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let mut out = format!("🗂 <b>Live posts ({})</b>", records.len());
    let mut used = out.chars().count();
    let reserve = more_line(records.len()).chars().count();
    let mut shown = 0;
    for r in &newest_first {
        let line = format!(
            "\n• <code>{}</code> {}",
            r.id,
            format_timestamp(r.published_at)
        );
        let len = line.chars().count();
        if used + len + reserve > max_chars {
            break;
        }
        out.push_str(&line);
        used += len;
        shown += 1;
    }

    if shown < records.len() {
        out.push_str(&more_line(records.len() - shown));
    }
    out
}

fn more_line(hidden: usize) -> String {
    format!("\n… and {hidden} more")
}
