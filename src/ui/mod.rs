//! Terminal output: status lines, colored icons and result tables.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{AuthorProfile, SearchResponse, SearchResult, SourceKind};
use crate::monitoring::{HealthStatus, ServiceStatus, UsageStats};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Icon for a provider kind.
pub fn source_icon(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Academic => "🎓",
        SourceKind::Web => "🌐",
        SourceKind::Video => "🎬",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
        Status::Search => eprintln!("{} {}", icon.yellow(), msg),
    }
}

fn health_color(status: HealthStatus) -> Color {
    match status {
        HealthStatus::Healthy => Color::Green,
        HealthStatus::Degraded => Color::Yellow,
        HealthStatus::Unhealthy => Color::Red,
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print search results header.
pub fn print_search_header(query: &str, count: usize, duration: Duration, cache_hit: bool) {
    println!();
    println!(
        "{} Search results for: \"{}\"",
        status_icon(Status::Search).yellow().bold(),
        query.cyan().bold()
    );
    println!(
        "{} Found {} results in {:.2}s{}",
        "─".repeat(30).dimmed(),
        count.to_string().green().bold(),
        duration.as_secs_f64(),
        if cache_hit { " (cached)" } else { "" }
    );
    println!();
}

/// Format a number with thousands separators.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Truncate text to `max_chars` characters, ending with "..." when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// One-line description of the provider-specific fields of a result
fn result_details(result: &SearchResult) -> String {
    match result {
        SearchResult::Academic(r) => {
            let mut parts = Vec::new();
            if !r.authors.is_empty() {
                parts.push(truncate_with_ellipsis(&r.authors.join(", "), 30));
            }
            if let Some(year) = r.year {
                parts.push(year.to_string());
            }
            if r.citations > 0 {
                parts.push(format!("{} citations", format_number(r.citations)));
            }
            parts.join(" · ")
        }
        SearchResult::Web(r) => r.display_link.clone(),
        SearchResult::Video(r) => {
            let mut parts = vec![truncate_with_ellipsis(&r.channel_name, 25)];
            if !r.duration.is_empty() {
                parts.push(r.duration.clone());
            }
            parts.push(format!("{} views", format_number(r.view_count)));
            parts.join(" · ")
        }
    }
}

/// Table of every result in a unified response, grouped by source.
pub fn results_table(response: &SearchResponse) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Source", "Title", "Details", "URL"]);

    for (kind, results) in response.results() {
        for result in results {
            table.add_row(vec![
                Cell::new(format!("{} {}", source_icon(*kind), kind)),
                Cell::new(truncate_with_ellipsis(result.title(), 50)).add_attribute(Attribute::Bold),
                Cell::new(result_details(result)),
                Cell::new(truncate_with_ellipsis(result.url(), 60)),
            ]);
        }
    }
    for (kind, error) in response.errors() {
        table.add_row(vec![
            Cell::new(format!("{} {}", source_icon(*kind), kind)),
            Cell::new(truncate_with_ellipsis(error, 50)).fg(Color::Red),
            Cell::new(""),
            Cell::new(""),
        ]);
    }
    table
}

/// Table of a single author profile.
pub fn author_table(profile: &AuthorProfile) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);

    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let count = |value: Option<u64>| value.map(format_number).unwrap_or_else(|| "-".to_string());

    table.add_row(vec![
        Cell::new("Name"),
        Cell::new(&profile.name).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Affiliation"), Cell::new(optional(&profile.affiliation))]);
    table.add_row(vec![Cell::new("Email domain"), Cell::new(optional(&profile.email_domain))]);
    table.add_row(vec![Cell::new("Interests"), Cell::new(profile.interests.join(", "))]);
    table.add_row(vec![Cell::new("Cited by"), Cell::new(count(profile.cited_by))]);
    table.add_row(vec![Cell::new("h-index"), Cell::new(count(profile.h_index))]);
    table.add_row(vec![Cell::new("Profile"), Cell::new(optional(&profile.url))]);
    table
}

/// Per-provider usage and quota table.
pub fn usage_table(stats: &UsageStats) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Source",
        "Calls today",
        "Errors today",
        "Total calls",
        "Daily limit",
        "Remaining",
    ]);

    for (kind, usage) in &stats.usage.providers {
        let remaining = match usage.remaining {
            Some(0) => Cell::new("0").fg(Color::Red),
            Some(n) => Cell::new(format_number(n)),
            None => Cell::new("unlimited"),
        };
        table.add_row(vec![
            Cell::new(format!("{} {}", source_icon(*kind), kind)),
            Cell::new(format_number(usage.calls_today)),
            Cell::new(format_number(usage.errors_today)),
            Cell::new(format_number(usage.total_calls)),
            Cell::new(usage.daily_limit.map(format_number).unwrap_or_else(|| "-".to_string())),
            remaining,
        ]);
    }
    table
}

/// Cache statistics table.
pub fn cache_table(stats: &UsageStats) -> Table {
    let cache = &stats.cache;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Backend", "Hits", "Misses", "Hit rate", "Sets", "Errors", "Entries"]);
    table.add_row(vec![
        Cell::new(if cache.enabled {
            cache.backend.clone()
        } else {
            format!("{} (disabled)", cache.backend)
        }),
        Cell::new(format_number(cache.hits)),
        Cell::new(format_number(cache.misses)),
        Cell::new(format!("{:.1}%", cache.hit_rate * 100.0)),
        Cell::new(format_number(cache.sets)),
        Cell::new(format_number(cache.errors)),
        Cell::new(cache.entries.map(format_number).unwrap_or_else(|| "-".to_string())),
    ]);
    table
}

/// Per-provider readiness table.
pub fn status_table(status: &ServiceStatus) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Source", "Configured", "Status", "Quota left", "Notes"]);

    for source in &status.sources {
        table.add_row(vec![
            Cell::new(format!("{} {}", source_icon(source.source), source.name)),
            Cell::new(if source.configured { "yes" } else { "no" }),
            Cell::new(source.status.to_string()).fg(health_color(source.status)),
            Cell::new(
                source
                    .quota_remaining
                    .map(format_number)
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(source.probe_error.as_deref().unwrap_or("")),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!("cache ({})", status.cache.backend)),
        Cell::new(if status.cache.enabled { "yes" } else { "no" }),
        Cell::new(status.cache.status.to_string()).fg(health_color(status.cache.status)),
        Cell::new("-"),
        Cell::new(""),
    ]);
    table
}

/// Print the overall service status line.
pub fn print_overall_status(status: &ServiceStatus) {
    let label = match status.status {
        HealthStatus::Healthy => status.status.to_string().green().bold().to_string(),
        HealthStatus::Degraded => status.status.to_string().yellow().bold().to_string(),
        HealthStatus::Unhealthy => status.status.to_string().red().bold().to_string(),
    };
    println!(
        "unified-search v{} is {} (up {}s)",
        status.version, label, status.uptime_secs
    );
}
