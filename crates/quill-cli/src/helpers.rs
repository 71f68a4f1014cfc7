//! Shared CLI helpers — result printing, warnings, stats tables.

use std::time::Duration;

use colored::Colorize;

use quill_core::types::AnalysisResult;
use quill_core::utils::truncate_string;
use quill_providers::stats::ApiStats;

/// Print a fallback transition (called from the orchestrator's callback).
pub fn print_fallback_warning(message: &str) {
    println!("{}", fallback_warning_line(message));
}

fn fallback_warning_line(message: &str) -> String {
    format!("{} {}", "⚠️".yellow(), message.yellow())
}

pub fn print_interrupted() {
    eprintln!();
    eprintln!("{}", "Interrupted, cancelling in-flight requests...".dimmed());
}

/// Human-readable rendering of one analysis.
pub fn print_result(result: &AnalysisResult) {
    println!();
    println!(
        "{}  {}",
        format!("📓 {}", result.source).cyan().bold(),
        format!("via {} in {}", result.provider, format_duration(result.duration)).dimmed()
    );

    if result.is_degraded() {
        if let Some(ref raw) = result.raw_response {
            println!("  {}", truncate_string(raw, 300).red());
        }
    }

    let entities = &result.entities;
    print_list("Projects", &entities.projects);
    print_list("Participants", &entities.participants);
    print_list("Tasks", &entities.tasks);
    print_list("Themes", &entities.themes);
}

fn print_list(label: &str, items: &[String]) {
    let value = if items.is_empty() {
        "—".dimmed().to_string()
    } else {
        items.join(", ")
    };
    println!("  {:<14} {}", format!("{label}:").bold(), value);
}

/// One JSON object per line, without the raw model text.
pub fn result_json_line(result: &AnalysisResult) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(result)?;
    if !result.is_degraded() {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("raw_response");
        }
    }
    serde_json::to_string(&value)
}

/// Per-provider call counters, as printed after a batch.
pub fn print_stats(name: &str, stats: &ApiStats) {
    println!(
        "  {:<14} {} calls  {} ok  {} failed  {} rate-limited  avg {}",
        format!("{name}:").bold(),
        stats.total_calls,
        stats.successful_calls.to_string().green(),
        if stats.failed_calls > 0 {
            stats.failed_calls.to_string().red().to_string()
        } else {
            stats.failed_calls.to_string()
        },
        stats.rate_limit_hits,
        format_duration(stats.average_response_time()),
    );
}

pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// `✓` / `✗` marker.
pub fn check_mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::types::EntitySet;

    #[test]
    fn fallback_warning_has_marker_and_message() {
        colored::control::set_override(false);
        let line = fallback_warning_line("Provider bedrock failed: boom. Falling back to cborg.");
        assert_eq!(line, "⚠️ Provider bedrock failed: boom. Falling back to cborg.");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
    }

    #[test]
    fn json_line_drops_raw_response_on_success() {
        let result = AnalysisResult::new(
            "a.md",
            "cborg",
            EntitySet {
                tasks: vec!["ship".into()],
                ..Default::default()
            },
            Duration::from_millis(1500),
        )
        .with_raw_response("{\"tasks\": [\"ship\"]}");

        let line = result_json_line(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["source"], "a.md");
        assert_eq!(value["tasks"][0], "ship");
        assert!(value.get("raw_response").is_none());
        assert!(!line.contains('\n'));
    }

    #[test]
    fn json_line_keeps_diagnostic_on_failure() {
        let result = AnalysisResult::degraded("a.md", "cborg", Duration::ZERO, "boom");
        let line = result_json_line(&result).unwrap();
        assert!(line.contains("Error: boom"));
    }
}
