//! Plain-text rendering for the `lens` commands.
//!
//! Every function returns a `String` so command output can be asserted on
//! without capturing stdout.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use lens_health::{HealthReport, StatusCheck};
use lens_tracking::{BuildDashboardRow, BuildSummary, MigrationDashboardRow};
use lens_types::{BuildRecord, MigrationRecord, MigrationState};
use serde_json::Value;

/// Characters of a record ID shown in listings.
pub const SHORT_ID_LEN: usize = 16;

/// Map values longer than this are cut in record details.
pub const MAP_VALUE_MAX_CHARS: usize = 100;

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Two-column table with a header row.
fn table(out: &mut String, header: (&str, &str), rows: &[(String, String)]) {
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .chain(std::iter::once(header.0.len()))
        .max()
        .unwrap_or(0);
    let _ = writeln!(out, "{:<width$}  {}", header.0, header.1, width = width);
    for (label, value) in rows {
        let _ = writeln!(out, "{:<width$}  {}", label, value, width = width);
    }
}

fn status_line(out: &mut String, check: &StatusCheck) {
    let _ = writeln!(
        out,
        "[{}] {}: {}",
        check.status.as_str().to_uppercase(),
        check.title,
        check.detail
    );
    for line in &check.help {
        let _ = writeln!(out, "    {}", line);
    }
}

pub fn build_dashboard(rows: &[BuildDashboardRow]) -> String {
    if rows.is_empty() {
        return "No build logs found\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32} {:>8} {:>8} {:>8} {:>8}",
        "Index Model", "Failed", "Skipped", "Success", "Total"
    );
    for row in rows {
        let BuildSummary {
            failed,
            skipped,
            success,
            total,
        } = row.summary;
        let _ = writeln!(
            out,
            "{:<32} {:>8} {:>8} {:>8} {:>8}",
            row.index_model, failed, skipped, success, total
        );
    }
    out.push_str("\nRun `lens build-logs <index-model>` to list failed builds\n");
    out
}

pub fn failed_builds(index_model: &str, summary: &BuildSummary, records: &[BuildRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} failed, {} skipped, {} success, {} total",
        index_model, summary.failed, summary.skipped, summary.success, summary.total
    );
    if records.is_empty() {
        out.push_str("No failed builds\n");
        return out;
    }
    let _ = writeln!(
        out,
        "\n{:<18} {:<20} {:<20} {}",
        "ID", "Model ID", "Updated At", "Error"
    );
    for record in records {
        let _ = writeln!(
            out,
            "{:<18} {:<20} {:<20} {}",
            short_id(&record.id),
            truncate(&record.model_id, 20),
            format_time(&record.updated_at),
            record.error_snippet()
        );
    }
    out.push_str("\nRun `lens build-logs --id <id>` to view full details\n");
    out
}

pub fn build_detail(record: &BuildRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})\n", record.state.label(), record.state);
    table(
        &mut out,
        ("Field", "Value"),
        &[
            ("Build ID".to_string(), record.id.clone()),
            ("Index Model".to_string(), record.index_model.clone()),
            ("Model".to_string(), record.model.clone()),
            ("Model ID".to_string(), record.model_id.clone()),
            ("State".to_string(), record.state.to_string()),
            ("Last Source".to_string(), record.last_source.clone()),
            ("Updated At".to_string(), format_time(&record.updated_at)),
        ],
    );

    if !record.state_data.is_null() {
        out.push_str("\nState Data:\n");
        display_map(&mut out, &record.state_data, 1);
    }

    let _ = writeln!(out, "\nLogs ({}, newest first):", record.logs.len());
    for entry in &record.logs {
        let outcome = if entry.skipped {
            "skipped"
        } else if entry.success {
            "success"
        } else {
            "failed"
        };
        let _ = writeln!(
            out,
            "  {} {:<8} {}",
            format_time(&entry.timestamp),
            outcome,
            entry.data.message.as_deref().unwrap_or("")
        );
        if let Some(details) = &entry.data.details {
            let _ = writeln!(out, "      {}", truncate(details, MAP_VALUE_MAX_CHARS));
        }
        if let Some(ms) = entry.data.duration_ms {
            let _ = writeln!(out, "      took {:.1}ms", ms);
        }
        if let Some(map) = &entry.data.problematic_field_map {
            out.push_str("      Problematic fields:\n");
            display_map(&mut out, map, 4);
        }
    }
    out
}

pub fn migration_dashboard(rows: &[MigrationDashboardRow]) -> String {
    if rows.is_empty() {
        return "No migration logs found\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32} {:<15} {:>16}  {}",
        "Index Model", "Latest Version", "Total Migrations", "Last Migration"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<32} {:<15} {:>16}  {}",
            row.index_model,
            row.latest_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            row.total,
            row.last_migrated_at
                .as_ref()
                .map(format_time)
                .unwrap_or_else(|| "N/A".to_string())
        );
    }
    out.push_str("\nRun `lens migration-logs <index-model>` to view migration history\n");
    out
}

pub fn migration_history(index_model: &str, records: &[MigrationRecord]) -> String {
    if records.is_empty() {
        return format!("No migration logs found for {}\n", index_model);
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Showing {} most recent migrations for {}\n",
        records.len(),
        index_model
    );
    let _ = writeln!(out, "{:<18} {:<8} {:<10} {}", "ID", "Version", "State", "Created At");
    for record in records {
        let _ = writeln!(
            out,
            "{:<18} {:<8} {:<10} {}",
            short_id(&record.id),
            record.version_label(),
            record.state,
            format_time(&record.created_at)
        );
    }
    out.push_str("\nRun `lens migration-logs --id <id>` to view full details\n");
    out
}

pub fn migration_detail(record: &MigrationRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Migration Details ({})\n", record.state);
    table(
        &mut out,
        ("Field", "Value"),
        &[
            ("Migration ID".to_string(), record.id.clone()),
            ("Index Model".to_string(), record.index_model.clone()),
            ("Version".to_string(), record.version_label()),
            ("State".to_string(), record.state.to_string()),
            ("Created At".to_string(), format_time(&record.created_at)),
        ],
    );
    out.push('\n');

    match (record.state, record.error()) {
        (MigrationState::Failed, Some(error)) => {
            let _ = writeln!(out, "Migration Error:\n  {}", error);
        }
        _ if record.map.as_object().is_some_and(|m| !m.is_empty()) => {
            out.push_str("Migration Schema/Mappings:\n");
            display_map(&mut out, &record.map, 1);
        }
        _ => {}
    }
    out
}

/// Nested key/value listing, two spaces per level, long scalars cut.
pub fn display_map(out: &mut String, value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        scalar => {
            let _ = writeln!(out, "{}{}", prefix, scalar_text(scalar));
            return;
        }
    };
    for (key, value) in entries {
        match value {
            Value::Object(_) | Value::Array(_) => {
                let _ = writeln!(out, "{}{}:", prefix, key);
                display_map(out, value, indent + 1);
            }
            scalar => {
                let _ = writeln!(out, "{}{}: {}", prefix, key, scalar_text(scalar));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    truncate(&text, MAP_VALUE_MAX_CHARS)
}

pub fn health(report: &HealthReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} [{}]\n",
        report.title,
        report.overall().as_str().to_uppercase()
    );

    status_line(&mut out, &report.index_status);
    out.push('\n');
    table(&mut out, ("Index Model", "Value"), &report.index_data);
    out.push('\n');

    status_line(&mut out, &report.model_status);
    out.push('\n');
    table(&mut out, ("Base Model", "Value"), &report.model_data);
    out.push('\n');

    status_line(&mut out, &report.build_status);
    out.push('\n');
    table(&mut out, ("Build Data", "Value"), &report.build_data);
    out.push('\n');

    status_line(&mut out, &report.config_status);
    out.push('\n');
    table(&mut out, ("Config", "Value"), &report.config_data);
    out.push('\n');

    if report.observers.is_empty() {
        out.push_str("No observers found\n");
    } else {
        let rows: Vec<_> = report
            .observers
            .iter()
            .map(|o| (o.model.clone(), o.kind.clone()))
            .collect();
        table(&mut out, ("Observed Model", "Type"), &rows);
    }

    if !report.config_findings.is_empty() {
        out.push_str("\nConfig Help\n");
        for finding in &report.config_findings.critical {
            let _ = writeln!(out, "[CONFIG ERROR] {}", finding.name);
            for line in &finding.help {
                let _ = writeln!(out, "    {}", line);
            }
        }
        for finding in &report.config_findings.warning {
            let _ = writeln!(out, "[CONFIG RECOMMENDATION] {}", finding.name);
            for line in &finding.help {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }
    out
}
