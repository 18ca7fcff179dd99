//! Analysis report rendering.

use std::fmt::Write;

use chrono::{TimeZone, Utc};
use clap::ValueEnum;
use wifi_topology_core::metrics::RankedAp;
use wifi_topology_core::AnalysisSummary;

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Markdown
    Md,
    /// Pretty-printed JSON
    Json,
}

/// Render `summary` in the requested format.
pub fn render(summary: &AnalysisSummary, format: ReportFormat) -> Result<String, ServerError> {
    match format {
        ReportFormat::Md => Ok(render_markdown(summary)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

fn timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// Escape text for a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace(['\n', '\r'], " ")
}

fn ranked_table(out: &mut String, rows: &[RankedAp]) {
    let _ = writeln!(out, "| SSID | BSSID | Channel | Latest (dBm) | Mean (dBm) | Variance | Samples |");
    let _ = writeln!(out, "|---|---|---|---|---|---|---|");
    for ap in rows {
        let channel = ap.channel.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
        let mean = ap
            .mean_value
            .map(|m| format!("{m:.1}"))
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "| {} | `{}` | {} | {} | {} | {:.2} | {} |",
            cell(&ap.label), ap.id, channel, ap.latest_value, mean, ap.variance, ap.sample_count
        );
    }
}

/// Human-readable Markdown report.
pub fn render_markdown(s: &AnalysisSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# WiFi Topology Analysis\n");
    let _ = writeln!(out, "- Started: {}", timestamp(s.started_at));
    let _ = writeln!(out, "- Ended: {}", timestamp(s.ended_at));
    let _ = writeln!(out, "- Duration: {:.1} s", s.duration_ms as f64 / 1000.0);
    let _ = writeln!(out, "- Scans: {}", s.scan_count);
    let _ = writeln!(out, "- Distinct access points seen: {}", s.distinct_aps_seen);
    let _ = writeln!(out, "- Active access points: {}", s.active_ap_count);
    let sizes = s
        .cluster_sizes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if s.cluster_count == 0 {
        let _ = writeln!(out, "- Clusters: none");
    } else {
        let _ = writeln!(out, "- Clusters: {} (sizes {})", s.cluster_count, sizes);
    }

    let _ = writeln!(out, "\n## Strongest\n");
    ranked_table(&mut out, &s.strongest);

    let _ = writeln!(out, "\n## Most volatile\n");
    ranked_table(&mut out, &s.most_volatile);

    let _ = writeln!(out, "\n## Channel occupancy\n");
    if s.channel_density.is_empty() {
        let _ = writeln!(out, "No channel information.");
    }
    for (band, channels) in &s.channel_density {
        let counts = channels
            .iter()
            .map(|(ch, n)| format!("{ch}: {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "- **{band}**: {counts}");
        if let Some(rec) = s.recommended_channels.get(band) {
            let rec = rec.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ");
            let _ = writeln!(out, "  - recommended: {rec}");
        }
    }

    let _ = writeln!(out, "\n## Security\n");
    for (security, n) in &s.security_counts {
        let _ = writeln!(out, "- {security}: {n}");
    }
    out
}
