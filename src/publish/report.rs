//! Human-readable renderings of a run result.
//!
//! The HTML report is fully self-contained (inline CSS, no external assets)
//! so it can be served straight out of object storage. The terminal summary
//! is the short form printed at the end of a CLI run.

use crate::engine::{OutcomeStatus, RunResult};
use std::fmt::Write;

fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn status_class(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Passed => "passed",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Errored => "errored",
    }
}

fn format_metric(metric: Option<f64>) -> String {
    match metric {
        Some(value) => format!("{value:.4}"),
        None => "—".to_string(),
    }
}

fn format_pass_rate(pass_rate: Option<f64>) -> String {
    match pass_rate {
        Some(rate) => format!("{:.1}%", rate * 100.0),
        None => "n/a".to_string(),
    }
}

/// Renders the self-contained HTML report artifact.
pub fn render_html(result: &RunResult) -> String {
    let mut page = String::with_capacity(8 * 1024);
    let _ = write!(
        page,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Data Quality Report — {name}</title>
<style>
  body {{ font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 2rem auto; max-width: 64rem; color: #1f2933; }}
  h1 {{ font-size: 1.5rem; }}
  .meta {{ color: #52606d; font-size: 0.9rem; margin-bottom: 1.5rem; }}
  .cards {{ display: flex; gap: 1rem; margin-bottom: 1.5rem; }}
  .card {{ flex: 1; border: 1px solid #d9dde3; border-radius: 6px; padding: 0.75rem 1rem; }}
  .card .value {{ font-size: 1.6rem; font-weight: 600; }}
  .card .label {{ color: #52606d; font-size: 0.8rem; text-transform: uppercase; }}
  table {{ border-collapse: collapse; width: 100%; }}
  th, td {{ border-bottom: 1px solid #d9dde3; padding: 0.5rem 0.75rem; text-align: left; vertical-align: top; font-size: 0.9rem; }}
  th {{ background: #f5f7fa; }}
  td.detail {{ white-space: pre-wrap; font-family: ui-monospace, monospace; font-size: 0.8rem; color: #52606d; }}
  .status {{ font-weight: 600; text-transform: uppercase; font-size: 0.8rem; }}
  .status.passed {{ color: #0f7b4f; }}
  .status.failed {{ color: #b33434; }}
  .status.errored {{ color: #9f5f00; }}
  .banner {{ border-radius: 6px; padding: 0.75rem 1rem; font-weight: 600; margin-bottom: 1.5rem; }}
  .banner.passed {{ background: #e3f5ec; color: #0f7b4f; }}
  .banner.failed {{ background: #fbe6e6; color: #b33434; }}
  .banner.errored {{ background: #fdf1dd; color: #9f5f00; }}
  footer {{ margin-top: 2rem; color: #9aa5b1; font-size: 0.8rem; }}
</style>
</head>
<body>
<h1>Data Quality Report — {name}</h1>
<div class="meta">Run {timestamp} · started {started} · finished {finished}</div>
<div class="banner {status_class}">Run status: {status}</div>
<div class="cards">
  <div class="card"><div class="value">{total}</div><div class="label">Checks</div></div>
  <div class="card"><div class="value">{passed}</div><div class="label">Passed</div></div>
  <div class="card"><div class="value">{failed}</div><div class="label">Failed</div></div>
  <div class="card"><div class="value">{errored}</div><div class="label">Errored</div></div>
  <div class="card"><div class="value">{pass_rate}</div><div class="label">Pass rate</div></div>
</div>
<table>
<thead><tr><th>Check</th><th>Target</th><th>Status</th><th>Metric</th><th>Duration</th><th>Detail</th></tr></thead>
<tbody>
"#,
        name = html_escape(&result.run_name),
        timestamp = html_escape(&result.run_timestamp),
        started = result.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        finished = result.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        status_class = result.status,
        status = result.status,
        total = result.summary.total,
        passed = result.summary.passed,
        failed = result.summary.failed,
        errored = result.summary.errored,
        pass_rate = format_pass_rate(result.summary.pass_rate),
    );

    for outcome in &result.outcomes {
        let _ = write!(
            page,
            "<tr><td>{check}</td><td>{target}</td>\
             <td><span class=\"status {class}\">{status}</span></td>\
             <td>{metric}</td><td>{duration} ms</td><td class=\"detail\">{detail}</td></tr>\n",
            check = html_escape(&outcome.check_type),
            target = html_escape(&outcome.target),
            class = status_class(outcome.status),
            status = outcome.status,
            metric = format_metric(outcome.metric),
            duration = outcome.duration_ms,
            detail = html_escape(outcome.detail.as_deref().unwrap_or("")),
        );
    }

    let _ = write!(
        page,
        "</tbody>\n</table>\n<footer>Generated by dq-sentinel</footer>\n</body>\n</html>\n"
    );
    page
}

/// Renders the short plain-text summary printed after a CLI run.
pub fn render_summary(result: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run '{}' ({})", result.run_name, result.run_timestamp);
    let _ = writeln!(
        out,
        "Status: {}  ({} checks: {} passed, {} failed, {} errored, pass rate {})",
        result.status,
        result.summary.total,
        result.summary.passed,
        result.summary.failed,
        result.summary.errored,
        format_pass_rate(result.summary.pass_rate),
    );
    for outcome in &result.outcomes {
        let _ = writeln!(
            out,
            "  [{:>7}] {} on {} (metric {}, {} ms)",
            outcome.status,
            outcome.check_type,
            outcome.target,
            format_metric(outcome.metric),
            outcome.duration_ms,
        );
        if !outcome.status.is_passed() {
            if let Some(detail) = &outcome.detail {
                if let Some(first_line) = detail.lines().next() {
                    let _ = writeln!(out, "           {first_line}");
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::{CheckEvaluation, CheckOutcome};
    use crate::engine::RunResult;
    use chrono::Utc;

    fn sample_result() -> RunResult {
        RunResult::finalize(
            "orders_quality",
            "20260828T120000Z",
            Utc::now(),
            Utc::now(),
            vec![
                CheckOutcome::from_evaluation(
                    "not_null",
                    "order_id",
                    CheckEvaluation::passed_with_metric(1.0),
                    12,
                ),
                CheckOutcome::from_evaluation(
                    "range",
                    "amount",
                    CheckEvaluation::failed_with_metric(0.9, "2 of 20 rows out of range"),
                    8,
                ),
            ],
        )
    }

    #[test]
    fn test_html_report_contains_outcomes() {
        let html = render_html(&sample_result());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("orders_quality"));
        assert!(html.contains("not_null"));
        assert!(html.contains("2 of 20 rows out of range"));
        assert!(html.contains("class=\"status failed\""));
    }

    #[test]
    fn test_html_escapes_detail() {
        let mut result = sample_result();
        result.outcomes[1].detail = Some("<script>alert(1)</script>".to_string());
        let html = render_html(&result);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_summary_lists_failures() {
        let summary = render_summary(&sample_result());
        assert!(summary.contains("Status: failed"));
        assert!(summary.contains("2 of 20 rows out of range"));
        assert!(summary.contains("pass rate 50.0%"));
    }
}
