use anyhow::{Context, Result};
use clap::ValueEnum;
use std::io::Write;
use tally_core::{Money, TierProgress};
use tally_report::{reconcile, Applied, Report, ReportState};

const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
    Csv,
}

pub fn render_report(out: &mut impl Write, report: &Report, format: Format) -> Result<()> {
    match format {
        Format::Table => report_table(out, report),
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, report).context("serialize report")?;
            writeln!(out)?;
            Ok(())
        }
        Format::Csv => report_csv(out, report),
    }
}

/// One watch refresh: a failure notice when the fetch failed, then the last
/// good report if there is one.
pub fn render_update(
    out: &mut impl Write,
    state: &ReportState<Report>,
    applied: Applied,
    format: Format,
) -> Result<()> {
    if applied == Applied::Failed {
        writeln!(
            out,
            "refresh failed: {} (showing last good report)",
            state.last_error().unwrap_or("unknown error")
        )?;
    }
    if let Some(report) = state.latest() {
        render_report(out, report, format)?;
    }
    out.flush()?;
    Ok(())
}

/// Decimal amount with a dot, for machine-readable output.
fn plain(m: Money) -> String {
    format!("{:.2}", m.to_amount())
}

fn report_table(out: &mut impl Write, report: &Report) -> Result<()> {
    writeln!(
        out,
        "# {:?} {} .. {}\n",
        report.view,
        report.window.start(),
        report.window.end()
    )?;
    writeln!(
        out,
        "{:<12} {:>6} {:>18} {:>18} {:>18}",
        "bucket", "sales", "net", "affiliate", "running net"
    )?;
    for (bucket, running) in report.buckets.iter().zip(&report.running) {
        writeln!(
            out,
            "{:<12} {:>6} {:>18} {:>18} {:>18}",
            bucket.key.to_string(),
            bucket.count,
            bucket.net_amount.to_string(),
            bucket.affiliate_amount.to_string(),
            running.net_amount.to_string()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Sales:          {}", report.totals.count)?;
    writeln!(out, "Net:            {}", report.totals.net_amount)?;
    writeln!(out, "Affiliate:      {}", report.totals.affiliate_amount)?;
    writeln!(out, "Average ticket: {}", report.average_ticket)?;
    if reconcile(&report.totals, report.server_totals.as_ref()) == Some(false) {
        writeln!(
            out,
            "(server totals differ; showing totals recomputed from the window)"
        )?;
    }

    if !report.products.is_empty() {
        writeln!(out, "\n## Products\n")?;
        for p in &report.products {
            writeln!(out, "{:<30} {:>6} {:>18}", p.name, p.count, p.net_amount.to_string())?;
        }
    }

    if !report.goals.is_empty() {
        writeln!(out, "\n## Goals\n")?;
        goals_table(out, &report.goals)?;
    }
    Ok(())
}

fn report_csv(out: &mut impl Write, report: &Report) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(["bucket", "sales", "net_amount", "affiliate_amount", "running_net_amount"])?;
    for (bucket, running) in report.buckets.iter().zip(&report.running) {
        w.write_record([
            bucket.key.to_string(),
            bucket.count.to_string(),
            plain(bucket.net_amount),
            plain(bucket.affiliate_amount),
            plain(running.net_amount),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn bar(fill_pct: f64) -> String {
    let filled = ((fill_pct / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn goals_table(out: &mut impl Write, goals: &[TierProgress]) -> Result<()> {
    for g in goals {
        if g.target.is_zero() {
            writeln!(out, "{:<11} {:>18}  (not set)", g.label, g.display)?;
            continue;
        }
        writeln!(
            out,
            "{:<11} {:>18}  {} {:>7.2}% (expected {:.2}%)  {}",
            g.label,
            g.display,
            bar(g.progress.bar_fill_pct()),
            g.progress.actual_pct,
            g.progress.expected_pct,
            g.progress.deviation_label()
        )?;
    }
    Ok(())
}

pub fn render_goals(out: &mut impl Write, goals: &[TierProgress], format: Format) -> Result<()> {
    match format {
        Format::Table => goals_table(out, goals),
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, goals).context("serialize goals")?;
            writeln!(out)?;
            Ok(())
        }
        Format::Csv => {
            let mut w = csv::Writer::from_writer(out);
            w.write_record(["tier", "target", "expected_pct", "actual_pct", "deviation_pct"])?;
            for g in goals {
                w.write_record([
                    g.tier.key_suffix().to_string(),
                    plain(g.target),
                    format!("{:.2}", g.progress.expected_pct),
                    format!("{:.2}", g.progress.actual_pct),
                    format!("{:.2}", g.progress.deviation_pct),
                ])?;
            }
            w.flush()?;
            Ok(())
        }
    }
}
