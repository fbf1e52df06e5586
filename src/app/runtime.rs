use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use super::analyze::analyze as compute_metrics;
use super::chart::render_chart;
use super::data_io::{detect_data_format, load_report, save_chart, write_report, write_sources};
use super::error::AnalysisError;
use super::extract::extract_document;
use super::fetch::{build_client, fetch_page};
use super::tui::run_tui;
use super::types::{Analysis, AnalysisReport, AnalysisRequest, Cli, DataFormat, FetchResult};

/// Shown to the user whenever the page could not be retrieved.
pub const FETCH_FAILURE_NOTICE: &str = "Failed to fetch content from the provided URL.";

pub async fn run() -> Result<(), AnalysisError> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if let Some(review_file) = cli.review_file.as_deref() {
        return run_review(review_file, &cli.output);
    }

    if cli.no_tui {
        let raw = cli.url.as_deref().ok_or(AnalysisError::EmptyInput)?;
        return run_headless(&cli, raw).await;
    }

    let client = build_client()?;
    run_tui(client, cli).await
}

fn init_logging(cli: &Cli) -> Result<(), AnalysisError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // stderr belongs to the terminal UI unless a log file takes over
    let result = match (cli.log_file.as_deref(), cli.no_tui || cli.review_file.is_some()) {
        (Some(path), _) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        (None, true) => builder.with_writer(io::stderr).try_init(),
        (None, false) => return Ok(()),
    };
    if let Err(err) = result {
        eprintln!("logging already initialized: {err}");
    }
    Ok(())
}

/// Fetch, extract, analyze and render for one request.
pub async fn analyze(
    client: &reqwest::Client,
    request: AnalysisRequest,
) -> Result<Analysis, AnalysisError> {
    info!(url = request.url(), "starting analysis");
    let raw_html = match fetch_page(client, &request).await? {
        FetchResult::Success { raw_html } => raw_html,
        FetchResult::Failure { status_code } => {
            return Err(AnalysisError::HttpStatus {
                url: request.url().to_string(),
                status: status_code,
            });
        }
    };

    let document = extract_document(&request, &raw_html);
    let metrics = compute_metrics(&document);
    let report = AnalysisReport {
        url: request.url().to_string(),
        domain_name: document.domain_name.clone(),
        analyzed_at: Utc::now().to_rfc3339(),
        metrics,
    };
    let chart = render_chart(&report)?;
    info!(
        url = request.url(),
        chart_bytes = chart.len(),
        "analysis finished"
    );

    Ok(Analysis {
        request,
        document,
        report,
        chart,
    })
}

/// Like [`analyze`], starting from the raw text of the input box.
pub async fn analyze_url(client: &reqwest::Client, raw: &str) -> Result<Analysis, AnalysisError> {
    let request = AnalysisRequest::from_input(raw).ok_or(AnalysisError::EmptyInput)?;
    analyze(client, request).await
}

async fn run_headless(cli: &Cli, raw: &str) -> Result<(), AnalysisError> {
    let client = build_client()?;
    let analysis = match analyze_url(&client, raw).await {
        Ok(analysis) => analysis,
        Err(err) => {
            if err.is_fetch_failure() {
                eprintln!("{FETCH_FAILURE_NOTICE}");
            }
            return Err(err);
        }
    };

    save_chart(&cli.output, &analysis.chart)?;
    if let Some(path) = cli.report.as_deref() {
        let format = detect_data_format(path, DataFormat::from(cli.format));
        write_report(path, format, &analysis.report)?;
    }
    if let Some(dir) = cli.sources.as_deref() {
        write_sources(dir, &analysis.document)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_summary(&mut out, &analysis.report)?;
    writeln!(out, "chart: {}", cli.output)?;
    Ok(())
}

fn run_review(review_file: &str, output: &str) -> Result<(), AnalysisError> {
    let report = load_report(review_file)?;
    debug!(path = review_file, url = %report.url, "loaded saved report");
    let chart = render_chart(&report)?;
    save_chart(output, &chart)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_summary(&mut out, &report)?;
    writeln!(out, "chart: {output}")?;
    Ok(())
}

fn write_summary(out: &mut impl Write, report: &AnalysisReport) -> io::Result<()> {
    let metrics = &report.metrics;
    writeln!(out, "url: {}", report.url)?;
    writeln!(out, "summary: {}", metrics.summary_text())?;

    let headers = metrics
        .header_counts
        .iter()
        .map(|entry| format!("{}={}", entry.tag, entry.count))
        .collect::<Vec<_>>();
    writeln!(
        out,
        "headers: {}",
        if headers.is_empty() {
            "none".to_string()
        } else {
            headers.join(" ")
        }
    )?;

    let share = metrics.technology_share;
    if share.is_empty() {
        warn!(url = %report.url, "no content to measure");
    }
    writeln!(
        out,
        "technology: html={:.1}% css={:.1}% js={:.1}%",
        share.html_pct, share.css_pct, share.js_pct
    )?;
    for bigram in &metrics.top_bigrams {
        writeln!(out, "bigram: {} ({})", bigram.label(), bigram.count)?;
    }
    for link in &metrics.top_links {
        writeln!(out, "link: {link}")?;
    }
    Ok(())
}
