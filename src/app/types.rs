use std::fmt;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// File name offered when the composite chart is downloaded.
pub const CHART_FILE_NAME: &str = "analysis_results.png";

/// Shown in place of the summary sentence when the page has no meta description.
pub const NO_DESCRIPTION: &str = "No meta description available.";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "secode",
    version,
    about = "Analyze a website's HTML, CSS and JavaScript and render the results as a chart"
)]
pub struct Cli {
    /// Domain or URL to analyze (e.g. synology.com)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = CHART_FILE_NAME
    )]
    pub output: String,

    #[arg(long, value_name = "FILE")]
    pub report: Option<String>,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Json)]
    pub format: FileFormatArg,

    #[arg(long, value_name = "DIR")]
    pub sources: Option<String>,

    #[arg(
        long = "review",
        alias = "review-csv",
        alias = "review-json",
        value_name = "FILE"
    )]
    pub review_file: Option<String>,

    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_tui: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum FileFormatArg {
    Csv,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Json => DataFormat::Json,
        }
    }
}

/// A normalized target URL, built once per Analyze action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    url: String,
}

impl AnalysisRequest {
    /// Returns `None` for blank input.
    pub fn from_input(raw: &str) -> Option<Self> {
        super::fetch::normalize_input(raw).map(|url| Self { url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success { raw_html: String },
    Failure { status_code: u16 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub pretty_html: String,
    /// One entry per `<style>` element, empty when the element has no text.
    pub css_blocks: Vec<String>,
    /// One entry per `<script>` element, empty when the element has no text.
    pub js_blocks: Vec<String>,
    pub domain_name: String,
    pub meta_description: Option<String>,
}

impl ExtractedDocument {
    pub fn css_code(&self) -> String {
        self.css_blocks.join("\n")
    }

    pub fn js_code(&self) -> String {
        self.js_blocks.join("\n")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderTag {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeaderTag {
    pub const ALL: [HeaderTag; 6] = [
        HeaderTag::H1,
        HeaderTag::H2,
        HeaderTag::H3,
        HeaderTag::H4,
        HeaderTag::H5,
        HeaderTag::H6,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeaderTag::H1 => "h1",
            HeaderTag::H2 => "h2",
            HeaderTag::H3 => "h3",
            HeaderTag::H4 => "h4",
            HeaderTag::H5 => "h5",
            HeaderTag::H6 => "h6",
        }
    }
}

impl fmt::Display for HeaderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCount {
    pub tag: HeaderTag,
    pub count: usize,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyShare {
    pub html_pct: f64,
    pub css_pct: f64,
    pub js_pct: f64,
}

impl TechnologyShare {
    /// Shares of the combined length. All zero when there is nothing to measure.
    pub fn from_lengths(html_len: usize, css_len: usize, js_len: usize) -> Self {
        let total = html_len + css_len + js_len;
        if total == 0 {
            return Self::default();
        }
        let total = total as f64;
        Self {
            html_pct: html_len as f64 / total * 100.0,
            css_pct: css_len as f64 / total * 100.0,
            js_pct: js_len as f64 / total * 100.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.html_pct == 0.0 && self.css_pct == 0.0 && self.js_pct == 0.0
    }

    /// Label/value pairs in chart order.
    pub fn slices(&self) -> [(&'static str, f64); 3] {
        [
            ("HTML", self.html_pct),
            ("CSS", self.css_pct),
            ("JavaScript", self.js_pct),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bigram {
    pub first: String,
    pub second: String,
    pub count: usize,
}

impl Bigram {
    pub fn label(&self) -> String {
        format!("{} {}", self.first, self.second)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub header_counts: Vec<HeaderCount>,
    pub technology_share: TechnologyShare,
    pub top_bigrams: Vec<Bigram>,
    pub top_links: Vec<String>,
    pub summary_sentence: Option<String>,
}

impl AnalysisMetrics {
    pub fn header_count(&self, tag: HeaderTag) -> usize {
        self.header_counts
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    pub fn summary_text(&self) -> &str {
        self.summary_sentence
            .as_deref()
            .filter(|sentence| !sentence.trim().is_empty())
            .unwrap_or(NO_DESCRIPTION)
    }
}

/// The serializable outcome of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub url: String,
    pub domain_name: String,
    pub analyzed_at: String,
    pub metrics: AnalysisMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeChart {
    png: Vec<u8>,
}

impl CompositeChart {
    pub fn new(png: Vec<u8>) -> Self {
        Self { png }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}

/// Everything produced by one Analyze action. Replaced wholesale by the next one.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub request: AnalysisRequest,
    pub document: ExtractedDocument,
    pub report: AnalysisReport,
    pub chart: CompositeChart,
}
