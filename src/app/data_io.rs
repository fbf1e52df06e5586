use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::error::AnalysisError;
use super::types::{
    AnalysisMetrics, AnalysisReport, Bigram, CompositeChart, DataFormat, ExtractedDocument,
    HeaderCount, HeaderTag, TechnologyShare,
};

const CSV_HEADERS: [&str; 3] = ["section", "label", "value"];

pub const SOURCE_FILES: [&str; 3] = ["structure.html", "styles.css", "scripts.js"];

pub fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else {
        fallback
    }
}

pub fn save_chart(path: &str, chart: &CompositeChart) -> Result<(), AnalysisError> {
    fs::write(path, chart.as_bytes())?;
    info!(path, bytes = chart.len(), "saved composite chart");
    Ok(())
}

/// Writes the HTML, CSS and JavaScript views of the document into `dir`.
pub fn write_sources(dir: &str, doc: &ExtractedDocument) -> Result<Vec<PathBuf>, AnalysisError> {
    let dir = Path::new(dir);
    fs::create_dir_all(dir)?;

    let contents = [doc.pretty_html.clone(), doc.css_code(), doc.js_code()];
    let mut written = Vec::new();
    for (name, content) in SOURCE_FILES.iter().zip(contents) {
        let path = dir.join(name);
        fs::write(&path, content)?;
        written.push(path);
    }
    info!(dir = %dir.display(), "wrote extracted sources");
    Ok(written)
}

pub fn write_report(
    path: &str,
    format: DataFormat,
    report: &AnalysisReport,
) -> Result<(), AnalysisError> {
    match format {
        DataFormat::Json => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, report)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        DataFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(CSV_HEADERS)?;
            for record in report_to_records(report) {
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
    }
    info!(path, ?format, "wrote analysis report");
    Ok(())
}

fn report_to_records(report: &AnalysisReport) -> Vec<[String; 3]> {
    let metrics = &report.metrics;
    let mut rows = vec![
        ["meta".to_string(), "url".to_string(), report.url.clone()],
        [
            "meta".to_string(),
            "domain".to_string(),
            report.domain_name.clone(),
        ],
        [
            "meta".to_string(),
            "analyzed_at".to_string(),
            report.analyzed_at.clone(),
        ],
    ];
    if let Some(summary) = &metrics.summary_sentence {
        rows.push(["meta".to_string(), "summary".to_string(), summary.clone()]);
    }
    for entry in &metrics.header_counts {
        rows.push([
            "header".to_string(),
            entry.tag.to_string(),
            entry.count.to_string(),
        ]);
    }
    let share = metrics.technology_share;
    for (label, pct) in [
        ("html", share.html_pct),
        ("css", share.css_pct),
        ("js", share.js_pct),
    ] {
        rows.push(["technology".to_string(), label.to_string(), pct.to_string()]);
    }
    for bigram in &metrics.top_bigrams {
        rows.push([
            "bigram".to_string(),
            bigram.label(),
            bigram.count.to_string(),
        ]);
    }
    for (idx, link) in metrics.top_links.iter().enumerate() {
        rows.push(["link".to_string(), (idx + 1).to_string(), link.clone()]);
    }
    rows
}

pub fn load_report(path: &str) -> Result<AnalysisReport, AnalysisError> {
    match detect_data_format(path, DataFormat::Json) {
        DataFormat::Json => {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str::<AnalysisReport>(&content)?)
        }
        DataFormat::Csv => load_report_csv(path),
    }
}

fn load_report_csv(path: &str) -> Result<AnalysisReport, AnalysisError> {
    let invalid = |reason: String| AnalysisError::Report {
        path: PathBuf::from(path),
        reason,
    };

    let mut reader = csv::Reader::from_path(path)?;
    let mut report = AnalysisReport {
        url: String::new(),
        domain_name: String::new(),
        analyzed_at: String::new(),
        metrics: AnalysisMetrics::default(),
    };
    let mut share = TechnologyShare::default();

    for record in reader.records() {
        let record = record?;
        let section = record.get(0).unwrap_or("").trim();
        let label = record.get(1).unwrap_or("");
        let value = record.get(2).unwrap_or("");
        match section {
            "meta" => match label {
                "url" => report.url = value.to_string(),
                "domain" => report.domain_name = value.to_string(),
                "analyzed_at" => report.analyzed_at = value.to_string(),
                "summary" => report.metrics.summary_sentence = Some(value.to_string()),
                _ => {}
            },
            "header" => {
                let tag = HeaderTag::from_name(label)
                    .ok_or_else(|| invalid(format!("unknown header tag '{label}'")))?;
                let count = value
                    .parse::<usize>()
                    .map_err(|err| invalid(format!("bad header count '{value}': {err}")))?;
                report.metrics.header_counts.push(HeaderCount { tag, count });
            }
            "technology" => {
                let pct = value
                    .parse::<f64>()
                    .map_err(|err| invalid(format!("bad share '{value}': {err}")))?;
                match label {
                    "html" => share.html_pct = pct,
                    "css" => share.css_pct = pct,
                    "js" => share.js_pct = pct,
                    other => return Err(invalid(format!("unknown technology '{other}'"))),
                }
            }
            "bigram" => {
                let (first, second) = label
                    .split_once(' ')
                    .ok_or_else(|| invalid(format!("bad bigram '{label}'")))?;
                let count = value
                    .parse::<usize>()
                    .map_err(|err| invalid(format!("bad bigram count '{value}': {err}")))?;
                report.metrics.top_bigrams.push(Bigram {
                    first: first.to_string(),
                    second: second.to_string(),
                    count,
                });
            }
            "link" => report.metrics.top_links.push(value.to_string()),
            "" => {}
            other => return Err(invalid(format!("unknown section '{other}'"))),
        }
    }

    if report.url.is_empty() {
        return Err(invalid("missing url row".to_string()));
    }
    report.metrics.technology_share = share;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            url: "https://www.synology.com".to_string(),
            domain_name: "synology".to_string(),
            analyzed_at: "2026-10-19T08:00:00+00:00".to_string(),
            metrics: AnalysisMetrics {
                header_counts: vec![
                    HeaderCount {
                        tag: HeaderTag::H2,
                        count: 2,
                    },
                    HeaderCount {
                        tag: HeaderTag::H1,
                        count: 1,
                    },
                ],
                technology_share: TechnologyShare::from_lengths(3, 2, 2),
                top_bigrams: vec![Bigram {
                    first: "Synology".to_string(),
                    second: "NAS".to_string(),
                    count: 4,
                }],
                top_links: vec![
                    "https://a.example/x,y".to_string(),
                    "https://b.example".to_string(),
                ],
                summary_sentence: Some("Synology Inc. provides, \"storage\".".to_string()),
            },
        }
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            detect_data_format("out.JSON", DataFormat::Csv),
            DataFormat::Json
        );
        assert_eq!(
            detect_data_format("out.csv", DataFormat::Json),
            DataFormat::Csv
        );
        assert_eq!(
            detect_data_format("out.txt", DataFormat::Csv),
            DataFormat::Csv
        );
    }

    #[test]
    fn json_report_reloads_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let path = path.to_str().unwrap();
        let report = sample_report();
        write_report(path, DataFormat::Json, &report).unwrap();
        assert_eq!(load_report(path).unwrap(), report);
    }

    #[test]
    fn csv_report_reloads_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let path = path.to_str().unwrap();
        let report = sample_report();
        write_report(path, DataFormat::Csv, &report).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("section,label,value"));
        assert!(content.contains("header,h2,2"));
        assert_eq!(load_report(path).unwrap(), report);
    }

    #[test]
    fn csv_report_without_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(&path, "section,label,value\nheader,h1,1\n").unwrap();
        let err = load_report(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, AnalysisError::Report { .. }));
    }

    #[test]
    fn writes_three_source_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sources");
        let doc = ExtractedDocument {
            pretty_html: "<html>\n</html>\n".to_string(),
            css_blocks: vec!["a{}".to_string()],
            js_blocks: vec![String::new(), "x()".to_string()],
            domain_name: "example".to_string(),
            meta_description: None,
        };
        let written = write_sources(target.to_str().unwrap(), &doc).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(
            fs::read_to_string(target.join("styles.css")).unwrap(),
            "a{}"
        );
        assert_eq!(
            fs::read_to_string(target.join("scripts.js")).unwrap(),
            "\nx()"
        );
    }
}
