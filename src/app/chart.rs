//! Composite chart: four panels plus a title block, drawn as SVG and
//! rasterized to PNG.

use std::fmt::Write as _;

use png::{BitDepth, ColorType, Encoder};
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use tracing::debug;

use super::error::AnalysisError;
use super::text::capitalize;
use super::types::{AnalysisReport, Bigram, CompositeChart, HeaderCount, TechnologyShare};

const CANVAS_WIDTH: f64 = 1200.0;
const CANVAS_HEIGHT: f64 = 800.0;
const MARGIN: f64 = 24.0;
const GRID_TOP: f64 = 124.0;
const FONT: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

const HEADER_BAR_COLOR: &str = "#87ceeb";
const BIGRAM_BAR_COLOR: &str = "#90ee90";
const PIE_COLORS: [&str; 3] = ["#1f77b4", "#ff7f0e", "#2ca02c"];
const PIE_START_DEGREES: f64 = 140.0;
const PIE_EXPLODE: f64 = 0.1;
const SUMMARY_WRAP: usize = 150;
const LINK_MAX_CHARS: usize = 84;
const BIGRAM_LABEL_MAX_CHARS: usize = 24;

#[derive(Debug, Clone, Copy)]
struct Panel {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

struct PieSlice {
    label: &'static str,
    pct: f64,
    color: &'static str,
    start: f64,
    span: f64,
    mid: f64,
    cx: f64,
    cy: f64,
}

impl Panel {
    fn grid(column: usize, row: usize) -> Self {
        let width = (CANVAS_WIDTH - MARGIN * 3.0) / 2.0;
        let height = (CANVAS_HEIGHT - GRID_TOP - MARGIN * 2.0) / 2.0;
        Self {
            x: MARGIN + column as f64 * (width + MARGIN),
            y: GRID_TOP + row as f64 * (height + MARGIN),
            width,
            height,
        }
    }

    fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// Composes and rasterizes the chart for one report.
pub fn render_chart(report: &AnalysisReport) -> Result<CompositeChart, AnalysisError> {
    let svg = compose_svg(report);
    let png = svg_to_png(&svg, CANVAS_WIDTH as u32, CANVAS_HEIGHT as u32)?;
    debug!(svg_bytes = svg.len(), png_bytes = png.len(), "rendered chart");
    Ok(CompositeChart::new(png))
}

pub fn compose_svg(report: &AnalysisReport) -> String {
    let metrics = &report.metrics;
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{CANVAS_WIDTH:.0}' height='{CANVAS_HEIGHT:.0}' viewBox='0 0 {CANVAS_WIDTH:.0} {CANVAS_HEIGHT:.0}'>"
    );
    let _ = writeln!(
        svg,
        "  <rect width='{CANVAS_WIDTH:.0}' height='{CANVAS_HEIGHT:.0}' fill='#ffffff'/>"
    );

    write_title_block(&mut svg, report);
    write_header_panel(&mut svg, Panel::grid(0, 0), &metrics.header_counts);
    write_pie_panel(&mut svg, Panel::grid(1, 0), &metrics.technology_share);
    write_bigram_panel(&mut svg, Panel::grid(0, 1), &metrics.top_bigrams);
    write_links_panel(&mut svg, Panel::grid(1, 1), &metrics.top_links);

    let _ = writeln!(svg, "</svg>");
    svg
}

fn write_title_block(svg: &mut String, report: &AnalysisReport) {
    let _ = writeln!(
        svg,
        "  <text x='{MARGIN:.0}' y='36' fill='#000000' font-family='{FONT}' font-size='20' font-weight='700'>{}</text>",
        escape_text(&format!("SEO Analysis on {}", report.url))
    );
    let _ = writeln!(
        svg,
        "  <text x='{MARGIN:.0}' y='62' fill='#000000' font-family='{FONT}' font-size='14'>{}</text>",
        escape_text(&format!("About {}:", capitalize(&report.domain_name)))
    );

    let summary = wrap_words(report.metrics.summary_text(), SUMMARY_WRAP);
    for (idx, line) in summary.iter().take(2).enumerate() {
        let mut line = line.clone();
        if idx == 1 && summary.len() > 2 {
            line = truncate_label(&format!("{line} {}", summary[2]), SUMMARY_WRAP);
        }
        let _ = writeln!(
            svg,
            "  <text x='{MARGIN:.0}' y='{:.0}' fill='#333333' font-family='{FONT}' font-size='13'>{}</text>",
            82.0 + idx as f64 * 18.0,
            escape_text(&line)
        );
    }
}

fn write_panel_title(svg: &mut String, panel: Panel, title: &str) {
    let _ = writeln!(
        svg,
        "  <text x='{:.1}' y='{:.1}' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='15' font-weight='600'>{}</text>",
        panel.center_x(),
        panel.y + 16.0,
        escape_text(title)
    );
}

fn write_placeholder(svg: &mut String, panel: Panel, message: &str) {
    let _ = writeln!(
        svg,
        "  <text x='{:.1}' y='{:.1}' text-anchor='middle' fill='#777777' font-family='{FONT}' font-size='14'>{}</text>",
        panel.center_x(),
        panel.y + panel.height / 2.0,
        escape_text(message)
    );
}

fn write_header_panel(svg: &mut String, panel: Panel, counts: &[HeaderCount]) {
    write_panel_title(svg, panel, "Header Tags Analysis");
    if counts.is_empty() {
        write_placeholder(svg, panel, "No header tags found");
        return;
    }

    let left = panel.x + 56.0;
    let right = panel.x + panel.width - 16.0;
    let top = panel.y + 36.0;
    let bottom = panel.y + panel.height - 60.0;
    let plot_width = right - left;
    let plot_height = bottom - top;

    let max_count = counts.iter().map(|c| c.count).max().unwrap_or(1) as f64;
    let (axis_max, step) = axis_scale(max_count * 1.2);

    write_y_ticks(svg, left, right, top, bottom, axis_max, step);
    write_axes(svg, left, right, top, bottom);

    let slot = plot_width / counts.len() as f64;
    let bar_width = (slot * 0.6).min(80.0);
    for (idx, entry) in counts.iter().enumerate() {
        let center = left + slot * (idx as f64 + 0.5);
        let height = entry.count as f64 / axis_max * plot_height;
        let _ = writeln!(
            svg,
            "  <rect x='{:.2}' y='{:.2}' width='{:.2}' height='{:.2}' fill='{HEADER_BAR_COLOR}'/>",
            center - bar_width / 2.0,
            bottom - height,
            bar_width,
            height
        );
        let label_y = bottom + 16.0;
        let _ = writeln!(
            svg,
            "  <text x='{center:.2}' y='{label_y:.2}' transform='rotate(-45 {center:.2} {label_y:.2})' text-anchor='end' fill='#000000' font-family='{FONT}' font-size='12'>{}</text>",
            entry.tag.as_str()
        );
    }

    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='{:.2}' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='12'>Header Tags</text>",
        left + plot_width / 2.0,
        panel.y + panel.height - 8.0
    );
    write_vertical_axis_label(svg, panel.x + 14.0, top + plot_height / 2.0, "Count");
}

fn write_pie_panel(svg: &mut String, panel: Panel, share: &TechnologyShare) {
    write_panel_title(svg, panel, "Technology Analysis");
    if share.is_empty() {
        write_placeholder(svg, panel, "No content to measure");
        return;
    }

    let cx = panel.center_x();
    let cy = panel.y + 20.0 + (panel.height - 20.0) / 2.0;
    let radius = (panel.width.min(panel.height - 20.0) / 2.0 - 44.0).max(20.0);

    let mut start = PIE_START_DEGREES;
    let mut slices = Vec::new();
    for (idx, (label, pct)) in share.slices().into_iter().enumerate() {
        if pct <= 0.0 {
            continue;
        }
        let span = pct / 100.0 * 360.0;
        let mid = start + span / 2.0;
        let (dx, dy) = polar(0.0, 0.0, radius * PIE_EXPLODE, mid);
        slices.push(PieSlice {
            label,
            pct,
            color: PIE_COLORS[idx],
            start,
            span,
            mid,
            cx: cx + dx,
            cy: cy + dy,
        });
        start += span;
    }

    for slice in &slices {
        let shadow = slice_shape(
            slice.cx + 3.0,
            slice.cy + 3.0,
            radius,
            slice.start,
            slice.span,
            "rgba(0,0,0,0.25)",
        );
        let _ = writeln!(svg, "  {shadow}");
    }
    for slice in &slices {
        let shape = slice_shape(slice.cx, slice.cy, radius, slice.start, slice.span, slice.color);
        let _ = writeln!(svg, "  {shape}");
    }
    for slice in &slices {
        let (lx, ly) = polar(slice.cx, slice.cy, radius * 1.1, slice.mid);
        let anchor = if slice.mid.to_radians().cos() >= 0.0 {
            "start"
        } else {
            "end"
        };
        let _ = writeln!(
            svg,
            "  <text x='{lx:.2}' y='{:.2}' text-anchor='{anchor}' fill='#000000' font-family='{FONT}' font-size='13'>{}</text>",
            ly + 4.0,
            slice.label
        );
        let (px, py) = polar(slice.cx, slice.cy, radius * 0.6, slice.mid);
        let _ = writeln!(
            svg,
            "  <text x='{px:.2}' y='{:.2}' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='12'>{}</text>",
            py + 4.0,
            format_percent(slice.pct)
        );
    }
}

fn slice_shape(cx: f64, cy: f64, radius: f64, start: f64, span: f64, fill: &str) -> String {
    if span >= 359.999 {
        return format!("<circle cx='{cx:.2}' cy='{cy:.2}' r='{radius:.2}' fill='{fill}'/>");
    }
    let (x0, y0) = polar(cx, cy, radius, start);
    let (x1, y1) = polar(cx, cy, radius, start + span);
    let large_arc = if span > 180.0 { 1 } else { 0 };
    format!(
        "<path d='M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {radius:.2} {radius:.2} 0 {large_arc} 0 {x1:.2} {y1:.2} Z' fill='{fill}'/>"
    )
}

fn write_bigram_panel(svg: &mut String, panel: Panel, bigrams: &[Bigram]) {
    write_panel_title(svg, panel, "Top Bi-grams");
    if bigrams.is_empty() {
        write_placeholder(svg, panel, "No text content found");
        return;
    }

    let left = panel.x + 190.0;
    let right = panel.x + panel.width - 20.0;
    let top = panel.y + 30.0;
    let bottom = panel.y + panel.height - 44.0;
    let plot_width = right - left;
    let plot_height = bottom - top;

    let max_count = bigrams.iter().map(|b| b.count).max().unwrap_or(1) as f64;
    let (axis_max, step) = axis_scale(max_count * 1.2);

    let mut tick = 0.0;
    while tick <= axis_max + f64::EPSILON {
        let x = left + tick / axis_max * plot_width;
        let _ = writeln!(
            svg,
            "  <line x1='{x:.2}' y1='{bottom:.2}' x2='{x:.2}' y2='{:.2}' stroke='#000000' stroke-width='1'/>",
            bottom + 4.0
        );
        let _ = writeln!(
            svg,
            "  <text x='{x:.2}' y='{:.2}' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='11'>{}</text>",
            bottom + 16.0,
            format_tick(tick)
        );
        tick += step;
    }
    write_axes(svg, left, right, top, bottom);

    let slot = plot_height / bigrams.len() as f64;
    let bar_height = slot * 0.7;
    for (idx, bigram) in bigrams.iter().enumerate() {
        let center = top + slot * (idx as f64 + 0.5);
        let width = bigram.count as f64 / axis_max * plot_width;
        let _ = writeln!(
            svg,
            "  <rect x='{left:.2}' y='{:.2}' width='{width:.2}' height='{bar_height:.2}' fill='{BIGRAM_BAR_COLOR}'/>",
            center - bar_height / 2.0
        );
        let _ = writeln!(
            svg,
            "  <text x='{:.2}' y='{:.2}' text-anchor='end' fill='#000000' font-family='{FONT}' font-size='11'>{}</text>",
            left - 6.0,
            center + 4.0,
            escape_text(&truncate_label(&bigram.label(), BIGRAM_LABEL_MAX_CHARS))
        );
    }

    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='{:.2}' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='12'>Count</text>",
        left + plot_width / 2.0,
        panel.y + panel.height - 8.0
    );
    write_vertical_axis_label(svg, panel.x + 14.0, top + plot_height / 2.0, "Bi-gram");
}

fn write_links_panel(svg: &mut String, panel: Panel, links: &[String]) {
    let row_height = 30.0;
    let table_width = panel.width - 16.0;
    let left = panel.x + 8.0;
    let rows = links.len().max(1) + 1;
    let top = panel.y + (panel.height - row_height * rows as f64) / 2.0;

    let header = std::iter::once(("Top Links:".to_string(), true));
    let body: Vec<(String, bool)> = if links.is_empty() {
        vec![("No https links found".to_string(), false)]
    } else {
        links
            .iter()
            .map(|link| (truncate_label(link, LINK_MAX_CHARS), false))
            .collect()
    };

    for (idx, (text, is_header)) in header.chain(body).enumerate() {
        let y = top + idx as f64 * row_height;
        let fill = if is_header { "#eeeeee" } else { "#ffffff" };
        let weight = if is_header { "700" } else { "400" };
        let _ = writeln!(
            svg,
            "  <rect x='{left:.2}' y='{y:.2}' width='{table_width:.2}' height='{row_height:.2}' fill='{fill}' stroke='#000000' stroke-width='1'/>"
        );
        let _ = writeln!(
            svg,
            "  <text x='{:.2}' y='{:.2}' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='11' font-weight='{weight}'>{}</text>",
            left + table_width / 2.0,
            y + row_height / 2.0 + 4.0,
            escape_text(&text)
        );
    }
}

fn write_axes(svg: &mut String, left: f64, right: f64, top: f64, bottom: f64) {
    let _ = writeln!(
        svg,
        "  <rect x='{left:.2}' y='{top:.2}' width='{:.2}' height='{:.2}' fill='none' stroke='#000000' stroke-width='1'/>",
        right - left,
        bottom - top
    );
}

fn write_y_ticks(
    svg: &mut String,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    axis_max: f64,
    step: f64,
) {
    let plot_height = bottom - top;
    let mut tick = 0.0;
    while tick <= axis_max + f64::EPSILON {
        let y = bottom - tick / axis_max * plot_height;
        let _ = writeln!(
            svg,
            "  <line x1='{:.2}' y1='{y:.2}' x2='{left:.2}' y2='{y:.2}' stroke='#000000' stroke-width='1'/>",
            left - 4.0
        );
        if tick > 0.0 {
            let _ = writeln!(
                svg,
                "  <line x1='{left:.2}' y1='{y:.2}' x2='{right:.2}' y2='{y:.2}' stroke='#eeeeee' stroke-width='1'/>"
            );
        }
        let _ = writeln!(
            svg,
            "  <text x='{:.2}' y='{:.2}' text-anchor='end' fill='#000000' font-family='{FONT}' font-size='11'>{}</text>",
            left - 8.0,
            y + 4.0,
            format_tick(tick)
        );
        tick += step;
    }
}

fn write_vertical_axis_label(svg: &mut String, x: f64, y: f64, label: &str) {
    let _ = writeln!(
        svg,
        "  <text x='{x:.2}' y='{y:.2}' transform='rotate(-90 {x:.2} {y:.2})' text-anchor='middle' fill='#000000' font-family='{FONT}' font-size='12'>{}</text>",
        escape_text(label)
    );
}

/// Upper bound and tick step for a count axis, always whole numbers.
fn axis_scale(max_value: f64) -> (f64, f64) {
    let max_value = max_value.max(1.0);
    let step = (max_value / 5.0).ceil().max(1.0);
    let axis_max = (max_value / step).ceil() * step;
    (axis_max, step)
}

fn polar(cx: f64, cy: f64, radius: f64, degrees: f64) -> (f64, f64) {
    let rad = degrees.to_radians();
    (cx + radius * rad.cos(), cy - radius * rad.sin())
}

fn format_percent(pct: f64) -> String {
    format!("{pct:.1}%")
}

fn format_tick(value: f64) -> String {
    format!("{value:.0}")
}

/// Greedy word wrap on whitespace.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate_label(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out = input
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    out.push_str("...");
    out
}

fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn svg_to_png(svg: &str, width: u32, height: u32) -> Result<Vec<u8>, AnalysisError> {
    let mut options = Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = Tree::from_data(svg.as_bytes(), &options)
        .map_err(|err| AnalysisError::Render(format!("SVG parse failed: {err}")))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| AnalysisError::Render("pixmap allocation failed".to_string()))?;
    pixmap.fill(Color::WHITE);
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, width, height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    encoder
        .write_header()
        .map_err(|err| AnalysisError::Render(err.to_string()))?
        .write_image_data(pixmap.data())
        .map_err(|err| AnalysisError::Render(err.to_string()))?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::types::{AnalysisMetrics, HeaderTag};

    fn report(metrics: AnalysisMetrics) -> AnalysisReport {
        AnalysisReport {
            url: "https://www.example.com".to_string(),
            domain_name: "example".to_string(),
            analyzed_at: "2026-01-01T00:00:00+00:00".to_string(),
            metrics,
        }
    }

    fn sample_metrics() -> AnalysisMetrics {
        AnalysisMetrics {
            header_counts: vec![
                HeaderCount {
                    tag: HeaderTag::H1,
                    count: 1,
                },
                HeaderCount {
                    tag: HeaderTag::H2,
                    count: 4,
                },
            ],
            technology_share: TechnologyShare::from_lengths(600, 300, 100),
            top_bigrams: vec![
                Bigram {
                    first: "Fast".to_string(),
                    second: "NAS".to_string(),
                    count: 3,
                },
                Bigram {
                    first: "<b>".to_string(),
                    second: "&".to_string(),
                    count: 1,
                },
            ],
            top_links: vec!["https://example.com/a?x=1&y=2".to_string()],
            summary_sentence: Some("Example Inc. builds things.".to_string()),
        }
    }

    #[test]
    fn svg_contains_all_panels_and_overlay() {
        let svg = compose_svg(&report(sample_metrics()));
        assert!(svg.contains("SEO Analysis on https://www.example.com"));
        assert!(svg.contains("About Example:"));
        assert!(svg.contains("Example Inc. builds things."));
        assert!(svg.contains("Header Tags Analysis"));
        assert!(svg.contains("Technology Analysis"));
        assert!(svg.contains("Top Bi-grams"));
        assert!(svg.contains("Top Links:"));
        assert!(svg.contains("60.0%"));
        assert!(svg.contains("https://example.com/a?x=1&amp;y=2"));
        assert!(svg.contains("&lt;b&gt; &amp;"));
    }

    #[test]
    fn empty_metrics_render_placeholders() {
        let svg = compose_svg(&report(AnalysisMetrics::default()));
        assert!(svg.contains("No header tags found"));
        assert!(svg.contains("No content to measure"));
        assert!(svg.contains("No text content found"));
        assert!(svg.contains("No https links found"));
        assert!(svg.contains("No meta description available."));
    }

    #[test]
    fn blank_summary_uses_fallback_text() {
        let metrics = AnalysisMetrics {
            summary_sentence: Some(String::new()),
            ..AnalysisMetrics::default()
        };
        let svg = compose_svg(&report(metrics));
        assert!(svg.contains("No meta description available."));
    }

    #[test]
    fn full_share_draws_a_circle() {
        let mut metrics = AnalysisMetrics::default();
        metrics.technology_share = TechnologyShare::from_lengths(10, 0, 0);
        let svg = compose_svg(&report(metrics));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("100.0%"));
        assert!(!svg.contains(">CSS<"));
    }

    #[test]
    fn axis_scale_uses_whole_steps() {
        assert_eq!(axis_scale(1.2), (2.0, 1.0));
        assert_eq!(axis_scale(4.8), (5.0, 1.0));
        assert_eq!(axis_scale(24.0), (25.0, 5.0));
        assert_eq!(axis_scale(0.0), (1.0, 1.0));
    }

    #[test]
    fn wraps_and_truncates_text() {
        assert_eq!(wrap_words("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert_eq!(truncate_label("abcdefghij", 6), "abc...");
        assert_eq!(truncate_label("short", 6), "short");
    }

    #[test]
    fn renders_png_bytes() {
        let chart = render_chart(&report(sample_metrics())).unwrap();
        assert!(chart.as_bytes().starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(!chart.is_empty());
    }
}
