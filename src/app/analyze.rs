use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::extract::extract_meta_description;
use super::text::{first_sentence, top_bigrams, word_tokenize};
use super::types::{AnalysisMetrics, ExtractedDocument, HeaderCount, HeaderTag, TechnologyShare};

pub const MAX_BIGRAMS: usize = 10;
pub const MAX_LINKS: usize = 7;

/// Elements whose text is not shown to readers.
const HIDDEN_TEXT_ELEMENTS: [&str; 7] = [
    "script", "style", "template", "noscript", "iframe", "noembed", "noframes",
];

/// Derives all metrics from the re-parsed pretty-printed markup.
pub fn analyze(doc: &ExtractedDocument) -> AnalysisMetrics {
    let html = Html::parse_document(&doc.pretty_html);

    let technology_share = TechnologyShare::from_lengths(
        doc.pretty_html.chars().count(),
        doc.css_code().chars().count(),
        doc.js_code().chars().count(),
    );
    let tokens = word_tokenize(&visible_text(&html));
    let metrics = AnalysisMetrics {
        header_counts: count_headers(&html),
        technology_share,
        top_bigrams: top_bigrams(&tokens, MAX_BIGRAMS),
        top_links: top_links(&html, MAX_LINKS),
        summary_sentence: extract_meta_description(&html)
            .map(|description| first_sentence(&description).to_string())
            .filter(|sentence| !sentence.is_empty()),
    };
    debug!(
        headers = metrics.header_counts.len(),
        tokens = tokens.len(),
        bigrams = metrics.top_bigrams.len(),
        links = metrics.top_links.len(),
        "analyzed document"
    );
    metrics
}

/// Counts of `h1`..`h6`, in the order each tag is first seen.
pub fn count_headers(html: &Html) -> Vec<HeaderCount> {
    let selector = match Selector::parse("h1, h2, h3, h4, h5, h6") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut counts = Vec::<HeaderCount>::new();
    for el in html.select(&selector) {
        let Some(tag) = HeaderTag::from_name(el.value().name()) else {
            continue;
        };
        match counts.iter_mut().find(|entry| entry.tag == tag) {
            Some(entry) => entry.count += 1,
            None => counts.push(HeaderCount { tag, count: 1 }),
        }
    }
    counts
}

/// The first `limit` anchor targets that start with `https://`, in document order.
pub fn top_links(html: &Html, limit: usize) -> Vec<String> {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    html.select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.starts_with("https://"))
        .take(limit)
        .map(ToString::to_string)
        .collect()
}

/// Concatenated text nodes, skipping scripts, styles, templates and comments.
pub fn visible_text(html: &Html) -> String {
    let mut out = String::new();
    collect_text(&mut out, html.root_element());
    out
}

fn collect_text(out: &mut String, element: ElementRef<'_>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if HIDDEN_TEXT_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(inner) = ElementRef::wrap(child) {
                    collect_text(out, inner);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::extract::extract_document;
    use crate::app::types::{AnalysisRequest, Bigram};

    fn analyze_html(raw: &str) -> AnalysisMetrics {
        let request = AnalysisRequest::from_input("example.com").unwrap();
        analyze(&extract_document(&request, raw))
    }

    #[test]
    fn counts_headers_in_first_seen_order() {
        let metrics = analyze_html(
            "<body><h2>A</h2><h1>B</h1><section><h2>C</h2></section><h7>x</h7></body>",
        );
        assert_eq!(
            metrics.header_counts,
            vec![
                HeaderCount {
                    tag: HeaderTag::H2,
                    count: 2
                },
                HeaderCount {
                    tag: HeaderTag::H1,
                    count: 1
                },
            ]
        );
        assert_eq!(metrics.header_count(HeaderTag::H1), 1);
        assert_eq!(metrics.header_count(HeaderTag::H2), 2);
        assert_eq!(metrics.header_count(HeaderTag::H3), 0);
    }

    #[test]
    fn uppercase_header_tags_are_counted() {
        let metrics = analyze_html("<BODY><H1>Loud</H1><H3>x</H3></BODY>");
        assert_eq!(metrics.header_count(HeaderTag::H1), 1);
        assert_eq!(metrics.header_count(HeaderTag::H3), 1);
    }

    #[test]
    fn no_style_or_script_means_all_html() {
        let metrics = analyze_html("<html><body><p>plain page</p></body></html>");
        let share = metrics.technology_share;
        assert_eq!(share.css_pct, 0.0);
        assert_eq!(share.js_pct, 0.0);
        assert!((share.html_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn technology_shares_sum_to_one_hundred() {
        let metrics = analyze_html(
            "<html><head><style>p { color: red; }</style><script>var x = 1;</script></head>\
             <body><p>text</p></body></html>",
        );
        let share = metrics.technology_share;
        assert!(share.css_pct > 0.0);
        assert!(share.js_pct > 0.0);
        assert!((share.html_pct + share.css_pct + share.js_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn links_are_https_only_in_order_and_limited() {
        let mut body = String::from("<body><a href=\"http://insecure.example\">x</a><a>none</a>");
        for i in 0..10 {
            body.push_str(&format!("<a href=\"https://example.com/{i}\">l</a>"));
        }
        body.push_str("<a href=\"https://example.com/0\">dup</a></body>");
        let metrics = analyze_html(&body);
        assert_eq!(metrics.top_links.len(), MAX_LINKS);
        assert_eq!(metrics.top_links[0], "https://example.com/0");
        assert_eq!(metrics.top_links[6], "https://example.com/6");
        assert!(metrics.top_links.iter().all(|l| l.starts_with("https://")));
    }

    #[test]
    fn duplicate_links_are_kept() {
        let metrics = analyze_html(
            "<a href=\"https://a.example\">1</a><a href=\"https://a.example\">2</a>",
        );
        assert_eq!(metrics.top_links, vec!["https://a.example", "https://a.example"]);
    }

    #[test]
    fn bigrams_ignore_script_and_style_text() {
        let metrics = analyze_html(
            "<html><head><title>Fast NAS</title><style>fast nas {}</style></head>\
             <body><script>fast nas fast nas</script><p>Fast NAS for home. Fast NAS for work.</p></body></html>",
        );
        let top = &metrics.top_bigrams[0];
        assert_eq!(top.label(), "Fast NAS");
        assert_eq!(top.count, 3);
        assert!(metrics.top_bigrams.len() <= MAX_BIGRAMS);
        assert!(metrics.top_bigrams.iter().all(|b| b.first != "fast"));
    }

    #[test]
    fn tag_manager_noscript_does_not_leak_into_bigrams() {
        let metrics = analyze_html(
            "<html><head><title></title></head><body>\
             <noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id=GTM-X\" \
             height=\"0\" width=\"0\" style=\"display:none;visibility:hidden\"></iframe></noscript>\
             <p>Hello world</p></body></html>",
        );
        let labels = metrics
            .top_bigrams
            .iter()
            .map(Bigram::label)
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Hello world".to_string()]);
    }

    #[test]
    fn blank_description_has_no_summary() {
        for content in ["", "   "] {
            let metrics = analyze_html(&format!(
                "<head><meta name=\"description\" content=\"{content}\"></head><body></body>"
            ));
            assert_eq!(metrics.summary_sentence, None);
            assert_eq!(metrics.summary_text(), "No meta description available.");
        }
    }

    #[test]
    fn summary_is_first_sentence_of_description() {
        let metrics = analyze_html(
            "<head><meta name=\"description\" content=\"Synology Inc. provides...more info.\"></head>",
        );
        assert_eq!(
            metrics.summary_sentence.as_deref(),
            Some("Synology Inc. provides...more info.")
        );

        let metrics = analyze_html("<head><title>No description</title></head>");
        assert_eq!(metrics.summary_sentence, None);
        assert_eq!(metrics.summary_text(), "No meta description available.");
    }

    #[test]
    fn empty_document_does_not_panic() {
        let metrics = analyze_html("");
        assert!(metrics.header_counts.is_empty());
        assert!(metrics.top_links.is_empty());
        assert!(metrics.top_bigrams.is_empty());
    }
}
