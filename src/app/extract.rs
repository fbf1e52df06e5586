use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::fetch::domain_name;
use super::types::{AnalysisRequest, ExtractedDocument};

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
/// Elements the parser reads as unescaped raw text (`noscript` because
/// scripting is enabled).
const RAW_TEXT_ELEMENTS: [&str; 7] = [
    "script", "style", "noscript", "iframe", "noembed", "noframes", "xmp",
];
const PRESERVE_WHITESPACE_ELEMENTS: [&str; 2] = ["pre", "textarea"];

pub fn extract_document(request: &AnalysisRequest, raw_html: &str) -> ExtractedDocument {
    let doc = Html::parse_document(raw_html);
    let pretty_html = prettify(&doc);
    let css_blocks = element_texts(&doc, "style");
    let js_blocks = element_texts(&doc, "script");
    let meta_description = extract_meta_description(&doc);
    debug!(
        html_chars = pretty_html.chars().count(),
        style_blocks = css_blocks.len(),
        script_blocks = js_blocks.len(),
        has_description = meta_description.is_some(),
        "extracted document"
    );

    ExtractedDocument {
        pretty_html,
        css_blocks,
        js_blocks,
        domain_name: domain_name(request.url()),
        meta_description,
    }
}

/// Text of every element matching `selector`, one entry per element.
fn element_texts(doc: &Html, selector: &str) -> Vec<String> {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    doc.select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect()
}

pub fn extract_meta_description(doc: &Html) -> Option<String> {
    let selector = match Selector::parse("meta[name=\"description\"]") {
        Ok(s) => s,
        Err(_) => return None,
    };

    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(ToString::to_string)
}

/// Indented serialization of the parsed tree, one node per line.
pub fn prettify(doc: &Html) -> String {
    let mut out = String::new();
    for child in doc.tree.root().children() {
        write_node(&mut out, child.value(), ElementRef::wrap(child), 0);
    }
    out
}

fn write_node(out: &mut String, node: &Node, element: Option<ElementRef<'_>>, depth: usize) {
    match node {
        Node::Doctype(doctype) => push_line(out, depth, &format!("<!DOCTYPE {}>", doctype.name())),
        Node::Comment(comment) => push_line(out, depth, &format!("<!--{}-->", &**comment)),
        Node::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                push_line(out, depth, &escape_text(trimmed));
            }
        }
        Node::Element(_) => {
            if let Some(element) = element {
                write_element(out, element, depth);
            }
        }
        _ => {}
    }
}

fn write_element(out: &mut String, element: ElementRef<'_>, depth: usize) {
    let value = element.value();
    let name = value.name();

    if VOID_ELEMENTS.contains(&name) {
        push_line(out, depth, &open_tag(value, true));
        return;
    }

    if PRESERVE_WHITESPACE_ELEMENTS.contains(&name) {
        let mut inline = String::new();
        write_inline(&mut inline, element);
        push_line(out, depth, &inline);
        return;
    }

    push_line(out, depth, &open_tag(value, false));
    if RAW_TEXT_ELEMENTS.contains(&name) {
        let body = element.text().collect::<String>();
        let body = body.trim();
        if !body.is_empty() {
            push_line(out, depth + 1, body);
        }
    } else {
        for child in element.children() {
            write_node(out, child.value(), ElementRef::wrap(child), depth + 1);
        }
    }
    push_line(out, depth, &format!("</{name}>"));
}

fn write_inline(out: &mut String, element: ElementRef<'_>) {
    let value = element.value();
    let name = value.name();
    if VOID_ELEMENTS.contains(&name) {
        out.push_str(&open_tag(value, true));
        return;
    }

    out.push_str(&open_tag(value, false));
    if RAW_TEXT_ELEMENTS.contains(&name) {
        out.push_str(&element.text().collect::<String>());
        out.push_str(&format!("</{name}>"));
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Comment(comment) => out.push_str(&format!("<!--{}-->", &**comment)),
            Node::Element(_) => {
                if let Some(inner) = ElementRef::wrap(child) {
                    write_inline(out, inner);
                }
            }
            _ => {}
        }
    }
    out.push_str(&format!("</{name}>"));
}

fn open_tag(element: &Element, self_closing: bool) -> String {
    let mut tag = format!("<{}", element.name());
    for (name, value) in element.attrs() {
        tag.push(' ');
        tag.push_str(name);
        tag.push_str("=\"");
        tag.push_str(&escape_attr(value));
        tag.push('"');
    }
    tag.push_str(if self_closing { "/>" } else { ">" });
    tag
}

fn push_line(out: &mut String, depth: usize, content: &str) {
    out.push_str(&" ".repeat(depth));
    out.push_str(content);
    out.push('\n');
}

fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(input: &str) -> String {
    input.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> AnalysisRequest {
        AnalysisRequest::from_input(url).unwrap()
    }

    #[test]
    fn prettify_indents_one_space_per_level() {
        let doc = Html::parse_document(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>Hi <b>x</b></p></body></html>",
        );
        let pretty = prettify(&doc);
        let expected = "<!DOCTYPE html>\n<html>\n <head>\n  <title>\n   T\n  </title>\n </head>\n <body>\n  <p>\n   Hi\n   <b>\n    x\n   </b>\n  </p>\n </body>\n</html>\n";
        assert_eq!(pretty, expected);
    }

    #[test]
    fn prettify_writes_void_elements_and_escapes() {
        let doc = Html::parse_document(
            "<body><img src=\"a.png?x=1&amp;y=2\" alt=\"say &quot;hi&quot;\"><p>a &lt; b</p></body>",
        );
        let pretty = prettify(&doc);
        let img_line = pretty
            .lines()
            .find(|line| line.trim_start().starts_with("<img"))
            .unwrap();
        assert!(img_line.contains("src=\"a.png?x=1&amp;y=2\""));
        assert!(img_line.contains("alt=\"say &quot;hi&quot;\""));
        assert!(img_line.ends_with("/>"));
        assert!(pretty.contains("a &lt; b"));
        assert!(!pretty.contains("</img>"));
    }

    #[test]
    fn prettify_keeps_pre_inline() {
        let doc = Html::parse_document("<body><pre>a\n  b <i>c</i></pre></body>");
        let pretty = prettify(&doc);
        assert!(pretty.contains("<pre>a\n  b <i>c</i></pre>"));
    }

    #[test]
    fn prettify_writes_noscript_body_verbatim() {
        let doc = Html::parse_document(
            "<body><noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id=GTM-X\" \
             height=\"0\" width=\"0\"></iframe></noscript><p>Hello world</p></body>",
        );
        let pretty = prettify(&doc);
        assert!(pretty.contains(
            "<iframe src=\"https://www.googletagmanager.com/ns.html?id=GTM-X\" height=\"0\" width=\"0\"></iframe>"
        ));
        assert!(!pretty.contains("&lt;"));
        assert!(!pretty.contains("&gt;"));

        let reparsed = prettify(&Html::parse_document(&pretty));
        assert_eq!(reparsed, pretty);
    }

    #[test]
    fn style_and_script_blocks_keep_empty_entries() {
        let html = "<html><head><style>body{color:red}</style><style></style>\
                    <script src=\"x.js\"></script><script>let a = 1;</script></head></html>";
        let doc = extract_document(&request("example.com"), html);
        assert_eq!(doc.css_blocks, vec!["body{color:red}".to_string(), String::new()]);
        assert_eq!(doc.js_blocks, vec![String::new(), "let a = 1;".to_string()]);
        assert_eq!(doc.css_code(), "body{color:red}\n");
        assert_eq!(doc.js_code(), "\nlet a = 1;");
    }

    #[test]
    fn extracts_meta_description_and_domain() {
        let html = "<head><meta name=\"description\" content=\"Storage. More.\">\
                    <meta name=\"description\" content=\"second\"></head>";
        let doc = extract_document(&request("https://www.synology.com/en"), html);
        assert_eq!(doc.meta_description.as_deref(), Some("Storage. More."));
        assert_eq!(doc.domain_name, "synology");
    }

    #[test]
    fn missing_description_is_absent() {
        let doc = extract_document(
            &request("example.com"),
            "<head><meta name=\"description\"></head><body></body>",
        );
        assert_eq!(doc.meta_description, None);
        assert!(doc.css_blocks.is_empty());
        assert!(doc.js_blocks.is_empty());
    }

    #[test]
    fn malformed_markup_is_tolerated() {
        let doc = extract_document(
            &request("example.com"),
            "<html><body><div><p>unclosed <b>bold</div></span><h1>Title",
        );
        assert!(doc.pretty_html.contains("<h1>"));
        assert!(doc.pretty_html.contains("Title"));
    }
}
