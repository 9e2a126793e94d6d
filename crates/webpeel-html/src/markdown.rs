//! HTML -> Markdown conversion (spec.md §4.5).
//!
//! This is a small hand-rolled converter rather than a wrapper over an
//! existing markdown-from-html crate: the spec's rule set (degrade wide
//! tables to bullets, drop inert links, honor `includeImages`/
//! `includeIframes`) doesn't map cleanly onto any single off-the-shelf
//! converter's options, so we walk the `scraper`/`ego-tree` node tree
//! directly.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub include_images: bool,
    pub include_iframes: bool,
    /// Render `<form>` contents instead of dropping them (spec.md §4.5:
    /// "form (unless content mode)").
    pub render_forms: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_iframes: false,
            render_forms: false,
        }
    }
}

const MAX_TABLE_COLUMNS_FOR_PIPES: usize = 10;

/// Convert an HTML fragment (or full document) to markdown.
pub fn html_to_markdown(html: &str, opts: &ConvertOptions) -> String {
    let doc = Html::parse_fragment(html);
    let mut out = String::new();
    for child in doc.root_element().children() {
        render_node(child, &mut out, opts, 0);
    }
    finalize(&out)
}

fn finalize(out: &str) -> String {
    collapse_blank_lines(out).trim().to_string()
}

fn collapse_blank_lines(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut blank_run = 0;
    for line in s.split('\n') {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                result.push('\n');
            }
        } else {
            blank_run = 0;
            result.push_str(line.trim_end());
            result.push('\n');
        }
    }
    result
}

fn ensure_block_sep(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if out.is_empty() {
        return;
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
}

fn is_inert_href(href: &str) -> bool {
    let h = href.trim();
    h.is_empty() || h.starts_with('#') || h.starts_with("javascript:") || h.starts_with("data:")
}

/// Render one node (text, comment, or element) into `out`.
fn render_node(node: NodeRef<Node>, out: &mut String, opts: &ConvertOptions, depth: usize) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(&normalize_whitespace(text));
        }
        Node::Element(_) => {
            if let Some(el) = ElementRef::wrap(node) {
                render_element(el, out, opts, depth);
            }
        }
        _ => {}
    }
}

fn normalize_whitespace(text: &str) -> String {
    // Collapse runs of whitespace the way a browser would when laying out
    // inline text, but preserve a single boundary space so words from
    // adjacent inline elements don't run together.
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.starts_with(char::is_whitespace) && !collapsed.is_empty() {
        format!(" {collapsed}")
    } else {
        collapsed
    }
}

fn render_children(el: ElementRef, out: &mut String, opts: &ConvertOptions, depth: usize) {
    for child in el.children() {
        render_node(child, out, opts, depth);
    }
}

fn inline_text(el: ElementRef, opts: &ConvertOptions) -> String {
    let mut buf = String::new();
    render_children(el, &mut buf, opts, 0);
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_element(el: ElementRef, out: &mut String, opts: &ConvertOptions, depth: usize) {
    let tag = el.value().name();
    match tag {
        "script" | "style" | "svg" | "noscript" | "head" | "template" => {}
        "iframe" => {
            if opts.include_iframes {
                if let Some(src) = el.value().attr("src") {
                    ensure_block_sep(out);
                    out.push_str(&format!("[iframe]({src})"));
                    ensure_block_sep(out);
                }
            }
        }
        "form" => {
            if opts.render_forms {
                render_children(el, out, opts, depth);
            }
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: usize = tag[1..].parse().unwrap_or(1);
            ensure_block_sep(out);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            out.push_str(&inline_text(el, opts));
            ensure_block_sep(out);
        }
        "p" => {
            ensure_block_sep(out);
            out.push_str(&inline_text(el, opts));
            ensure_block_sep(out);
        }
        "br" => {
            out.push_str("  \n");
        }
        "hr" => {
            ensure_block_sep(out);
            out.push_str("---");
            ensure_block_sep(out);
        }
        "blockquote" => {
            ensure_block_sep(out);
            let mut inner = String::new();
            render_children(el, &mut inner, opts, depth);
            for line in finalize(&inner).lines() {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
            ensure_block_sep(out);
        }
        "ul" => {
            ensure_block_sep(out);
            render_list(el, out, opts, depth, false);
            ensure_block_sep(out);
        }
        "ol" => {
            ensure_block_sep(out);
            render_list(el, out, opts, depth, true);
            ensure_block_sep(out);
        }
        "pre" => {
            ensure_block_sep(out);
            render_code_block(el, out, opts);
            ensure_block_sep(out);
        }
        "table" => {
            ensure_block_sep(out);
            render_table(el, out, opts);
            ensure_block_sep(out);
        }
        "a" => {
            let href = el.value().attr("href").unwrap_or("");
            let text = inline_text(el, opts);
            if href.is_empty() || is_inert_href(href) {
                out.push_str(&text);
            } else {
                out.push_str(&format!("[{text}]({href})"));
            }
        }
        "img" => {
            if opts.include_images {
                let src = el.value().attr("src").unwrap_or("");
                let alt = el.value().attr("alt").unwrap_or("");
                if !src.is_empty() {
                    out.push_str(&format!("![{alt}]({src})"));
                }
            }
        }
        "strong" | "b" => {
            out.push_str("**");
            render_children(el, out, opts, depth);
            out.push_str("**");
        }
        "em" | "i" => {
            out.push('*');
            render_children(el, out, opts, depth);
            out.push('*');
        }
        "code" => {
            out.push('`');
            out.push_str(&inline_text(el, opts));
            out.push('`');
        }
        "li" => {
            // Handled by render_list; a stray <li> outside a list is
            // rendered as a plain bullet paragraph.
            ensure_block_sep(out);
            out.push_str("- ");
            render_children(el, out, opts, depth);
            ensure_block_sep(out);
        }
        _ => {
            render_children(el, out, opts, depth);
        }
    }
}

fn render_list(el: ElementRef, out: &mut String, opts: &ConvertOptions, depth: usize, ordered: bool) {
    let indent = "  ".repeat(depth);
    let mut index = 1usize;
    for child in el.children() {
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        if child_el.value().name() != "li" {
            continue;
        }
        let marker = if ordered {
            format!("{index}.")
        } else {
            "-".to_string()
        };
        out.push_str(&indent);
        out.push_str(&marker);
        out.push(' ');

        // Render the <li>'s inline content, then any nested lists indented
        // one level deeper, matching spec.md's "2-space nested indent".
        let mut nested = String::new();
        for li_child in child_el.children() {
            match li_child.value() {
                Node::Element(e) if e.name() == "ul" || e.name() == "ol" => {
                    ensure_block_sep(&mut nested);
                    if let Some(nested_el) = ElementRef::wrap(li_child) {
                        render_list(nested_el, &mut nested, opts, depth + 1, e.name() == "ol");
                    }
                }
                _ => render_node(li_child, out, opts, depth),
            }
        }
        out.push('\n');
        out.push_str(&nested);
        index += 1;
    }
}

fn render_code_block(el: ElementRef, out: &mut String, opts: &ConvertOptions) {
    let code_el = el
        .children()
        .find_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "code");
    let (lang, code_text) = match code_el {
        Some(code) => {
            let lang = code
                .value()
                .attr("class")
                .and_then(|c| {
                    c.split_whitespace()
                        .find_map(|tok| tok.strip_prefix("language-").or_else(|| tok.strip_prefix("lang-")))
                })
                .unwrap_or("")
                .to_string();
            (lang, raw_text(code))
        }
        None => (String::new(), raw_text(el)),
    };
    let _ = opts;
    out.push_str("```");
    out.push_str(&lang);
    out.push('\n');
    out.push_str(code_text.trim_end_matches('\n'));
    out.push('\n');
    out.push_str("```");
}

fn raw_text(el: ElementRef) -> String {
    el.text().collect::<String>()
}

struct TableRow {
    cells: Vec<String>,
}

fn render_table(el: ElementRef, out: &mut String, opts: &ConvertOptions) {
    let mut header: Option<TableRow> = None;
    let mut rows: Vec<TableRow> = Vec::new();

    for tr in descendant_elements(el, "tr") {
        let mut cells = Vec::new();
        let mut is_header_row = false;
        for cell in el_children_named(tr, &["th", "td"]) {
            if cell.value().name() == "th" {
                is_header_row = true;
            }
            cells.push(inline_text(cell, opts));
        }
        if header.is_none() && is_header_row {
            header = Some(TableRow { cells });
        } else {
            rows.push(TableRow { cells });
        }
    }

    let column_count = header
        .as_ref()
        .map(|h| h.cells.len())
        .unwrap_or_else(|| rows.first().map(|r| r.cells.len()).unwrap_or(0));

    if column_count == 0 {
        return;
    }

    if column_count > MAX_TABLE_COLUMNS_FOR_PIPES {
        render_table_as_bullets(&header, &rows, out);
        return;
    }

    if let Some(h) = &header {
        out.push_str("| ");
        out.push_str(&h.cells.join(" | "));
        out.push_str(" |\n");
        out.push('|');
        for _ in 0..h.cells.len() {
            out.push_str(" --- |");
        }
        out.push('\n');
    }
    for row in &rows {
        out.push_str("| ");
        out.push_str(&row.cells.join(" | "));
        out.push_str(" |\n");
    }
}

fn render_table_as_bullets(header: &Option<TableRow>, rows: &[TableRow], out: &mut String) {
    for row in rows {
        out.push_str("- ");
        let labeled: Vec<String> = row
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match header.as_ref().and_then(|h| h.cells.get(i)) {
                Some(name) => format!("{name}: {cell}"),
                None => cell.clone(),
            })
            .collect();
        out.push_str(&labeled.join(", "));
        out.push('\n');
    }
}

fn descendant_elements<'a>(el: ElementRef<'a>, tag: &'static str) -> Vec<ElementRef<'a>> {
    let mut out = Vec::new();
    collect_descendants(el, tag, &mut out);
    out
}

fn collect_descendants<'a>(el: ElementRef<'a>, tag: &'static str, out: &mut Vec<ElementRef<'a>>) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() == tag {
                out.push(child_el);
            }
            collect_descendants(child_el, tag, out);
        }
    }
}

fn el_children_named<'a>(el: ElementRef<'a>, tags: &[&str]) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| tags.contains(&e.value().name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(html: &str) -> String {
        html_to_markdown(html, &ConvertOptions::default())
    }

    #[test]
    fn headings_and_paragraphs() {
        let out = md("<h1>Example Domain</h1><p>This is an example page.</p>");
        assert!(out.starts_with("# Example Domain"));
        assert!(out.contains("This is an example page."));
    }

    #[test]
    fn links_preserved_and_inert_links_dropped() {
        let out = md(r#"<p><a href="https://a.com">go</a> and <a href="javascript:void(0)">no</a></p>"#);
        assert!(out.contains("[go](https://a.com)"));
        assert!(!out.contains("[no]"));
        assert!(out.contains("no"));
    }

    #[test]
    fn unordered_list_with_nesting() {
        let out = md("<ul><li>one</li><li>two<ul><li>nested</li></ul></li></ul>");
        assert!(out.contains("- one"));
        assert!(out.contains("- two"));
        assert!(out.contains("  - nested"));
    }

    #[test]
    fn ordered_list_numbers_increment() {
        let out = md("<ol><li>first</li><li>second</li></ol>");
        assert!(out.contains("1. first"));
        assert!(out.contains("2. second"));
    }

    #[test]
    fn fenced_code_block_keeps_language() {
        let out = md(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#);
        assert!(out.contains("```rust"));
        assert!(out.contains("fn main() {}"));
    }

    #[test]
    fn narrow_table_becomes_pipe_table() {
        let out = md("<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td>30</td></tr></table>");
        assert!(out.contains("| Name | Age |"));
        assert!(out.contains("| Ann | 30 |"));
    }

    #[test]
    fn wide_table_degrades_to_bullets() {
        let mut header = String::from("<tr>");
        let mut row = String::from("<tr>");
        for i in 0..12 {
            header.push_str(&format!("<th>c{i}</th>"));
            row.push_str(&format!("<td>v{i}</td>"));
        }
        header.push_str("</tr>");
        row.push_str("</tr>");
        let html = format!("<table>{header}{row}</table>");
        let out = md(&html);
        assert!(!out.contains('|'));
        assert!(out.contains("c0: v0"));
    }

    #[test]
    fn images_omitted_when_disabled() {
        let opts = ConvertOptions {
            include_images: false,
            ..Default::default()
        };
        let out = html_to_markdown(r#"<img src="a.png" alt="a">"#, &opts);
        assert!(!out.contains("![a]"));
    }

    #[test]
    fn blockquote_prefixes_each_line() {
        let out = md("<blockquote><p>line one</p><p>line two</p></blockquote>");
        assert!(out.lines().all(|l| l.is_empty() || l.starts_with("> ")));
    }

    #[test]
    fn script_and_style_are_dropped() {
        let out = md("<script>alert(1)</script><style>body{}</style><p>kept</p>");
        assert_eq!(out.trim(), "kept");
    }
}
