//! Tree capability the extraction and discovery heuristics are written against

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Elements that start a new rendered line
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt",
    "figcaption", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text is never rendered
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Read-only view over a parsed markup document
///
/// Nodes are cheap handles into the tree. Only element nodes are exposed.
pub trait DocumentTree {
    /// Handle to an element of the tree
    type Node: Copy + PartialEq;

    /// The top-level element of the document
    fn root(&self) -> Self::Node;

    /// Descendants of `scope` (excluding `scope` itself) matching a CSS selector, in
    /// document order. An invalid selector matches nothing.
    fn select(&self, scope: Self::Node, css: &str) -> Vec<Self::Node>;

    /// Text of the node: each text fragment trimmed, empty fragments dropped, joined
    /// with single spaces
    fn text(&self, node: Self::Node) -> String;

    /// Text of the node laid out as rendered lines, one per block element, each line
    /// whitespace-collapsed and non-empty
    fn rendered_text(&self, node: Self::Node) -> String;

    /// Attribute value
    fn attr(&self, node: Self::Node, name: &str) -> Option<String>;

    /// Lowercase tag name
    fn tag_name(&self, node: Self::Node) -> String;

    /// Parent element, `None` at the top of the tree
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// First match of `css` under `scope`
    fn select_first(&self, scope: Self::Node, css: &str) -> Option<Self::Node> {
        self.select(scope, css).into_iter().next()
    }

    /// Ancestor elements, nearest first
    fn ancestors(&self, node: Self::Node) -> Vec<Self::Node> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// True when `node` is `container` or one of its descendants
    fn is_within(&self, node: Self::Node, container: Self::Node) -> bool {
        node == container || self.ancestors(node).contains(&container)
    }
}

/// `DocumentTree` over a document parsed by `scraper`
#[derive(Clone, Copy)]
pub struct HtmlTree<'a> {
    html: &'a Html,
}

impl<'a> HtmlTree<'a> {
    pub fn new(html: &'a Html) -> Self {
        Self { html }
    }
}

impl<'a> DocumentTree for HtmlTree<'a> {
    type Node = ElementRef<'a>;

    fn root(&self) -> ElementRef<'a> {
        self.html.root_element()
    }

    fn select(&self, scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
        match Selector::parse(css) {
            Ok(selector) => scope.select(&selector).collect(),
            Err(e) => {
                warn!("Failed to parse selector '{}': {}", css, e);
                Vec::new()
            }
        }
    }

    fn text(&self, node: ElementRef<'a>) -> String {
        node.text()
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn rendered_text(&self, node: ElementRef<'a>) -> String {
        let mut raw = String::new();
        render_into(node, &mut raw);
        raw.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn attr(&self, node: ElementRef<'a>, name: &str) -> Option<String> {
        node.value().attr(name).map(str::to_string)
    }

    fn tag_name(&self, node: ElementRef<'a>) -> String {
        node.value().name().to_ascii_lowercase()
    }

    fn parent(&self, node: ElementRef<'a>) -> Option<ElementRef<'a>> {
        node.parent().and_then(ElementRef::wrap)
    }
}

fn render_into(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_TAGS.contains(&name) {
        return;
    }
    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            render_into(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
    if block {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div id="outer" class="row">
            <ul>
              <li id="item">
                <p><time>3/15/2023</time></p>
                <p><a href="/speech/a.htm" title="Alt">  Opening   Remarks </a></p>
                <p class="speaker">Chair <em>Jerome H. Powell</em></p>
                <script>var x = "hidden";</script>
              </li>
            </ul>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_text_joins_trimmed_fragments() {
        let html = Html::parse_document(PAGE);
        let tree = HtmlTree::new(&html);
        let speaker = tree.select_first(tree.root(), "p.speaker").unwrap();
        assert_eq!(tree.text(speaker), "Chair Jerome H. Powell");
    }

    #[test]
    fn test_rendered_text_lines() {
        let html = Html::parse_document(PAGE);
        let tree = HtmlTree::new(&html);
        let item = tree.select_first(tree.root(), "li").unwrap();
        let rendered = tree.rendered_text(item);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec!["3/15/2023", "Opening Remarks", "Chair Jerome H. Powell"]
        );
    }

    #[test]
    fn test_ancestors_and_within() {
        let html = Html::parse_document(PAGE);
        let tree = HtmlTree::new(&html);
        let anchor = tree.select_first(tree.root(), "a").unwrap();
        let item = tree.select_first(tree.root(), "li").unwrap();
        let outer = tree.select_first(tree.root(), "#outer").unwrap();

        let tags: Vec<String> = tree
            .ancestors(anchor)
            .into_iter()
            .map(|node| tree.tag_name(node))
            .collect();
        assert_eq!(tags, vec!["p", "li", "ul", "div", "body", "html"]);
        assert!(tree.is_within(anchor, item));
        assert!(tree.is_within(item, item));
        assert!(!tree.is_within(outer, item));
        assert_eq!(tree.attr(anchor, "title").as_deref(), Some("Alt"));
        assert_eq!(tree.attr(anchor, "name"), None);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let html = Html::parse_document(PAGE);
        let tree = HtmlTree::new(&html);
        assert!(tree.select(tree.root(), "p[[").is_empty());
    }
}
