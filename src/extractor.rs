use std::sync::LazyLock;

use scraper::{Html, Selector};

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// Elements whose text is code or markup, not prose. The title stays in.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub title: Option<String>,
}

/// Parse markup once and pull out both visible text and the title.
pub fn extract(body: &str) -> Extracted {
    let document = Html::parse_document(body);
    Extracted {
        text: visible_text(&document),
        title: title(&document),
    }
}

/// Document text nodes, each trimmed, empty ones dropped, joined by one space.
fn visible_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                return None;
            }
            let t = text.trim();
            (!t.is_empty()).then_some(t)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `<title>`, trimmed. `None` when absent or blank.
fn title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

// ── Tests ──
