//! JSON-LD extraction (`<script type="application/ld+json">`), used by
//! Stage 5's "html, JSON-LD first" path and the Stage 6 zero-token safety
//! net's JSON-LD rescue.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static JSONLD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// One parsed JSON-LD block, normalized to a single object even when the
/// source embedded a `@graph` array or a top-level array of nodes.
#[derive(Debug, Clone)]
pub struct JsonLdEntry {
    pub value: Value,
    pub raw_len: usize,
}

impl JsonLdEntry {
    pub fn type_name(&self) -> Option<String> {
        self.value
            .get("@type")
            .and_then(|t| t.as_str().map(str::to_string))
    }

    pub fn name(&self) -> Option<String> {
        self.value
            .get("name")
            .or_else(|| self.value.get("headline"))
            .and_then(|n| n.as_str().map(str::to_string))
    }
}

/// Parse every JSON-LD script block in the document. Malformed JSON is
/// skipped rather than treated as an error — one bad block should not sink
/// the others.
pub fn extract_json_ld(doc: &Html) -> Vec<JsonLdEntry> {
    let mut out = Vec::new();
    for el in doc.select(&JSONLD_SELECTOR) {
        let raw = el.text().collect::<String>();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(parsed) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };
        match parsed {
            Value::Array(items) => {
                for item in items {
                    out.push(JsonLdEntry {
                        raw_len: trimmed.len(),
                        value: item,
                    });
                }
            }
            Value::Object(ref map) if map.contains_key("@graph") => {
                if let Some(Value::Array(items)) = map.get("@graph").cloned() {
                    for item in items {
                        out.push(JsonLdEntry {
                            raw_len: trimmed.len(),
                            value: item,
                        });
                    }
                }
            }
            other => out.push(JsonLdEntry {
                raw_len: trimmed.len(),
                value: other,
            }),
        }
    }
    out
}

/// Pick the first entry with at least `min_content_chars` of normalized
/// textual content (name/description/articleBody combined), per Stage 5's
/// "≥ 100 chars of content" gate.
pub fn primary_entry(entries: &[JsonLdEntry], min_content_chars: usize) -> Option<&JsonLdEntry> {
    entries
        .iter()
        .find(|e| normalized_content(&e.value).chars().count() >= min_content_chars)
}

/// Flatten the useful textual fields of a JSON-LD node into a markdown-ish
/// document: `# name` followed by description/body text.
pub fn normalized_content(value: &Value) -> String {
    let mut parts = Vec::new();
    if let Some(name) = value.get("name").and_then(|v| v.as_str()) {
        parts.push(format!("# {name}"));
    } else if let Some(headline) = value.get("headline").and_then(|v| v.as_str()) {
        parts.push(format!("# {headline}"));
    }
    for field in ["description", "articleBody", "text"] {
        if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
            if !text.trim().is_empty() {
                parts.push(text.trim().to_string());
            }
        }
    }
    if let Some(ingredients) = value.get("recipeIngredient").and_then(|v| v.as_array()) {
        if !ingredients.is_empty() {
            parts.push("## Ingredients".to_string());
            for item in ingredients {
                if let Some(s) = item.as_str() {
                    parts.push(format!("- {s}"));
                }
            }
        }
    }
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_recipe_json_ld() {
        let html = r#"<html><head>
        <script type="application/ld+json">
        {"@type":"Recipe","name":"Pancakes","description":"Fluffy buttermilk pancakes made from scratch with simple pantry ingredients every morning.","recipeIngredient":["2 cups flour","2 eggs","1 cup milk"]}
        </script>
        </head><body></body></html>"#;
        let doc = Html::parse_document(html);
        let entries = extract_json_ld(&doc);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].type_name(), Some("Recipe".to_string()));
        assert_eq!(entries[0].name(), Some("Pancakes".to_string()));
        let content = normalized_content(&entries[0].value);
        assert!(content.starts_with("# Pancakes"));
        assert!(content.contains("- 2 cups flour"));
    }

    #[test]
    fn malformed_json_ld_is_skipped() {
        let html = r#"<html><head>
        <script type="application/ld+json">{not valid json</script>
        <script type="application/ld+json">{"@type":"Article","name":"ok"}</script>
        </head></html>"#;
        let doc = Html::parse_document(html);
        let entries = extract_json_ld(&doc);
        assert_eq!(entries.len(), 1);
    }
}
