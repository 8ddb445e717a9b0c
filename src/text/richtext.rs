use serde_json::{Map, Value};

/// Node types that end a line of output.
const BLOCK_NODES: &[&str] = &[
    "paragraph",
    "heading",
    "blockquote",
    "code_block",
    "list_item",
    "bullet_list",
    "ordered_list",
    "table",
    "table_row",
];

/// A rich-text field is an object `{"type": "doc", "content": [...]}`.
pub(crate) fn is_rich_text(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("doc")
        && map.get("content").map(Value::is_array).unwrap_or(false)
}

/// Flatten a rich-text document to plain lines. Marks are ignored; embedded component
/// nodes (`blok`) contribute nothing.
pub(crate) fn flatten(doc: &Value) -> String {
    let mut out = String::new();
    render_node(doc, &mut out);
    out
}

fn render_node(node: &Value, out: &mut String) {
    let Some(map) = node.as_object() else {
        return;
    };
    let kind = map.get("type").and_then(Value::as_str).unwrap_or("");

    match kind {
        "text" => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        "hard_break" => out.push('\n'),
        "horizontal_rule" | "blok" => end_line(out),
        "image" | "emoji" => {
            let alt = map
                .get("attrs")
                .and_then(|a| a.get("alt").or_else(|| a.get("name")))
                .and_then(Value::as_str)
                .unwrap_or("");
            if !alt.trim().is_empty() {
                out.push_str(alt);
            }
        }
        _ => {
            let is_block = BLOCK_NODES.contains(&kind);
            if is_block {
                end_line(out);
            }
            if let Some(children) = map.get("content").and_then(Value::as_array) {
                for child in children {
                    render_node(child, out);
                }
            }
            if is_block {
                end_line(out);
            }
        }
    }
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_paragraphs_and_breaks() {
        let doc = json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Opening hours"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Mon-Fri "},
                    {"type": "text", "text": "9-5", "marks": [{"type": "bold"}]},
                    {"type": "hard_break"},
                    {"type": "text", "text": "Sat closed"}
                ]}
            ]
        });
        assert!(is_rich_text(doc.as_object().unwrap()));
        assert_eq!(flatten(&doc), "Opening hours\nMon-Fri 9-5\nSat closed\n");
    }

    #[test]
    fn lists_put_items_on_lines() {
        let doc = json!({
            "type": "doc",
            "content": [{"type": "bullet_list", "content": [
                {"type": "list_item", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "one"}]}]},
                {"type": "list_item", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "two"}]}]}
            ]}]
        });
        assert_eq!(flatten(&doc), "one\ntwo\n");
    }

    #[test]
    fn images_and_emoji_keep_labels_but_bloks_are_dropped() {
        let doc = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Our fleet "},
                    {"type": "image", "attrs": {"src": "https://a.example.com/bike.png", "alt": "Red cargo bike"}},
                    {"type": "text", "text": " "},
                    {"type": "emoji", "attrs": {"name": "bicyclist", "emoji": "🚴"}}
                ]},
                {"type": "blok", "attrs": {"body": [{"component": "teaser", "headline": "Embedded teaser"}]},
                 "content": [{"type": "text", "text": "Hidden blok text"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "Book today"}]}
            ]
        });
        let flat = flatten(&doc);
        assert_eq!(flat, "Our fleet Red cargo bike bicyclist\nBook today\n");
        assert!(!flat.contains("Hidden"));
        assert!(!flat.contains("Embedded"));
    }

    #[test]
    fn plain_objects_are_not_rich_text() {
        let value = json!({"type": "doc", "content": "nope"});
        assert!(!is_rich_text(value.as_object().unwrap()));
    }
}
