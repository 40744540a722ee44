//! The built-in [`ShapeMatcher`] implementations.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{ExtractedContent, ShapeMatcher, DEFAULT_TITLE};

/// How deep [`Nesting`] follows wrapper keys below a matcher's entry point.
const MAX_DEPTH: usize = 3;

/// Fields that may carry the JSON object as text (Responses and Chat APIs).
const TEXT_FIELDS: [&str; 2] = ["text", "content"];

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Shape (1): a mapping holding `story_html` and `image_prompt`, and
/// optionally `title`.
pub fn match_object(value: &Value) -> Option<ExtractedContent> {
    let obj = value.as_object()?;
    let story_html = non_empty_str(obj, "story_html")?;
    let image_prompt = non_empty_str(obj, "image_prompt")?;
    let title = non_empty_str(obj, "title").unwrap_or(DEFAULT_TITLE);

    Some(ExtractedContent {
        title: title.to_string(),
        story_html: story_html.to_string(),
        image_prompt: image_prompt.to_string(),
    })
}

/// A shape (1) object serialised as text: either the value itself is a
/// string, or it is a mapping whose `text`/`content` field is one.
pub fn match_embedded(value: &Value) -> Option<ExtractedContent> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => TEXT_FIELDS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))?,
        _ => return None,
    };

    let parsed: Value = serde_json::from_str(strip_code_fence(text)).ok()?;
    match_object(&parsed)
}

/// Models sometimes wrap JSON in a Markdown fence despite being told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Rules applied to a wrapped value or a list element.
///
/// An element matches if it is shape (1), an embedded JSON object, or (up to
/// [`MAX_DEPTH`] levels) holds a matching value under one of the object keys
/// or inside a list under one of the list keys.
#[derive(Debug, Clone)]
pub struct Nesting {
    object_keys: Vec<String>,
    list_keys: Vec<String>,
}

impl Nesting {
    pub fn new(object_keys: Vec<String>, list_keys: Vec<String>) -> Self {
        Self {
            object_keys,
            list_keys,
        }
    }

    pub fn match_element(&self, value: &Value) -> Option<ExtractedContent> {
        self.match_at(value, 0)
    }

    fn match_at(&self, value: &Value, depth: usize) -> Option<ExtractedContent> {
        if let Some(found) = match_object(value).or_else(|| match_embedded(value)) {
            return Some(found);
        }
        if depth >= MAX_DEPTH {
            return None;
        }

        let obj = value.as_object()?;
        self.object_keys
            .iter()
            .filter_map(|key| obj.get(key).filter(|v| v.is_object()))
            .find_map(|inner| self.match_at(inner, depth + 1))
            .or_else(|| {
                self.list_keys
                    .iter()
                    .filter_map(|key| obj.get(key).and_then(Value::as_array))
                    .flatten()
                    .find_map(|element| self.match_at(element, depth + 1))
            })
    }
}

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

/// The response itself is shape (1).
pub struct Direct;

impl ShapeMatcher for Direct {
    fn name(&self) -> &str {
        "direct"
    }

    fn try_match(&self, response: &Value) -> Option<ExtractedContent> {
        match_object(response)
    }
}

/// The response holds a mapping under `key`.
pub struct Wrapped {
    key: String,
    label: String,
    nesting: Arc<Nesting>,
}

impl Wrapped {
    pub fn new(key: &str, nesting: Arc<Nesting>) -> Self {
        Self {
            key: key.to_string(),
            label: format!("wrapped:{key}"),
            nesting,
        }
    }
}

impl ShapeMatcher for Wrapped {
    fn name(&self) -> &str {
        &self.label
    }

    fn try_match(&self, response: &Value) -> Option<ExtractedContent> {
        let inner = response.get(&self.key).filter(|v| v.is_object())?;
        self.nesting.match_element(inner)
    }
}

/// The response holds a list under `key`; elements are scanned in order.
pub struct WrappedList {
    key: String,
    label: String,
    nesting: Arc<Nesting>,
}

impl WrappedList {
    pub fn new(key: &str, nesting: Arc<Nesting>) -> Self {
        Self {
            key: key.to_string(),
            label: format!("list:{key}"),
            nesting,
        }
    }
}

impl ShapeMatcher for WrappedList {
    fn name(&self) -> &str {
        &self.label
    }

    fn try_match(&self, response: &Value) -> Option<ExtractedContent> {
        response
            .get(&self.key)?
            .as_array()?
            .iter()
            .find_map(|element| self.nesting.match_element(element))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nesting() -> Arc<Nesting> {
        Arc::new(Nesting::new(
            vec!["output".into(), "message".into()],
            vec!["output".into(), "content".into()],
        ))
    }

    #[test]
    fn object_requires_both_mandatory_fields() {
        assert!(match_object(&json!({"story_html": "<p>x</p>"})).is_none());
        assert!(match_object(&json!({"image_prompt": "x"})).is_none());
        assert!(match_object(&json!({"story_html": "", "image_prompt": "x"})).is_none());
        assert!(match_object(&json!({"story_html": 5, "image_prompt": "x"})).is_none());
        assert!(match_object(&json!("story_html")).is_none());
    }

    #[test]
    fn object_trims_and_defaults_title() {
        let got = match_object(&json!({
            "title": "   ",
            "story_html": "\n<p>x</p>\n",
            "image_prompt": " a cat "
        }))
        .unwrap();
        assert_eq!(got.title, DEFAULT_TITLE);
        assert_eq!(got.story_html, "<p>x</p>");
        assert_eq!(got.image_prompt, "a cat");

        let got = match_object(&json!({"title": 7, "story_html": "s", "image_prompt": "p"})).unwrap();
        assert_eq!(got.title, DEFAULT_TITLE);
    }

    #[test]
    fn embedded_json_string_and_fence() {
        let inner = r#"{"title":"T","story_html":"<p>s</p>","image_prompt":"p"}"#;
        assert_eq!(match_embedded(&json!(inner)).unwrap().title, "T");

        let fenced = format!("```json\n{inner}\n```");
        assert_eq!(match_embedded(&json!(fenced)).unwrap().title, "T");

        assert_eq!(match_embedded(&json!({"content": inner})).unwrap().title, "T");
        assert!(match_embedded(&json!({"text": "not json"})).is_none());
        assert!(match_embedded(&json!({"text": 12})).is_none());
    }

    #[test]
    fn wrapped_ignores_non_mapping() {
        let m = Wrapped::new("output", nesting());
        assert!(m.try_match(&json!({"output": [1, 2]})).is_none());
        assert!(m.try_match(&json!({"output": "x"})).is_none());
        assert!(m.try_match(&json!([])).is_none());
        assert!(m
            .try_match(&json!({"output": {"story_html": "s", "image_prompt": "p"}}))
            .is_some());
    }

    #[test]
    fn list_skips_non_matching_elements() {
        let m = WrappedList::new("content", nesting());
        let got = m
            .try_match(&json!({"content": [
                null,
                "plain text",
                {"text": "{broken"},
                {"text": "{\"title\":\"ok\",\"story_html\":\"s\",\"image_prompt\":\"p\"}"}
            ]}))
            .unwrap();
        assert_eq!(got.title, "ok");
    }

    #[test]
    fn nesting_is_depth_bounded() {
        let leaf = json!({"story_html": "s", "image_prompt": "p"});
        let mut value = leaf;
        for _ in 0..(MAX_DEPTH + 1) {
            value = json!({ "output": value });
        }
        assert!(nesting().match_element(&value).is_none());

        let mut value = json!({"story_html": "s", "image_prompt": "p"});
        for _ in 0..MAX_DEPTH {
            value = json!({ "output": value });
        }
        assert!(nesting().match_element(&value).is_some());
    }

    #[test]
    fn labels() {
        assert_eq!(Direct.name(), "direct");
        assert_eq!(Wrapped::new("output", nesting()).name(), "wrapped:output");
        assert_eq!(WrappedList::new("content", nesting()).name(), "list:content");
    }
}
