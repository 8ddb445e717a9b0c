use super::CmsClient;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Where raw story JSON comes from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load_stories(&self, language: Option<&str>) -> Result<Vec<Value>>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl ContentSource for CmsClient {
    async fn load_stories(&self, language: Option<&str>) -> Result<Vec<Value>> {
        Ok(self.fetch_all_stories(language).await?)
    }

    fn describe(&self) -> String {
        format!("cms:{}", self.base_url())
    }
}

/// Stories already held in memory (embedding callers, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    stories: Vec<Value>,
}

impl StaticSource {
    pub fn new(stories: Vec<Value>) -> Self {
        Self { stories }
    }

    /// Accepts either a stories listing (`{"stories": [...]}`), a single story response
    /// (`{"story": {...}}`), a bare array, or a single story object.
    pub fn from_response(value: Value) -> Self {
        let stories = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("stories") {
                    items
                } else if let Some(story) = map.remove("story") {
                    vec![story]
                } else {
                    vec![Value::Object(map)]
                }
            }
            _ => Vec::new(),
        };
        Self { stories }
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn load_stories(&self, _language: Option<&str>) -> Result<Vec<Value>> {
        Ok(self.stories.clone())
    }

    fn describe(&self) -> String {
        format!("static:{} stories", self.stories.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_listing_and_single_story_shapes() {
        let listing = StaticSource::from_response(json!({"stories": [{"name": "a"}, {"name": "b"}]}));
        assert_eq!(listing.len(), 2);

        let single = StaticSource::from_response(json!({"story": {"name": "a"}}));
        assert_eq!(single.len(), 1);

        let bare = StaticSource::from_response(json!({"name": "a", "content": {}}));
        assert_eq!(bare.len(), 1);

        assert!(StaticSource::from_response(json!("nope")).is_empty());
    }

    #[tokio::test]
    async fn static_source_ignores_language() {
        let source = StaticSource::new(vec![json!({"name": "a"})]);
        let stories = source.load_stories(Some("de")).await.unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(source.describe(), "static:1 stories");
    }
}
