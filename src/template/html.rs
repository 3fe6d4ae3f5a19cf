//! Content of the synthesized entry page

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// Keys accepted in an HTML content map, in documentation order
pub const HTML_CONTENT_KEYS: [&str; 6] = ["title", "h1", "h2", "description", "canvas_width", "canvas_height"];

/// Values substituted into the page template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HtmlContent {
    pub title: String,
    pub h1: String,
    pub h2: String,
    pub description: String,
    pub canvas_width: String,
    pub canvas_height: String,
}

impl Default for HtmlContent {
    fn default() -> Self {
        Self {
            title: "Brian simulation".to_string(),
            h1: String::new(),
            h2: String::new(),
            description: String::new(),
            canvas_width: "95%".to_string(),
            canvas_height: "500px".to_string(),
        }
    }
}

impl HtmlContent {
    /// Build content from a user map; omitted keys keep their defaults and
    /// unknown keys are rejected.
    pub fn from_map(map: &BTreeMap<String, String>) -> DeviceResult<Self> {
        let mut content = HtmlContent::default();
        for (key, value) in map {
            let slot = match key.as_str() {
                "title" => &mut content.title,
                "h1" => &mut content.h1,
                "h2" => &mut content.h2,
                "description" => &mut content.description,
                "canvas_width" => &mut content.canvas_width,
                "canvas_height" => &mut content.canvas_height,
                _ => {
                    return Err(DeviceError::UnknownHtmlKey {
                        key: key.clone(),
                        allowed: HTML_CONTENT_KEYS.join(", "),
                    })
                }
            };
            *slot = value.clone();
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let content = HtmlContent::default();
        assert_eq!(content.title, "Brian simulation");
        assert_eq!(content.h1, "");
        assert_eq!(content.canvas_width, "95%");
        assert_eq!(content.canvas_height, "500px");
    }

    #[test]
    fn test_partial_map_falls_back() {
        let mut map = BTreeMap::new();
        map.insert("title".to_string(), "Brunel & Hakim".to_string());
        map.insert("canvas_height".to_string(), "300px".to_string());
        let content = HtmlContent::from_map(&map).unwrap();
        assert_eq!(content.title, "Brunel & Hakim");
        assert_eq!(content.canvas_height, "300px");
        assert_eq!(content.canvas_width, "95%");
        assert_eq!(content.description, "");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut map = BTreeMap::new();
        map.insert("footer".to_string(), "x".to_string());
        let err = HtmlContent::from_map(&map).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'footer'"));
        assert!(msg.contains("canvas_width"));
        assert!(err.is_validation());
    }
}
