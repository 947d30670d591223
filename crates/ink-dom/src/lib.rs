//! Markup tree data structures.

/// One node in a parsed markup tree.
///
/// The variants form a closed sum decoded once at the parser boundary; code
/// downstream never inspects raw node shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(ElementNode),
    Text(String),
}

/// An element with a case-normalized tag name, ordered attributes, and
/// ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// First attribute value for `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Class tokens in document order (`class` is a space-separated list).
    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// The `id` attribute as a single token.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::ElementNode;

    #[test]
    fn attribute_lookup_returns_first_match() {
        let mut element = ElementNode::new("div");
        element
            .attributes
            .push(("class".to_owned(), "card wide".to_owned()));
        element.attributes.push(("id".to_owned(), "hero".to_owned()));

        assert_eq!(element.attribute("class"), Some("card wide"));
        assert_eq!(element.attribute("missing"), None);
    }

    #[test]
    fn classes_split_on_whitespace_in_order() {
        let mut element = ElementNode::new("div");
        element
            .attributes
            .push(("class".to_owned(), "  card   wide\tdark ".to_owned()));
        assert_eq!(element.classes(), vec!["card", "wide", "dark"]);
    }

    #[test]
    fn blank_id_is_treated_as_absent() {
        let mut element = ElementNode::new("div");
        element.attributes.push(("id".to_owned(), "   ".to_owned()));
        assert_eq!(element.id(), None);
    }
}
