//! Query templates with an `${iri}` placeholder

/// Marker replaced by the target IRI
pub const IRI_PLACEHOLDER: &str = "${iri}";

/// A SPARQL query string containing zero or more `${iri}` markers
///
/// Instantiation is literal substring replacement. No other placeholders and
/// no expression evaluation are supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    template: String,
}

impl QueryTemplate {
    /// Create a new template
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Raw template text
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Replace every occurrence of the placeholder with `iri`
    pub fn instantiate(&self, iri: &str) -> String {
        self.template.replace(IRI_PLACEHOLDER, iri)
    }
}

impl From<&str> for QueryTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for QueryTemplate {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}
