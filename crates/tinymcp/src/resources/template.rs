//! `{param}` URI templates.
//!
//! A template compiles to an anchored regex: literal text is escaped and
//! each `{name}` becomes a named group matching one or more characters
//! other than `/`.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("placeholder '{0}' appears more than once")]
    DuplicateParam(String),

    #[error("{0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone)]
pub struct UriTemplate {
    pattern: Regex,
    params: Vec<String>,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex is valid"))
}

impl UriTemplate {
    pub fn is_template(uri: &str) -> bool {
        placeholder_re().is_match(uri)
    }

    /// Compile `uri`. `Ok(None)` means it has no placeholder, i.e. it is a
    /// concrete URI.
    pub fn parse(uri: &str) -> Result<Option<Self>, TemplateError> {
        if !Self::is_template(uri) {
            return Ok(None);
        }

        let mut pattern = String::from("^");
        let mut params = Vec::new();
        let mut seen = HashSet::new();
        let mut last = 0;
        for caps in placeholder_re().captures_iter(uri) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if !seen.insert(name) {
                return Err(TemplateError::DuplicateParam(name.to_string()));
            }
            pattern.push_str(&regex::escape(&uri[last..whole.start()]));
            pattern.push_str(&format!("(?P<{name}>[^/]+)"));
            params.push(name.to_string());
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&uri[last..]));
        pattern.push('$');

        Ok(Some(Self {
            pattern: Regex::new(&pattern)?,
            params,
        }))
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(String::as_str)
    }

    /// Captured parameters by name, or `None` if `uri` does not match.
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let caps = self.pattern.captures(uri)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}
