//! Cache key definitions.

use std::fmt;

/// Identifies one cached response.
///
/// Derived from the request path, the raw query string, the template name
/// and the template-set version. The render data is deliberately not part of
/// the key: handlers whose output depends on data outside this tuple must
/// bump the version or vary the path/query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: String,
    query: String,
    template: String,
    version: String,
}

impl CacheKey {
    pub fn new(
        path: impl Into<String>,
        query: impl Into<String>,
        template: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            template: template.into(),
            version: version.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}?{}|tmpl:{}|v:{}",
            self.path, self.query, self.template, self.version
        )
    }
}
