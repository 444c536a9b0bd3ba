//! Atomically swappable template set.
//!
//! The current set lives behind a single `Arc`. Readers clone the `Arc` once
//! and keep rendering from that snapshot even if a reload publishes a new set
//! mid-request. A reload parses the complete set before publishing it, so a
//! failed parse never disturbs the set already being served.

use std::sync::{Arc, RwLock};

use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use crate::cache::{rw_read, rw_write};

use super::functions::FunctionMap;

const SOURCE: &str = "presentation::templates";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template pattern `{pattern}`: {reason}")]
    Pattern {
        pattern: String,
        reason: &'static str,
    },
    #[error("failed to parse templates matching `{pattern}`")]
    Parse {
        pattern: String,
        #[source]
        source: tera::Error,
    },
    #[error("no templates match `{pattern}`")]
    NoTemplates { pattern: String },
    #[error("failed to execute template `{template}`")]
    Execution {
        template: String,
        #[source]
        source: tera::Error,
    },
}

/// Holds the one current template set.
#[derive(Default)]
pub struct TemplateStore {
    current: RwLock<Option<Arc<Tera>>>,
}

impl TemplateStore {
    /// A store with no template set loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current template set, if one was ever loaded.
    pub fn load(&self) -> Option<Arc<Tera>> {
        rw_read(&self.current, SOURCE, "load").clone()
    }

    /// Parse a fresh set from `pattern` and publish it as current.
    ///
    /// On error the previously published set is left untouched.
    pub fn reload(&self, pattern: &str, functions: &FunctionMap) -> Result<(), TemplateError> {
        let parsed = parse_template_set(pattern, functions)?;
        let template_count = parsed.get_template_names().count();
        self.publish(parsed);

        info!(
            target = "vellum::templates",
            op = "reload",
            result = "published",
            pattern,
            template_count,
            "Template set published"
        );
        Ok(())
    }

    /// Publish an already-built template set.
    pub fn publish(&self, templates: Tera) {
        let next = Arc::new(templates);
        *rw_write(&self.current, SOURCE, "publish") = Some(next);
    }
}

/// Parse every template matching the glob `pattern` into one set sharing
/// `functions`.
pub fn parse_template_set(pattern: &str, functions: &FunctionMap) -> Result<Tera, TemplateError> {
    if pattern.trim().is_empty() {
        return Err(TemplateError::Pattern {
            pattern: pattern.to_string(),
            reason: "pattern must not be empty",
        });
    }

    let mut tera = Tera::new(pattern).map_err(|source| TemplateError::Parse {
        pattern: pattern.to_string(),
        source,
    })?;

    if tera.get_template_names().next().is_none() {
        return Err(TemplateError::NoTemplates {
            pattern: pattern.to_string(),
        });
    }

    functions.register_into(&mut tera);
    Ok(tera)
}

/// Execute the named template against `context`, appending the output to `sink`.
pub fn execute_template(
    templates: &Tera,
    name: &str,
    context: &Context,
    sink: &mut Vec<u8>,
) -> Result<(), TemplateError> {
    templates
        .render_to(name, context, sink)
        .map_err(|source| TemplateError::Execution {
            template: name.to_string(),
            source,
        })
}
