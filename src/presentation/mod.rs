//! Presentation layer: the hot-swappable compiled template set.

mod functions;
mod templates;

pub use functions::FunctionMap;
pub use templates::{TemplateError, TemplateStore, execute_template, parse_template_set};
