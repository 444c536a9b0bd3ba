use std::{cell::Cell, rc::Rc};

use lol_html::{
    EndTagHandler, RewriteStrSettings, doc_comments, doc_text, element, html_content::ContentType,
    rewrite_str,
};

use super::{MinifyEngine, MinifyError};

/// Elements whose text content is emitted byte-for-byte.
const PRESERVED_ELEMENTS: [&str; 4] = ["pre", "textarea", "script", "style"];

/// HTML minifier built on a streaming rewriter.
///
/// Drops comments, collapses whitespace runs in text, and removes
/// whitespace next to block-level tags. A run between inline elements
/// keeps a single space. Document tags (`html`, `head`,
/// `body`) are never removed.
#[derive(Debug, Clone)]
pub struct HtmlMinifier {
    /// Keep conditional comments (`<!--[if ...`) and `<!--! ... -->`.
    pub keep_special_comments: bool,
}

impl Default for HtmlMinifier {
    fn default() -> Self {
        Self {
            keep_special_comments: true,
        }
    }
}

impl MinifyEngine for HtmlMinifier {
    fn minify(&self, input: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let html = std::str::from_utf8(input)?;
        minify_html(html, self.keep_special_comments).map(String::into_bytes)
    }
}

fn minify_html(html: &str, keep_special_comments: bool) -> Result<String, MinifyError> {
    // Number of currently open preserved elements.
    let preserved = Rc::new(Cell::new(0usize));
    // Whether the last thing emitted was a block-level tag boundary.
    let after_block = Rc::new(Cell::new(true));

    let mut element_content_handlers: Vec<_> = PRESERVED_ELEMENTS
        .iter()
        .map(|tag| {
            let preserved = Rc::clone(&preserved);
            element!(*tag, move |el| {
                if let Some(handlers) = el.end_tag_handlers() {
                    preserved.set(preserved.get() + 1);
                    let preserved = Rc::clone(&preserved);
                    let handler: EndTagHandler<'static> = Box::new(move |_end| {
                        preserved.set(preserved.get().saturating_sub(1));
                        Ok(())
                    });
                    handlers.push(handler);
                }
                Ok(())
            })
        })
        .collect();

    element_content_handlers.push(element!("*", {
        let after_block = Rc::clone(&after_block);
        move |el| {
            let block = is_block_element(&el.tag_name());
            after_block.set(block);
            if let Some(handlers) = el.end_tag_handlers() {
                let after_block = Rc::clone(&after_block);
                let handler: EndTagHandler<'static> = Box::new(move |_end| {
                    after_block.set(block);
                    Ok(())
                });
                handlers.push(handler);
            }
            Ok(())
        }
    }));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            document_content_handlers: vec![
                doc_comments!(move |comment| {
                    if !(keep_special_comments && is_special_comment(&comment.text())) {
                        comment.remove();
                    }
                    Ok(())
                }),
                doc_text!({
                    let preserved = Rc::clone(&preserved);
                    let after_block = Rc::clone(&after_block);
                    move |chunk| {
                        if preserved.get() > 0 || chunk.as_str().is_empty() {
                            return Ok(());
                        }
                        let collapsed = collapse_whitespace(chunk.as_str(), after_block.get());
                        if !collapsed.is_empty() {
                            after_block.set(false);
                        }
                        if collapsed != chunk.as_str() {
                            chunk.replace(&collapsed, ContentType::Html);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| MinifyError::Rewrite {
        message: err.to_string(),
    })
}

fn is_special_comment(text: &str) -> bool {
    text.starts_with("[if") || text.starts_with("[endif") || text.starts_with('!')
}

/// Elements whose surrounding whitespace never renders.
fn is_block_element(tag: &str) -> bool {
    matches!(
        tag,
        "html"
            | "head"
            | "body"
            | "title"
            | "meta"
            | "link"
            | "base"
            | "script"
            | "style"
            | "header"
            | "footer"
            | "main"
            | "nav"
            | "section"
            | "article"
            | "aside"
            | "div"
            | "p"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "dl"
            | "dt"
            | "dd"
            | "table"
            | "thead"
            | "tbody"
            | "tfoot"
            | "tr"
            | "td"
            | "th"
            | "form"
            | "fieldset"
            | "figure"
            | "figcaption"
            | "blockquote"
            | "hr"
            | "br"
            | "pre"
            | "address"
            | "details"
            | "summary"
    )
}

/// Collapse whitespace runs to one space.
///
/// Leading whitespace right after a block-level boundary is dropped, so
/// indentation between block tags disappears while the single space
/// separating inline elements survives.
fn collapse_whitespace(text: &str, after_block: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !(out.is_empty() && after_block) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    if pending_space && !(out.is_empty() && after_block) {
        out.push(' ');
    }
    out
}
