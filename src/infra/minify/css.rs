use super::{MinifyEngine, MinifyError};

/// Light CSS minifier: drops comments and collapses whitespace, leaving
/// quoted strings intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl MinifyEngine for CssMinifier {
    fn minify(&self, input: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let css = std::str::from_utf8(input)?;
        Ok(minify_css(css).into_bytes())
    }
}

/// Punctuation that never needs surrounding whitespace.
fn is_tight(ch: char) -> bool {
    matches!(ch, '{' | '}' | ';' | ',' | '>')
}

fn minify_css(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut previous = '\0';
            for inner in chars.by_ref() {
                if previous == '*' && inner == '/' {
                    break;
                }
                previous = inner;
            }
            pending_space = true;
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space {
            // A colon only swallows the space after it; `nav :first-child`
            // and `nav:first-child` are different selectors.
            let after_tight = out
                .chars()
                .last()
                .is_none_or(|last| is_tight(last) || last == ':');
            if !after_tight && !is_tight(ch) {
                out.push(' ');
            }
            pending_space = false;
        }

        if ch == '}' && out.ends_with(';') {
            out.pop();
        }

        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
    }

    out
}
