//! Markup splitter
//!
//! Partitions an HTML document into a static shell and a dynamic payload.
//! The divider tag marks the dynamic region: its start and end tags stay in
//! the shell, the fetch stub follows the start tag, and everything between
//! goes to the payload.
//!
//! ```text
//! <!DOCTYPE html>            shell
//! <html lang="en">           shell
//!   <?php ... ?>             shell (stub)
//!   <head>...</body>         payload
//! </html>                    shell
//! ```

mod tokenizer;

pub use tokenizer::{Attribute, Tag, Token, Tokenizer};

use crate::links::LinkTargets;
use crate::{Result, SplitResult};
use std::borrow::Cow;

/// Divider value that marks the whole document as dynamic.
pub const NO_DIVIDER: &str = "none";

/// Content type of every split markup payload.
pub const MARKUP_CONTENT_TYPE: &str = "text/html";

/// Split a markup document at `divider_tag`, rewriting links to `targets`.
///
/// With the divider `"none"` the whole document is dynamic and the shell is
/// the stub alone.
///
/// # Errors
///
/// Any tokenizer error aborts the split; no partial result is returned.
pub fn split_markup(
    markup: &str,
    divider_tag: &str,
    targets: &LinkTargets,
    stub: &str,
) -> Result<SplitResult> {
    let divider = divider_tag.trim().to_ascii_lowercase();
    let whole_document = divider == NO_DIVIDER || divider.is_empty();

    let mut shell = String::new();
    let mut payload = String::with_capacity(markup.len());
    let mut inside = whole_document;
    let mut depth = 0usize;
    let mut stub_written = false;

    if whole_document {
        shell.push_str(stub);
        stub_written = true;
    }

    for token in Tokenizer::new(markup) {
        let token = token?;
        match &token {
            Token::StartTag(tag) => {
                let text = rewrite_tag(tag, targets);
                let is_divider = !whole_document && !tag.self_closing && tag.name == divider;
                if is_divider && !inside {
                    shell.push_str(&text);
                    inside = true;
                    depth = 1;
                    if !stub_written {
                        shell.push_str(stub);
                        stub_written = true;
                    }
                    continue;
                }
                if is_divider {
                    depth += 1;
                }
                active(&mut shell, &mut payload, inside).push_str(&text);
            }
            Token::EndTag { name, raw } => {
                if inside && !whole_document && *name == divider {
                    depth -= 1;
                    if depth == 0 {
                        inside = false;
                        shell.push_str(raw);
                        continue;
                    }
                }
                active(&mut shell, &mut payload, inside).push_str(raw);
            }
            other => {
                active(&mut shell, &mut payload, inside).push_str(&other.to_markup());
            }
        }
    }

    if !stub_written {
        tracing::warn!(divider = %divider, "Divider tag not found; document kept whole in shell");
    }

    Ok(SplitResult {
        shell: Some(shell),
        payload: payload.into_bytes(),
        content_type: MARKUP_CONTENT_TYPE.to_string(),
    })
}

fn active<'b>(shell: &'b mut String, payload: &'b mut String, inside: bool) -> &'b mut String {
    if inside { payload } else { shell }
}

/// Apply the link rule to one tag: `href` on anchors, `src` on anything.
///
/// `src` is not limited to self-closing tags, so `<img src>` and
/// `<script src>` written without `/>` follow a renamed artifact too.
fn rewrite_tag<'a>(tag: &Tag<'a>, targets: &LinkTargets) -> Cow<'a, str> {
    if targets.is_empty() {
        return Cow::Borrowed(tag.raw);
    }
    if tag.name == "a"
        && let Some(href) = tag.attribute("href")
        && let Some(rewritten) = targets.rewrite_href(href)
    {
        tracing::trace!(from = href, to = %rewritten, "Rewrote anchor");
        return tag.with_attribute("href", &rewritten);
    }
    if let Some(src) = tag.attribute("src")
        && let Some(rewritten) = targets.rewrite_src(src)
    {
        tracing::trace!(from = src, to = %rewritten, "Rewrote src");
        return tag.with_attribute("src", &rewritten);
    }
    Cow::Borrowed(tag.raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STUB: &str = "<?php stub ?>";

    #[test]
    fn splits_at_html_divider() {
        let doc = "<!DOCTYPE html>\n<html lang=\"en\"><head></head><body>21.3</body></html>\n";
        let result = split_markup(doc, "html", &LinkTargets::none(), STUB).unwrap();

        assert_eq!(
            result.shell.as_deref(),
            Some("<!DOCTYPE html>\n<html lang=\"en\"><?php stub ?></html>\n")
        );
        assert_eq!(result.payload, b"<head></head><body>21.3</body>".to_vec());
        assert_eq!(result.content_type, "text/html");
    }

    #[test]
    fn none_divider_makes_everything_payload() {
        let doc = "<!DOCTYPE html><p>x</p>";
        let result = split_markup(doc, "none", &LinkTargets::none(), STUB).unwrap();
        assert_eq!(result.shell.as_deref(), Some(STUB));
        assert_eq!(result.payload, doc.as_bytes().to_vec());
    }

    #[test]
    fn nested_divider_tags_are_tracked() {
        let doc = "<div id=o><div>a</div>b</div>c";
        let result = split_markup(doc, "div", &LinkTargets::none(), STUB).unwrap();
        assert_eq!(result.shell.as_deref(), Some("<div id=o><?php stub ?></div>c"));
        assert_eq!(result.payload, b"<div>a</div>b".to_vec());
    }

    #[test]
    fn missing_divider_keeps_document_in_shell() {
        let doc = "<p>no body here</p>";
        let result = split_markup(doc, "body", &LinkTargets::none(), STUB).unwrap();
        assert_eq!(result.shell.as_deref(), Some(doc));
        assert!(result.payload.is_empty());
    }

    #[test]
    fn parse_error_aborts_split() {
        let doc = "<html><body><a href=\"x.html</body></html>";
        assert!(split_markup(doc, "body", &LinkTargets::none(), STUB).is_err());
    }
}
