//! Script reference rewriter
//!
//! Scripts are not split: the payload is the whole script with string
//! literals rewritten to follow renamed artifacts, and the shell is the
//! standalone fetch stub.

use crate::SplitResult;
use crate::links::LinkTargets;
use std::borrow::Cow;

/// Content type of every script payload.
pub const SCRIPT_CONTENT_TYPE: &str = "text/javascript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    Literal(char),
    LineComment,
}

/// Rewrite a script and package it with `stub` as its shell.
pub fn split_script(script: &str, targets: &LinkTargets, stub: &str) -> SplitResult {
    SplitResult {
        shell: Some(stub.to_string()),
        payload: rewrite_script(script, targets).into_bytes(),
        content_type: SCRIPT_CONTENT_TYPE.to_string(),
    }
}

/// Rewrite references to `targets` inside the string literals of `script`.
///
/// Quotes are tracked with backslash parity, so `"a\"b"` is one literal.
/// Line comments are entered on `//` outside literals and left at the end of
/// the line; their contents are never rewritten. An unterminated literal at
/// end of input is copied unchanged.
pub fn rewrite_script(script: &str, targets: &LinkTargets) -> String {
    if targets.is_empty() {
        return script.to_string();
    }

    let mut out = String::with_capacity(script.len());
    let mut state = ScanState::Code;
    let mut backslashes = 0usize;
    let mut prev_slash = false;
    let mut literal_start = 0usize;
    let mut copied = 0usize;

    for (i, c) in script.char_indices() {
        let escaped = backslashes % 2 == 1;
        let after_slash = std::mem::replace(&mut prev_slash, false);

        match state {
            ScanState::Code => match c {
                '"' | '\'' if !escaped => {
                    state = ScanState::Literal(c);
                    literal_start = i + c.len_utf8();
                }
                '/' if !escaped => {
                    if after_slash {
                        state = ScanState::LineComment;
                    } else {
                        prev_slash = true;
                    }
                }
                _ => {}
            },
            ScanState::Literal(quote) => {
                if c == quote && !escaped {
                    let contents = &script[literal_start..i];
                    if let Cow::Owned(rewritten) = replace_targets(contents, targets) {
                        out.push_str(&script[copied..literal_start]);
                        out.push_str(&rewritten);
                        copied = i;
                    }
                    state = ScanState::Code;
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Code;
                }
            }
        }

        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
    }

    out.push_str(&script[copied..]);
    out
}

/// Replace every occurrence of a target path in `text` with its renamed form.
///
/// A match has to start at a path-segment boundary and must not run into a
/// longer word, so `chart.json` does not match inside `mychart.json` or
/// `chart.jsonp`. Longer targets win over shorter ones at the same position.
fn replace_targets<'t>(text: &'t str, targets: &LinkTargets) -> Cow<'t, str> {
    let candidates = targets.longest_first();
    let mut out = String::new();
    let mut copied = 0usize;
    let mut pos = 0usize;

    while pos < text.len() {
        let rest = &text[pos..];
        let at_boundary = text[..pos].chars().next_back().is_none_or(is_boundary);

        let hit = at_boundary
            .then(|| {
                candidates.iter().find(|target| {
                    rest.starts_with(**target)
                        && rest[target.len()..]
                            .chars()
                            .next()
                            .is_none_or(|next| !next.is_alphanumeric() && next != '_')
                })
            })
            .flatten();

        match hit {
            Some(target) => {
                out.push_str(&text[copied..pos]);
                out.push_str(&targets.rename(target));
                pos += target.len();
                copied = pos;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

fn is_boundary(c: char) -> bool {
    !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
