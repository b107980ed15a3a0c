//! Content categories and the split dispatch

use crate::links::LinkTargets;
use crate::markup::{NO_DIVIDER, split_markup};
use crate::{Error, Result, opaque, script};

/// Result of splitting one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    /// Static remainder written back to disk. `None` when no shell is wanted.
    pub shell: Option<String>,
    /// Dynamic part stored in the record store.
    pub payload: Vec<u8>,
    pub content_type: String,
}

impl SplitResult {
    /// Drop the shell, keeping payload and content type.
    pub fn without_shell(self) -> Self {
        Self {
            shell: None,
            ..self
        }
    }
}

/// Everything a splitter needs besides the raw bytes.
#[derive(Debug, Clone, Copy)]
pub struct SplitContext<'a> {
    /// Lowercase file-name extension of the artifact, without the dot.
    pub extension: &'a str,
    pub divider_tag: &'a str,
    pub targets: &'a LinkTargets,
    /// Stub embedded inside a markup shell.
    pub inline_stub: &'a str,
    /// Stub that is the whole shell for scripts and opaque payloads.
    pub standalone_stub: &'a str,
    pub declared_content_type: Option<&'a str>,
}

/// The fixed set of processing strategies, chosen once per artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Markup,
    Script,
    Opaque,
}

impl ContentCategory {
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "html" | "htm" => Self::Markup,
            "js" => Self::Script,
            _ => Self::Opaque,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Markup => "markup",
            Self::Script => "script",
            Self::Opaque => "opaque",
        }
    }

    /// Split `raw` according to this category.
    ///
    /// # Errors
    ///
    /// Markup and script content must be UTF-8; markup must tokenize.
    pub fn split(&self, raw: &[u8], ctx: &SplitContext<'_>) -> Result<SplitResult> {
        match self {
            Self::Markup => {
                let text = std::str::from_utf8(raw).map_err(Error::utf8)?;
                let whole = ctx.divider_tag.trim().eq_ignore_ascii_case(NO_DIVIDER);
                let stub = if whole {
                    ctx.standalone_stub
                } else {
                    ctx.inline_stub
                };
                split_markup(text, ctx.divider_tag, ctx.targets, stub)
            }
            Self::Script => {
                let text = std::str::from_utf8(raw).map_err(Error::utf8)?;
                Ok(script::split_script(text, ctx.targets, ctx.standalone_stub))
            }
            Self::Opaque => Ok(opaque::package(
                raw,
                ctx.standalone_stub,
                ctx.extension,
                ctx.declared_content_type,
            )),
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(extension: &'a str, targets: &'a LinkTargets) -> SplitContext<'a> {
        SplitContext {
            extension,
            divider_tag: "body",
            targets,
            inline_stub: "[inline]",
            standalone_stub: "[standalone]",
            declared_content_type: None,
        }
    }

    #[test]
    fn dispatch_by_extension() {
        assert_eq!(ContentCategory::from_extension("HTML"), ContentCategory::Markup);
        assert_eq!(ContentCategory::from_extension("htm"), ContentCategory::Markup);
        assert_eq!(ContentCategory::from_extension(".js"), ContentCategory::Script);
        assert_eq!(ContentCategory::from_extension("json"), ContentCategory::Opaque);
        assert_eq!(ContentCategory::from_extension(""), ContentCategory::Opaque);
    }

    #[test]
    fn markup_uses_inline_stub() {
        let targets = LinkTargets::none();
        let r = ContentCategory::Markup
            .split(b"<body>x</body>", &ctx("html", &targets))
            .unwrap();
        assert_eq!(r.shell.as_deref(), Some("<body>[inline]</body>"));
    }

    #[test]
    fn whole_markup_uses_standalone_stub() {
        let targets = LinkTargets::none();
        let mut c = ctx("html", &targets);
        c.divider_tag = "none";
        let r = ContentCategory::Markup.split(b"<p>x</p>", &c).unwrap();
        assert_eq!(r.shell.as_deref(), Some("[standalone]"));
        assert_eq!(r.payload, b"<p>x</p>".to_vec());
    }

    #[test]
    fn invalid_utf8_is_rejected_for_text_categories() {
        let targets = LinkTargets::none();
        let err = ContentCategory::Script
            .split(&[b'a', 0xff], &ctx("js", &targets))
            .unwrap_err();
        assert_eq!(err, Error::InvalidUtf8 { valid_up_to: 1 });
        assert!(ContentCategory::Opaque.split(&[0xff], &ctx("bin", &targets)).is_ok());
    }
}
