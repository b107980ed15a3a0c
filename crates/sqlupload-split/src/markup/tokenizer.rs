//! Streaming tokenizer for generator markup.
//!
//! Produces start tags, end tags, text, comments, declarations and
//! character/entity references in document order. Every token keeps a slice
//! of the input it was read from, so re-emitting the raw slices reproduces the
//! document byte for byte. References are the exception: they re-serialize in
//! canonical `&name;` / `&#N;` form.
//!
//! Only well-formed generator output is supported. Unclosed tags, comments,
//! declarations and quoted attribute values are errors.

use crate::{Error, Result};
use std::borrow::Cow;
use std::ops::Range;

/// Elements whose body is raw text rather than markup.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// One attribute inside a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name.
    pub name: String,
    /// Byte range of the value within [`Tag::raw`], quotes excluded.
    pub value: Option<Range<usize>>,
}

/// A start tag or self-closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Lowercased tag name.
    pub name: String,
    /// The tag exactly as it appeared in the input.
    pub raw: &'a str,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

impl<'a> Tag<'a> {
    /// Value of the first attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.clone())
            .map(|range| &self.raw[range])
    }

    /// The raw tag with the value of attribute `name` replaced.
    ///
    /// Quoting and all other bytes of the tag are preserved.
    pub fn with_attribute(&self, name: &str, value: &str) -> Cow<'a, str> {
        let Some(range) = self
            .attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.clone())
        else {
            return Cow::Borrowed(self.raw);
        };
        let mut out = String::with_capacity(self.raw.len() + value.len());
        out.push_str(&self.raw[..range.start]);
        out.push_str(value);
        out.push_str(&self.raw[range.end..]);
        Cow::Owned(out)
    }
}

/// A markup token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    StartTag(Tag<'a>),
    EndTag { name: String, raw: &'a str },
    Text(&'a str),
    Comment(&'a str),
    /// `<!DOCTYPE ...>`, `<![CDATA[...]]>` and `<?...?>` constructs.
    Declaration(&'a str),
    CharRef { raw: &'a str, code: u32 },
    EntityRef { raw: &'a str, name: &'a str },
}

impl<'a> Token<'a> {
    /// The input slice this token was read from.
    pub fn raw(&self) -> &'a str {
        match self {
            Token::StartTag(tag) => tag.raw,
            Token::EndTag { raw, .. }
            | Token::Text(raw)
            | Token::Comment(raw)
            | Token::Declaration(raw)
            | Token::CharRef { raw, .. }
            | Token::EntityRef { raw, .. } => *raw,
        }
    }

    /// The token as it is written back out.
    pub fn to_markup(&self) -> Cow<'a, str> {
        match self {
            Token::CharRef { code, .. } => Cow::Owned(format!("&#{code};")),
            Token::EntityRef { name, .. } => Cow::Owned(format!("&{name};")),
            other => Cow::Borrowed(other.raw()),
        }
    }
}

/// Iterator over the tokens of a markup document.
///
/// Yields at most one error, after which iteration ends.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text: Option<String>,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text: None,
            failed: false,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        if let Some(element) = self.raw_text.take()
            && let Some(text) = self.raw_text_body(&element)?
        {
            return Ok(text);
        }

        match self.bytes()[self.pos] {
            b'<' => {
                if let Some(token) = self.markup_construct()? {
                    return Ok(token);
                }
            }
            b'&' => {
                if let Some(token) = self.reference() {
                    return Ok(token);
                }
            }
            _ => {}
        }
        Ok(self.text())
    }

    /// Body of a `<script>`/`<style>` element up to its end tag.
    fn raw_text_body(&mut self, element: &str) -> Result<Option<Token<'a>>> {
        let start = self.pos;
        let closing = format!("</{element}");
        let Some(offset) = find_ignore_ascii_case(&self.bytes()[start..], closing.as_bytes()) else {
            return Err(Error::UnterminatedRawText {
                tag: element.to_string(),
                offset: start,
            });
        };
        if offset == 0 {
            return Ok(None);
        }
        self.pos = start + offset;
        Ok(Some(Token::Text(&self.input[start..self.pos])))
    }

    fn text(&mut self) -> Token<'a> {
        let bytes = self.bytes();
        let start = self.pos;
        let mut end = start + 1;
        while end < bytes.len() && !matches!(bytes[end], b'<' | b'&') {
            end += 1;
        }
        self.pos = end;
        Token::Text(&self.input[start..end])
    }

    fn markup_construct(&mut self) -> Result<Option<Token<'a>>> {
        let start = self.pos;
        let rest = &self.input[start..];
        let bytes = self.bytes();

        if rest.starts_with("<!--") {
            let end = rest[4..]
                .find("-->")
                .map(|idx| start + 4 + idx + 3)
                .ok_or(Error::UnterminatedComment { offset: start })?;
            self.pos = end;
            return Ok(Some(Token::Comment(&self.input[start..end])));
        }

        if rest.starts_with("<![CDATA[") {
            let end = rest
                .find("]]>")
                .map(|idx| start + idx + 3)
                .ok_or(Error::UnterminatedDeclaration { offset: start })?;
            self.pos = end;
            return Ok(Some(Token::Declaration(&self.input[start..end])));
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest
                .find('>')
                .map(|idx| start + idx + 1)
                .ok_or(Error::UnterminatedDeclaration { offset: start })?;
            self.pos = end;
            return Ok(Some(Token::Declaration(&self.input[start..end])));
        }

        if rest.starts_with("</") && bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) {
            let name_end = scan_name(bytes, start + 2);
            let name = self.input[start + 2..name_end].to_ascii_lowercase();
            let end = self.input[name_end..]
                .find('>')
                .map(|idx| name_end + idx + 1)
                .ok_or(Error::UnterminatedTag { offset: start })?;
            self.pos = end;
            return Ok(Some(Token::EndTag {
                name,
                raw: &self.input[start..end],
            }));
        }

        if bytes.get(start + 1).is_some_and(u8::is_ascii_alphabetic) {
            return self.start_tag().map(Some);
        }

        Ok(None)
    }

    fn start_tag(&mut self) -> Result<Token<'a>> {
        let bytes = self.bytes();
        let len = bytes.len();
        let start = self.pos;
        let unterminated = Error::UnterminatedTag { offset: start };

        let mut i = scan_name(bytes, start + 1);
        let name = self.input[start + 1..i].to_ascii_lowercase();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            i = skip_whitespace(bytes, i);
            if i >= len {
                return Err(unterminated);
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' if bytes.get(i + 1) == Some(&b'>') => {
                    self_closing = true;
                    i += 2;
                    break;
                }
                b'/' | b'=' => {
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            while i < len
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>')
                && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
            {
                i += 1;
            }
            let attr_name = self.input[name_start..i].to_ascii_lowercase();

            let after_name = skip_whitespace(bytes, i);
            let mut value = None;
            if after_name < len && bytes[after_name] == b'=' {
                let mut j = skip_whitespace(bytes, after_name + 1);
                if j >= len {
                    return Err(unterminated);
                }
                match bytes[j] {
                    quote @ (b'"' | b'\'') => {
                        let value_start = j + 1;
                        let close = bytes[value_start..]
                            .iter()
                            .position(|&b| b == quote)
                            .map(|idx| value_start + idx)
                            .ok_or(Error::UnterminatedAttribute { offset: start })?;
                        value = Some(value_start - start..close - start);
                        i = close + 1;
                    }
                    _ => {
                        let value_start = j;
                        while j < len && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                            j += 1;
                        }
                        value = Some(value_start - start..j - start);
                        i = j;
                    }
                }
            }
            attributes.push(Attribute {
                name: attr_name,
                value,
            });
        }

        self.pos = i;
        if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text = Some(name.clone());
        }
        Ok(Token::StartTag(Tag {
            name,
            raw: &self.input[start..i],
            attributes,
            self_closing,
        }))
    }

    /// `&name;`, `&#N;` or `&#xH;`, with the trailing `;` optional.
    fn reference(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let rest = &self.input[start + 1..];

        if let Some(numeric) = rest.strip_prefix('#') {
            let (digits_start, radix) = if numeric.starts_with(['x', 'X']) {
                (2, 16)
            } else {
                (1, 10)
            };
            let digits_len = rest[digits_start..]
                .bytes()
                .take_while(|b| if radix == 16 { b.is_ascii_hexdigit() } else { b.is_ascii_digit() })
                .count();
            if digits_len == 0 {
                return None;
            }
            let digits = &rest[digits_start..digits_start + digits_len];
            let code = u32::from_str_radix(digits, radix).ok()?;
            let end = self.reference_end(start + 1 + digits_start + digits_len);
            return Some(Token::CharRef {
                raw: &self.input[start..end],
                code,
            });
        }

        if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let name_len = rest.bytes().take_while(u8::is_ascii_alphanumeric).count();
        let name = &rest[..name_len];
        let end = self.reference_end(start + 1 + name_len);
        Some(Token::EntityRef {
            raw: &self.input[start..end],
            name,
        })
    }

    fn reference_end(&mut self, mut end: usize) -> usize {
        if self.bytes().get(end) == Some(&b';') {
            end += 1;
        }
        self.pos = end;
        end
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.input.len() {
            return None;
        }
        let result = self.next_token();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

fn scan_name(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_' | b':' | b'.')) {
        i += 1;
    }
    i
}

/// Offset of the first ASCII case-insensitive occurrence of `needle`.
fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
