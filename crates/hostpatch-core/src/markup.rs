//! Span-preserving XML element scanner.
//!
//! Builds a flat element tree (document order, parent links) whose text runs
//! remember their byte span in the source. Rendering splices replacement text
//! into those spans and copies everything else verbatim, so a document with no
//! edits renders byte-identical to its input.
//!
//! Only well-formedness is checked; there is no DTD or namespace processing
//! beyond splitting `prefix:local` names.

use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at byte {offset}")]
pub struct MarkupError {
    pub offset: usize,
    pub message: String,
}

fn err<T>(offset: usize, message: impl Into<String>) -> Result<T, MarkupError> {
    Err(MarkupError {
        offset,
        message: message.into(),
    })
}

/// Character data directly after an element's start tag, up to the first
/// child element, comment or processing instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Byte span of the raw run in the source.
    pub span: Range<usize>,
    /// Decoded value (entities resolved, CDATA unwrapped).
    pub value: String,
    /// Whether the run is a single CDATA section.
    pub cdata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `cfg:ServerAddress`.
    pub name: String,
    pub parent: Option<usize>,
    pub text: Option<TextRun>,
}

impl Element {
    /// Name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }
}

#[derive(Debug)]
pub struct Document<'a> {
    source: &'a str,
    elements: Vec<Element>,
}

impl<'a> Document<'a> {
    pub fn parse(source: &'a str) -> Result<Self, MarkupError> {
        let elements = Parser::new(source).run()?;
        Ok(Self { source, elements })
    }

    /// Elements in document order; index 0 is the root.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Render the document with the text of some elements replaced.
    ///
    /// `replacements` maps element index to new text; elements without a text
    /// run are ignored.
    pub fn render(&self, replacements: &BTreeMap<usize, String>) -> String {
        let mut edits: Vec<(&TextRun, &str)> = replacements
            .iter()
            .filter_map(|(&idx, value)| {
                let run = self.elements.get(idx)?.text.as_ref()?;
                Some((run, value.as_str()))
            })
            .collect();
        edits.sort_by_key(|(run, _)| run.span.start);

        let mut out = String::with_capacity(self.source.len() + 64);
        let mut copied = 0;
        for (run, value) in edits {
            out.push_str(&self.source[copied..run.span.start]);
            if run.cdata && !value.contains("]]>") {
                out.push_str("<![CDATA[");
                out.push_str(value);
                out.push_str("]]>");
            } else {
                escape_text_into(value, &mut out);
            }
            copied = run.span.end;
        }
        out.push_str(&self.source[copied..]);
        out
    }
}

fn escape_text_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Text run being collected for the innermost open element.
struct PendingRun {
    element: usize,
    start: usize,
    value: String,
    segments: usize,
    cdata_segments: usize,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    elements: Vec<Element>,
    open: Vec<usize>,
    root_closed: bool,
    run: Option<PendingRun>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            elements: Vec::new(),
            open: Vec::new(),
            root_closed: false,
            run: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn run(mut self) -> Result<Vec<Element>, MarkupError> {
        if self.src.starts_with('\u{feff}') {
            self.pos = '\u{feff}'.len_utf8();
        }
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.finish_run();
                self.skip_past(2, "?>", "unterminated processing instruction")?;
            } else if rest.starts_with("<!--") {
                self.finish_run();
                self.skip_past(4, "-->", "unterminated comment")?;
            } else if rest.starts_with("<![CDATA[") {
                self.cdata()?;
            } else if rest.starts_with("<!") {
                self.finish_run();
                self.declaration()?;
            } else if rest.starts_with("</") {
                self.finish_run();
                self.end_tag()?;
            } else if rest.starts_with('<') {
                self.finish_run();
                self.start_tag()?;
            } else {
                self.text()?;
            }
        }

        if let Some(&idx) = self.open.last() {
            return err(
                self.src.len(),
                format!("unclosed element <{}>", self.elements[idx].name),
            );
        }
        if self.elements.is_empty() {
            return err(self.src.len(), "no root element");
        }
        Ok(self.elements)
    }

    /// Advance past `terminator`, searching from `skip` bytes into the rest.
    fn skip_past(&mut self, skip: usize, terminator: &str, message: &str) -> Result<&'a str, MarkupError> {
        let start = self.pos;
        let body_start = start + skip;
        match self.src[body_start..].find(terminator) {
            Some(i) => {
                self.pos = body_start + i + terminator.len();
                Ok(&self.src[body_start..body_start + i])
            }
            None => err(start, message),
        }
    }

    fn finish_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        if self.pos > run.start {
            self.elements[run.element].text = Some(TextRun {
                span: run.start..self.pos,
                value: run.value,
                cdata: run.segments == 1 && run.cdata_segments == 1,
            });
        }
    }

    fn cdata(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        if self.open.is_empty() {
            return err(start, "CDATA section outside the root element");
        }
        let body = self.skip_past(9, "]]>", "unterminated CDATA section")?;
        if let Some(run) = self.run.as_mut() {
            run.value.push_str(body);
            run.segments += 1;
            run.cdata_segments += 1;
        }
        Ok(())
    }

    /// `<!DOCTYPE ...>` and friends, possibly with an internal subset.
    fn declaration(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        if !self.elements.is_empty() {
            return err(start, "declaration after the root element started");
        }
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        for (i, c) in self.src[start + 2..].char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '[') => depth += 1,
                (None, ']') => depth = depth.saturating_sub(1),
                (None, '>') if depth == 0 => {
                    self.pos = start + 2 + i + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        err(start, "unterminated declaration")
    }

    fn end_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.name()?;
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return err(self.pos, format!("expected '>' to close </{name}>"));
        }
        self.pos += 1;

        let Some(idx) = self.open.pop() else {
            return err(start, format!("unexpected end tag </{name}>"));
        };
        if self.elements[idx].name != name {
            return err(
                start,
                format!("mismatched end tag: expected </{}>, found </{name}>", self.elements[idx].name),
            );
        }
        if self.open.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        if self.root_closed {
            return err(start, "more than one root element");
        }
        self.pos += 1;
        let name = self.name()?;

        let empty = loop {
            let had_space = self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.is_empty() {
                return err(start, format!("unterminated start tag <{name}>"));
            }
            if !had_space {
                return err(self.pos, format!("expected whitespace before attribute in <{name}>"));
            }
            self.attribute()?;
        };

        let idx = self.elements.len();
        self.elements.push(Element {
            name,
            parent: self.open.last().copied(),
            text: None,
        });
        if empty {
            if self.open.is_empty() {
                self.root_closed = true;
            }
        } else {
            self.open.push(idx);
            self.run = Some(PendingRun {
                element: idx,
                start: self.pos,
                value: String::new(),
                segments: 0,
                cdata_segments: 0,
            });
        }
        Ok(())
    }

    fn attribute(&mut self) -> Result<(), MarkupError> {
        let name = self.name()?;
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            return err(self.pos, format!("expected '=' after attribute {name}"));
        }
        self.pos += 1;
        self.skip_whitespace();
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return err(self.pos, format!("expected quoted value for attribute {name}")),
        };
        let value_start = self.pos + 1;
        let Some(len) = self.src[value_start..].find(quote) else {
            return err(self.pos, format!("unterminated value for attribute {name}"));
        };
        let value = &self.src[value_start..value_start + len];
        if let Some(i) = value.find('<') {
            return err(value_start + i, format!("'<' in value of attribute {name}"));
        }
        decode_entities(value, value_start)?;
        self.pos = value_start + len + 1;
        Ok(())
    }

    fn text(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let end = self.rest().find('<').map_or(self.src.len(), |i| start + i);
        let raw = &self.src[start..end];
        self.pos = end;

        if self.open.is_empty() {
            if !raw.trim().is_empty() {
                return err(start, "text outside the root element");
            }
            return Ok(());
        }
        let value = decode_entities(raw, start)?;
        if let Some(run) = self.run.as_mut() {
            run.value.push_str(&value);
            run.segments += 1;
        }
        Ok(())
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !is_name_char(c))
            .map_or(self.rest().len(), |(i, _)| i);
        let name = &self.src[start..start + len];
        match name.chars().next() {
            Some(c) if is_name_start(c) => {
                self.pos += len;
                Ok(name.to_string())
            }
            _ => err(start, "expected a name"),
        }
    }

    /// Returns whether any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches([' ', '\t', '\r', '\n']);
        self.pos += rest.len() - trimmed.len();
        rest.len() != trimmed.len()
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

/// Resolve predefined entities and character references.
fn decode_entities(raw: &str, offset: usize) -> Result<String, MarkupError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let at = offset + (raw.len() - rest.len()) + amp;
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            return err(at, "unterminated entity reference");
        };
        let entity = &after[..semi];
        let c = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    return err(at, format!("undefined entity &{entity};"));
                };
                match code.and_then(char::from_u32) {
                    Some(c) => c,
                    None => return err(at, format!("invalid character reference &{entity};")),
                }
            }
        };
        out.push(c);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
