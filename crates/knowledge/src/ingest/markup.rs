//! Minimal tag tokenizer shared by the HTML and Office loaders.
//!
//! Only what text extraction needs: element boundaries, attributes by name,
//! and entity decoding. Not a validating XML parser.

/// One token of markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Start {
        name: &'a str,
        attrs: &'a str,
        self_closing: bool,
    },
    End {
        name: &'a str,
    },
    Text(&'a str),
}

/// Iterator over the tokens of a markup string. Comments, processing
/// instructions and doctypes are skipped.
pub(crate) struct Tokens<'a> {
    rest: &'a str,
}

pub(crate) fn tokens(markup: &str) -> Tokens<'_> {
    Tokens { rest: markup }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            if !self.rest.starts_with('<') {
                let end = self.rest.find('<').unwrap_or(self.rest.len());
                let (text, rest) = self.rest.split_at(end);
                self.rest = rest;
                return Some(Token::Text(text));
            }

            if let Some(body) = self.rest.strip_prefix("<!--") {
                self.rest = match body.find("-->") {
                    Some(end) => &body[end + 3..],
                    None => "",
                };
                continue;
            }

            if let Some(body) = self.rest.strip_prefix("<![CDATA[") {
                let end = body.find("]]>").unwrap_or(body.len());
                let text = &body[..end];
                self.rest = body.get(end + 3..).unwrap_or("");
                return Some(Token::Text(text));
            }

            let Some(close) = self.rest.find('>') else {
                // Unterminated tag: treat the remainder as text
                let text = self.rest;
                self.rest = "";
                return Some(Token::Text(text));
            };

            let inner = &self.rest[1..close];
            self.rest = &self.rest[close + 1..];

            if inner.starts_with('?') || inner.starts_with('!') {
                continue;
            }

            if let Some(name) = inner.strip_prefix('/') {
                return Some(Token::End { name: name.trim() });
            }

            let self_closing = inner.ends_with('/');
            let inner = inner.trim_end_matches('/');
            let name_end = inner
                .find(|c: char| c.is_whitespace())
                .unwrap_or(inner.len());
            return Some(Token::Start {
                name: &inner[..name_end],
                attrs: inner[name_end..].trim(),
                self_closing,
            });
        }
    }
}

/// Value of attribute `key` in a start tag's attribute text.
pub(crate) fn attr<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
    let mut search = attrs;
    while let Some(at) = search.find(key) {
        let before_ok = at == 0
            || search[..at]
                .chars()
                .next_back()
                .map(char::is_whitespace)
                .unwrap_or(true);
        let after = search[at + key.len()..].trim_start();

        if before_ok {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let value = &value[1..];
                    let end = value.find(quote)?;
                    return Some(&value[..end]);
                }
            }
        }
        search = &search[at + key.len()..];
    }
    None
}

/// Decode the predefined XML entities plus numeric and common HTML ones.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

const HTML_BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "section", "article", "header", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "title",
];

/// Extract readable text from HTML. Script and style bodies are dropped,
/// block elements become line breaks, whitespace inside a line is collapsed.
pub(crate) fn clean_html(html: &str) -> String {
    let mut raw = String::with_capacity(html.len());
    let mut skip_depth = 0usize;

    for token in tokens(html) {
        match token {
            Token::Start {
                name, self_closing, ..
            } => {
                let name = name.to_ascii_lowercase();
                if (name == "script" || name == "style") && !self_closing {
                    skip_depth += 1;
                } else if skip_depth == 0 && HTML_BLOCK_TAGS.contains(&name.as_str()) {
                    raw.push('\n');
                }
            }
            Token::End { name } => {
                let name = name.to_ascii_lowercase();
                if name == "script" || name == "style" {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if skip_depth == 0 && HTML_BLOCK_TAGS.contains(&name.as_str()) {
                    raw.push('\n');
                }
            }
            Token::Text(text) if skip_depth == 0 => raw.push_str(&decode_entities(text)),
            Token::Text(_) => {}
        }
    }

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
