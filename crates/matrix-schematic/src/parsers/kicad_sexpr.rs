use crate::types::round_f64;

/// S-expression tree for KiCad schematic files.
///
/// Grammar:
///   sexpr  = '(' atom_or_sexpr* ')'
///   atom   = string | symbol
///   string = '"' ([^"\\] | '\\' .)* '"'
///   symbol = [^ \t\n\r()"]+
///
/// Quoted strings and bare symbols are kept apart so a parsed tree can be
/// written back out unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    List(Vec<SExpr>),
    /// Bare token: keywords, numbers, `yes`/`no`.
    Atom(String),
    /// Quoted string.
    Str(String),
}

impl SExpr {
    // ─── Construction ────────────────────────────────────────────────

    pub fn atom(s: impl Into<String>) -> Self {
        SExpr::Atom(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        SExpr::Str(s.into())
    }

    /// A number atom at schematic precision (4 decimals, no trailing zeros).
    pub fn num(v: f64) -> Self {
        SExpr::Atom(format_num(v))
    }

    /// `(tag child...)`
    pub fn node(tag: &str, children: Vec<SExpr>) -> Self {
        let mut items = Vec::with_capacity(children.len() + 1);
        items.push(SExpr::atom(tag));
        items.extend(children);
        SExpr::List(items)
    }

    /// `(tag yes)` / `(tag no)`
    pub fn flag(tag: &str, value: bool) -> Self {
        SExpr::node(tag, vec![SExpr::atom(if value { "yes" } else { "no" })])
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Get the first atom in a list (the "tag" or "name").
    pub fn tag(&self) -> Option<&str> {
        match self {
            SExpr::List(items) => items.first().and_then(|item| match item {
                SExpr::Atom(s) => Some(s.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Get list children (everything after the tag).
    pub fn children(&self) -> &[SExpr] {
        match self {
            SExpr::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// Find a child list with the given tag.
    pub fn find(&self, tag: &str) -> Option<&SExpr> {
        self.children().iter().find(|c| c.tag() == Some(tag))
    }

    /// Find all child lists with the given tag.
    pub fn find_all(&self, tag: &str) -> Vec<&SExpr> {
        self.children()
            .iter()
            .filter(|c| c.tag() == Some(tag))
            .collect()
    }

    /// Find every list with the given tag at any depth, in document order.
    pub fn find_recursive(&self, tag: &str) -> Vec<&SExpr> {
        let mut found = Vec::new();
        self.collect_tagged(tag, &mut found);
        found
    }

    fn collect_tagged<'a>(&'a self, tag: &str, found: &mut Vec<&'a SExpr>) {
        for child in self.children() {
            if child.tag() == Some(tag) {
                found.push(child);
            }
            child.collect_tagged(tag, found);
        }
    }

    /// Get the value of a simple (tag value) node.
    pub fn value(&self, tag: &str) -> Option<&str> {
        self.find(tag)
            .and_then(|node| node.children().first().and_then(|v| v.as_atom()))
    }

    /// Get the atom value (bare or quoted).
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) | SExpr::Str(s) => Some(s.as_str()),
            SExpr::List(_) => None,
        }
    }

    /// Get the nth atom child (0-indexed from children, i.e., after the tag).
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.children().get(index).and_then(|v| v.as_atom())
    }

    /// Get the nth child as f64.
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.atom_at(index).and_then(|v| v.parse().ok())
    }

    // ─── Output ──────────────────────────────────────────────────────

    /// Render in KiCad's layout: lists holding only atoms stay on one
    /// line, anything nested gets one child per line, tab indented.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        match self {
            SExpr::Atom(s) => out.push_str(s),
            SExpr::Str(s) => write_quoted(out, s),
            SExpr::List(items) => {
                let nested = items.iter().any(|i| matches!(i, SExpr::List(_)));
                out.push('(');
                if !nested {
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push(' ');
                        }
                        item.write_pretty(out, depth);
                    }
                    out.push(')');
                    return;
                }

                // Leading atoms share the opening line: (symbol "Device:D"
                let head = items
                    .iter()
                    .take_while(|i| !matches!(i, SExpr::List(_)))
                    .count();
                for (i, item) in items[..head].iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.write_pretty(out, depth);
                }
                for item in &items[head..] {
                    out.push('\n');
                    push_indent(out, depth + 1);
                    item.write_pretty(out, depth + 1);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push(')');
            }
        }
    }
}

/// Format a coordinate the way KiCad writes them: rounded to 4 decimals,
/// no trailing zeros, no negative zero.
pub fn format_num(v: f64) -> String {
    let r = round_f64(v, 4);
    if r == 0.0 {
        "0".to_string()
    } else {
        r.to_string()
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse_string(&mut self) -> String {
        // Skip opening quote
        self.pos += 1;
        let mut bytes = Vec::new();
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'"' => {
                    self.pos += 1;
                    break;
                }
                b'\\' => {
                    self.pos += 1;
                    if let Some(&c) = self.input.get(self.pos) {
                        bytes.push(if c == b'n' { b'\n' } else { c });
                        self.pos += 1;
                    }
                }
                c => {
                    bytes.push(c);
                    self.pos += 1;
                }
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn parse_symbol(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'"' => break,
                _ => self.pos += 1,
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn parse_sexpr(&mut self) -> Option<SExpr> {
        self.skip_whitespace();
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            break;
                        }
                        None => break,
                        _ => {
                            if let Some(expr) = self.parse_sexpr() {
                                items.push(expr);
                            }
                        }
                    }
                }
                Some(SExpr::List(items))
            }
            b'"' => Some(SExpr::Str(self.parse_string())),
            b')' => None,
            _ => Some(SExpr::Atom(self.parse_symbol())),
        }
    }
}

/// Parse an S-expression from bytes.
pub fn parse(input: &[u8]) -> Result<SExpr, String> {
    let mut parser = Parser::new(input);
    parser
        .parse_sexpr()
        .ok_or_else(|| "empty input".to_string())
}
