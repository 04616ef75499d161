//! Scanner for string values
//!
//! A string is split into runs of plain text and directive invocations:
//!
//! ```text
//! "I am a $var(color.hue, default='blue') $sweep(cow, sheep)"
//!  ^^^^^^^ text
//!         ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ directive `var`
//!                                         ^ text
//!                                          ^^^^^^^^^^^^^^^^^ directive `sweep`
//! ```
//!
//! A directive is `$name` or `$name(arguments)`. The argument list may not contain nested
//! parentheses. Each argument is a single literal (number, quoted string, boolean, null) or a
//! dotted identifier (`a.b.c`), optionally passed by keyword (`default=10`). Anything else
//! (lists, calls, operators) is rejected as too complex.
use crate::ast::Node;
use crate::parser::ParseError;
use crate::value::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Prefix used at the start of all directives
pub const DIRECTIVE_PREFIX: char = '$';

/// Token name of plain text runs
pub const TEXT: &str = "str";

/// Keywords that are literals, not identifiers
pub fn reserved(word: &str) -> Option<Value> {
    match word {
        "true" | "True" => Some(Value::Boolean(true)),
        "false" | "False" => Some(Value::Boolean(false)),
        "null" | "None" => Some(Value::Null),
        _ => None,
    }
}

/// Characters that start something the argument grammar does not support
const COMPLEX: &str = "([{+-*/%<>=!&|^~@:";

/// One directive invocation, or a run of text when `name` is [TEXT]
#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct Token {
    pub name: String,
    pub args: Vec<Node>,
    pub kwargs: IndexMap<String, Node>,
}

impl Token {
    fn text(text: String) -> Self {
        Token::new(TEXT.to_string(), vec![Node::literal(text)], IndexMap::new())
    }

    pub fn is_text(&self) -> bool {
        self.name == TEXT
    }
}

fn directive_regex() -> &'static Regex {
    static DIRECTIVE_RE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE_RE.get_or_init(|| {
        Regex::new(r"\$[^)(\s.,$]+\([^()]*\)|\$[^)(\s.,$]+|[^$]+|\$")
            .expect("directive regex must compile")
    })
}

/// Split a string into text and directive tokens
///
/// Adjacent text (including a `$` that does not start a directive) is merged into one token.
/// An empty string yields no tokens.
pub fn scan(data: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = vec![];
    let mut text = String::new();

    for found in directive_regex().find_iter(data) {
        let fragment = found.as_str();
        let is_directive = fragment.len() > 1 && fragment.starts_with(DIRECTIVE_PREFIX);
        if !is_directive {
            text.push_str(fragment);
            continue;
        }

        // `$name(` without a matching `)` was only matched up to the name
        if !fragment.ends_with(')') && data[found.end()..].starts_with('(') {
            return Err(ParseError::Syntax {
                fragment: data[found.start()..].to_string(),
                reason: "unbalanced parentheses".to_string(),
            });
        }

        if !text.is_empty() {
            tokens.push(Token::text(std::mem::take(&mut text)));
        }

        let token = CallParser::new(fragment).parse()?;
        tracing::trace!(name = %token.name, fragment, "directive found");
        tokens.push(token);
    }

    if !text.is_empty() {
        tokens.push(Token::text(text));
    }

    Ok(tokens)
}

/// Parser for a single `$name(arguments)` fragment
struct CallParser<'src> {
    fragment: &'src str,
    offset: usize,
}

impl<'src> CallParser<'src> {
    fn new(fragment: &'src str) -> Self {
        Self {
            fragment,
            offset: DIRECTIVE_PREFIX.len_utf8(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.fragment[self.offset..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.fragment[self.offset..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let chr = self.peek()?;
        self.offset += chr.len_utf8();
        Some(chr)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, reason: &str) -> ParseError {
        ParseError::Syntax {
            fragment: self.fragment.to_string(),
            reason: reason.to_string(),
        }
    }

    fn too_complex(&self) -> ParseError {
        ParseError::ArgumentTooComplex {
            fragment: self.fragment.to_string(),
        }
    }

    fn parse(mut self) -> Result<Token, ParseError> {
        let name = self
            .identifier()
            .ok_or_else(|| self.error("expected a directive name"))?;
        let mut token = Token::new(name, vec![], IndexMap::new());

        match self.bump() {
            None => return Ok(token),
            Some('(') => {}
            Some(_) => return Err(self.error("invalid directive name")),
        }

        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
        } else {
            self.arguments(&mut token)?;
        }

        self.skip_whitespace();
        if self.peek().is_some() {
            return Err(self.error("unexpected text after the argument list"));
        }

        Ok(token)
    }

    /// Everything up to and including the closing `)`
    fn arguments(&mut self, token: &mut Token) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();

            if let Some(key) = self.keyword() {
                let value = self.value()?;
                if token.kwargs.insert(key, value).is_some() {
                    return Err(self.error("keyword argument repeated"));
                }
            } else {
                if !token.kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                let value = self.value()?;
                token.args.push(value);
            }

            self.skip_whitespace();
            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    if self.peek() == Some(')') {
                        self.bump();
                        return Ok(());
                    }
                }
                Some(')') => return Ok(()),
                Some(chr) if COMPLEX.contains(chr) => return Err(self.too_complex()),
                Some(_) => return Err(self.error("expected `,` or `)`")),
                None => return Err(self.error("unbalanced parentheses")),
            }
        }
    }

    /// `name =` prefix of a keyword argument, consumed only if present
    fn keyword(&mut self) -> Option<String> {
        let start = self.offset;
        if let Some(name) = self.identifier() {
            self.skip_whitespace();
            if self.peek() == Some('=') && self.peek_nth(1) != Some('=') {
                self.bump();
                self.skip_whitespace();
                return Some(name);
            }
        }

        self.offset = start;
        None
    }

    fn identifier(&mut self) -> Option<String> {
        let start = self.offset;
        if !self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return None;
        }

        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }

        Some(self.fragment[start..self.offset].to_string())
    }

    fn value(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.string(quote),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.number(),
            Some('.') if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.path(),
            Some('[' | '{' | '(') => Err(self.too_complex()),
            Some(_) => Err(self.error("invalid argument")),
            None => Err(self.error("unbalanced parentheses")),
        }
    }

    /// Dotted identifier, or one of the [reserved] literals
    fn path(&mut self) -> Result<Node, ParseError> {
        let start = self.offset;
        self.identifier();

        while self.peek() == Some('.') {
            self.bump();
            let is_index = self.peek().is_some_and(|c| c.is_ascii_digit());
            if is_index {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else if self.identifier().is_none() {
                return Err(self.error("invalid identifier"));
            }
        }

        let path = &self.fragment[start..self.offset];
        let literal = reserved(path).unwrap_or_else(|| path.into());

        Ok(Node::literal(literal))
    }

    fn number(&mut self) -> Result<Node, ParseError> {
        let start = self.offset;
        let mut float = false;

        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        self.digits();
        if self.peek() == Some('.') {
            float = true;
            self.bump();
            self.digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            float = true;
            self.bump();
            if matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
            self.digits();
        }

        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return Err(self.error("invalid number"));
        }

        let text = &self.fragment[start..self.offset];
        let value = if float {
            text.parse::<f64>().map(Value::Decimal).ok()
        } else {
            text.parse::<i64>().map(Value::Integer).ok()
        };

        value
            .map(Node::literal)
            .ok_or_else(|| self.error("invalid number"))
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn string(&mut self, quote: char) -> Result<Node, ParseError> {
        self.bump();
        let mut string = String::new();

        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('r') => string.push('\r'),
                    Some('0') => string.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => string.push(c),
                    Some(c) => {
                        string.push('\\');
                        string.push(c);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => string.push(c),
            }
        }

        Ok(Node::literal(string))
    }
}
