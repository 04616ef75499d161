//! Turn values into syntax trees
//!
//! Strings are scanned for directives (see [crate::scanner]). Mappings are checked against the
//! special directive shapes before they are parsed as plain dictionaries:
//!
//! ```yaml
//! # loop
//! $for(items, x):
//!   name_$index(x): $item(x.name)
//! # host call
//! $call: path/to/file.py:Builder
//! $args: { size: 10 }
//! # host model, same shape as a call
//! $model: path/to/file.py:Settings
//! $args: { size: 10 }
//! # extended directive, for arguments the compact syntax can not hold
//! $directive: sweep
//! $args: [ [1, 2], { a: b } ]
//! $kwargs: {}
//! ```
use crate::ast::{Call, Cmd, Date, Dict, For, Import, Literal, LoopRef, Node, Sweep, TmpDir, Var};
use crate::scanner::{scan, Token};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::collections::VecDeque;

/// Directive names valid inside strings and in the extended form
pub const CALL_FORMS: [&str; 10] = [
    "str", "var", "import", "sweep", "index", "item", "uuid", "date", "cmd", "tmp_dir",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid directive syntax in `{fragment}`: {reason}")]
    Syntax { fragment: String, reason: String },
    #[error("unknown directive `{name}`")]
    UnknownDirective { name: String },
    #[error("argument too complex in `{fragment}`, only literals and identifiers are supported")]
    ArgumentTooComplex { fragment: String },
    #[error("wrong number of arguments for `{directive}`: {reason}")]
    Arity { directive: String, reason: String },
    #[error("unexpected argument `{name}` for `{directive}`")]
    UnexpectedArgument { directive: String, name: String },
    #[error("argument `{argument}` of `{directive}` must be {expected}")]
    ArgumentType {
        directive: String,
        argument: String,
        expected: String,
    },
}

/// Parse any value into a syntax tree
pub fn parse(data: &Value) -> Result<Node, ParseError> {
    match data {
        Value::Object(map) => parse_object(map),
        Value::Array(items) => items
            .iter()
            .map(parse)
            .collect::<Result<_, _>>()
            .map(Node::List),
        Value::String(string) => parse_str(string),
        other => Ok(Node::literal(other.clone())),
    }
}

/// Parse a string, which may contain any number of directives
pub fn parse_str(data: &str) -> Result<Node, ParseError> {
    let nodes = scan(data)?
        .into_iter()
        .map(build_directive)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Node::str_bundle(nodes))
}

fn parse_object(map: &Map) -> Result<Node, ParseError> {
    if let Some(mut keys) = directive_keys(map) {
        let mut names: Vec<String> = keys.keys().cloned().collect();
        names.sort_unstable();

        match names.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["for"] => {
                if let Some((token, body)) = keys.swap_remove("for") {
                    return parse_for(token, body);
                }
            }
            ["args", "call"] => {
                tracing::trace!(symbol = ?keys["call"].1, "call shape recognised");
                return parse_call("call", &keys).map(Node::Instance);
            }
            ["args", "model"] => {
                tracing::trace!(symbol = ?keys["model"].1, "model shape recognised");
                return parse_call("model", &keys).map(Node::Model);
            }
            ["args", "directive", "kwargs"] => {
                if let Some(node) = parse_extended(&keys)? {
                    return Ok(node);
                }
            }
            _ => {}
        }
    }

    parse_dict(map).map(Node::Dict)
}

/// Entries of a plain mapping, without shape detection
fn parse_dict(map: &Map) -> Result<Dict, ParseError> {
    map.iter()
        .map(|(key, value)| {
            let key = match key {
                Value::String(key) => parse_str(key)?,
                other => Node::literal(other.clone()),
            };
            Ok((key, parse(value)?))
        })
        .collect()
}

/// Keys of `map` by directive name, when every key is a single directive
fn directive_keys(map: &Map) -> Option<IndexMap<String, (Token, &Value)>> {
    let mut keys = IndexMap::new();

    for (key, value) in map {
        let mut tokens = scan(key.as_str()?).ok()?;
        if tokens.len() != 1 || tokens[0].is_text() {
            return None;
        }
        let token = tokens.remove(0);
        if keys.insert(token.name.clone(), (token, value)).is_some() {
            return None;
        }
    }

    (!keys.is_empty()).then_some(keys)
}

fn parse_for(token: Token, body: &Value) -> Result<Node, ParseError> {
    let mut arguments = Arguments::new(token);
    let iterable = arguments.required("iterable")?;
    let identifier = arguments.optional("identifier");
    let directive = arguments.finish()?;

    let node = For {
        iterable: string_literal(&directive, "iterable", iterable)?,
        body: Box::new(parse(body)?),
        identifier: identifier
            .map(|identifier| string_literal(&directive, "identifier", identifier))
            .transpose()?,
    };

    tracing::trace!(iterable = ?node.iterable.0, "loop recognised");
    Ok(Node::For(node))
}

fn parse_call(name: &str, keys: &IndexMap<String, (Token, &Value)>) -> Result<Call, ParseError> {
    let symbol = keys[name].1;
    let args = keys["args"].1;

    let Value::String(_) = symbol else {
        return Err(ParseError::ArgumentType {
            directive: name.to_string(),
            argument: name.to_string(),
            expected: "a string".to_string(),
        });
    };
    let Value::Object(args) = args else {
        return Err(ParseError::ArgumentType {
            directive: name.to_string(),
            argument: "args".to_string(),
            expected: "a mapping".to_string(),
        });
    };

    Ok(Call {
        symbol: Literal(symbol.clone()),
        args: parse_dict(args)?,
    })
}

/// `None` when the mapping only looks like an extended directive
fn parse_extended(keys: &IndexMap<String, (Token, &Value)>) -> Result<Option<Node>, ParseError> {
    let name = match keys["directive"].1.as_str() {
        Some(name) if CALL_FORMS.contains(&name) => name,
        _ => return Ok(None),
    };
    let Value::Array(args) = keys["args"].1 else {
        return Ok(None);
    };
    let Value::Object(kwargs) = keys["kwargs"].1 else {
        return Ok(None);
    };
    if !kwargs.keys().all(|key| key.as_str().is_some()) {
        return Ok(None);
    }

    tracing::trace!(directive = name, "extended directive recognised");

    let token = Token::new(
        name.to_string(),
        args.iter().map(parse).collect::<Result<_, _>>()?,
        kwargs
            .iter()
            .filter_map(|(key, value)| Some((key.as_str()?.to_string(), value)))
            .map(|(key, value)| Ok((key, parse(value)?)))
            .collect::<Result<_, ParseError>>()?,
    );

    build_directive(token).map(Some)
}

/// Build the node of a call form directive
fn build_directive(token: Token) -> Result<Node, ParseError> {
    let mut arguments = Arguments::new(token);

    let node = match arguments.directive.as_str() {
        "str" => arguments.required("text")?,
        "var" => {
            let identifier = arguments.required("identifier")?;
            let default = arguments.optional("default");
            let env = arguments.optional("env");
            let directive = &arguments.directive;
            Node::Var(Var {
                identifier: string_literal(directive, "identifier", identifier)?,
                default: default.map(Box::new),
                env: env.map(|env| literal(directive, "env", env)).transpose()?,
            })
        }
        "import" => Node::Import(Import {
            path: Box::new(arguments.required("path")?),
        }),
        "sweep" => {
            let cases: Vec<_> = arguments.args.drain(..).collect();
            if cases.is_empty() {
                return Err(arguments.arity("at least one case is required"));
            }
            Node::Sweep(Sweep { cases })
        }
        "index" | "item" => {
            let identifier = arguments
                .optional("identifier")
                .map(|identifier| string_literal(&arguments.directive, "identifier", identifier))
                .transpose()?;
            let loop_ref = LoopRef { identifier };
            if arguments.directive == "index" {
                Node::Index(loop_ref)
            } else {
                Node::Item(loop_ref)
            }
        }
        "uuid" => Node::Uuid,
        "date" => Node::Date(Date {
            format: arguments.optional("format").map(Box::new),
        }),
        "cmd" => Node::Cmd(Cmd {
            command: Box::new(arguments.required("command")?),
        }),
        "tmp_dir" => Node::TmpDir(TmpDir {
            name: arguments.optional("name").map(Box::new),
        }),
        _ => {
            return Err(ParseError::UnknownDirective {
                name: arguments.directive.clone(),
            })
        }
    };

    arguments.finish()?;
    Ok(node)
}

/// Binds the arguments of a token to parameter names
struct Arguments {
    directive: String,
    args: VecDeque<Node>,
    kwargs: IndexMap<String, Node>,
}

impl Arguments {
    fn new(token: Token) -> Self {
        Self {
            directive: token.name,
            args: token.args.into(),
            kwargs: token.kwargs,
        }
    }

    fn arity(&self, reason: impl Into<String>) -> ParseError {
        ParseError::Arity {
            directive: self.directive.clone(),
            reason: reason.into(),
        }
    }

    /// Next positional argument, or the keyword argument `name`
    fn optional(&mut self, name: &str) -> Option<Node> {
        self.args
            .pop_front()
            .or_else(|| self.kwargs.shift_remove(name))
    }

    fn required(&mut self, name: &str) -> Result<Node, ParseError> {
        self.optional(name)
            .ok_or_else(|| self.arity(format!("missing argument `{name}`")))
    }

    /// Fails on arguments that were not bound, returns the directive name
    fn finish(self) -> Result<String, ParseError> {
        if !self.args.is_empty() {
            return Err(self.arity(format!("{} extra positional argument(s)", self.args.len())));
        }

        if let Some(name) = self.kwargs.keys().next() {
            return Err(ParseError::UnexpectedArgument {
                directive: self.directive,
                name: name.clone(),
            });
        }

        Ok(self.directive)
    }
}

fn literal(directive: &str, argument: &str, node: Node) -> Result<Literal, ParseError> {
    match node {
        Node::Literal(literal) => Ok(literal),
        _ => Err(ParseError::ArgumentType {
            directive: directive.to_string(),
            argument: argument.to_string(),
            expected: "a literal".to_string(),
        }),
    }
}

fn string_literal(directive: &str, argument: &str, node: Node) -> Result<Literal, ParseError> {
    match node {
        Node::Literal(literal @ Literal(Value::String(_))) => Ok(literal),
        _ => Err(ParseError::ArgumentType {
            directive: directive.to_string(),
            argument: argument.to_string(),
            expected: "a string".to_string(),
        }),
    }
}
