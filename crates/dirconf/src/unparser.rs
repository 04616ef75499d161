//! Turn syntax trees back into values
//!
//! Parsing the output of [unparse] yields the same tree again. Directives are written in their
//! compact form (`$var(a.b, default=10)`) when every argument is a scalar literal, and in the
//! extended form otherwise:
//!
//! ```yaml
//! $directive: var
//! $args: [a.b]
//! $kwargs: { default: [1, 2, 3] }
//! ```
//!
//! [decode] does the same but also turns host objects into plain data so the result can be
//! written with any serializer.
use crate::ast::{Call, Dict, Node};
use crate::scanner::{reserved, DIRECTIVE_PREFIX};
use crate::value::{Decoded, Map, Value};

/// Convert a node back to the value it was parsed from
pub fn unparse(node: &Node) -> Value {
    Unparser::plain().unparse(node)
}

/// Like [unparse], with host objects replaced by their plain representation
pub fn decode(node: &Node) -> Value {
    Unparser::decoding().unparse(node)
}

/// Unparser with a configurable treatment of literal values
pub struct Unparser {
    literal: fn(&Value) -> Value,
}

impl Unparser {
    pub fn plain() -> Self {
        Self {
            literal: Value::clone,
        }
    }

    pub fn decoding() -> Self {
        Self {
            literal: decode_literal,
        }
    }

    pub fn unparse(&self, node: &Node) -> Value {
        match node {
            Node::Dict(dict) => self.dict(dict),
            Node::List(items) => Value::Array(items.iter().map(|x| self.unparse(x)).collect()),
            Node::Literal(literal) => (self.literal)(&literal.0),
            Node::StrBundle(nodes) => {
                let mut string = String::new();
                for node in nodes {
                    match self.unparse(node) {
                        Value::String(part) => string.push_str(&part),
                        other => string.push_str(&other.to_string()),
                    }
                }
                Value::String(string)
            }
            Node::Var(var) => {
                let mut kwargs = vec![];
                if let Some(default) = &var.default {
                    kwargs.push(("default", default.as_ref().clone()));
                }
                if let Some(env) = &var.env {
                    kwargs.push(("env", Node::Literal(env.clone())));
                }
                self.auto("var", &[Node::Literal(var.identifier.clone())], &kwargs)
            }
            Node::Import(import) => self.auto("import", &[import.path.as_ref().clone()], &[]),
            Node::Sweep(sweep) => self.auto("sweep", &sweep.cases, &[]),
            Node::Instance(call) => self.call("call", call),
            Node::Model(call) => self.call("model", call),
            Node::For(for_loop) => {
                let mut args = vec![Node::Literal(for_loop.iterable.clone())];
                args.extend(for_loop.identifier.clone().map(Node::Literal));
                let key = match self.compact("for", &args, &[]) {
                    Some(key) => key,
                    None => format!("{DIRECTIVE_PREFIX}for"),
                };

                Value::Object(Map::from_iter([(
                    Value::String(key),
                    self.unparse(&for_loop.body),
                )]))
            }
            Node::Index(loop_ref) | Node::Item(loop_ref) => {
                let name = if matches!(node, Node::Index(_)) {
                    "index"
                } else {
                    "item"
                };
                let args: Vec<_> = loop_ref.identifier.iter().cloned().map(Node::Literal).collect();
                self.auto(name, &args, &[])
            }
            Node::Uuid => self.auto("uuid", &[], &[]),
            Node::Date(date) => self.auto("date", &optional(&date.format), &[]),
            Node::Cmd(cmd) => self.auto("cmd", &[cmd.command.as_ref().clone()], &[]),
            Node::TmpDir(tmp_dir) => self.auto("tmp_dir", &optional(&tmp_dir.name), &[]),
        }
    }

    fn dict(&self, dict: &Dict) -> Value {
        Value::Object(
            dict.iter()
                .map(|(key, value)| (self.unparse(key), self.unparse(value)))
                .collect(),
        )
    }

    fn call(&self, name: &str, call: &Call) -> Value {
        Value::Object(Map::from_iter([
            (
                Value::String(format!("{DIRECTIVE_PREFIX}{name}")),
                (self.literal)(&call.symbol.0),
            ),
            (
                Value::String(format!("{DIRECTIVE_PREFIX}args")),
                self.dict(&call.args),
            ),
        ]))
    }

    /// Compact form when possible, extended form otherwise
    fn auto(&self, name: &str, args: &[Node], kwargs: &[(&str, Node)]) -> Value {
        if let Some(compact) = self.compact(name, args, kwargs) {
            return Value::String(compact);
        }

        Value::Object(Map::from_iter([
            (Value::from("$directive"), Value::from(name)),
            (
                Value::from("$args"),
                Value::Array(args.iter().map(|x| self.unparse(x)).collect()),
            ),
            (
                Value::from("$kwargs"),
                Value::Object(
                    kwargs
                        .iter()
                        .map(|(key, value)| (Value::from(*key), self.unparse(value)))
                        .collect(),
                ),
            ),
        ]))
    }

    /// `$name` or `$name(args, key=value)`, `None` if any argument can not be written inline
    fn compact(&self, name: &str, args: &[Node], kwargs: &[(&str, Node)]) -> Option<String> {
        let compact = format!("{DIRECTIVE_PREFIX}{name}");
        if args.is_empty() && kwargs.is_empty() {
            return Some(compact);
        }

        let mut parts = vec![];
        for arg in args {
            parts.push(self.argument(arg)?);
        }
        for (key, value) in kwargs {
            parts.push(format!("{key}={}", self.argument(value)?));
        }

        Some(format!("{compact}({})", parts.join(", ")))
    }

    /// Inline form of a single argument
    fn argument(&self, node: &Node) -> Option<String> {
        let Node::Literal(literal) = node else {
            return None;
        };

        match (self.literal)(&literal.0) {
            Value::Null => Some("null".to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) if d.is_finite() => Some(format!("{d:?}")),
            Value::String(s) if s.contains(['(', ')']) => None,
            Value::String(s) if is_identifier_path(&s) => Some(s),
            Value::String(s) => Some(quote(&s)),
            _ => None,
        }
    }
}

fn optional(node: &Option<Box<Node>>) -> Vec<Node> {
    node.iter().map(|node| node.as_ref().clone()).collect()
}

/// `a.b.0.c`, written without quotes
fn is_identifier_path(s: &str) -> bool {
    if reserved(s).is_some() {
        return false;
    }

    let is_identifier = |segment: &str| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && chars.all(|c| c.is_alphanumeric() || c == '_')
    };

    let mut segments = s.split('.');
    segments.next().is_some_and(is_identifier)
        && segments.all(|segment| {
            is_identifier(segment)
                || (!segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
        })
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            '\0' => quoted.push_str("\\0"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn decode_literal(value: &Value) -> Value {
    match value {
        Value::Opaque(object) => match object.decode() {
            Decoded::Plain(plain) => decode_literal(&plain),
            Decoded::Model { symbol, args } => Value::Object(Map::from_iter([
                (Value::from("$model"), Value::String(symbol)),
                (Value::from("$args"), decode_literal(&Value::Object(args))),
            ])),
            Decoded::Opaque => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(decode_literal).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (decode_literal(key), decode_literal(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{Literal, Sweep, Var};
    use crate::object;
    use crate::parser::{parse, parse_str};
    use crate::value::HostObject;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn lit(value: impl Into<Value>) -> Node {
        Node::literal(value)
    }

    #[test]
    fn compact_directives() {
        let var = |default: Option<Node>, env: Option<bool>| {
            Node::Var(Var {
                identifier: Literal::new("variable.one"),
                default: default.map(Box::new),
                env: env.map(Literal::new),
            })
        };

        let cases = [
            (var(None, None), "$var(variable.one)"),
            (var(None, Some(true)), "$var(variable.one, env=true)"),
            (var(Some(lit(-24)), None), "$var(variable.one, default=-24)"),
            (
                var(Some(lit(-24)), Some(true)),
                "$var(variable.one, default=-24, env=true)",
            ),
            (var(Some(lit("two words")), None), r#"$var(variable.one, default="two words")"#),
            (var(Some(lit("True")), None), r#"$var(variable.one, default="True")"#),
            (
                Node::Sweep(Sweep {
                    cases: vec![lit("a"), lit("variable"), lit(10), lit(0.5)],
                }),
                "$sweep(a, variable, 10, 0.5)",
            ),
            (Node::Uuid, "$uuid"),
        ];

        for (node, expected) in cases {
            assert_eq!(unparse(&node), Value::from(expected));
        }
    }

    #[test]
    fn str_bundle() {
        let node = parse_str("alice $var(foo, default=loves) bob").unwrap();
        assert_eq!(unparse(&node), Value::from("alice $var(foo, default=loves) bob"));

        let node = parse_str("$import('path/to/file.yaml')").unwrap();
        assert_eq!(unparse(&node), Value::from(r#"$import("path/to/file.yaml")"#));
    }

    #[test]
    fn extended_form() {
        let node = Node::Sweep(Sweep {
            cases: vec![lit("a"), Node::List(vec![lit(1), lit(2)])],
        });
        let expected = object! {
            "$directive" => "sweep",
            "$args" => vec![Value::from("a"), Value::from(vec![1, 2])],
            "$kwargs" => object! {},
        };
        assert_eq!(unparse(&node), expected);
        assert_eq!(parse(&expected).unwrap(), node);
    }

    #[test]
    fn special_forms() {
        let data = object! {
            "$call" => "path/to_my/file.py:MyClass",
            "$args" => object! {
                "arg1" => object! {
                    "$model" => "module.submodule.function",
                    "$args" => object! { "a" => vec![1, 2], "b" => 100 },
                },
            },
            };
        assert_eq!(unparse(&parse(&data).unwrap()), data);

        let data = object! {
            "$for(my.var, x)" => object! {
                "Hello" => "World",
                "Number_$index(x)" => "$item(x.value)",
                "$index" => "$item",
            },
        };
        assert_eq!(unparse(&parse(&data).unwrap()), data);
    }

    #[test]
    fn round_trip() {
        let data = object! {
            "a" => "$sweep(1096, 20.0, \"40\", red)",
            "b" => object! {
                "$var(x, default=\"with space\")" => "$cmd(\"echo 'hi'\")",
                "c" => vec!["$date(\"%Y\")", "$tmp_dir", "$uuid"],
                "d" => "$var(name, default=\"a\\\"quote\")",
            },
            "e" => 10,
        };

        let node = parse(&data).unwrap();
        let unparsed = unparse(&node);
        assert_eq!(parse(&unparsed).unwrap(), node);
        assert_eq!(unparsed, data);
    }

    #[derive(Debug)]
    struct Vector(Vec<i64>);

    impl HostObject for Vector {
        fn type_name(&self) -> &str {
            "Vector"
        }

        fn decode(&self) -> Decoded {
            Decoded::Plain(self.0.clone().into())
        }
    }

    #[derive(Debug)]
    struct Settings;

    impl HostObject for Settings {
        fn type_name(&self) -> &str {
            "Settings"
        }

        fn decode(&self) -> Decoded {
            Decoded::Model {
                symbol: "settings.Settings".into(),
                args: Map::from_iter([(Value::from("size"), Value::from(3))]),
            }
        }
    }

    #[test]
    fn decode_host_objects() {
        let node = Node::List(vec![
            lit(Value::Opaque(Arc::new(Vector(vec![1, 2])))),
            lit(Value::Opaque(Arc::new(Settings))),
        ]);

        assert_eq!(
            decode(&node),
            Value::from(vec![
                Value::from(vec![1, 2]),
                object! { "$model" => "settings.Settings", "$args" => object! { "size" => 3 } },
            ])
        );
        assert!(matches!(unparse(&node), Value::Array(items) if matches!(items[0], Value::Opaque(_))));
    }
}
