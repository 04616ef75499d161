//! Flatten trees into (path, leaf) pairs
use crate::ast::Node;
use crate::parser::{parse, ParseError};
use crate::unparser::unparse;
use crate::value::{PathSegment, Value};

/// Path and unparsed value of every leaf
///
/// Leaves are everything except non-empty dictionaries and lists, so directives are leaves
/// too. Dictionary keys are unparsed as well. A leaf root has the empty path.
pub fn walk(node: &Node) -> Vec<(Vec<PathSegment>, Value)> {
    let mut entries = vec![];
    walk_into(node, &mut vec![], &mut entries);
    entries
}

fn walk_into(
    node: &Node,
    path: &mut Vec<PathSegment>,
    entries: &mut Vec<(Vec<PathSegment>, Value)>,
) {
    match node {
        Node::Dict(dict) if !dict.is_empty() => {
            for (key, value) in dict {
                path.push(PathSegment::Key(unparse(key)));
                walk_into(value, path, entries);
                path.pop();
            }
        }
        Node::List(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk_into(item, path, entries);
                path.pop();
            }
        }
        leaf => entries.push((path.clone(), unparse(leaf))),
    }
}

/// Apply all leaves of `other` onto `target`
///
/// Unless `full_merge` is set only paths that already exist in `target` are updated.
pub fn deep_update(target: &mut Value, other: &Value, full_merge: bool) -> Result<(), ParseError> {
    let node = parse(other)?;
    for (path, value) in walk(&node) {
        let updated = target.set_path(&path, value, !full_merge);
        tracing::trace!(?path, updated, "deep update");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object;
    use pretty_assertions::assert_eq;

    fn key(key: &str) -> PathSegment {
        PathSegment::Key(key.into())
    }

    #[test]
    fn leaves() {
        let data = object! {
            "a" => 10,
            "b" => object! {
                "c" => vec![Value::from(1), object! { "d" => "$var(x)" }],
                "$sweep(e, f)" => vec![Value::Null; 0],
            },
            "g" => object! { "$call" => "f", "$args" => object! { "x" => 1 } },
        };

        let walked = walk(&parse(&data).unwrap());
        assert_eq!(
            walked,
            vec![
                (vec![key("a")], Value::from(10)),
                (vec![key("b"), key("c"), PathSegment::Index(0)], Value::from(1)),
                (
                    vec![key("b"), key("c"), PathSegment::Index(1), key("d")],
                    Value::from("$var(x)")
                ),
                (vec![key("b"), key("$sweep(e, f)")], Value::Array(vec![])),
                (
                    vec![key("g")],
                    object! { "$call" => "f", "$args" => object! { "x" => 1 } }
                ),
            ]
        );

        assert_eq!(walk(&Node::literal(1)), vec![(vec![], Value::from(1))]);
    }

    #[test]
    fn update_existing_only() {
        let mut target = object! { "a" => object! { "b" => 1, "c" => 2 }, "d" => vec![1, 2] };
        let other = object! { "a" => object! { "b" => 10, "x" => 5 }, "d" => vec![3] };

        deep_update(&mut target, &other, false).unwrap();
        assert_eq!(
            target,
            object! { "a" => object! { "b" => 10, "c" => 2 }, "d" => vec![3, 2] }
        );
    }

    #[test]
    fn full_merge() {
        let mut target = object! { "a" => object! { "b" => 1 } };
        let other = object! {
            "a" => object! { "x" => "$var(y)" },
            "z" => vec![Value::from(1), object! { "w" => 2 }],
        };

        deep_update(&mut target, &other, true).unwrap();
        assert_eq!(
            target,
            object! {
                "a" => object! { "b" => 1, "x" => "$var(y)" },
                "z" => vec![Value::from(1), object! { "w" => 2 }],
            }
        );
    }
}
