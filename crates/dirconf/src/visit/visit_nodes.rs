use super::Visit;
use crate::ast::{Dict, Node};

/// Recursively visit all [Node]s, parents before their children
pub trait VisitNodes {
    fn visit_nodes(&self, visitor: &mut dyn Visit<Node>);
}

impl VisitNodes for Node {
    fn visit_nodes(&self, visitor: &mut dyn Visit<Node>) {
        visitor.visit(self);

        match self {
            Node::Dict(dict) => dict.visit_nodes(visitor),
            Node::List(nodes) | Node::StrBundle(nodes) => {
                for node in nodes {
                    node.visit_nodes(visitor);
                }
            }
            Node::Sweep(sweep) => {
                for case in &sweep.cases {
                    case.visit_nodes(visitor);
                }
            }
            Node::Instance(call) | Node::Model(call) => call.args.visit_nodes(visitor),
            Node::For(for_loop) => for_loop.body.visit_nodes(visitor),
            Node::Var(var) => {
                if let Some(default) = &var.default {
                    default.visit_nodes(visitor);
                }
            }
            Node::Import(import) => import.path.visit_nodes(visitor),
            Node::Cmd(cmd) => cmd.command.visit_nodes(visitor),
            Node::Date(date) => {
                if let Some(format) = &date.format {
                    format.visit_nodes(visitor);
                }
            }
            Node::TmpDir(tmp_dir) => {
                if let Some(name) = &tmp_dir.name {
                    name.visit_nodes(visitor);
                }
            }
            Node::Literal(_) | Node::Index(_) | Node::Item(_) | Node::Uuid => {}
        }
    }
}

impl VisitNodes for Dict {
    fn visit_nodes(&self, visitor: &mut dyn Visit<Node>) {
        for (key, value) in self {
            key.visit_nodes(visitor);
            value.visit_nodes(visitor);
        }
    }
}
