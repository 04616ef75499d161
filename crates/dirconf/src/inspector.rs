//! Static analysis of syntax trees
//!
//! Reports what a document needs before it can be processed: context variables, environment
//! variables, host symbols and imported files.
use crate::ast::{Node, Var};
use crate::io;
use crate::parser::parse;
use crate::processor::ProcessError;
use crate::value::Value;
use crate::visit::VisitNodes;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    /// Nested object of all referenced context paths, leaves are the literal defaults
    pub variables: Value,
    /// Environment variables that may be read, with their defaults
    pub environ: IndexMap<String, Value>,
    pub symbols: IndexSet<String>,
    /// Absolute paths of imported files
    pub imports: IndexSet<PathBuf>,
    /// Whether the tree contains no directives at all
    pub processed: bool,
}

impl Default for Inspection {
    fn default() -> Self {
        Self {
            variables: Value::object(),
            environ: IndexMap::new(),
            symbols: IndexSet::new(),
            imports: IndexSet::new(),
            processed: false,
        }
    }
}

impl Inspection {
    fn merge(&mut self, other: Inspection) {
        merge_variables(&mut self.variables, other.variables);
        self.environ.extend(other.environ);
        self.symbols.extend(other.symbols);
        self.imports.extend(other.imports);
        self.processed &= other.processed;
    }

    pub fn to_value(&self) -> Value {
        crate::object! {
            "variables" => self.variables.clone(),
            "environ" => self.environ.clone(),
            "symbols" => self.symbols.iter().cloned().collect::<Vec<_>>(),
            "imports" => self
                .imports
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>(),
            "processed" => self.processed,
        }
    }
}

/// Inspect `node` and, recursively, all files it imports
///
/// Relative imports are resolved against `cwd`. Missing files are reported but not followed.
pub fn inspect(node: &Node, cwd: &Path) -> Result<Inspection, ProcessError> {
    let mut visited = IndexSet::new();
    inspect_recursive(node, cwd, &mut visited)
}

fn inspect_recursive(
    node: &Node,
    cwd: &Path,
    visited: &mut IndexSet<PathBuf>,
) -> Result<Inspection, ProcessError> {
    let mut inspection = Inspection {
        processed: true,
        ..Default::default()
    };
    let mut imports = vec![];

    node.visit_nodes(&mut |node: &Node| {
        if node.is_directive() {
            inspection.processed = false;
        }

        match node {
            Node::Var(var) => add_variable(&mut inspection, var),
            Node::For(for_loop) => {
                if let Some(path) = for_loop.iterable.as_str() {
                    add_path(&mut inspection.variables, path, Value::Null);
                }
            }
            Node::Instance(call) | Node::Model(call) => {
                inspection.symbols.insert(call.symbol.0.to_string());
            }
            Node::Import(import) => {
                if let Node::Literal(literal) = import.path.as_ref() {
                    if let Some(path) = literal.as_str() {
                        imports.push(absolute(&cwd.join(path)));
                    }
                }
            }
            _ => {}
        }
    });

    for path in imports {
        inspection.imports.insert(path.clone());
        if !visited.insert(path.clone()) {
            continue;
        }

        if !path.exists() {
            tracing::warn!(path=%path.display(), "imported file not found");
            continue;
        }

        let node = parse(&io::load(&path)?).map_err(|source| ProcessError::ImportParse {
            path: path.clone(),
            source,
        })?;
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let nested = inspect_recursive(&node, &parent, visited)?;
        inspection.merge(nested);
    }

    Ok(inspection)
}

fn add_variable(inspection: &mut Inspection, var: &Var) {
    let Some(identifier) = var.identifier.as_str() else {
        return;
    };

    let default = match var.default.as_deref() {
        Some(Node::Literal(literal)) => literal.0.clone(),
        _ => Value::Null,
    };

    add_path(&mut inspection.variables, identifier, default.clone());
    if var.env.as_ref().is_some_and(|env| env.0.is_truthy()) {
        inspection.environ.insert(identifier.to_string(), default);
    }
}

fn merge_variables(target: &mut Value, other: Value) {
    match (target, other) {
        (Value::Object(target), Value::Object(other)) => {
            for (key, value) in other {
                match target.get_mut(&key) {
                    Some(existing) => merge_variables(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, other) => *target = other,
    }
}

fn add_path(variables: &mut Value, path: &str, default: Value) {
    variables.set_path(&Value::parse_path(path), default, false);
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
