//! Evaluate syntax trees
//!
//! Every node evaluates to a list of branches: all values the node can take. Plain data has a
//! single branch, `$sweep` has one branch per case and containers combine the branches of
//! their elements.
//!
//! ### Branch order
//!
//! Containers process their elements in order, starting with a single empty partial result.
//! For every element, each of its branches (outer loop) is combined with each existing partial
//! (inner loop). Elements that come first therefore vary fastest:
//!
//! ```yaml
//! a: $sweep(1, 2)
//! b: $sweep(x, y)
//! ```
//!
//! evaluates to `{a: 1, b: x}`, `{a: 2, b: x}`, `{a: 1, b: y}`, `{a: 2, b: y}`.
//!
//! Loops are the exception: the branches of all iterations are combined like nested loops where
//! the first iteration is the outermost one.
use crate::ast::{Call, Dict, For, Import, LoopRef, Node, Var};
use crate::host::{Environment, NoSymbols, SymbolError, SymbolResolver, SystemEnvironment};
use crate::io::{self, LoadError};
use crate::parser::{parse, ParseError};
use crate::unparser::unparse;
use crate::value::{Map, Value};
use chrono::format::{Item, StrftimeItems};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Format of `$date` without arguments
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Behaviour of `$var` when neither context, environment nor default provide a value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingVariable {
    /// Evaluate to null
    #[default]
    Null,
    /// Fail with [ProcessError::MissingVariable]
    Error,
}

#[derive(Clone)]
pub struct ProcessOptions {
    pub context: Value,
    /// Directory relative imports and symbols are resolved against
    pub cwd: PathBuf,
    /// When disabled sweeps are not expanded but kept in their textual form
    pub allow_branching: bool,
    pub missing_variable: MissingVariable,
    /// Upper bound for the number of branches of any node
    pub max_branches: Option<usize>,
    pub environment: Arc<dyn Environment>,
    pub symbols: Arc<dyn SymbolResolver>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            context: Value::object(),
            cwd: std::env::current_dir().unwrap_or_default(),
            allow_branching: true,
            missing_variable: MissingVariable::default(),
            max_branches: None,
            environment: Arc::new(SystemEnvironment),
            symbols: Arc::new(NoSymbols),
        }
    }
}

impl std::fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("context", &self.context)
            .field("cwd", &self.cwd)
            .field("allow_branching", &self.allow_branching)
            .field("missing_variable", &self.missing_variable)
            .field("max_branches", &self.max_branches)
            .finish_non_exhaustive()
    }
}

impl ProcessOptions {
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn allow_branching(mut self, allow_branching: bool) -> Self {
        self.allow_branching = allow_branching;
        self
    }

    pub fn missing_variable(mut self, missing_variable: MissingVariable) -> Self {
        self.missing_variable = missing_variable;
        self
    }

    pub fn max_branches(mut self, max_branches: impl Into<Option<usize>>) -> Self {
        self.max_branches = max_branches.into();
        self
    }

    pub fn environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    pub fn symbols(mut self, symbols: impl SymbolResolver + 'static) -> Self {
        self.symbols = Arc::new(symbols);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("unable to parse imported file {}", path.display())]
    ImportParse {
        path: PathBuf,
        source: ParseError,
    },
    #[error("unable to load file")]
    Load(#[from] LoadError),
    #[error("variable `{name}` is not defined")]
    MissingVariable { name: String },
    #[error("no active loop named `{identifier}`")]
    UnboundLoop { identifier: String },
    #[error("`{path}` is a {kind} and can not be iterated")]
    NotIterable { path: String, kind: String },
    #[error("invalid argument for `{directive}`: {reason}")]
    InvalidArgument { directive: String, reason: String },
    #[error("unable to resolve symbol")]
    Symbol(#[from] SymbolError),
    #[error("call to `{symbol}` failed")]
    Call {
        symbol: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },
    #[error("invalid date format `{format}`")]
    DateFormat { format: String },
    #[error("unable to create temporary directory")]
    TmpDir(#[source] std::io::Error),
    #[error("more than {limit} branches")]
    TooManyBranches { limit: usize },
}

/// All outcomes of `node`
///
/// With branching disabled the result always has exactly one element.
pub fn process(node: &Node, options: &ProcessOptions) -> Result<Vec<Value>, ProcessError> {
    let mut processor = Processor::new(options);
    let branches = processor.visit(node)?;
    tracing::debug!(branches = branches.len(), "processed");
    Ok(branches)
}

/// An active `$for`
#[derive(Debug)]
struct LoopFrame {
    identifier: Option<String>,
    index: usize,
    item: Value,
}

pub struct Processor<'a> {
    options: &'a ProcessOptions,
    cwd: PathBuf,
    loops: Vec<LoopFrame>,
}

impl<'a> Processor<'a> {
    pub fn new(options: &'a ProcessOptions) -> Self {
        Self {
            options,
            cwd: options.cwd.clone(),
            loops: vec![],
        }
    }

    pub fn visit(&mut self, node: &Node) -> Result<Vec<Value>, ProcessError> {
        match node {
            Node::Literal(literal) => Ok(vec![literal.0.clone()]),
            Node::Dict(dict) => Ok(self.dict(dict)?.into_iter().map(Value::Object).collect()),
            Node::List(items) => {
                let mut partials = vec![vec![]];
                for item in items {
                    let branches = self.visit(item)?;
                    partials = self.combine(partials, branches, Vec::push)?;
                }
                Ok(partials.into_iter().map(Value::Array).collect())
            }
            Node::StrBundle(nodes) => {
                let mut partials = vec![String::new()];
                for node in nodes {
                    let branches = self.visit(node)?;
                    partials = self.combine(partials, branches, |partial, branch| {
                        partial.push_str(&branch.to_string());
                    })?;
                }
                Ok(partials.into_iter().map(Value::String).collect())
            }
            Node::Var(var) => self.var(var),
            Node::Import(import) => self.import(import),
            Node::Sweep(sweep) => {
                if !self.options.allow_branching {
                    return Ok(vec![unparse(node)]);
                }

                let mut cases = vec![];
                for case in &sweep.cases {
                    cases.extend(self.visit(case)?);
                    self.check_limit(cases.len())?;
                }
                tracing::trace!(cases = cases.len(), "sweep expanded");
                Ok(cases)
            }
            Node::Instance(call) | Node::Model(call) => self.call(call),
            Node::For(for_loop) => self.for_loop(for_loop),
            Node::Index(loop_ref) => {
                let (frame, _) = self.frame(loop_ref)?;
                Ok(vec![Value::from(frame.index)])
            }
            Node::Item(loop_ref) => {
                let (frame, path) = self.frame(loop_ref)?;
                let item = match path {
                    Some(path) => frame.item.get_path(path).cloned().unwrap_or(Value::Null),
                    None => frame.item.clone(),
                };
                Ok(vec![item])
            }
            Node::Uuid => Ok(vec![Value::String(uuid::Uuid::new_v4().to_string())]),
            Node::Date(date) => {
                let format = match &date.format {
                    Some(format) => self.single_string("date", format)?,
                    None => DEFAULT_DATE_FORMAT.to_string(),
                };
                Ok(vec![Value::String(now(&format)?)])
            }
            Node::Cmd(cmd) => {
                let command = self.single_string("cmd", &cmd.command)?;
                Ok(vec![Value::String(run(&command)?)])
            }
            Node::TmpDir(tmp_dir) => {
                let name = match &tmp_dir.name {
                    Some(name) => Some(self.single_string("tmp_dir", name)?),
                    None => None,
                };
                let path = make_tmp_dir(name.as_deref())?;
                Ok(vec![Value::String(path.display().to_string())])
            }
        }
    }

    fn dict(&mut self, dict: &Dict) -> Result<Vec<Map>, ProcessError> {
        let mut partials = vec![Map::new()];
        for (key, value) in dict {
            let keys = self.visit(key)?;
            let values = self.visit(value)?;
            self.check_limit(keys.len().saturating_mul(values.len()))?;

            let entries: Vec<(Value, Value)> = keys
                .iter()
                .flat_map(|key| values.iter().map(move |value| (key.clone(), value.clone())))
                .collect();

            partials = self.combine(partials, entries, |partial, (key, value)| {
                partial.insert(key, value);
            })?;
        }
        Ok(partials)
    }

    /// Extend every partial with every branch, the branches being the outer loop
    fn combine<T: Clone, B: Clone>(
        &self,
        partials: Vec<T>,
        branches: Vec<B>,
        extend: impl Fn(&mut T, B),
    ) -> Result<Vec<T>, ProcessError> {
        if branches.len() == 1 {
            let branch = &branches[0];
            return Ok(partials
                .into_iter()
                .map(|mut partial| {
                    extend(&mut partial, branch.clone());
                    partial
                })
                .collect());
        }

        self.check_limit(partials.len().saturating_mul(branches.len()))?;

        let mut combined = Vec::with_capacity(partials.len() * branches.len());
        for branch in &branches {
            for partial in &partials {
                let mut partial = partial.clone();
                extend(&mut partial, branch.clone());
                combined.push(partial);
            }
        }
        Ok(combined)
    }

    fn check_limit(&self, branches: usize) -> Result<(), ProcessError> {
        match self.options.max_branches {
            Some(limit) if branches > limit => Err(ProcessError::TooManyBranches { limit }),
            _ => Ok(()),
        }
    }

    /// Context, then environment (if enabled), then default
    fn var(&mut self, var: &Var) -> Result<Vec<Value>, ProcessError> {
        let identifier = literal_string(&var.identifier.0);

        if let Some(value) = self.options.context.get_path(&identifier) {
            return Ok(vec![value.clone()]);
        }

        if var.env.as_ref().is_some_and(|env| env.0.is_truthy()) {
            if let Some(value) = self.options.environment.get_env(&identifier) {
                tracing::trace!(%identifier, "variable read from environment");
                return Ok(vec![Value::String(value)]);
            }
        }

        if let Some(default) = &var.default {
            return self.visit(default);
        }

        match self.options.missing_variable {
            MissingVariable::Null => Ok(vec![Value::Null]),
            MissingVariable::Error => Err(ProcessError::MissingVariable { name: identifier }),
        }
    }

    fn import(&mut self, import: &Import) -> Result<Vec<Value>, ProcessError> {
        let relative = self.single_string("import", &import.path)?;
        let path = self.cwd.join(relative);

        let data = io::load(&path)?;
        let node = parse(&data).map_err(|source| ProcessError::ImportParse {
            path: path.clone(),
            source,
        })?;

        let cwd = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::debug!(path=%path.display(), cwd=%cwd.display(), "processing import");

        let previous = std::mem::replace(&mut self.cwd, cwd);
        let result = self.visit(&node);
        self.cwd = previous;

        result
    }

    fn call(&mut self, call: &Call) -> Result<Vec<Value>, ProcessError> {
        let symbol = literal_string(&call.symbol.0);
        let callable = self.options.symbols.resolve(&symbol, &self.cwd)?;

        let mut results = vec![];
        for args in self.dict(&call.args)? {
            tracing::trace!(%symbol, "calling host symbol");
            let result = callable(args).map_err(|source| ProcessError::Call {
                symbol: symbol.clone(),
                source: source.into(),
            })?;
            results.push(result);
        }
        Ok(results)
    }

    fn for_loop(&mut self, for_loop: &For) -> Result<Vec<Value>, ProcessError> {
        let path = literal_string(&for_loop.iterable.0);
        let collection = self
            .options
            .context
            .get_path(&path)
            .ok_or_else(|| ProcessError::MissingVariable { name: path.clone() })?;

        let items: Vec<Value> = match collection {
            Value::Array(items) => items.clone(),
            Value::Object(map) => map.keys().cloned().collect(),
            Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
            other => {
                return Err(ProcessError::NotIterable {
                    path,
                    kind: other.kind().to_string(),
                })
            }
        };

        let identifier = for_loop.identifier.as_ref().map(|id| literal_string(&id.0));
        let mut iterations = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            tracing::trace!(iterable = %path, index, "loop iteration");
            self.loops.push(LoopFrame {
                identifier: identifier.clone(),
                index,
                item,
            });
            let branches = self.visit(&for_loop.body);
            self.loops.pop();
            iterations.push(branches?);
        }

        // first iteration varies slowest
        let mut combinations: Vec<Vec<Value>> = vec![vec![]];
        for branches in iterations {
            self.check_limit(combinations.len().saturating_mul(branches.len()))?;
            combinations = combinations
                .into_iter()
                .flat_map(|combination| {
                    branches.iter().map(move |branch| {
                        let mut combination = combination.clone();
                        combination.push(branch.clone());
                        combination
                    })
                })
                .collect();
        }

        Ok(combinations
            .into_iter()
            .map(|combination| merge(&for_loop.body, combination))
            .collect())
    }

    /// Loop referenced by `loop_ref`, and the path into its item
    fn frame<'r>(
        &self,
        loop_ref: &'r LoopRef,
    ) -> Result<(&LoopFrame, Option<&'r str>), ProcessError> {
        let Some(identifier) = loop_ref.identifier.as_ref().and_then(|id| id.as_str()) else {
            return self
                .loops
                .last()
                .map(|frame| (frame, None))
                .ok_or_else(|| ProcessError::UnboundLoop {
                    identifier: String::new(),
                });
        };

        let (name, path) = match identifier.split_once('.') {
            Some((name, path)) => (name, Some(path)),
            None => (identifier, None),
        };

        self.loops
            .iter()
            .rev()
            .find(|frame| frame.identifier.as_deref() == Some(name))
            .map(|frame| (frame, path))
            .ok_or_else(|| ProcessError::UnboundLoop {
                identifier: name.to_string(),
            })
    }

    /// Argument that must evaluate to exactly one string
    fn single_string(&mut self, directive: &str, node: &Node) -> Result<String, ProcessError> {
        let branches = self.visit(node)?;
        match branches.as_slice() {
            [Value::String(s)] => Ok(s.clone()),
            [other] => Err(ProcessError::InvalidArgument {
                directive: directive.to_string(),
                reason: format!("expected a string, got a {}", other.kind()),
            }),
            _ => Err(ProcessError::InvalidArgument {
                directive: directive.to_string(),
                reason: format!("expected a single value, got {} branches", branches.len()),
            }),
        }
    }
}

fn literal_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Join the results of all iterations according to the shape of the loop body
fn merge(body: &Node, results: Vec<Value>) -> Value {
    match body {
        Node::Dict(_) => {
            let mut merged = Map::new();
            for result in results {
                if let Value::Object(map) = result {
                    merged.extend(map);
                }
            }
            Value::Object(merged)
        }
        Node::List(_) => {
            let mut merged = vec![];
            for result in results {
                if let Value::Array(items) = result {
                    merged.extend(items);
                }
            }
            Value::Array(merged)
        }
        _ => {
            let mut merged = String::new();
            for result in results {
                merged.push_str(&result.to_string());
            }
            Value::String(merged)
        }
    }
}

fn now(format: &str) -> Result<String, ProcessError> {
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ProcessError::DateFormat {
            format: format.to_string(),
        });
    }

    Ok(chrono::Local::now()
        .format_with_items(items.into_iter())
        .to_string())
}

fn run(command: &str) -> Result<String, ProcessError> {
    let mut shell = if cfg!(windows) {
        let mut shell = std::process::Command::new("cmd");
        shell.arg("/C");
        shell
    } else {
        let mut shell = std::process::Command::new("sh");
        shell.arg("-c");
        shell
    };

    tracing::debug!(command, "running command");
    let output = shell
        .arg(command)
        .output()
        .map_err(|err| ProcessError::Command {
            command: command.to_string(),
            reason: err.to_string(),
        })?;

    if !output.status.success() {
        return Err(ProcessError::Command {
            command: command.to_string(),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Named directory below the system temp dir, or a new unique one
fn make_tmp_dir(name: Option<&str>) -> Result<PathBuf, ProcessError> {
    let path = match name {
        Some(name) => {
            let path = std::env::temp_dir().join(name);
            std::fs::create_dir_all(&path).map_err(ProcessError::TmpDir)?;
            path
        }
        None => tempfile::Builder::new()
            .prefix("dirconf-")
            .tempdir()
            .map_err(ProcessError::TmpDir)?
            .keep(),
    };

    tracing::debug!(path=%path.display(), "temporary directory created");
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::SymbolTable;
    use crate::object;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;

    fn run_with(data: Value, options: &ProcessOptions) -> Vec<Value> {
        process(&parse(&data).unwrap(), options).unwrap()
    }

    fn branches(data: Value) -> Vec<Value> {
        run_with(data, &ProcessOptions::default())
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn plain_data() {
        let data = object! { "a" => 10, "b" => vec![Value::from(1.5), "x".into()] };
        assert_eq!(branches(data.clone()), vec![data]);
    }

    #[test]
    fn sweep_order() {
        let data = object! {
            "a" => r#"$sweep(1096, 20.0, "40", red)"#,
            "b" => object! {
                "a" => "$sweep('hello')",
                "b" => "$sweep('hello', 'world')",
                "c" => "$sweep('hello', 'world')",
                "d" => 10,
            },
        };

        let results = branches(data);
        assert_eq!(results.len(), 16);

        let a = [Value::from(1096), Value::from(20.0), "40".into(), "red".into()];
        for (i, result) in results.iter().enumerate() {
            let greeting = |flip: bool| Value::from(if flip { "world" } else { "hello" });
            let expected = object! {
                "a" => a[i % 4].clone(),
                "b" => object! {
                    "a" => "hello",
                    "b" => greeting((i / 4) % 2 == 1),
                    "c" => greeting((i / 8) % 2 == 1),
                    "d" => 10,
                },
            };
            assert_eq!(result, &expected, "outcome {i}");
        }
    }

    #[test]
    fn sweep_in_lists_and_strings() {
        let data = Value::from(vec!["$sweep(a, b)", "x", "$sweep(1, 2, 3)"]);
        let results = branches(data);
        assert_eq!(results.len(), 6);
        let row = |s: &str, i: i64| Value::from(vec![Value::from(s), "x".into(), i.into()]);
        assert_eq!(results[0], row("a", 1));
        assert_eq!(results[1], row("b", 1));
        assert_eq!(results[2], row("a", 2));
        assert_eq!(results[5], row("b", 3));

        let results = branches("$sweep(a, b)_$sweep(1, 2)".into());
        assert_eq!(
            results,
            vec![
                Value::from("a_1"),
                "b_1".into(),
                "a_2".into(),
                "b_2".into()
            ]
        );
    }

    #[test]
    fn sweep_keys() {
        let data = object! { "$sweep(a, b)" => "$sweep(1, 2)" };
        assert_eq!(
            branches(data),
            vec![
                object! { "a" => 1 },
                object! { "a" => 2 },
                object! { "b" => 1 },
                object! { "b" => 2 },
            ]
        );
    }

    #[test]
    fn nested_sweeps_flatten() {
        let data = object! {
            "$directive" => "sweep",
            "$args" => vec![Value::from("$sweep(a, b)"), Value::from(vec!["$sweep(1, 2)"])],
            "$kwargs" => object! {},
        };
        assert_eq!(
            branches(data),
            vec![
                Value::from("a"),
                "b".into(),
                Value::from(vec![1]),
                Value::from(vec![2])
            ]
        );
    }

    #[test]
    fn branching_disabled() {
        let data = object! { "a" => "$sweep(1,2)", "b" => "x_$sweep(a, 'b c')" };
        let options = ProcessOptions::default().allow_branching(false);
        assert_eq!(
            run_with(data, &options),
            vec![object! { "a" => "$sweep(1, 2)", "b" => r#"x_$sweep(a, "b c")"# }]
        );
    }

    #[test]
    fn max_branches() {
        let data = Value::from(vec!["$sweep(1, 2, 3)", "$sweep(1, 2, 3)"]);
        let options = ProcessOptions::default().max_branches(8);
        let node = parse(&data).unwrap();
        assert!(matches!(
            process(&node, &options),
            Err(ProcessError::TooManyBranches { limit: 8 })
        ));
        assert_eq!(
            process(&node, &options.max_branches(9)).unwrap().len(),
            9
        );
    }

    #[test]
    fn variables() {
        let options = ProcessOptions::default()
            .context(object! { "x" => object! { "y" => 42, "n" => Value::Null } })
            .environment(|name: &str| (name == "HOME").then(|| "/home/me".to_string()));

        let cases = [
            ("$var(x.y)", Value::from(42)),
            ("$var(x.y, default='low')", Value::from(42)),
            ("$var(x.z, default='low')", Value::from("low")),
            ("$var(x.n, default='low')", Value::Null),
            ("$var(HOME, default='low')", Value::from("low")),
            ("$var(HOME, default='low', env=true)", Value::from("/home/me")),
            ("$var(x.y, env=true)", Value::from(42)),
            ("$var(USER, env=true)", Value::Null),
            ("$var(nothing)", Value::Null),
            ("value: $var(x.y)", Value::from("value: 42")),
        ];

        for (data, expected) in cases {
            assert_eq!(run_with(data.into(), &options), vec![expected], "{data}");
        }
    }

    #[test]
    fn default_branches() {
        let data = object! {
            "$directive" => "var",
            "$args" => vec!["missing"],
            "$kwargs" => object! { "default" => "$sweep(a, b)" },
        };
        assert_eq!(branches(data), vec![Value::from("a"), "b".into()]);
    }

    #[test]
    fn missing_variable_error() {
        let options = ProcessOptions::default()
            .missing_variable(MissingVariable::Error)
            .environment(no_env);
        let node = parse_str("$var(a.b, env=true)").unwrap();
        assert!(matches!(
            process(&node, &options),
            Err(ProcessError::MissingVariable { name }) if name == "a.b"
        ));
    }

    fn loop_options() -> ProcessOptions {
        ProcessOptions::default().context(object! {
            "alice" => (0..10).map(Value::from).collect::<Vec<_>>(),
            "bob" => object! { "x" => object! { "v" => 1 }, "y" => object! { "v" => 2 } },
            "word" => "abc",
            "people" => vec![
                object! { "name" => "ann", "pets" => vec!["cat"] },
                object! { "name" => "ben", "pets" => vec!["dog", "fox"] },
            ],
        })
    }

    #[test]
    fn for_dict() {
        let data = object! { "$for(alice, x)" => object! { "node_$index(x)" => "$item(x)" } };
        let expected: Value = (0..10)
            .map(|i| (Value::from(format!("node_{i}")), Value::from(i)))
            .collect();
        assert_eq!(run_with(data, &loop_options()), vec![expected]);
    }

    #[test]
    fn for_list_and_string() {
        let data = object! { "$for(alice)" => vec!["$index", "$item"] };
        let expected: Vec<Value> = (0..10).flat_map(|i| [Value::from(i), Value::from(i)]).collect();
        assert_eq!(run_with(data, &loop_options()), vec![Value::Array(expected)]);

        let data = object! { "$for(word, c)" => "$item(c)$index(c)," };
        assert_eq!(run_with(data, &loop_options()), vec![Value::from("a0,b1,c2,")]);

        let data = object! { "$for(bob, k)" => vec!["$item(k)"] };
        assert_eq!(
            run_with(data, &loop_options()),
            vec![Value::from(vec!["x", "y"])]
        );
    }

    #[test]
    fn nested_loops() {
        let data = object! {
            "$for(people, p)" => object! {
                "$item(p.name)" => object! {
                    "$for(people, q)" => vec!["$index(p)-$index(q)"],
                },
            },
        };
        assert_eq!(
            run_with(data, &loop_options()),
            vec![object! {
                "ann" => vec!["0-0", "0-1"],
                "ben" => vec!["1-0", "1-1"],
            }]
        );
    }

    #[test]
    fn for_with_sweep() {
        let data = object! { "$for(word, c)" => vec!["$item(c)$sweep(1, 2)"] };
        let results = run_with(data, &loop_options());
        assert_eq!(results.len(), 8);
        assert_eq!(results[0], Value::from(vec!["a1", "b1", "c1"]));
        assert_eq!(results[1], Value::from(vec!["a1", "b1", "c2"]));
        assert_eq!(results[2], Value::from(vec!["a1", "b2", "c1"]));
        assert_eq!(results[7], Value::from(vec!["a2", "b2", "c2"]));
    }

    #[test]
    fn loop_errors() {
        let options = loop_options();
        let process_str = |data: &str| process(&parse_str(data).unwrap(), &options);
        assert!(matches!(
            process_str("$index"),
            Err(ProcessError::UnboundLoop { .. })
        ));
        assert!(matches!(
            process(&parse(&object! { "$for(alice, x)" => "$item(y)" }).unwrap(), &options),
            Err(ProcessError::UnboundLoop { identifier }) if identifier == "y"
        ));
        assert!(matches!(
            process(&parse(&object! { "$for(alice.0, x)" => "$item" }).unwrap(), &options),
            Err(ProcessError::NotIterable { .. })
        ));
        assert!(matches!(
            process(&parse(&object! { "$for(nobody)" => "$item" }).unwrap(), &options),
            Err(ProcessError::MissingVariable { .. })
        ));
    }

    #[test]
    fn imports() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("leaf.yml"), "colour: $sweep(red, green)\n").unwrap();
        std::fs::write(
            dir.path().join("part.yml"),
            "inner: $import('nested/leaf.yml')\nsize: $sweep(1, 2, 3)\n",
        )
        .unwrap();

        let data = object! { "part" => "$import(part.yml)", "name" => "$sweep(a, b)" };
        let options = ProcessOptions::default().cwd(dir.path());
        let results = run_with(data, &options);

        assert_eq!(results.len(), 12);
        assert_eq!(
            results[0],
            object! {
                "part" => object! { "inner" => object! { "colour" => "red" }, "size" => 1 },
                "name" => "a",
            }
        );
        assert_eq!(
            results[1],
            object! {
                "part" => object! { "inner" => object! { "colour" => "green" }, "size" => 1 },
                "name" => "a",
            }
        );
    }

    #[test]
    fn text_parentheses_around_directives() {
        let options = ProcessOptions::default().context(object! { "x" => "v" });
        assert_eq!(
            run_with(Value::from("f($var(x)) and $var(x)(y)"), &options),
            vec![Value::from("f(v) and v(y)")]
        );
    }

    #[test]
    fn calls() {
        let symbols = SymbolTable::new()
            .with("sum", |args: Map| {
                let mut total = 0;
                for value in args.values() {
                    match value {
                        Value::Integer(i) => total += i,
                        other => anyhow::bail!("cannot add a {}", other.kind()),
                    }
                }
                Ok(Value::from(total))
            });
        let options = ProcessOptions::default().symbols(symbols);

        let data = object! {
            "$call" => "sum",
            "$args" => object! { "a" => 1, "b" => "$sweep(10, 20)" },
        };
        assert_eq!(
            run_with(data, &options),
            vec![Value::from(11), Value::from(21)]
        );

        let data = object! { "$model" => "sum", "$args" => object! { "a" => "x" } };
        assert!(matches!(
            process(&parse(&data).unwrap(), &options),
            Err(ProcessError::Call { symbol, .. }) if symbol == "sum"
        ));

        let data = object! { "$call" => "missing", "$args" => object! {} };
        assert!(matches!(
            process(&parse(&data).unwrap(), &options),
            Err(ProcessError::Symbol(SymbolError::NotFound { .. }))
        ));
    }

    #[test]
    fn generators() {
        let uuid = &branches("$uuid".into())[0];
        assert!(uuid::Uuid::parse_str(uuid.as_str().unwrap()).is_ok());

        let date = &branches("$date('%Y')".into())[0];
        assert_eq!(date.as_str().unwrap().len(), 4);
        assert!(matches!(
            process(&parse_str("$date('%Q')").unwrap(), &ProcessOptions::default()),
            Err(ProcessError::DateFormat { .. })
        ));

        let dir = &branches("$tmp_dir".into())[0];
        assert!(Path::new(dir.as_str().unwrap()).is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn commands() {
        assert_eq!(branches("$cmd('echo hello')".into()), vec![Value::from("hello")]);
        assert!(matches!(
            process(&parse_str("$cmd('exit 3')").unwrap(), &ProcessOptions::default()),
            Err(ProcessError::Command { .. })
        ));
    }
}
