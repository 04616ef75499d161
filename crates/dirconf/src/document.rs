//! Convenience wrapper around a single document
use crate::ast::Node;
use crate::inspector::{inspect, Inspection};
use crate::io::{self, LoadError};
use crate::parser::{parse, ParseError};
use crate::processor::{process, ProcessError, ProcessOptions};
use crate::unparser::decode;
use crate::value::{PathSegment, Value};
use crate::walker;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("unable to load document")]
    Load(#[from] LoadError),
    #[error("unable to parse document")]
    Parse(#[from] ParseError),
    #[error("unable to process document")]
    Process(#[from] ProcessError),
}

/// Document data and the directory relative paths inside it refer to
#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct Document {
    pub data: Value,
    pub cwd: Option<PathBuf>,
}

impl Document {
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let path = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        let data = io::load(&path)?;
        Ok(Self::new(data, path.parent().map(Path::to_path_buf)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), DocumentError> {
        Ok(io::dump(&self.to_value()?, path)?)
    }

    pub fn parse(&self) -> Result<Node, DocumentError> {
        Ok(parse(&self.data)?)
    }

    /// Data with host objects replaced by plain values
    pub fn to_value(&self) -> Result<Value, DocumentError> {
        Ok(decode(&self.parse()?))
    }

    pub fn walk(&self) -> Result<Vec<(Vec<PathSegment>, Value)>, DocumentError> {
        Ok(walker::walk(&self.parse()?))
    }

    pub fn deep_get(&self, path: &str) -> Option<&Value> {
        self.data.get_path(path)
    }

    pub fn deep_set(&mut self, path: &str, value: impl Into<Value>, only_existing: bool) -> bool {
        self.data
            .set_path(&Value::parse_path(path), value.into(), only_existing)
    }

    pub fn deep_update(&mut self, other: &Document, full_merge: bool) -> Result<(), DocumentError> {
        Ok(walker::deep_update(&mut self.data, &other.data, full_merge)?)
    }

    /// Process without expanding sweeps
    pub fn process(&self, context: Value) -> Result<Document, DocumentError> {
        let options = self.options(context).allow_branching(false);
        let mut outcomes = process(&self.parse()?, &options)?;
        let data = outcomes.pop().unwrap_or(Value::Null);
        Ok(Document::new(data, self.cwd.clone()))
    }

    /// All outcomes
    pub fn process_all(&self, context: Value) -> Result<Vec<Document>, DocumentError> {
        self.process_with(&self.options(context))
    }

    /// All outcomes, with full control over processing
    ///
    /// `options.cwd` is replaced by the document directory if the document has one.
    pub fn process_with(&self, options: &ProcessOptions) -> Result<Vec<Document>, DocumentError> {
        let mut options = options.clone();
        if let Some(cwd) = &self.cwd {
            options.cwd = cwd.clone();
        }

        let outcomes = process(&self.parse()?, &options)?;
        Ok(outcomes
            .into_iter()
            .map(|data| Document::new(data, self.cwd.clone()))
            .collect())
    }

    pub fn inspect(&self) -> Result<Inspection, DocumentError> {
        let cwd = self.cwd.clone().unwrap_or_default();
        Ok(inspect(&self.parse()?, &cwd)?)
    }

    fn options(&self, context: Value) -> ProcessOptions {
        let options = ProcessOptions::default().context(context);
        match &self.cwd {
            Some(cwd) => options.cwd(cwd),
            None => options,
        }
    }
}

impl From<Value> for Document {
    fn from(data: Value) -> Self {
        Document::new(data, None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object;
    use pretty_assertions::assert_eq;

    #[test]
    fn deep_get_and_set() {
        let mut document = Document::from(object! { "a" => object! { "b" => vec![1, 2] } });
        assert_eq!(document.deep_get("a.b.1"), Some(&Value::from(2)));

        assert!(!document.deep_set("a.c", 3, true));
        assert!(document.deep_set("a.c", 3, false));
        assert_eq!(document.deep_get("a.c"), Some(&Value::from(3)));
    }

    #[test]
    fn process_keeps_sweeps() {
        let document = Document::from(object! {
            "name" => "$var(name)",
            "size" => "$sweep(1, 2)",
        });
        let context = object! { "name" => "x" };

        let processed = document.process(context.clone()).unwrap();
        assert_eq!(
            processed.data,
            object! { "name" => "x", "size" => "$sweep(1, 2)" }
        );

        let all = document.process_all(context).unwrap();
        let sizes: Vec<_> = all.iter().filter_map(|d| d.deep_get("size")).cloned().collect();
        assert_eq!(sizes, vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shared.yml"), "value: 7\n").unwrap();
        std::fs::write(dir.path().join("main.yml"), "shared: $import(shared.yml)\n").unwrap();

        let document = Document::from_file(&dir.path().join("main.yml")).unwrap();
        assert_eq!(document.cwd, Some(dir.path().canonicalize().unwrap()));

        let processed = document.process(Value::object()).unwrap();
        assert_eq!(processed.deep_get("shared.value"), Some(&Value::from(7)));

        let inspection = document.inspect().unwrap();
        assert_eq!(inspection.imports.len(), 1);

        let out = dir.path().join("out.json");
        processed.save_to(&out).unwrap();
        assert_eq!(Document::from_file(&out).unwrap().data, processed.data);
    }

    #[test]
    fn deep_update() {
        let mut document = Document::from(object! { "a" => 1, "b" => 2 });
        let other = Document::from(object! { "b" => 3, "c" => 4 });

        document.deep_update(&other, false).unwrap();
        assert_eq!(document.data, object! { "a" => 1, "b" => 3 });

        document.deep_update(&other, true).unwrap();
        assert_eq!(document.data, object! { "a" => 1, "b" => 3, "c" => 4 });
    }
}
