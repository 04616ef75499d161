//! # dirconf - directive driven configuration
//!
//! Configuration documents (yaml, json) with directives embedded in their strings and keys.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `dirconf` works internally.
//!
//! ### Directives
//!
//! A directive is a `$` followed by a name and an optional argument list. Directives can appear
//! anywhere inside a string, mixed with plain text:
//!
//! ```yaml
//! model:
//!   name: resnet_$var(depth, default=18)
//!   lr: $sweep(0.1, 0.01)
//!   data: $import(data.yml)
//!   run: $uuid
//! $for(stages, s):
//!   stage_$index(s): $item(s.name)
//! ```
//!
//! Arguments are literals (numbers, quoted strings, `true`/`false`/`null`) or dotted
//! identifiers (`a.b.c`). Directives that need more complex arguments are written in the
//! extended form, see [parser].
//!
//! ### Parsing
//!
//! see [parser::parse]
//!
//! Documents are loaded into a [value::Value] (see [io]) and parsed into a tree of
//! [ast::Node]s. Strings are split by the [scanner] into plain text and directive tokens. Some
//! mapping shapes (`$for`, `$call`, `$model` and the extended form) are directives as well.
//!
//! Keys are nodes too. `{"$sweep(a, b)": 1}` is a mapping with a single sweep as its key.
//!
//! ### Processing
//!
//! see [processor::process]
//!
//! Each node evaluates to the list of all values it can take, which is more than one once
//! `$sweep` is involved. The order of these branches is fixed and documented in [processor].
//!
//! Everything the processor needs from the outside (context, working directory, environment
//! variables, host callables) is passed in with [processor::ProcessOptions].
//!
//! ### Other operations on the tree
//!
//! - [unparser::unparse] turns a tree back into data that parses to the same tree
//! - [unparser::decode] does the same but replaces host objects by plain data
//! - [walker::walk] lists every leaf with its path, used for [walker::deep_update]
//! - [inspector::inspect] lists variables, symbols and imports without processing
//!
//! [document::Document] bundles all of these for a single file.
//!
pub mod ast;
pub mod document;
pub mod host;
pub mod inspector;
pub mod io;
pub mod parser;
pub mod processor;
pub mod scanner;
pub mod unparser;
pub mod value;
mod visit;
pub mod walker;

pub use document::{Document, DocumentError};
pub use parser::{parse, ParseError};
pub use processor::{process, MissingVariable, ProcessError, ProcessOptions};
pub use value::Value;
