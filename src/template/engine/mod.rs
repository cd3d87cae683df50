//! Rendering engine.
//!
//! A pure function from (template source, variables) to text. The grammar is
//! fixed: `{{ name }}` placeholders, `{# comments #}` and `-` whitespace
//! markers. Lookups are strict (an undefined name fails the render) and
//! substituted values are HTML-escaped unless inserted with
//! [`Variables::insert_raw`].
//!
//! ```ignore
//! let renderer = Renderer::new();
//! let vars = Variables::new().with("name", "John Doe");
//! assert_eq!(renderer.render("Hello {{ name }}", &vars)?, "Hello John Doe");
//! ```

mod parser;
mod variables;

use serde_json::Value;
use thiserror::Error;

use parser::Node;
use variables::{escape_into, stringify};

pub use variables::{Variable, Variables};

/// The only error the engine reports
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Malformed template source
    #[error("Template syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A referenced variable is missing from the supplied mapping
    #[error("Undefined variable: '{name}' is not defined")]
    UndefinedVariable { name: String },
}

impl RenderError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        RenderError::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Fixed engine configuration, chosen once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Fail on names missing from the variables instead of rendering nothing
    pub strict_undefined: bool,
    /// Escape substituted values for HTML contexts
    pub autoescape: bool,
    /// Remove comment-only lines entirely
    pub trim_whitespace: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            strict_undefined: true,
            autoescape: true,
            trim_whitespace: true,
        }
    }
}

/// Stateless renderer, safe to share across any number of tasks
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    config: RendererConfig,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::with_config(RendererConfig::default())
    }
}

impl Renderer {
    /// Strict renderer with autoescape and whitespace trimming enabled
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Compile source without rendering it
    pub fn compile(&self, source: &str) -> Result<CompiledTemplate, RenderError> {
        let nodes = parser::parse(source, self.config.trim_whitespace)?;
        Ok(CompiledTemplate {
            nodes,
            strict_undefined: self.config.strict_undefined,
            autoescape: self.config.autoescape,
        })
    }

    /// Compile and render in one step
    pub fn render(&self, source: &str, variables: &Variables) -> Result<String, RenderError> {
        self.compile(source)?.render(variables)
    }
}

/// Executable form of a template source
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
    strict_undefined: bool,
    autoescape: bool,
}

impl CompiledTemplate {
    /// Evaluate against `variables`. Fails on the first undefined name;
    /// no partial output is ever returned.
    pub fn render(&self, variables: &Variables) -> Result<String, RenderError> {
        let mut out = String::with_capacity(self.size_hint());

        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable { path, .. } => match lookup(variables, path) {
                    Err(_) if !self.strict_undefined => {}
                    Err(e) => return Err(e),
                    Ok(Resolved::Raw(raw)) => out.push_str(raw),
                    Ok(Resolved::Value(value)) => {
                        let text = stringify(value);
                        if self.autoescape {
                            escape_into(&mut out, &text);
                        } else {
                            out.push_str(&text);
                        }
                    }
                },
            }
        }

        Ok(out)
    }

    /// Distinct variable names referenced by the template, in first-use order
    pub fn referenced_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for node in &self.nodes {
            if let Node::Variable { path, .. } = node {
                let name = path.join(".");
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn size_hint(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Text(text) => text.len(),
                Node::Variable { .. } => 16,
            })
            .sum()
    }
}

enum Resolved<'a> {
    Value(&'a Value),
    Raw(&'a str),
}

fn lookup<'a>(variables: &'a Variables, path: &[String]) -> Result<Resolved<'a>, RenderError> {
    let undefined = || RenderError::UndefinedVariable {
        name: path.join("."),
    };

    let (head, tail) = path.split_first().ok_or_else(undefined)?;

    match variables.get(head).ok_or_else(undefined)? {
        Variable::Raw(raw) if tail.is_empty() => Ok(Resolved::Raw(raw)),
        Variable::Raw(_) => Err(undefined()),
        Variable::Value(value) => {
            let mut current = value;
            for segment in tail {
                current = current
                    .as_object()
                    .and_then(|object| object.get(segment))
                    .ok_or_else(undefined)?;
            }
            Ok(Resolved::Value(current))
        }
    }
}
