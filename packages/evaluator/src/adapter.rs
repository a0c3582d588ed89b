//! Compiler Adapter: raw document text in, renderable tree or structured
//! failure out.

use crate::capabilities::CapabilitySet;
use crate::evaluator::{EvalError, Evaluator};
use crate::render::RenderableTree;
use scribe_parser::{extract_metadata, parse, strip, Location, ParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The text does not parse
    Syntax,
    /// The text parses but cannot be evaluated
    Evaluation,
    /// A widget is referenced that the capability set does not provide
    UnknownCapability,
}

/// Why a compile failed and where
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl FailureInfo {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn from_parse(source: &str, err: &ParseError) -> Self {
        Self::new(FailureKind::Syntax, err.to_string()).at(err.location(source))
    }

    pub fn from_eval(source: &str, err: &EvalError) -> Self {
        let kind = match err {
            EvalError::UnknownCapability { .. } => FailureKind::UnknownCapability,
            EvalError::InvalidProps { .. } | EvalError::UnsupportedExpression { .. } => FailureKind::Evaluation,
        };
        Self::new(kind, err.to_string()).at(Location::from_offset(source, err.span().start))
    }

    /// Human-readable report with the offending source line
    #[cfg(feature = "pretty-errors")]
    pub fn report(&self, source: &str, filename: &str) -> String {
        match self.location {
            Some(location) => {
                scribe_parser::format_message(source, filename, location.offset, &self.message, self.label())
            }
            None => format!("{}: {}", filename, self.message),
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            FailureKind::Syntax => "syntax error here",
            FailureKind::Evaluation => "cannot evaluate this",
            FailureKind::UnknownCapability => "not a registered widget",
        }
    }
}

/// Something that compiles document text against a capability set.
/// Implementations must be deterministic and free of ambient state.
pub trait Compile: Send + Sync {
    fn compile(&self, source: &str, capabilities: &CapabilitySet) -> Result<RenderableTree, FailureInfo>;
}

impl<F> Compile for F
where
    F: Fn(&str, &CapabilitySet) -> Result<RenderableTree, FailureInfo> + Send + Sync,
{
    fn compile(&self, source: &str, capabilities: &CapabilitySet) -> Result<RenderableTree, FailureInfo> {
        self(source, capabilities)
    }
}

/// The markup compiler: strip declarations, parse, evaluate
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupCompiler;

impl MarkupCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Compile for MarkupCompiler {
    #[instrument(skip_all, fields(bytes = source.len()))]
    fn compile(&self, source: &str, capabilities: &CapabilitySet) -> Result<RenderableTree, FailureInfo> {
        let metadata = match extract_metadata(source) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable metadata");
                None
            }
        };

        // Stripping keeps byte offsets, so locations below index `source`
        let stripped = strip(source);
        let doc = parse(&stripped).map_err(|err| {
            debug!(error = %err, "Parse failed");
            FailureInfo::from_parse(source, &err)
        })?;

        let mut tree = Evaluator::new(capabilities).evaluate(&doc).map_err(|err| {
            debug!(error = %err, "Evaluation failed");
            FailureInfo::from_eval(source, &err)
        })?;
        tree.metadata = metadata;

        debug!(nodes = tree.nodes.len(), "Compile succeeded");
        Ok(tree)
    }
}
