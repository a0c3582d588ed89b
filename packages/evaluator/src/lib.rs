pub mod adapter;
pub mod boundary;
pub mod builtins;
pub mod capabilities;
pub mod evaluator;
pub mod html;
pub mod render;

pub use adapter::{Compile, FailureInfo, FailureKind, MarkupCompiler};
pub use boundary::render_tree;
pub use capabilities::{CapabilityRegistry, CapabilitySet, RegistryError, Widget, WidgetError};
pub use evaluator::{EvalError, EvalResult, Evaluator};
pub use html::{to_html, to_html_page};
pub use render::{Props, RenderFailure, RenderNode, RenderableTree, RenderedDocument};
