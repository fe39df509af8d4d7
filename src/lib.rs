mod ast;
mod attributed;
mod context;
mod engine;
mod error;
mod parser;
mod render;
mod template;

// Public exports.
pub use ast::Node;
pub use attributed::AttributedText;
pub use context::{Context, Value};
pub use engine::{RichstacheEngine, RichstacheInterface};
pub use error::{RenderError, RichstacheError, RichstacheResult, SyntaxError, SyntaxErrorKind};
pub use render::{NoPartials, PartialMode, PartialResolver, RenderOptions, escape_html, render};
pub use template::{NameUsage, Template};
