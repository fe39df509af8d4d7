use std::borrow::Cow;

use crate::ast::Node;
use crate::attributed::AttributedText;
use crate::context::{Context, Value};
use crate::error::RenderError;

/// Resolves `{{>name}}` references to externally supplied sub-trees.
///
/// Returning `Ok(None)` means the name is unknown; whether that is an
/// error depends on the [`PartialMode`] of the render call. A resolver may
/// also fail outright with [`RenderError::Resolve`].
pub trait PartialResolver<A> {
    fn resolve(&self, name: &str) -> Result<Option<&Node<A>>, RenderError>;
}

/// Resolver for templates that use no partials.
pub struct NoPartials;

impl<A> PartialResolver<A> for NoPartials {
    fn resolve(&self, _name: &str) -> Result<Option<&Node<A>>, RenderError> {
        Ok(None)
    }
}

/// Policy for a `{{>name}}` that does not resolve.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PartialMode {
    /// Substitute nothing and continue.
    #[default]
    Lenient,
    /// Abort the render with [`RenderError::MissingPartial`].
    Strict,
}

/// Knobs for a render call.
#[derive(Clone)]
pub struct RenderOptions {
    pub partial_mode: PartialMode,
    /// Applied to every [`Node::Tag`] substitution before insertion.
    /// Defaults to [`escape_html`].
    pub escape: for<'s> fn(&'s str) -> Cow<'s, str>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            partial_mode: PartialMode::default(),
            escape: escape_html,
        }
    }
}

impl RenderOptions {
    /// Fail the whole render when a partial does not resolve.
    #[must_use]
    pub fn strict_partials(mut self) -> Self {
        self.partial_mode = PartialMode::Strict;
        self
    }

    /// Replaces the escaping function, e.g. for a non-HTML target format.
    #[must_use]
    pub fn with_escape(mut self, escape: for<'s> fn(&'s str) -> Cow<'s, str>) -> Self {
        self.escape = escape;
        self
    }
}

/// HTML-entity escaping for tag substitution. Borrows when the input
/// contains nothing to escape.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut escaped = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// How deep `{{>name}}` expansion may nest before the render fails. A
/// depth cap rather than a visited set, so partials that recurse over
/// data-bounded structures still work.
const MAX_PARTIAL_DEPTH: usize = 64;

/// Renders a tree against `value` as the root context frame.
///
/// The output is built in a private buffer and returned only on success,
/// so a failing render leaves no partial output visible to the caller.
///
/// # Errors
///
/// - [`RenderError::MissingPartial`] if a partial does not resolve under
///   [`PartialMode::Strict`].
/// - [`RenderError::Resolve`] if the resolver itself fails.
/// - [`RenderError::PartialDepthExceeded`] if partial expansion nests past
///   its depth limit, as it does for a cycle of `{{>name}}` references.
pub fn render<A, P>(
    tree: &Node<A>,
    value: &Value,
    partials: Option<&P>,
    options: &RenderOptions,
) -> Result<AttributedText<A>, RenderError>
where
    A: Clone + Default,
    P: PartialResolver<A>,
{
    let context = Context::root(value);
    let mut output = AttributedText::new();
    render_node(tree, &context, &mut output, partials, options, 0)?;
    Ok(output)
}

fn render_node<A, P>(
    node: &Node<A>,
    context: &Context<'_>,
    output: &mut AttributedText<A>,
    partials: Option<&P>,
    options: &RenderOptions,
    depth: usize,
) -> Result<(), RenderError>
where
    A: Clone + Default,
    P: PartialResolver<A>,
{
    match node {
        Node::Empty => {}
        Node::Global(children) => {
            for child in children {
                render_node(child, context, output, partials, options, depth)?;
            }
        }
        Node::Text(text) => {
            output.append(text.clone());
        }
        Node::Tag(name_run) => {
            if let Some(value) = context.lookup(name_run.text()) {
                let text = value.to_text();
                let escaped = (options.escape)(&text);
                push_substitution(output, &escaped, name_run);
            }
        }
        Node::UnescapedTag(name_run) => {
            if let Some(value) = context.lookup(name_run.text()) {
                let text = value.to_text();
                push_substitution(output, &text, name_run);
            }
        }
        Node::Section(name, children) => match context.lookup(name.as_str()) {
            Some(Value::List(items)) if !items.is_empty() => {
                for item in items {
                    let frame = context.push(item);
                    for child in children {
                        render_node(child, &frame, output, partials, options, depth)?;
                    }
                }
            }
            Some(value @ Value::Map(_)) => {
                // A truthy record rebinds the innermost frame.
                let frame = context.push(value);
                for child in children {
                    render_node(child, &frame, output, partials, options, depth)?;
                }
            }
            Some(value) if value.is_truthy() => {
                // A truthy scalar keeps the current context.
                for child in children {
                    render_node(child, context, output, partials, options, depth)?;
                }
            }
            Some(_) | None => {}
        },
        Node::InvertedSection(name, children) => {
            let truthy = context.lookup(name.as_str()).is_some_and(Value::is_truthy);
            if !truthy {
                for child in children {
                    render_node(child, context, output, partials, options, depth)?;
                }
            }
        }
        Node::Partial(name) => {
            let resolved = match partials {
                Some(resolver) => resolver.resolve(name)?,
                None => None,
            };
            match resolved {
                Some(tree) => {
                    if depth >= MAX_PARTIAL_DEPTH {
                        return Err(RenderError::PartialDepthExceeded { name: name.clone() });
                    }
                    render_node(tree, context, output, partials, options, depth + 1)?;
                }
                None => {
                    if options.partial_mode == PartialMode::Strict {
                        return Err(RenderError::MissingPartial { name: name.clone() });
                    }
                }
            }
        }
    }

    Ok(())
}

/// Appends substituted text as one new run carrying the tag site's own
/// attributes, never the neighbouring text nodes'.
fn push_substitution<A: Clone + Default>(
    output: &mut AttributedText<A>,
    text: &str,
    site: &AttributedText<A>,
) {
    if text.is_empty() {
        return;
    }
    let attrs = site.attributes_at(0).cloned().unwrap_or_default();
    output.push_run(text, attrs);
}
