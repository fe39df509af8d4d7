use crate::attributed::AttributedText;

/// One node of a parsed template. A template is parsed into a tree of these
/// nodes, rooted at [`Node::Global`].
///
/// The tree is pure data: it is immutable once built, owns its attributed
/// payloads, and holds no external resources, so a parsed tree can be
/// cached and rendered concurrently against different contexts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node<A = ()> {
    /// Renders to nothing.
    Empty,
    /// The top-level node of a template; renders its children in order.
    /// Valid only at the root, never nested.
    Global(Vec<Node<A>>),
    /// Literal content between tags, rendered verbatim with its attribute
    /// ranges intact. Never contains unresolved tag syntax.
    Text(AttributedText<A>),
    /// A section, either a repetition (if the named value is a sequence) or
    /// a conditional (otherwise). If the value is absent, `false`, or an
    /// empty sequence the children are skipped; a sequence renders them
    /// once per element with that element pushed as the innermost context
    /// frame; any other truthy value renders them once.
    ///
    /// Introduced with a `{{#` tag and closed with a matching `{{/` tag:
    ///
    /// ```text
    /// {{#addresses}}
    ///   Has address in: {{city}}
    /// {{/addresses}}
    /// ```
    Section(String, Vec<Node<A>>),
    /// An inverted section displays its children only when the named value
    /// is absent, `false`, or an empty sequence, and never repeats:
    ///
    /// ```text
    /// {{^addresses}}
    ///   The person has no addresses assigned.
    /// {{/addresses}}
    /// ```
    InvertedSection(String, Vec<Node<A>>),
    /// A variable tag, `{{city}}`. The payload's textual content is the
    /// lookup name; its attributes are the tag site's formatting, which the
    /// substituted value inherits. Lookup starts at the innermost context
    /// frame and falls back through parent frames. The resolved value is
    /// escaped before insertion.
    Tag(AttributedText<A>),
    /// Same as [`Node::Tag`] but the value is inserted raw, unescaped.
    /// Written with triple braces (`{{{html}}}`) or an ampersand
    /// (`{{& html}}`).
    UnescapedTag(AttributedText<A>),
    /// A reference to an externally resolved sub-template, `{{>user}}`.
    /// How the name resolves is up to the
    /// [`PartialResolver`](crate::PartialResolver).
    Partial(String),
}
