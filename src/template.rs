use crate::ast::Node;
use crate::attributed::AttributedText;
use crate::context::Value;
use crate::error::RichstacheResult;
use crate::parser::parse;
use crate::render::{PartialResolver, RenderOptions, render};

/// How a name is used inside a template, as reported by
/// [`Template::collect_names`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NameUsage {
    /// Substituted by a `{{name}}` or `{{{name}}}` tag.
    Tag,
    /// Drives a `{{#name}}` or `{{^name}}` section.
    Section,
    /// Referenced by a `{{>name}}` partial.
    Partial,
}

/// A parsed template: the source plus its cached node tree.
///
/// Parsing happens once in [`Template::new`]; the tree is immutable
/// afterwards, so one template may be rendered many times, concurrently,
/// against different context values.
///
/// # Example
///
/// ```rust
/// use richstache::{NoPartials, RenderOptions, Template, Value};
///
/// let template: Template = Template::new("Hello, {{ name }}!").unwrap();
///
/// let context = Value::record([("name", Value::from("World"))]);
/// let output = template
///     .render(&context, None::<&NoPartials>, &RenderOptions::default())
///     .unwrap();
/// assert_eq!(output.text(), "Hello, World!");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Template<A = ()> {
    source: AttributedText<A>,
    #[cfg_attr(feature = "serde", serde(skip))]
    ast: Node<A>,
    pub(crate) name: Option<String>,
}

#[cfg(feature = "serde")]
impl<'de, A> serde::Deserialize<'de> for Template<A>
where
    A: Clone + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // The tree is not serialized; re-parse the source instead.
        #[derive(serde::Deserialize)]
        struct TemplateHelper<A> {
            source: AttributedText<A>,
            name: Option<String>,
        }

        let helper = TemplateHelper::<A>::deserialize(deserializer)?;

        let mut template = Template::new(helper.source)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse template: {}", e)))?;
        template.name = helper.name;

        Ok(template)
    }
}

impl<A: Clone> Template<A> {
    /// Parses `source` into a template.
    ///
    /// # Errors
    ///
    /// Returns [`RichstacheError::Syntax`](crate::RichstacheError::Syntax)
    /// if the source is malformed; no partial tree is ever kept.
    pub fn new<S: Into<AttributedText<A>>>(source: S) -> RichstacheResult<Self> {
        let source = source.into();
        let ast = parse(&source)?;
        Ok(Self {
            source,
            ast,
            name: None,
        })
    }

    /// The parsed tree, rooted at [`Node::Global`].
    pub const fn ast(&self) -> &Node<A> {
        &self.ast
    }

    /// The source this template was parsed from.
    pub const fn source(&self) -> &AttributedText<A> {
        &self.source
    }

    /// Collects the names this template references, with how each is used.
    /// Each `(name, usage)` pair is reported once, in document order.
    pub fn collect_names<'b>(&'b self, names: &mut Vec<(&'b str, NameUsage)>) {
        collect_names_from_node(&self.ast, names);
    }

    /// Renders the template against `value` as the root context frame.
    ///
    /// # Errors
    ///
    /// Returns [`RichstacheError::Render`](crate::RichstacheError::Render)
    /// for an unresolved partial in strict mode or a failing resolver; in
    /// that case no partial output is returned.
    pub fn render<P>(
        &self,
        value: &Value,
        partials: Option<&P>,
        options: &RenderOptions,
    ) -> RichstacheResult<AttributedText<A>>
    where
        A: Default,
        P: PartialResolver<A>,
    {
        Ok(render(&self.ast, value, partials, options)?)
    }
}

fn collect_names_from_node<'a, A>(node: &'a Node<A>, names: &mut Vec<(&'a str, NameUsage)>) {
    match node {
        Node::Empty | Node::Text(_) => {}
        Node::Global(children) => {
            for child in children {
                collect_names_from_node(child, names);
            }
        }
        Node::Tag(name_run) | Node::UnescapedTag(name_run) => {
            push_name(names, name_run.text(), NameUsage::Tag);
        }
        Node::Section(name, children) | Node::InvertedSection(name, children) => {
            push_name(names, name, NameUsage::Section);
            for child in children {
                collect_names_from_node(child, names);
            }
        }
        Node::Partial(name) => {
            push_name(names, name, NameUsage::Partial);
        }
    }
}

fn push_name<'a>(names: &mut Vec<(&'a str, NameUsage)>, name: &'a str, usage: NameUsage) {
    if !names
        .iter()
        .any(|(existing, existing_usage)| *existing == name && *existing_usage == usage)
    {
        names.push((name, usage));
    }
}
