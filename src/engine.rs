use std::collections::HashMap;

use crate::ast::Node;
use crate::attributed::AttributedText;
use crate::context::Value;
use crate::error::{RenderError, RichstacheError, RichstacheResult};
use crate::render::{PartialResolver, RenderOptions};
use crate::template::{NameUsage, Template};

/// `RichstacheInterface` is the front door of the engine: a store of named
/// templates that can be added, rendered, and inspected for the names they
/// reference.
pub trait RichstacheInterface<A> {
    /// `add_template` tries to make a new template available in the engine.
    ///
    /// # Errors
    /// - If the template name is a duplicate.
    /// - If the source fails to parse.
    fn add_template<N: AsRef<str>, S: Into<AttributedText<A>>>(
        &mut self,
        name: N,
        source: S,
    ) -> RichstacheResult<()>;

    /// `render` tries to render a named template against `value` as the
    /// root context frame. Partials resolve against the engine's own
    /// template store.
    ///
    /// # Errors
    /// - If the template name is not found.
    /// - If a partial fails to resolve in strict mode.
    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        value: &Value,
        options: &RenderOptions,
    ) -> RichstacheResult<AttributedText<A>>;

    /// `names` lists every name the selected template references, with how
    /// each is used, following `{{>partial}}` references through the store.
    /// Unknown templates produce an empty list.
    fn names<N: AsRef<str>>(&self, template_name: N) -> Vec<(&str, NameUsage)>;
}

/// The primary implementation of [`RichstacheInterface`]: an in-memory
/// template store whose registered templates double as the partials
/// available to each other.
///
/// # Examples
///
/// ```
/// use richstache::{RenderOptions, RichstacheEngine, RichstacheInterface, Value};
///
/// let mut engine: RichstacheEngine = RichstacheEngine::new();
/// engine.add_template("greeting", "Hello, {{ name }}!").unwrap();
///
/// let context = Value::record([("name", Value::from("World"))]);
/// let output = engine
///     .render("greeting", &context, &RenderOptions::default())
///     .unwrap();
/// assert_eq!(output.text(), "Hello, World!");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(deserialize = "A: Clone + serde::Deserialize<'de>"))
)]
pub struct RichstacheEngine<A = ()> {
    templates: HashMap<String, Template<A>>,
}

impl<A> RichstacheEngine<A> {
    /// Creates a new engine with no templates.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }
}

impl<A> Default for RichstacheEngine<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone> RichstacheEngine<A> {
    /// Walks a template's names, expanding partial references against the
    /// store. `visited` guards against partial cycles.
    fn collect_template_names<'b>(
        &'b self,
        template: &'b Template<A>,
        names: &mut Vec<(&'b str, NameUsage)>,
        visited: &mut Vec<&'b str>,
    ) {
        template.collect_names(names);

        let partials: Vec<&'b str> = names
            .iter()
            .filter(|(_, usage)| *usage == NameUsage::Partial)
            .map(|(name, _)| *name)
            .collect();

        for partial in partials {
            if visited.contains(&partial) {
                continue;
            }
            visited.push(partial);
            if let Some(included) = self.templates.get(partial) {
                self.collect_template_names(included, names, visited);
            }
        }
    }
}

impl<A: Clone + Default> RichstacheInterface<A> for RichstacheEngine<A> {
    fn add_template<N: AsRef<str>, S: Into<AttributedText<A>>>(
        &mut self,
        name: N,
        source: S,
    ) -> RichstacheResult<()> {
        let name = name.as_ref();

        if self.templates.contains_key(name) {
            return Err(RichstacheError::TemplateExists {
                template_name: name.to_string(),
            });
        }

        let mut template = Template::new(source)?;
        template.name = Some(name.to_string());

        self.templates.insert(name.to_string(), template);

        Ok(())
    }

    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        value: &Value,
        options: &RenderOptions,
    ) -> RichstacheResult<AttributedText<A>> {
        let name = template_name.as_ref();
        let template =
            self.templates
                .get(name)
                .ok_or_else(|| RichstacheError::MissingTemplate {
                    template_name: name.to_string(),
                })?;

        template.render(value, Some(self), options)
    }

    fn names<N: AsRef<str>>(&self, template_name: N) -> Vec<(&str, NameUsage)> {
        let Some((key, template)) = self.templates.get_key_value(template_name.as_ref()) else {
            return Vec::new();
        };

        let mut names = Vec::new();
        let mut visited = vec![key.as_str()];
        self.collect_template_names(template, &mut names, &mut visited);

        names
    }
}

impl<A: Clone> PartialResolver<A> for RichstacheEngine<A> {
    fn resolve(&self, name: &str) -> Result<Option<&Node<A>>, RenderError> {
        Ok(self.templates.get(name).map(Template::ast))
    }
}
