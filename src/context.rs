use std::borrow::Cow;
use std::collections::BTreeMap;

/// A value resolvable from a template name lookup.
///
/// Absence is expressed as `None` at the lookup seam rather than as a
/// variant, so a tree of `Value`s never contains holes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a [`Value::Map`] from name/value pairs.
    pub fn record<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Builds a [`Value::List`].
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// The enter/skip rule for sections: `false`, the empty string, and the
    /// empty sequence are falsy; records and everything else are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Str(text) => !text.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(_) => true,
        }
    }

    /// The string form used for tag substitution. Sequences concatenate
    /// their elements' string forms; records have no string form.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Str(text) => Cow::Borrowed(text.as_str()),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::List(items) => Cow::Owned(items.iter().map(Self::to_text).collect::<String>()),
            Self::Map(_) => Cow::Borrowed(""),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// One frame of the name-lookup stack a render call walks.
///
/// Frames are a borrowed, read-only linked list: sections push a frame for
/// the value they enter, and [`lookup`](Self::lookup) falls back through
/// parent frames until the name is found or the stack is exhausted. The
/// chained fallback is what lets nested sections reference ancestor fields.
///
/// # Examples
///
/// ```
/// use richstache::{Context, Value};
///
/// let outer = Value::record([("x", Value::from("from outer"))]);
/// let inner = Value::record([("y", Value::from("from inner"))]);
///
/// let root = Context::root(&outer);
/// let frame = root.push(&inner);
///
/// assert_eq!(frame.lookup("y"), Some(&Value::from("from inner")));
/// assert_eq!(frame.lookup("x"), Some(&Value::from("from outer")));
/// assert_eq!(frame.lookup("z"), None);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    value: &'a Value,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// The outermost frame of a render call.
    pub const fn root(value: &'a Value) -> Self {
        Self {
            value,
            parent: None,
        }
    }

    /// Pushes a new innermost frame on top of `self`.
    pub const fn push(&'a self, value: &'a Value) -> Context<'a> {
        Context {
            value,
            parent: Some(self),
        }
    }

    /// The value of the innermost frame.
    pub const fn value(&self) -> &'a Value {
        self.value
    }

    /// Resolves `name` starting at the innermost frame and walking outward.
    /// The name `.` resolves to the innermost frame's value itself.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        if name == "." {
            return Some(self.value);
        }
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Value::Map(fields) = current.value {
                if let Some(value) = fields.get(name) {
                    return Some(value);
                }
            }
            frame = current.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::list([]).is_truthy());
        assert!(Value::list([Value::from("a")]).is_truthy());
        assert!(Value::record([] as [(&str, Value); 0]).is_truthy());
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::from("abc").to_text(), "abc");
        assert_eq!(Value::Bool(true).to_text(), "true");
        assert_eq!(Value::Bool(false).to_text(), "false");
        assert_eq!(
            Value::list([Value::from("a"), Value::from("b")]).to_text(),
            "ab"
        );
        assert_eq!(Value::record([("k", Value::from("v"))]).to_text(), "");
    }

    #[test]
    fn test_lookup_walks_outward() {
        let outer = Value::record([("x", Value::from("outer x")), ("y", Value::from("outer y"))]);
        let inner = Value::record([("y", Value::from("inner y"))]);

        let root = Context::root(&outer);
        let frame = root.push(&inner);

        // Inner frame shadows the outer one, missing names fall back.
        assert_eq!(frame.lookup("y"), Some(&Value::from("inner y")));
        assert_eq!(frame.lookup("x"), Some(&Value::from("outer x")));
        assert_eq!(frame.lookup("missing"), None);
    }

    #[test]
    fn test_lookup_dot_is_innermost_value() {
        let outer = Value::record([("item", Value::from("v"))]);
        let scalar = Value::from("the item");

        let root = Context::root(&outer);
        let frame = root.push(&scalar);

        assert_eq!(frame.lookup("."), Some(&scalar));
        assert_eq!(root.lookup("."), Some(&outer));

        // `.` is exactly the innermost frame's own value.
        assert_eq!(frame.lookup("."), Some(frame.value()));
        assert_eq!(root.lookup("."), Some(root.value()));
    }

    #[test]
    fn test_lookup_through_scalar_frame() {
        // A scalar frame has no fields; lookups pass through to parents.
        let outer = Value::record([("x", Value::from("outer x"))]);
        let scalar = Value::from("s");

        let root = Context::root(&outer);
        let frame = root.push(&scalar);

        assert_eq!(frame.lookup("x"), Some(&Value::from("outer x")));
    }
}
