use std::fmt::Display;
use std::ops::Range;

/// One contiguous stretch of characters sharing a single attribute value.
///
/// Runs store a byte length rather than a range; offsets are implied by the
/// sum of the lengths of the runs before them.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Run<A> {
    len: usize,
    attrs: A,
}

/// A string paired with a sequence of attribute runs that covers it exactly.
///
/// The attribute type `A` is opaque to this crate; it only needs to be
/// cloneable to travel through parsing and rendering. `A = ()` degenerates
/// to a plain string, which is what [`From<&str>`] produces.
///
/// Every character of the text belongs to exactly one run, and runs are
/// kept in document order. Appends are structural: runs are carried over
/// as-is and never merged, even when adjacent runs hold equal attributes.
///
/// # Examples
///
/// ```
/// use richstache::AttributedText;
///
/// let mut text = AttributedText::new();
/// text.push_run("Hello, ", "plain");
/// text.push_run("World", "bold");
///
/// assert_eq!(text.text(), "Hello, World");
/// assert_eq!(text.attributes_at(0), Some(&"plain"));
/// assert_eq!(text.attributes_at(7), Some(&"bold"));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributedText<A = ()> {
    text: String,
    runs: Vec<Run<A>>,
}

impl<A> AttributedText<A> {
    /// Creates an empty attributed string with no runs.
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            runs: Vec::new(),
        }
    }

    /// Creates an attributed string whose whole text is one run of `attrs`.
    pub fn with_attributes<T: Into<String>>(text: T, attrs: A) -> Self {
        let mut out = Self::new();
        out.push_owned(text.into(), attrs);
        out
    }

    /// Appends `text` as a new run carrying `attrs`. Empty text appends
    /// nothing.
    pub fn push_run(&mut self, text: &str, attrs: A) {
        self.push_owned(text.to_string(), attrs);
    }

    fn push_owned(&mut self, text: String, attrs: A) {
        if text.is_empty() {
            return;
        }
        self.runs.push(Run {
            len: text.len(),
            attrs,
        });
        self.text.push_str(&text);
    }

    /// Appends `other`, carrying its runs over unchanged. Adjacent runs with
    /// equal attributes stay distinct.
    pub fn append(&mut self, other: Self) {
        self.text.push_str(&other.text);
        self.runs.extend(other.runs);
    }

    /// [`append`](Self::append) by value, for chaining.
    #[must_use]
    pub fn concat(mut self, other: Self) -> Self {
        self.append(other);
        self
    }

    /// The flattened text, with all attributes dropped.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The length of the text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The attributes in effect at byte `offset`, or `None` when the offset
    /// is at or past the end of the text.
    pub fn attributes_at(&self, offset: usize) -> Option<&A> {
        if offset >= self.text.len() {
            return None;
        }
        let mut covered = 0;
        for run in &self.runs {
            covered += run.len;
            if offset < covered {
                return Some(&run.attrs);
            }
        }
        None
    }

    /// Iterates over `(text, attrs)` pairs, one per run, in document order.
    pub fn runs(&self) -> impl Iterator<Item = (&str, &A)> {
        let mut offset = 0;
        self.runs.iter().map(move |run| {
            let piece = &self.text[offset..offset + run.len];
            offset += run.len;
            (piece, &run.attrs)
        })
    }
}

impl<A: Clone> AttributedText<A> {
    /// Extracts the attributed substring covering `range`, splitting runs at
    /// the cut points.
    ///
    /// # Panics
    ///
    /// Panics when the range is out of bounds or not on character
    /// boundaries, with the same rules as slicing a [`str`].
    pub fn slice(&self, range: Range<usize>) -> Self {
        let text = &self.text[range.clone()];
        let mut out = Self {
            text: text.to_string(),
            runs: Vec::new(),
        };

        let mut run_start = 0;
        for run in &self.runs {
            let run_end = run_start + run.len;
            let start = range.start.max(run_start);
            let end = range.end.min(run_end);
            if start < end {
                out.runs.push(Run {
                    len: end - start,
                    attrs: run.attrs.clone(),
                });
            }
            run_start = run_end;
        }

        out
    }
}

impl<A> Default for AttributedText<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Default> From<&str> for AttributedText<A> {
    fn from(text: &str) -> Self {
        Self::with_attributes(text, A::default())
    }
}

impl<A: Default> From<String> for AttributedText<A> {
    fn from(text: String) -> Self {
        let mut out = Self::new();
        out.push_owned(text, A::default());
        out
    }
}

impl<A> Display for AttributedText<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
