pub type RichstacheResult<T> = std::result::Result<T, RichstacheError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// A tag was opened but its closing delimiter never appeared.
    UnclosedTag {
        /// The delimiter that was expected, e.g. `}}` or `}}}`.
        expected: String,
    },
    /// A tag name was empty after trimming whitespace.
    EmptyTagName,
    /// A section was opened but its `{{/name}}` close never appeared.
    UnclosedSection { name: String },
    /// A `{{/name}}` close did not match the innermost open section.
    SectionMismatch { expected: String, found: String },
    /// A `{{/name}}` close appeared with no section open.
    UnexpectedSectionClose { name: String },
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnclosedTag { expected } => {
                write!(f, "Unclosed tag (expected '{}')", expected)
            }
            Self::EmptyTagName => {
                write!(f, "Empty tag name")
            }
            Self::UnclosedSection { name } => {
                write!(f, "Unclosed section '{}' (expected '{{{{/{}}}}}')", name, name)
            }
            Self::SectionMismatch { expected, found } => {
                write!(
                    f,
                    "Section close mismatch: expected '{{{{/{}}}}}', found '{{{{/{}}}}}'",
                    expected, found
                )
            }
            Self::UnexpectedSectionClose { name } => {
                write!(f, "Close tag '{{{{/{}}}}}' without a matching open", name)
            }
        }
    }
}

impl std::error::Error for SyntaxErrorKind {}

/// A structural malformation of the tag grammar, positioned in the source.
///
/// Syntax errors are always surfaced to the caller; a malformed template is
/// never turned into a partial tree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    /// 1-indexed line of the offending tag.
    pub line: usize,
    /// 1-indexed column of the offending tag.
    pub column: usize,
    pub kind: SyntaxErrorKind,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Syntax error at line {}, column {}: {}",
            self.line, self.column, self.kind
        )
    }
}

impl std::error::Error for SyntaxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// A render-time failure, disjoint from [`SyntaxError`].
///
/// Rendering either produces a complete output or fails with one of these;
/// no partially rendered output is ever returned.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderError {
    /// A `{{>name}}` did not resolve and the render ran in strict mode.
    MissingPartial { name: String },
    /// The partial resolver itself failed.
    Resolve { name: String, message: String },
    /// Partial expansion nested past the depth limit, indicating a cycle
    /// of `{{>name}}` references.
    PartialDepthExceeded { name: String },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPartial { name } => {
                write!(f, "Partial not found: {}", name)
            }
            Self::Resolve { name, message } => {
                write!(f, "Failed to resolve partial '{}': {}", name, message)
            }
            Self::PartialDepthExceeded { name } => {
                write!(
                    f,
                    "Partial '{}' nested too deeply (likely a partial cycle)",
                    name
                )
            }
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RichstacheError {
    TemplateExists {
        template_name: String,
    },
    MissingTemplate {
        template_name: String,
    },
    Syntax(SyntaxError),
    Render(RenderError),
}

impl std::fmt::Display for RichstacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateExists { template_name } => {
                write!(f, "Template already exists: {}", template_name)
            }
            Self::MissingTemplate { template_name } => {
                write!(f, "Template not found: {}", template_name)
            }
            Self::Syntax(syntax_error) => {
                write!(f, "{}", syntax_error)
            }
            Self::Render(render_error) => {
                write!(f, "Rendering error: {}", render_error)
            }
        }
    }
}

impl std::error::Error for RichstacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(syntax_error) => Some(syntax_error),
            Self::Render(render_error) => Some(render_error),
            Self::TemplateExists { .. } | Self::MissingTemplate { .. } => None,
        }
    }
}

impl From<SyntaxError> for RichstacheError {
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl From<RenderError> for RichstacheError {
    fn from(error: RenderError) -> Self {
        Self::Render(error)
    }
}
