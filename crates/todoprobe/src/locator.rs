//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a description, not a handle: backends re-run it on every
//! query, so it stays valid across reloads and re-renders.
//!
//! Resolution order is fixed: base selector, then text filter, then `nth`,
//! then the descendant selector.

use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., ".todo-list li")
    Css(String),
    /// CSS selector filtered by exact (trimmed) text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text the element's trimmed `textContent` must equal
        text: String,
    },
}

impl Selector {
    /// Base CSS selector
    #[must_use]
    pub fn css(&self) -> &str {
        match self {
            Self::Css(css) | Self::CssWithText { css, .. } => css,
        }
    }

    /// Text filter, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Css(_) => None,
            Self::CssWithText { text, .. } => Some(text),
        }
    }
}

/// State of one matched element, as observed in the page
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ElementState {
    /// `textContent`, untrimmed
    #[serde(default)]
    pub text: String,
    /// Rendered with a non-empty box and not `visibility: hidden`
    #[serde(default)]
    pub visible: bool,
    /// Class list
    #[serde(default)]
    pub classes: Vec<String>,
    /// `checked` property (form controls)
    #[serde(default)]
    pub checked: bool,
}

impl ElementState {
    /// Whether the class list contains `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// A lazily evaluated element query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    nth: Option<usize>,
    descendant: Option<String>,
}

impl Locator {
    /// Create a locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: Selector::Css(selector.into()),
            nth: None,
            descendant: None,
        }
    }

    /// Keep only elements whose trimmed text equals `text`
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let css = match self.selector {
            Selector::Css(css) | Selector::CssWithText { css, .. } => css,
        };
        Self {
            selector: Selector::CssWithText {
                css,
                text: text.into(),
            },
            ..self
        }
    }

    /// Keep only the `index`-th match (zero-based)
    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// Keep only the first match
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Descend into the first `css` match inside each element
    #[must_use]
    pub fn locator(mut self, css: impl Into<String>) -> Self {
        self.descendant = Some(css.into());
        self
    }

    /// Selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Index filter
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.nth
    }

    /// Descendant selector
    #[must_use]
    pub fn descendant(&self) -> Option<&str> {
        self.descendant.as_deref()
    }

    /// JavaScript expression evaluating to the array of matched elements
    #[must_use]
    pub fn to_query_all(&self) -> String {
        let mut query = format!(
            "Array.from(document.querySelectorAll({:?}))",
            self.selector.css()
        );
        if let Some(text) = self.selector.text() {
            query.push_str(&format!(
                ".filter(el => (el.textContent || '').trim() === {text:?})"
            ));
        }
        if let Some(n) = self.nth {
            query.push_str(&format!(".slice({n}, {})", n + 1));
        }
        if let Some(css) = &self.descendant {
            query.push_str(&format!(
                ".map(el => el.querySelector({css:?})).filter(el => el !== null)"
            ));
        }
        query
    }

    /// JavaScript expression evaluating to the first matched element or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("({}[0] || null)", self.to_query_all())
    }

    /// JavaScript expression evaluating to the [`ElementState`] of every match
    #[must_use]
    pub fn to_state_query(&self) -> String {
        format!(
            "{}.map(el => {{ \
                const style = window.getComputedStyle(el); \
                const rect = el.getBoundingClientRect(); \
                return {{ \
                    text: el.textContent || '', \
                    visible: style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0, \
                    classes: Array.from(el.classList), \
                    checked: !!el.checked \
                }}; \
            }})",
            self.to_query_all()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector.css())?;
        if let Some(text) = self.selector.text() {
            write!(f, " with text {text:?}")?;
        }
        if let Some(n) = self.nth {
            write!(f, " >> nth={n}")?;
        }
        if let Some(css) = &self.descendant {
            write!(f, " >> {css}")?;
        }
        Ok(())
    }
}
