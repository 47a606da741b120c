//! Declarative element locators that cross frame and shadow-DOM boundaries.
//!
//! A [`LocatorSpec`] is three things:
//!
//! - a boundary path: ordered [`FrameHop`]s, each descending into a frame's
//!   document (frame lookup itself pierces shadow roots);
//! - optional enclosing scopes (`within`), each narrowing the search to the
//!   subtree of a previously matched element;
//! - the target [`Selection`]: a [`Strategy`] plus an [`Index`].
//!
//! ```yaml
//! locator:
//!   frames: [{ url_contains: "/iframe" }]
//!   within: [{ css: "table tbody tr" }]
//!   role: button
//!   name: "Hacer un Reclamo"
//!   index: first
//! ```
//!
//! Shadow roots below the last frame are pierced transparently. Candidates are
//! ordered by DOM order: an element, then its shadow tree, then its light
//! children.

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub(crate) mod script;

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// TEXT MATCHING
// =============================================================================

/// How expected text is compared against an element's text
///
/// Text is whitespace-normalized (runs collapsed, ends trimmed) before any
/// comparison. A bare string in YAML is a case-insensitive substring match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextMatch {
    /// Case-insensitive substring
    Contains(String),
    /// Exact, case-sensitive equality
    Exact {
        /// Expected text
        exact: String,
    },
    /// Regular expression
    Regex {
        /// Pattern
        regex: String,
        /// Compile with the `i` flag
        #[serde(default)]
        ignore_case: bool,
    },
}

impl TextMatch {
    /// Case-insensitive substring match
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Exact match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact { exact: text.into() }
    }

    /// Regex match, validated eagerly
    pub fn regex(pattern: impl Into<String>, ignore_case: bool) -> HarnessResult<Self> {
        let m = Self::Regex {
            regex: pattern.into(),
            ignore_case,
        };
        m.validate()?;
        Ok(m)
    }

    /// Reject empty expectations and malformed patterns
    pub fn validate(&self) -> HarnessResult<()> {
        match self {
            Self::Contains(text) | Self::Exact { exact: text } if normalize(text).is_empty() => {
                Err(HarnessError::invalid("expected text must not be empty"))
            }
            Self::Regex { .. } => self.compile().map(|_| ()),
            _ => Ok(()),
        }
    }

    fn compile(&self) -> HarnessResult<Option<regex::Regex>> {
        match self {
            Self::Regex { regex, ignore_case } => regex::RegexBuilder::new(regex)
                .case_insensitive(*ignore_case)
                .build()
                .map(Some)
                .map_err(|e| HarnessError::invalid(format!("bad text regex '{regex}': {e}"))),
            _ => Ok(None),
        }
    }

    /// Check whether `haystack` satisfies this expectation
    #[must_use]
    pub fn matches(&self, haystack: &str) -> bool {
        let text = normalize(haystack);
        match self {
            Self::Contains(needle) => text
                .to_lowercase()
                .contains(&normalize(needle).to_lowercase()),
            Self::Exact { exact } => text == normalize(exact),
            Self::Regex { .. } => matches!(self.compile(), Ok(Some(re)) if re.is_match(&text)),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(text) => write!(f, "~{text:?}"),
            Self::Exact { exact } => write!(f, "={exact:?}"),
            Self::Regex { regex, ignore_case } => {
                write!(f, "/{regex}/{}", if *ignore_case { "i" } else { "" })
            }
        }
    }
}

impl From<&str> for TextMatch {
    fn from(text: &str) -> Self {
        Self::contains(text)
    }
}

/// Collapse whitespace runs and trim
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// FRAME HOPS
// =============================================================================

/// Identifies one frame to descend into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameHop {
    /// Frame whose `title` attribute (or document title) equals the value
    Title(String),
    /// Frame whose URL contains the value
    UrlContains(String),
    /// Frame whose URL matches a `*` glob
    UrlGlob(String),
    /// Frame element matching a CSS selector
    Css(String),
    /// Frame with the given `name`
    Name(String),
}

impl FrameHop {
    fn validate(&self) -> HarnessResult<()> {
        let value = match self {
            Self::Title(v) | Self::UrlContains(v) | Self::UrlGlob(v) | Self::Css(v) | Self::Name(v) => v,
        };
        if value.trim().is_empty() {
            return Err(HarnessError::invalid("frame hop value must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Display for FrameHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title(v) => write!(f, "frame[title={v:?}]"),
            Self::UrlContains(v) => write!(f, "frame[url~{v:?}]"),
            Self::UrlGlob(v) => write!(f, "frame[url glob {v:?}]"),
            Self::Css(v) => write!(f, "frame[css={v:?}]"),
            Self::Name(v) => write!(f, "frame[name={v:?}]"),
        }
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// How candidates are picked within a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// CSS selector
    Css(String),
    /// ARIA role with optional accessible name
    Role {
        /// Role name (explicit or implicit)
        role: String,
        /// Accessible name expectation
        name: Option<TextMatch>,
    },
    /// Deepest element whose text matches
    Text(TextMatch),
    /// Form control whose label matches
    Label(TextMatch),
    /// `data-testid` attribute
    TestId(String),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "css={css}"),
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name{name}]"),
            Self::Text(m) => write!(f, "text{m}"),
            Self::Label(m) => write!(f, "label{m}"),
            Self::TestId(id) => write!(f, "test-id={id}"),
        }
    }
}

/// Which of several matches to take, in DOM order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Index {
    /// First match
    #[default]
    First,
    /// Zero-based position
    Nth(usize),
    /// Last match
    Last,
}

impl Index {
    /// Pick the position among `count` candidates
    #[must_use]
    pub fn pick(&self, count: usize) -> Option<usize> {
        match self {
            Self::First => (count > 0).then_some(0),
            Self::Nth(n) => (*n < count).then_some(*n),
            Self::Last => count.checked_sub(1),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IndexDef {
    Named(NamedIndex),
    Nth(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedIndex {
    First,
    Last,
}

impl Serialize for Index {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::First => IndexDef::Named(NamedIndex::First),
            Self::Last => IndexDef::Named(NamedIndex::Last),
            Self::Nth(n) => IndexDef::Nth(*n),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match IndexDef::deserialize(deserializer)? {
            IndexDef::Named(NamedIndex::First) => Self::First,
            IndexDef::Named(NamedIndex::Last) => Self::Last,
            IndexDef::Nth(n) => Self::Nth(n),
        })
    }
}

/// A strategy plus an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectionDef", into = "SelectionDef")]
pub struct Selection {
    strategy: Strategy,
    index: Index,
}

impl Selection {
    /// Select by strategy, first match
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            index: Index::First,
        }
    }

    /// CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css(selector.into()))
    }

    /// Role without a name constraint
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::new(Strategy::Role {
            role: role.into(),
            name: None,
        })
    }

    /// Role with an accessible-name constraint
    #[must_use]
    pub fn role_named(role: impl Into<String>, name: impl Into<TextMatch>) -> Self {
        Self::new(Strategy::Role {
            role: role.into(),
            name: Some(name.into()),
        })
    }

    /// Text content
    #[must_use]
    pub fn text(text: impl Into<TextMatch>) -> Self {
        Self::new(Strategy::Text(text.into()))
    }

    /// Label
    #[must_use]
    pub fn label(text: impl Into<TextMatch>) -> Self {
        Self::new(Strategy::Label(text.into()))
    }

    /// `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Strategy::TestId(id.into()))
    }

    /// Take the first match
    #[must_use]
    pub const fn first(mut self) -> Self {
        self.index = Index::First;
        self
    }

    /// Take the zero-based nth match
    #[must_use]
    pub const fn nth(mut self, n: usize) -> Self {
        self.index = Index::Nth(n);
        self
    }

    /// Take the last match
    #[must_use]
    pub const fn last(mut self) -> Self {
        self.index = Index::Last;
        self
    }

    /// Strategy
    #[must_use]
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Index
    #[must_use]
    pub const fn index(&self) -> Index {
        self.index
    }

    fn validate(&self) -> HarnessResult<()> {
        match &self.strategy {
            Strategy::Css(s) | Strategy::TestId(s) | Strategy::Role { role: s, .. }
                if s.trim().is_empty() =>
            {
                Err(HarnessError::invalid("selector value must not be empty"))
            }
            Strategy::Role {
                name: Some(name), ..
            } => name.validate(),
            Strategy::Text(m) | Strategy::Label(m) => m.validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.strategy)?;
        match self.index {
            Index::First => Ok(()),
            Index::Nth(n) => write!(f, " >> nth={n}"),
            Index::Last => write!(f, " >> last"),
        }
    }
}

/// Serialized form of a [`Selection`]: exactly one strategy key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SelectionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<TextMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<TextMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<TextMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<Index>,
}

impl TryFrom<SelectionDef> for Selection {
    type Error = HarnessError;

    fn try_from(def: SelectionDef) -> Result<Self, Self::Error> {
        if def.name.is_some() && def.role.is_none() {
            return Err(HarnessError::invalid("'name' is only valid together with 'role'"));
        }
        let mut strategies = Vec::new();
        if let Some(css) = def.css {
            strategies.push(Strategy::Css(css));
        }
        if let Some(role) = def.role {
            strategies.push(Strategy::Role {
                role,
                name: def.name,
            });
        }
        if let Some(text) = def.text {
            strategies.push(Strategy::Text(text));
        }
        if let Some(label) = def.label {
            strategies.push(Strategy::Label(label));
        }
        if let Some(id) = def.test_id {
            strategies.push(Strategy::TestId(id));
        }
        if strategies.len() != 1 {
            return Err(HarnessError::invalid(format!(
                "a selection needs exactly one of css, role, text, label, test_id (got {})",
                strategies.len()
            )));
        }
        let selection = Self {
            strategy: strategies.remove(0),
            index: def.index.unwrap_or_default(),
        };
        selection.validate()?;
        Ok(selection)
    }
}

impl From<Selection> for SelectionDef {
    fn from(selection: Selection) -> Self {
        let mut def = Self {
            index: (selection.index != Index::First).then_some(selection.index),
            ..Self::default()
        };
        match selection.strategy {
            Strategy::Css(css) => def.css = Some(css),
            Strategy::Role { role, name } => {
                def.role = Some(role);
                def.name = name;
            }
            Strategy::Text(text) => def.text = Some(text),
            Strategy::Label(label) => def.label = Some(label),
            Strategy::TestId(id) => def.test_id = Some(id),
        }
        def
    }
}

// =============================================================================
// LOCATOR SPEC
// =============================================================================

/// Where an element lives: frames, scopes, target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LocatorDef", into = "LocatorDef")]
pub struct LocatorSpec {
    frames: Vec<FrameHop>,
    within: Vec<Selection>,
    target: Selection,
}

impl LocatorSpec {
    /// Locate `target` in the top-level document
    #[must_use]
    pub const fn new(target: Selection) -> Self {
        Self {
            frames: Vec::new(),
            within: Vec::new(),
            target,
        }
    }

    /// CSS target
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Selection::css(selector))
    }

    /// Role target
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::new(Selection::role(role))
    }

    /// Role target with accessible name
    #[must_use]
    pub fn role_named(role: impl Into<String>, name: impl Into<TextMatch>) -> Self {
        Self::new(Selection::role_named(role, name))
    }

    /// Text target
    #[must_use]
    pub fn text(text: impl Into<TextMatch>) -> Self {
        Self::new(Selection::text(text))
    }

    /// Label target
    #[must_use]
    pub fn label(text: impl Into<TextMatch>) -> Self {
        Self::new(Selection::label(text))
    }

    /// `data-testid` target
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Selection::test_id(id))
    }

    /// Append a frame hop (outermost first)
    #[must_use]
    pub fn in_frame(mut self, hop: FrameHop) -> Self {
        self.frames.push(hop);
        self
    }

    /// Append an enclosing scope (outermost first)
    #[must_use]
    pub fn within(mut self, scope: Selection) -> Self {
        self.within.push(scope);
        self
    }

    /// Take the first target match
    #[must_use]
    pub fn first(mut self) -> Self {
        self.target = self.target.first();
        self
    }

    /// Take the zero-based nth target match
    #[must_use]
    pub fn nth(mut self, n: usize) -> Self {
        self.target = self.target.nth(n);
        self
    }

    /// Take the last target match
    #[must_use]
    pub fn last(mut self) -> Self {
        self.target = self.target.last();
        self
    }

    /// Boundary path
    #[must_use]
    pub fn frames(&self) -> &[FrameHop] {
        &self.frames
    }

    /// Enclosing scopes
    #[must_use]
    pub fn scopes(&self) -> &[Selection] {
        &self.within
    }

    /// Target selection
    #[must_use]
    pub const fn target(&self) -> &Selection {
        &self.target
    }

    /// Validate every component
    pub fn validate(&self) -> HarnessResult<()> {
        self.frames.iter().try_for_each(FrameHop::validate)?;
        self.within.iter().try_for_each(Selection::validate)?;
        self.target.validate()
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hop in &self.frames {
            write!(f, "{hop} >> ")?;
        }
        for scope in &self.within {
            write!(f, "{scope} >> ")?;
        }
        write!(f, "{}", self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocatorDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    frames: Vec<FrameHop>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    within: Vec<Selection>,
    #[serde(flatten)]
    target: SelectionDef,
}

impl TryFrom<LocatorDef> for LocatorSpec {
    type Error = HarnessError;

    fn try_from(def: LocatorDef) -> Result<Self, Self::Error> {
        let spec = Self {
            frames: def.frames,
            within: def.within,
            target: Selection::try_from(def.target)?,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl From<LocatorSpec> for LocatorDef {
    fn from(spec: LocatorSpec) -> Self {
        Self {
            frames: spec.frames,
            within: spec.within,
            target: spec.target.into(),
        }
    }
}

// =============================================================================
// RESOLUTION RESULTS
// =============================================================================

/// One step of a node path
///
/// Paths start at the top-level document. `Child(i)` is the i-th element
/// child of the current container, `Shadow` enters the current element's
/// open shadow root, `Frame` enters the current frame element's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    /// Element child at position
    Child(usize),
    /// Open shadow root of the current element
    Shadow,
    /// Content document of the current frame element
    Frame,
}

/// Stable address of a node across frames and shadow roots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    /// Build from steps
    #[must_use]
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    /// Steps from the top-level document
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Extend with one step
    #[must_use]
    pub fn join(&self, step: PathStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|s| match s {
                PathStep::Child(i) => i.to_string(),
                PathStep::Shadow => "#shadow".to_string(),
                PathStep::Frame => "#frame".to_string(),
            })
            .collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// Bounding box in top-level viewport CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box has an area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// State of a candidate element at probe time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Node address
    pub path: NodePath,
    /// Lower-case tag name
    pub tag: String,
    /// Normalized text content, shadow trees included; current value for
    /// `input` and `textarea`
    pub text: String,
    /// Attached, non-zero size, not hidden by style
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts text input
    pub editable: bool,
    /// Position, if laid out
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

/// One evaluation of a locator against the current DOM
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Probe {
    /// How many frame hops were found
    pub frames_resolved: usize,
    /// Number of candidates matching the target strategy
    pub count: usize,
    /// The candidate chosen by the index, if any
    #[serde(default)]
    pub element: Option<ElementSnapshot>,
}

impl Probe {
    /// Probe that found nothing
    #[must_use]
    pub fn empty(frames_resolved: usize) -> Self {
        Self {
            frames_resolved,
            count: 0,
            element: None,
        }
    }
}

/// A resolved element
#[derive(Debug, Clone)]
pub struct ElementHandle {
    locator: LocatorSpec,
    snapshot: ElementSnapshot,
}

impl ElementHandle {
    /// Wrap a snapshot
    #[must_use]
    pub const fn new(locator: LocatorSpec, snapshot: ElementSnapshot) -> Self {
        Self { locator, snapshot }
    }

    /// Locator that produced this handle
    #[must_use]
    pub const fn locator(&self) -> &LocatorSpec {
        &self.locator
    }

    /// Node address
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.snapshot.path
    }

    /// Snapshot taken at resolution time
    #[must_use]
    pub const fn snapshot(&self) -> &ElementSnapshot {
        &self.snapshot
    }

    /// Normalized text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.snapshot.text
    }

    /// Whether both handles address the same node
    #[must_use]
    pub fn same_element(&self, other: &Self) -> bool {
        self.snapshot.path == other.snapshot.path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_contains_is_case_insensitive_and_normalized() {
            let m = TextMatch::contains("tipos de  reclamo");
            assert!(m.matches("  Tipos de\nReclamo disponibles "));
            assert!(!m.matches("Reclamos"));
        }

        #[test]
        fn test_exact() {
            let m = TextMatch::exact("Volver");
            assert!(m.matches("  Volver "));
            assert!(!m.matches("volver"));
            assert!(!m.matches("Volver atrás"));
        }

        #[test]
        fn test_regex_ignore_case() {
            let m = TextMatch::regex("mercadolibre", true).unwrap();
            assert!(m.matches("Conectar MercadoLibre"));
            let strict = TextMatch::regex("^Volver$", false).unwrap();
            assert!(!strict.matches("volver"));
        }

        #[test]
        fn test_invalid_regex_rejected() {
            assert!(TextMatch::regex("(unclosed", false).is_err());
        }

        #[test]
        fn test_empty_rejected() {
            assert!(TextMatch::contains("   ").validate().is_err());
        }

        #[test]
        fn test_untagged_yaml_forms() {
            let plain: TextMatch = serde_yaml_ng::from_str("Hola").unwrap();
            assert_eq!(plain, TextMatch::contains("Hola"));
            let exact: TextMatch = serde_yaml_ng::from_str("{exact: Hola}").unwrap();
            assert_eq!(exact, TextMatch::exact("Hola"));
            let re: TextMatch = serde_yaml_ng::from_str("{regex: volver, ignore_case: true}").unwrap();
            assert!(re.matches("VOLVER"));
        }
    }

    mod index_tests {
        use super::*;

        #[test]
        fn test_pick() {
            assert_eq!(Index::First.pick(3), Some(0));
            assert_eq!(Index::Last.pick(3), Some(2));
            assert_eq!(Index::Nth(2).pick(3), Some(2));
            assert_eq!(Index::Nth(3).pick(3), None);
            assert_eq!(Index::First.pick(0), None);
            assert_eq!(Index::Last.pick(0), None);
        }

        #[test]
        fn test_serde() {
            let last: Index = serde_yaml_ng::from_str("last").unwrap();
            assert_eq!(last, Index::Last);
            let nth: Index = serde_yaml_ng::from_str("2").unwrap();
            assert_eq!(nth, Index::Nth(2));
            assert_eq!(serde_json::to_string(&Index::First).unwrap(), "\"first\"");
        }
    }

    mod locator_spec_tests {
        use super::*;

        #[test]
        fn test_builder_and_display() {
            let spec = LocatorSpec::role_named("button", "Hacer un Reclamo")
                .in_frame(FrameHop::UrlContains("/iframe".into()))
                .within(Selection::css("table tbody tr").first());
            assert_eq!(spec.frames().len(), 1);
            assert_eq!(spec.scopes().len(), 1);
            assert_eq!(
                spec.to_string(),
                "frame[url~\"/iframe\"] >> css=table tbody tr >> role=button[name~\"Hacer un Reclamo\"]"
            );
        }

        #[test]
        fn test_yaml_round_shape() {
            let yaml = r#"
frames: [{ url_contains: "/iframe" }]
within: [{ css: "table tbody tr" }]
role: button
name: { regex: "ver", ignore_case: true }
index: last
"#;
            let spec: LocatorSpec = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(spec.frames(), &[FrameHop::UrlContains("/iframe".into())]);
            assert_eq!(spec.target().index(), Index::Last);
            assert!(matches!(
                spec.target().strategy(),
                Strategy::Role { role, name: Some(TextMatch::Regex { .. }) } if role == "button"
            ));

            let json = serde_json::to_value(&spec).unwrap();
            assert_eq!(json["role"], "button");
            assert_eq!(json["index"], "last");
        }

        #[test]
        fn test_yaml_rejects_two_strategies() {
            let err = serde_yaml_ng::from_str::<LocatorSpec>("{css: a, text: b}").unwrap_err();
            assert!(err.to_string().contains("exactly one"));
        }

        #[test]
        fn test_yaml_rejects_name_without_role() {
            assert!(serde_yaml_ng::from_str::<LocatorSpec>("{css: a, name: b}").is_err());
        }

        #[test]
        fn test_yaml_rejects_empty_frame_hop() {
            assert!(serde_yaml_ng::from_str::<LocatorSpec>("{frames: [{name: ''}], css: a}").is_err());
        }

        #[test]
        fn test_nth_display() {
            let spec = LocatorSpec::css("li").nth(2);
            assert_eq!(spec.to_string(), "css=li >> nth=2");
        }
    }

    mod node_path_tests {
        use super::*;

        #[test]
        fn test_json_shape() {
            let path = NodePath::new(vec![PathStep::Child(0), PathStep::Shadow, PathStep::Frame]);
            let json = serde_json::to_string(&path).unwrap();
            assert_eq!(json, r#"[{"child":0},"shadow","frame"]"#);
            let back: NodePath = serde_json::from_str(&json).unwrap();
            assert_eq!(back, path);
        }

        #[test]
        fn test_display() {
            let path = NodePath::default()
                .join(PathStep::Child(1))
                .join(PathStep::Shadow)
                .join(PathStep::Child(0));
            assert_eq!(path.to_string(), "/1/#shadow/0");
        }
    }

    mod bounding_box_tests {
        use super::*;

        #[test]
        fn test_center() {
            let bbox = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
            assert_eq!(bbox.center(), (60.0, 45.0));
            assert!(bbox.has_area());
            assert!(!BoundingBox::default().has_area());
        }
    }
}
