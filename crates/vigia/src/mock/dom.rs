//! In-memory DOM with frames, shadow roots and timed mounting.

use super::css::Selector;
use crate::locator::{
    normalize, BoundingBox, ElementSnapshot, FrameHop, LocatorSpec, NodePath, PathStep, Probe,
    Selection, Strategy,
};
use crate::network::{glob_matches, UrlPattern};
use crate::result::HarnessResult;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// One element of a mock document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockNode {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<MockNode>,
    shadow: Option<Vec<MockNode>>,
    frame: Option<Box<MockDocument>>,
    hidden: bool,
    mounts_after: Option<Duration>,
    reveals: Vec<String>,
}

impl MockNode {
    /// Element with a tag name
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// `<button>` with text
    #[must_use]
    pub fn button(text: &str) -> Self {
        Self::new("button").text(text)
    }

    /// `<iframe>` hosting a document
    #[must_use]
    pub fn iframe(document: MockDocument) -> Self {
        Self::new("iframe").frame(document)
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the id
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let joined = match self.attrs.get("class") {
            Some(existing) => format!("{existing} {class}"),
            None => class.to_string(),
        };
        self.attrs.insert("class".to_string(), joined);
        self
    }

    /// Set own text (rendered before children)
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Append a light-DOM child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several light-DOM children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach an open shadow root
    #[must_use]
    pub fn shadow(mut self, content: impl IntoIterator<Item = Self>) -> Self {
        self.shadow = Some(content.into_iter().collect());
        self
    }

    /// Host a frame document; sets `src` to its URL
    #[must_use]
    pub fn frame(mut self, document: MockDocument) -> Self {
        self.attrs.insert("src".to_string(), document.url.clone());
        self.frame = Some(Box::new(document));
        self
    }

    /// Render with `display: none` until revealed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Mark disabled
    #[must_use]
    pub fn disabled(self) -> Self {
        self.attr("disabled", "")
    }

    /// Attach only after `delay` has passed since the last navigation
    #[must_use]
    pub const fn mounts_after(mut self, delay: Duration) -> Self {
        self.mounts_after = Some(delay);
        self
    }

    /// Clicking this node mounts and shows the node with `id`
    #[must_use]
    pub fn reveals(mut self, id: &str) -> Self {
        self.reveals.push(id.to_string());
        self
    }

    /// Lower-case tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value
    #[must_use]
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub(crate) fn revealed_ids(&self) -> &[String] {
        &self.reveals
    }
}

/// A document: the top-level page or a frame's content
///
/// Nodes added with [`MockDocument::child`] become children of the
/// document's `<body>`, which is the single root of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MockDocument {
    url: String,
    title: String,
    body: MockNode,
}

impl MockDocument {
    /// Empty document at `url`
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            body: MockNode::new("body"),
        }
    }

    /// Set the document title
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Append an element to `<body>`
    #[must_use]
    pub fn child(mut self, node: MockNode) -> Self {
        self.body.children.push(node);
        self
    }

    /// Document URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn roots(&self) -> &[MockNode] {
        std::slice::from_ref(&self.body)
    }
}

/// Pages served by URL pattern; first match wins
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    pages: Vec<(UrlPattern, MockDocument)>,
}

impl MockSite {
    /// Empty site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` for URLs matching `pattern`
    #[must_use]
    pub fn page(mut self, pattern: UrlPattern, document: MockDocument) -> Self {
        self.pages.push((pattern, document));
        self
    }

    /// Document served for `url`
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<&MockDocument> {
        self.pages
            .iter()
            .find(|(pattern, _)| pattern.matches(url))
            .map(|(_, doc)| doc)
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Dynamic state layered over a static document
#[derive(Debug, Clone, Copy)]
pub(crate) struct DomState<'s> {
    pub since_load: Duration,
    pub revealed: &'s HashSet<String>,
    pub values: &'s HashMap<NodePath, String>,
}

impl DomState<'_> {
    fn revealed(&self, node: &MockNode) -> bool {
        node.attr_value("id")
            .is_some_and(|id| self.revealed.contains(id))
    }

    fn mounted(&self, node: &MockNode) -> bool {
        self.revealed(node) || node.mounts_after.map_or(true, |d| self.since_load >= d)
    }

    fn hidden(&self, node: &MockNode) -> bool {
        node.hidden && !self.revealed(node)
    }
}

#[derive(Debug, Clone)]
struct Live<'a> {
    node: &'a MockNode,
    path: NodePath,
    ancestors: Vec<&'a MockNode>,
    hidden: bool,
}

fn collect<'a>(
    nodes: &'a [MockNode],
    base: &NodePath,
    ancestors: &[&'a MockNode],
    parent_hidden: bool,
    state: DomState<'_>,
    out: &mut Vec<Live<'a>>,
) {
    let mounted = nodes.iter().filter(|n| state.mounted(n));
    for (i, node) in mounted.enumerate() {
        let live = Live {
            node,
            path: base.join(PathStep::Child(i)),
            ancestors: ancestors.to_vec(),
            hidden: parent_hidden || state.hidden(node),
        };
        out.push(live.clone());
        descend(&live, state, out);
    }
}

fn descend<'a>(live: &Live<'a>, state: DomState<'_>, out: &mut Vec<Live<'a>>) {
    if let Some(shadow) = &live.node.shadow {
        collect(
            shadow,
            &live.path.join(PathStep::Shadow),
            &[],
            live.hidden,
            state,
            out,
        );
    }
    let mut chain = live.ancestors.clone();
    chain.push(live.node);
    collect(&live.node.children, &live.path, &chain, live.hidden, state, out);
}

fn document_nodes<'a>(doc: &'a MockDocument, root: &NodePath, state: DomState<'_>) -> Vec<Live<'a>> {
    let mut out = Vec::new();
    collect(doc.roots(), root, &[], false, state, &mut out);
    out
}

fn full_text(node: &MockNode, state: DomState<'_>) -> String {
    let mut parts = vec![node.text.clone()];
    if let Some(shadow) = &node.shadow {
        parts.extend(shadow.iter().filter(|n| state.mounted(n)).map(|n| full_text(n, state)));
    }
    parts.extend(
        node.children
            .iter()
            .filter(|n| state.mounted(n))
            .map(|n| full_text(n, state)),
    );
    normalize(&parts.join(" "))
}

fn implicit_role(node: &MockNode) -> Option<&'static str> {
    let input_type = node.attr_value("type").unwrap_or("").to_ascii_lowercase();
    Some(match node.tag.as_str() {
        "button" => "button",
        "a" if node.attr_value("href").is_some() => "link",
        "input" => match input_type.as_str() {
            "button" | "submit" | "reset" | "image" => "button",
            "checkbox" => "checkbox",
            "radio" => "radio",
            "search" => "searchbox",
            "hidden" => return None,
            _ => "textbox",
        },
        "textarea" => "textbox",
        "select" => "combobox",
        "option" => "option",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "img" => "img",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "table" => "table",
        "tr" => "row",
        "td" => "cell",
        "th" => "columnheader",
        "nav" => "navigation",
        "main" => "main",
        "dialog" => "dialog",
        "header" => "banner",
        "footer" => "contentinfo",
        "form" => "form",
        _ => return None,
    })
}

fn role_of(node: &MockNode) -> Option<&str> {
    node.attr_value("role")
        .and_then(|r| r.split_whitespace().next())
        .or_else(|| implicit_role(node))
}

fn labels_of(live: &Live<'_>, doc: &[Live<'_>], state: DomState<'_>) -> Vec<String> {
    let node = live.node;
    let mut labels = Vec::new();
    if let Some(ids) = node.attr_value("aria-labelledby") {
        for id in ids.split_whitespace() {
            if let Some(target) = doc.iter().find(|l| l.node.attr_value("id") == Some(id)) {
                labels.push(full_text(target.node, state));
            }
        }
    }
    if let Some(label) = node.attr_value("aria-label") {
        labels.push(label.to_string());
    }
    if let Some(id) = node.attr_value("id") {
        labels.extend(
            doc.iter()
                .filter(|l| l.node.tag == "label" && l.node.attr_value("for") == Some(id))
                .map(|l| full_text(l.node, state)),
        );
    }
    labels.extend(
        live.ancestors
            .iter()
            .filter(|a| a.tag == "label")
            .map(|a| full_text(a, state)),
    );
    labels
        .into_iter()
        .map(|l| normalize(&l))
        .filter(|l| !l.is_empty())
        .collect()
}

fn accessible_name(live: &Live<'_>, doc: &[Live<'_>], state: DomState<'_>) -> String {
    if let Some(label) = labels_of(live, doc, state).into_iter().next() {
        return label;
    }
    let node = live.node;
    match node.tag.as_str() {
        "img" => node.attr_value("alt").unwrap_or_default().to_string(),
        "input" | "textarea" => node
            .attr_value("placeholder")
            .or_else(|| node.attr_value("value"))
            .unwrap_or_default()
            .to_string(),
        _ => full_text(node, state),
    }
}

fn is_enabled(node: &MockNode) -> bool {
    node.attr_value("disabled").is_none() && node.attr_value("aria-disabled") != Some("true")
}

fn is_editable(node: &MockNode) -> bool {
    if node.attr_value("readonly").is_some() {
        return false;
    }
    if node.attr_value("contenteditable").is_some_and(|v| v != "false") {
        return true;
    }
    match node.tag.as_str() {
        "textarea" => true,
        "input" => !matches!(
            node.attr_value("type").unwrap_or("text"),
            "button" | "submit" | "reset" | "image" | "checkbox" | "radio" | "range" | "color"
                | "file" | "hidden"
        ),
        _ => false,
    }
}

fn hop_matches(hop: &FrameHop, live: &Live<'_>) -> HarnessResult<bool> {
    let Some(doc) = live.node.frame.as_deref() else {
        return Ok(false);
    };
    let node = live.node;
    Ok(match hop {
        FrameHop::Title(title) => node.attr_value("title") == Some(title.as_str()) || doc.title == *title,
        FrameHop::UrlContains(part) => doc.url.contains(part.as_str()),
        FrameHop::UrlGlob(glob) => glob_matches(glob, &doc.url),
        FrameHop::Css(css) => Selector::parse(css)?.matches(node, &live.ancestors),
        FrameHop::Name(name) => node.attr_value("name") == Some(name.as_str()),
    })
}

fn candidates<'a>(
    selection: &Selection,
    scope: &[Live<'a>],
    doc: &[Live<'a>],
    state: DomState<'_>,
) -> HarnessResult<Vec<Live<'a>>> {
    let css = match selection.strategy() {
        Strategy::Css(css) => Some(Selector::parse(css)?),
        _ => None,
    };
    let matched: Vec<Live<'a>> = scope
        .iter()
        .filter(|live| match selection.strategy() {
            Strategy::Css(_) => css
                .as_ref()
                .is_some_and(|s| s.matches(live.node, &live.ancestors)),
            Strategy::TestId(id) => live.node.attr_value("data-testid") == Some(id.as_str()),
            Strategy::Role { role, name } => {
                role_of(live.node) == Some(role.as_str())
                    && name
                        .as_ref()
                        .map_or(true, |n| n.matches(&accessible_name(live, doc, state)))
            }
            Strategy::Label(m) => labels_of(live, doc, state).iter().any(|l| m.matches(l)),
            Strategy::Text(m) => m.matches(&full_text(live.node, state)),
        })
        .cloned()
        .collect();

    if !matches!(selection.strategy(), Strategy::Text(_)) {
        return Ok(matched);
    }
    let deepest = matched
        .iter()
        .filter(|outer| {
            !matched.iter().any(|inner| {
                inner.path.steps().len() > outer.path.steps().len()
                    && inner.path.steps().starts_with(outer.path.steps())
            })
        })
        .cloned()
        .collect();
    Ok(deepest)
}

fn subtree<'a>(live: &Live<'a>, state: DomState<'_>) -> Vec<Live<'a>> {
    let mut out = Vec::new();
    descend(live, state, &mut out);
    out
}

fn snapshot(live: &Live<'_>, order: usize, state: DomState<'_>) -> ElementSnapshot {
    let visible = !live.hidden;
    #[allow(clippy::cast_precision_loss)]
    let bounding_box = visible.then(|| BoundingBox::new(0.0, order as f64 * 24.0, 320.0, 24.0));
    let text = match live.node.tag.as_str() {
        "input" | "textarea" => state
            .values
            .get(&live.path)
            .map(|v| normalize(v))
            .or_else(|| live.node.attr_value("value").map(normalize))
            .unwrap_or_default(),
        _ => full_text(live.node, state),
    };
    ElementSnapshot {
        path: live.path.clone(),
        tag: live.node.tag.clone(),
        text,
        visible,
        enabled: is_enabled(live.node),
        editable: is_editable(live.node),
        bounding_box,
    }
}

/// Evaluate a locator against a document
pub(crate) fn probe(
    document: &MockDocument,
    spec: &LocatorSpec,
    state: DomState<'_>,
) -> HarnessResult<Probe> {
    let mut doc = document;
    let mut root = NodePath::default();
    let mut resolved = 0;

    for hop in spec.frames() {
        let mut next = None;
        for live in document_nodes(doc, &root, state) {
            if hop_matches(hop, &live)? {
                next = live.node.frame.as_deref().map(|d| (d, live.path.join(PathStep::Frame)));
                break;
            }
        }
        match next {
            Some((frame_doc, path)) => {
                doc = frame_doc;
                root = path;
                resolved += 1;
            }
            None => return Ok(Probe::empty(resolved)),
        }
    }

    let doc_nodes = document_nodes(doc, &root, state);
    let mut scope = doc_nodes.clone();
    for selection in spec.scopes() {
        let found = candidates(selection, &scope, &doc_nodes, state)?;
        match selection.index().pick(found.len()) {
            Some(i) => scope = subtree(&found[i], state),
            None => return Ok(Probe::empty(resolved)),
        }
    }

    let found = candidates(spec.target(), &scope, &doc_nodes, state)?;
    let element = spec.target().index().pick(found.len()).map(|i| {
        let order = doc_nodes
            .iter()
            .position(|l| l.path == found[i].path)
            .unwrap_or_default();
        snapshot(&found[i], order, state)
    });
    Ok(Probe {
        frames_resolved: resolved,
        count: found.len(),
        element,
    })
}

/// Find the live node at `path`
pub(crate) fn node_at<'a>(
    document: &'a MockDocument,
    path: &NodePath,
    state: DomState<'_>,
) -> Option<&'a MockNode> {
    let mut container: &'a [MockNode] = document.roots();
    let mut current: Option<&'a MockNode> = None;
    for step in path.steps() {
        match step {
            PathStep::Child(i) => {
                current = Some(container.iter().filter(|n| state.mounted(n)).nth(*i)?);
            }
            PathStep::Shadow => container = current?.shadow.as_deref()?,
            PathStep::Frame => container = current?.frame.as_deref()?.roots(),
        }
        if let (Some(node), PathStep::Child(_)) = (current, step) {
            container = &node.children;
        }
    }
    current
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::{Selection, TextMatch};

    struct Fixture {
        revealed: HashSet<String>,
        values: HashMap<NodePath, String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                revealed: HashSet::new(),
                values: HashMap::new(),
            }
        }

        fn at(&self, ms: u64) -> DomState<'_> {
            DomState {
                since_load: Duration::from_millis(ms),
                revealed: &self.revealed,
                values: &self.values,
            }
        }
    }

    fn widget_page() -> MockDocument {
        let chat = MockDocument::new("http://localhost:5173/iframe?widget=1")
            .title("Chat")
            .child(
                MockNode::new("div").id("panel").child(
                    MockNode::new("ul").children([
                        MockNode::new("li").child(MockNode::button("Hacer un Reclamo")),
                        MockNode::new("li").child(MockNode::button("Consultar Estado")),
                    ]),
                ),
            );
        MockDocument::new("http://localhost:5173/")
            .child(MockNode::new("h1").text("Municipio"))
            .child(
                MockNode::new("div")
                    .id("chatboc-widget-container")
                    .shadow([MockNode::iframe(chat)
                        .attr("name", "chatboc")
                        .mounts_after(Duration::from_millis(500))]),
            )
    }

    #[test]
    fn test_frame_inside_shadow_root_respects_mount_time() {
        let fx = Fixture::new();
        let doc = widget_page();
        let spec = LocatorSpec::role_named("button", "Hacer un Reclamo")
            .in_frame(FrameHop::UrlContains("/iframe".into()));

        let early = probe(&doc, &spec, fx.at(499)).unwrap();
        assert_eq!(early.frames_resolved, 0);
        assert!(early.element.is_none());

        let later = probe(&doc, &spec, fx.at(500)).unwrap();
        assert_eq!(later.frames_resolved, 1);
        assert_eq!(later.count, 1);
        let el = later.element.unwrap();
        assert_eq!(el.tag, "button");
        assert_eq!(
            el.path.steps(),
            &[
                PathStep::Child(0),
                PathStep::Child(1),
                PathStep::Shadow,
                PathStep::Child(0),
                PathStep::Frame,
                PathStep::Child(0),
                PathStep::Child(0),
                PathStep::Child(0),
                PathStep::Child(0),
                PathStep::Child(0),
            ]
        );
    }

    #[test]
    fn test_frame_hop_strategies() {
        let fx = Fixture::new();
        let doc = widget_page();
        for hop in [
            FrameHop::Title("Chat".into()),
            FrameHop::UrlGlob("**/iframe?*".into()),
            FrameHop::Css("iframe[name=chatboc]".into()),
            FrameHop::Name("chatboc".into()),
        ] {
            let spec = LocatorSpec::css("button").in_frame(hop.clone());
            let p = probe(&doc, &spec, fx.at(600)).unwrap();
            assert_eq!(p.count, 2, "{hop}");
        }
    }

    #[test]
    fn test_index_and_within() {
        let fx = Fixture::new();
        let doc = widget_page();
        let frame = FrameHop::Name("chatboc".into());
        let last = LocatorSpec::css("button").in_frame(frame.clone()).last();
        let p = probe(&doc, &last, fx.at(600)).unwrap();
        assert_eq!(p.element.unwrap().text, "Consultar Estado");

        let scoped = LocatorSpec::role("button")
            .in_frame(frame)
            .within(Selection::css("ul li").nth(1));
        let p = probe(&doc, &scoped, fx.at(600)).unwrap();
        assert_eq!(p.count, 1);
        assert_eq!(p.element.unwrap().text, "Consultar Estado");
    }

    #[test]
    fn test_text_strategy_picks_deepest() {
        let fx = Fixture::new();
        let doc = MockDocument::new("http://x/").child(
            MockNode::new("section")
                .child(MockNode::new("p").text("Tipos de Reclamo"))
                .child(MockNode::new("p").text("otro")),
        );
        let p = probe(&doc, &LocatorSpec::text("tipos de reclamo"), fx.at(0)).unwrap();
        assert_eq!(p.count, 1);
        assert_eq!(p.element.unwrap().tag, "p");
    }

    #[test]
    fn test_hidden_inherits_and_reveal() {
        let mut fx = Fixture::new();
        let doc = MockDocument::new("http://x/").child(
            MockNode::new("div")
                .id("menu")
                .hidden()
                .child(MockNode::button("Salir")),
        );
        let spec = LocatorSpec::role_named("button", "Salir");
        let p = probe(&doc, &spec, fx.at(0)).unwrap();
        assert!(!p.element.unwrap().visible);

        fx.revealed.insert("menu".into());
        let p = probe(&doc, &spec, fx.at(0)).unwrap();
        assert!(p.element.unwrap().visible);
    }

    #[test]
    fn test_label_strategies() {
        let fx = Fixture::new();
        let doc = MockDocument::new("http://x/")
            .child(MockNode::new("label").attr("for", "email").text("Correo"))
            .child(MockNode::new("input").id("email"))
            .child(MockNode::new("label").text("Clave").child(MockNode::new("input").attr("type", "password")))
            .child(MockNode::new("textarea").attr("aria-label", "Mensaje").attr("readonly", ""));

        let email = probe(&doc, &LocatorSpec::label("correo"), fx.at(0)).unwrap();
        assert!(email.element.unwrap().editable);
        let pass = probe(&doc, &LocatorSpec::label(TextMatch::exact("Clave")), fx.at(0)).unwrap();
        assert_eq!(pass.count, 1);
        let msg = probe(&doc, &LocatorSpec::label("mensaje"), fx.at(0)).unwrap();
        assert!(!msg.element.unwrap().editable);
    }

    #[test]
    fn test_role_name_and_disabled() {
        let fx = Fixture::new();
        let doc = MockDocument::new("http://x/")
            .child(MockNode::button("Enviar").disabled())
            .child(MockNode::new("a").attr("href", "/volver").text("Volver"))
            .child(MockNode::new("img").attr("alt", "Logo MercadoLibre"));
        let send = probe(&doc, &LocatorSpec::role_named("button", "enviar"), fx.at(0)).unwrap();
        assert!(!send.element.unwrap().enabled);
        let link = probe(&doc, &LocatorSpec::role_named("link", TextMatch::regex("^volver$", true).unwrap()), fx.at(0)).unwrap();
        assert_eq!(link.count, 1);
        let img = probe(&doc, &LocatorSpec::role_named("img", "mercadolibre"), fx.at(0)).unwrap();
        assert_eq!(img.count, 1);
    }

    #[test]
    fn test_node_at_follows_frames_and_shadow() {
        let fx = Fixture::new();
        let doc = widget_page();
        let spec = LocatorSpec::text("Consultar Estado").in_frame(FrameHop::Name("chatboc".into()));
        let el = probe(&doc, &spec, fx.at(600)).unwrap().element.unwrap();
        let node = node_at(&doc, &el.path, fx.at(600)).unwrap();
        assert_eq!(node.tag(), "button");
        assert!(node_at(&doc, &el.path, fx.at(100)).is_none());
    }

    #[test]
    fn test_invalid_css_is_script_error() {
        let fx = Fixture::new();
        let doc = widget_page();
        let err = probe(&doc, &LocatorSpec::css("button:visible"), fx.at(0)).unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_site_lookup() {
        let site = MockSite::new()
            .page(UrlPattern::Glob("**/admin*".into()), MockDocument::new("http://x/admin"))
            .page(UrlPattern::Any, MockDocument::new("http://x/"));
        assert_eq!(site.lookup("http://x/admin/users").unwrap().url(), "http://x/admin");
        assert_eq!(site.lookup("http://x/").unwrap().url(), "http://x/");
    }
}
