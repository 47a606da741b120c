//! In-page programs evaluated by the CDP driver.
//!
//! The probe receives a serialized [`LocatorSpec`] and returns a [`Probe`]
//! as JSON. Matching rules mirror the Rust side: whitespace-normalized text,
//! case-insensitive substring by default, deepest element for text matches,
//! DOM order with shadow trees before light children.
//!
//! [`LocatorSpec`]: super::LocatorSpec
//! [`Probe`]: super::Probe

use super::{LocatorSpec, NodePath};
use crate::result::HarnessResult;

const PRELUDE: &str = r##"
const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();

const textMatches = (m, raw) => {
  if (m === null || m === undefined) return true;
  const t = norm(raw);
  if (typeof m === 'string') return t.toLowerCase().includes(norm(m).toLowerCase());
  if (Object.prototype.hasOwnProperty.call(m, 'exact')) return t === norm(m.exact);
  try { return new RegExp(m.regex, m.ignore_case ? 'i' : '').test(t); } catch (_) { return false; }
};

const SKIP = new Set(['SCRIPT', 'STYLE', 'TEMPLATE', 'NOSCRIPT']);

const fullText = (node) => {
  let out = '';
  if (node.shadowRoot) out += fullText(node.shadowRoot) + ' ';
  for (const child of node.childNodes) {
    if (child.nodeType === 3) out += child.data;
    else if (child.nodeType === 1 && !SKIP.has(child.tagName)) out += fullText(child);
  }
  return out;
};

const walk = (container, base, out) => {
  const kids = container.children;
  for (let i = 0; i < kids.length; i++) {
    const el = kids[i];
    const p = base.concat([{ child: i }]);
    out.push([el, p]);
    descend(el, p, out);
  }
  return out;
};

const descend = (node, path, out) => {
  if (node.shadowRoot) walk(node.shadowRoot, path.concat(['shadow']), out);
  walk(node, path, out);
  return out;
};

const resolvePath = (path) => {
  let node = document;
  const frames = [];
  for (const step of path) {
    if (!node) return null;
    if (step === 'shadow') node = node.shadowRoot;
    else if (step === 'frame') { frames.push(node); node = node.contentDocument; }
    else node = node.children[step.child];
  }
  return node ? { node, frames } : null;
};

const frameOffset = (frames) => {
  let x = 0, y = 0;
  for (const f of frames) {
    const r = f.getBoundingClientRect();
    x += r.left + f.clientLeft;
    y += r.top + f.clientTop;
  }
  return { x, y };
};
"##;

const PROBE: &str = r##"
const IMPLICIT = (el) => {
  const tag = el.tagName.toLowerCase();
  const type = (el.getAttribute('type') || '').toLowerCase();
  switch (tag) {
    case 'button': return 'button';
    case 'a': case 'area': return el.hasAttribute('href') ? 'link' : null;
    case 'input':
      if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
      if (type === 'checkbox') return 'checkbox';
      if (type === 'radio') return 'radio';
      if (type === 'range') return 'slider';
      if (type === 'number') return 'spinbutton';
      if (type === 'search') return 'searchbox';
      if (type === 'hidden') return null;
      return 'textbox';
    case 'textarea': return 'textbox';
    case 'select': return (el.multiple || el.size > 1) ? 'listbox' : 'combobox';
    case 'option': return 'option';
    case 'h1': case 'h2': case 'h3': case 'h4': case 'h5': case 'h6': return 'heading';
    case 'img': return el.getAttribute('alt') === '' ? 'presentation' : 'img';
    case 'ul': case 'ol': return 'list';
    case 'li': return 'listitem';
    case 'table': return 'table';
    case 'tr': return 'row';
    case 'td': return 'cell';
    case 'th': return 'columnheader';
    case 'nav': return 'navigation';
    case 'main': return 'main';
    case 'dialog': return 'dialog';
    case 'header': return 'banner';
    case 'footer': return 'contentinfo';
    case 'article': return 'article';
    case 'aside': return 'complementary';
    case 'form': return 'form';
    case 'section': return (el.hasAttribute('aria-label') || el.hasAttribute('aria-labelledby')) ? 'region' : null;
    case 'progress': return 'progressbar';
    default: return null;
  }
};

const roleOf = (el) => {
  const explicit = (el.getAttribute('role') || '').trim().split(/\s+/)[0];
  return explicit || IMPLICIT(el);
};

const byIds = (el, ids) => ids.split(/\s+/)
  .map((id) => (el.getRootNode().getElementById ? el.getRootNode().getElementById(id) : document.getElementById(id)))
  .filter(Boolean)
  .map((n) => fullText(n))
  .join(' ');

const labelsOf = (el) => {
  const out = [];
  if (el.hasAttribute('aria-labelledby')) out.push(byIds(el, el.getAttribute('aria-labelledby')));
  if (el.hasAttribute('aria-label')) out.push(el.getAttribute('aria-label'));
  if (el.labels) for (const l of el.labels) out.push(fullText(l));
  return out.map(norm).filter((s) => s.length > 0);
};

const accessibleName = (el) => {
  const labels = labelsOf(el);
  if (labels.length) return labels[0];
  const tag = el.tagName.toLowerCase();
  if (tag === 'img') return el.getAttribute('alt') || el.getAttribute('title') || '';
  if (tag === 'input') {
    const type = (el.getAttribute('type') || '').toLowerCase();
    if (['button', 'submit', 'reset'].includes(type)) return el.value || '';
    return el.getAttribute('placeholder') || el.getAttribute('title') || '';
  }
  if (tag === 'textarea') return el.getAttribute('placeholder') || el.getAttribute('title') || '';
  const text = norm(fullText(el));
  return text || el.getAttribute('title') || '';
};

const globToRegExp = (glob) => new RegExp('^' + glob
  .replace(/[.+^${}()|[\]\\?]/g, '\\$&')
  .replace(/\*+/g, '.*') + '$');

const frameUrl = (el) => {
  try { if (el.contentWindow && el.contentWindow.location.href !== 'about:blank') return el.contentWindow.location.href; } catch (_) {}
  return el.src || '';
};

const hopMatches = (hop, el) => {
  const tag = el.tagName;
  if (tag !== 'IFRAME' && tag !== 'FRAME') return false;
  if ('title' in hop) {
    let docTitle = '';
    try { docTitle = el.contentDocument ? el.contentDocument.title : ''; } catch (_) {}
    return el.getAttribute('title') === hop.title || docTitle === hop.title;
  }
  if ('url_contains' in hop) return frameUrl(el).includes(hop.url_contains);
  if ('url_glob' in hop) return globToRegExp(hop.url_glob).test(frameUrl(el));
  if ('css' in hop) { try { return el.matches(hop.css); } catch (_) { return false; } }
  if ('name' in hop) return el.name === hop.name || el.getAttribute('name') === hop.name;
  return false;
};

const isVisible = (el) => {
  if (!el.isConnected) return false;
  const r = el.getBoundingClientRect();
  if (r.width <= 0 || r.height <= 0) return false;
  const view = el.ownerDocument.defaultView;
  const style = view ? view.getComputedStyle(el) : null;
  return !style || (style.display !== 'none' && style.visibility !== 'hidden' && style.visibility !== 'collapse');
};

const isEnabled = (el) => {
  if (el.disabled === true) return false;
  if (el.getAttribute('aria-disabled') === 'true') return false;
  const fieldset = el.closest ? el.closest('fieldset[disabled]') : null;
  return !fieldset;
};

const NON_TEXT = ['button', 'submit', 'reset', 'image', 'checkbox', 'radio', 'range', 'color', 'file', 'hidden'];

const isEditable = (el) => {
  if (el.isContentEditable) return true;
  const tag = el.tagName.toLowerCase();
  if (tag === 'textarea') return !el.readOnly;
  if (tag === 'input') return !el.readOnly && !NON_TEXT.includes((el.type || '').toLowerCase());
  return false;
};

const strategyMatches = (sel, el) => {
  if (SKIP.has(el.tagName)) return false;
  if (sel.css !== undefined) return el.matches(sel.css);
  if (sel.test_id !== undefined) return el.getAttribute('data-testid') === sel.test_id;
  if (sel.role !== undefined) {
    if (roleOf(el) !== sel.role) return false;
    return sel.name === undefined || textMatches(sel.name, accessibleName(el));
  }
  if (sel.label !== undefined) return labelsOf(el).some((l) => textMatches(sel.label, l));
  if (sel.text !== undefined) return textMatches(sel.text, fullText(el));
  return false;
};

const candidates = (sel, scope) => {
  const all = scope.filter(([el]) => strategyMatches(sel, el));
  if (sel.text === undefined) return all;
  // Keep the deepest: drop any match that contains another match.
  return all.filter(([el]) => !all.some(([other]) => other !== el && contains(el, other)));
};

const contains = (outer, inner) => {
  let node = inner;
  while (node) {
    let parent = node.parentNode;
    if (parent && parent.nodeType === 11 && parent.host) parent = parent.host;
    if (parent === outer) return true;
    node = parent;
  }
  return false;
};

const pick = (index, n) => {
  if (index === undefined || index === 'first') return n > 0 ? 0 : -1;
  if (index === 'last') return n - 1;
  return index < n ? index : -1;
};

const snapshot = ([el, path], offset) => {
  const r = el.getBoundingClientRect();
  const laidOut = r.width > 0 || r.height > 0;
  const tag = el.tagName.toLowerCase();
  return {
    path,
    tag,
    text: (tag === 'input' || tag === 'textarea') ? norm(el.value) : norm(fullText(el)),
    visible: isVisible(el),
    enabled: isEnabled(el),
    editable: isEditable(el),
    bounding_box: laidOut ? { x: r.left + offset.x, y: r.top + offset.y, width: r.width, height: r.height } : null,
  };
};

const probe = (spec) => {
  let root = document;
  let rootPath = [];
  const frames = [];
  let resolved = 0;
  for (const hop of (spec.frames || [])) {
    const scope = descend(root, rootPath, []);
    const hit = scope.find(([el]) => hopMatches(hop, el));
    if (!hit) return { frames_resolved: resolved, count: 0, element: null };
    let doc = null;
    try { doc = hit[0].contentDocument; } catch (_) {}
    if (!doc || !doc.documentElement) return { frames_resolved: resolved, count: 0, element: null };
    frames.push(hit[0]);
    root = doc;
    rootPath = hit[1].concat(['frame']);
    resolved += 1;
  }

  let scope = descend(root, rootPath, []);
  for (const sel of (spec.within || [])) {
    const found = candidates(sel, scope);
    const at = pick(sel.index, found.length);
    if (at < 0) return { frames_resolved: resolved, count: 0, element: null };
    const [el, path] = found[at];
    scope = descend(el, path, []);
  }

  const found = candidates(spec, scope);
  const at = pick(spec.index, found.length);
  return {
    frames_resolved: resolved,
    count: found.length,
    element: at < 0 ? null : snapshot(found[at], frameOffset(frames)),
  };
};
"##;

/// Expression evaluating to the probe result for `spec`
pub(crate) fn probe_expression(spec: &LocatorSpec) -> HarnessResult<String> {
    let spec = serde_json::to_string(spec)?;
    Ok(format!(
        "(() => {{ {PRELUDE} {PROBE} try {{ return probe({spec}); }} catch (e) {{ return {{ error: String(e && e.message || e) }}; }} }})()"
    ))
}

/// Expression scrolling the node into view and returning its center in
/// top-level viewport coordinates, or `null` if the node is gone
pub(crate) fn center_expression(path: &NodePath) -> HarnessResult<String> {
    let path = serde_json::to_string(path)?;
    Ok(format!(
        r##"(() => {{ {PRELUDE}
  const hit = resolvePath({path});
  if (!hit || hit.node.nodeType !== 1) return null;
  for (const f of hit.frames) f.scrollIntoView({{ block: 'center', inline: 'center' }});
  hit.node.scrollIntoView({{ block: 'center', inline: 'center' }});
  const off = frameOffset(hit.frames);
  const r = hit.node.getBoundingClientRect();
  return {{ x: off.x + r.left + r.width / 2, y: off.y + r.top + r.height / 2 }};
}})()"##
    ))
}

/// Expression focusing the node and clearing its current value; evaluates
/// to `false` if the node is gone
pub(crate) fn focus_clear_expression(path: &NodePath) -> HarnessResult<String> {
    let path = serde_json::to_string(path)?;
    Ok(format!(
        r##"(() => {{ {PRELUDE}
  const hit = resolvePath({path});
  if (!hit || hit.node.nodeType !== 1) return false;
  const el = hit.node;
  el.focus();
  if ('value' in el) {{
    el.value = '';
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  }} else if (el.isContentEditable) {{
    el.ownerDocument.execCommand('selectAll', false);
    el.ownerDocument.execCommand('delete', false);
  }}
  return true;
}})()"##
    ))
}

/// Expression reporting `document.readyState`
pub(crate) const READY_STATE_EXPRESSION: &str = "document.readyState";

/// Expression counting resource timing entries
pub(crate) const RESOURCE_COUNT_EXPRESSION: &str =
    "performance.getEntriesByType('resource').length";

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::{FrameHop, PathStep, Selection};

    #[test]
    fn test_probe_embeds_serialized_spec() {
        let spec = LocatorSpec::role_named("button", "Abrir chat")
            .in_frame(FrameHop::UrlContains("/iframe".into()))
            .within(Selection::css("#chatboc-widget-container"));
        let js = probe_expression(&spec).unwrap();
        assert!(js.contains(r#""url_contains":"/iframe""#));
        assert!(js.contains(r#""role":"button""#));
        assert!(js.contains(r#""name":"Abrir chat""#));
        assert!(js.starts_with("(() => {"));
        assert!(js.ends_with("})()"));
    }

    #[test]
    fn test_probe_escapes_quotes() {
        let spec = LocatorSpec::css(r#"button[aria-label="Cerrar"]"#);
        let js = probe_expression(&spec).unwrap();
        assert!(js.contains(r#""css":"button[aria-label=\"Cerrar\"]""#));
    }

    #[test]
    fn test_path_expressions_embed_path() {
        let path = NodePath::new(vec![PathStep::Child(0), PathStep::Frame, PathStep::Child(1)]);
        let center = center_expression(&path).unwrap();
        assert!(center.contains(r#"resolvePath([{"child":0},"frame",{"child":1}])"#));
        let focus = focus_clear_expression(&path).unwrap();
        assert!(focus.contains("el.focus()"));
    }
}
