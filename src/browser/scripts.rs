//! JavaScript snippets evaluated in the page.
//!
//! Locators are resolved in the page the same way they are resolved on DOM
//! snapshots: first element matching the CSS selector whose rendered text
//! contains the optional fragment.

use super::{ClassScope, Locator};

/// Attribute used to hand a located element over to CDP element handles.
pub const MARK_ATTR: &str = "data-roadcap-target";

/// Selector matching the element marked by [`mark`].
pub fn marked_selector() -> String {
    format!("[{}=\"1\"]", MARK_ATTR)
}

fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Wrap `body` in a function that binds `el` to the first match of `locator`.
fn with_element(locator: &Locator, body: &str) -> String {
    let text = locator.text().map(js_str).unwrap_or_else(|| "null".into());
    format!(
        r#"(() => {{
    const text = {text};
    const el = Array.from(document.querySelectorAll({css}))
        .find(e => text === null || (e.innerText || e.textContent || '').includes(text)) || null;
    {body}
}})()"#,
        css = js_str(locator.css()),
        text = text,
        body = body,
    )
}

/// Returns a boolean: present and rendered with a non-empty box.
pub fn visible(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return false;
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';"#,
    )
}

/// Returns a boolean: whether an element was marked.
pub fn mark(locator: &Locator) -> String {
    with_element(
        locator,
        &format!(
            r#"document.querySelectorAll('[{attr}]').forEach(e => e.removeAttribute('{attr}'));
    if (!el) return false;
    el.setAttribute('{attr}', '1');
    return true;"#,
            attr = MARK_ATTR
        ),
    )
}

/// Clear then fill an input, firing the events frameworks listen for.
pub fn fill(locator: &Locator, value: &str) -> String {
    with_element(
        locator,
        &format!(
            r#"if (!el) return false;
    el.focus();
    el.value = '';
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.value = {value};
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;"#,
            value = js_str(value)
        ),
    )
}

/// Returns `[found, classAttribute]`.
pub fn class_of(locator: &Locator, scope: ClassScope) -> String {
    let target = match scope {
        ClassScope::Own => "el",
        ClassScope::Parent => "el.parentElement",
    };
    with_element(
        locator,
        &format!(
            r#"if (!el) return [false, ''];
    const target = {target};
    return [true, target ? (target.getAttribute('class') || '') : ''];"#,
            target = target
        ),
    )
}

/// Number of resource-timing entries recorded so far.
pub const RESOURCE_COUNT: &str = "performance.getEntriesByType('resource').length";
