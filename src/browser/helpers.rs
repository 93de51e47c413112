use crate::core::PageCall;
use crate::errors::Result;

/// Page-side counterpart of [`PageCall`], installed as `window.__pageParser`.
///
/// Idempotent: re-running it on a page that already has the helpers is a
/// no-op, so it is safe to send ahead of every call.
pub const HELPER_SCRIPT: &str = r#"
(function () {
    if (window.__pageParser) { return; }

    function select(selector) {
        var parts = selector.split(/:eq\((\d+)\)/);
        var current = null;
        for (var i = 0; i < parts.length; i += 2) {
            var segment = parts[i];
            var trimmed = segment.trim();
            if (current === null) {
                current = trimmed ? Array.prototype.slice.call(document.querySelectorAll(trimmed)) : [];
            } else if (trimmed) {
                var next = [];
                var descendant = /^\s/.test(segment);
                current.forEach(function (el) {
                    if (trimmed.charAt(0) === '>') {
                        Array.prototype.forEach.call(el.children, function (child) {
                            if (child.matches(trimmed.slice(1).trim())) { next.push(child); }
                        });
                    } else if (descendant) {
                        Array.prototype.push.apply(next, el.querySelectorAll(trimmed));
                    } else if (el.matches(trimmed)) {
                        next.push(el);
                    }
                });
                current = next.filter(function (el, index) { return next.indexOf(el) === index; });
            }
            if (i + 1 < parts.length) {
                var n = parseInt(parts[i + 1], 10);
                current = current[n] ? [current[n]] : [];
            }
        }
        return current || [];
    }

    function isVisible(el) {
        var style = window.getComputedStyle(el);
        var boxed = el.offsetWidth || el.offsetHeight || el.getClientRects().length;
        return !!boxed && style.visibility !== 'hidden' && style.display !== 'none';
    }

    function read(el, call) {
        if (call.attr) { return el.getAttribute(call.attr); }
        switch (call.prop) {
            case undefined:
            case null: return el.textContent;
            case 'value': return el.value;
            case 'innerHTML': return el.innerHTML;
            case 'outerHTML': return el.outerHTML;
            case 'textContent': return el.textContent;
            case 'innerText': return el.innerText;
            default: return el.getAttribute(call.prop);
        }
    }

    function fire(el, type) {
        el.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window }));
    }

    function each(call, fn) {
        var els = select(call.selector);
        els.forEach(fn);
        return els.length > 0;
    }

    var routines = {
        query: function (call) {
            var els;
            try { els = select(call.selector); } catch (e) { return null; }
            return els
                .map(function (el) { return read(el, call); })
                .filter(function (v) { return v !== null && v !== undefined; })
                .map(function (v) { return String(v).trim(); });
        },
        count: function (call) { return select(call.selector).length; },
        visible: function (call) { return select(call.selector).some(isVisible); },
        click: function (call) {
            var els = select(call.selector);
            if (els.length) { els[0].click(); }
            return els.length > 0;
        },
        mouseDown: function (call) { return each(call, function (el) { fire(el, 'mousedown'); }); },
        mouseUp: function (call) { return each(call, function (el) { fire(el, 'mouseup'); }); },
        focus: function (call) {
            var els = select(call.selector);
            if (els.length) { els[0].focus(); }
            return els.length > 0;
        },
        blur: function (call) { return each(call, function (el) { el.blur(); }); },
        type: function (call) {
            return each(call, function (el) {
                el.value = call.text;
                el.dispatchEvent(new Event('input', { bubbles: true }));
                el.dispatchEvent(new Event('change', { bubbles: true }));
            });
        },
        changeElement: function (call) {
            return each(call, function (el) {
                Object.keys(call.style || {}).forEach(function (k) { el.style[k] = call.style[k]; });
                Object.keys(call.attr || {}).forEach(function (k) {
                    if (call.attr[k] === null) { el.removeAttribute(k); }
                    else { el.setAttribute(k, call.attr[k]); }
                });
            });
        },
        scroll: function (call) {
            if (call.selector) {
                return each(call, function (el) { el.scrollTop = el.scrollHeight; });
            }
            window.scrollTo(0, document.body.scrollHeight);
            return true;
        },
        scrollHeight: function (call) {
            if (call.selector) {
                var els = select(call.selector);
                return els.length ? els[0].scrollHeight : 0;
            }
            return document.body.scrollHeight;
        },
        url: function () { return window.location.href; },
        readyState: function () { return document.readyState; },
        injectHelpers: function () { return true; }
    };

    window.__pageParser = {
        run: function (call) {
            var routine = routines[call.call];
            if (!routine) { throw new Error('unsupported page call ' + call.call); }
            return routine(call);
        }
    };
})();
"#;

/// Expression evaluating `call` in the page; the result comes back as a
/// JSON string so arrays and objects survive the protocol.
pub fn page_expression(call: &PageCall) -> Result<String> {
    let payload = serde_json::to_string(call)?;
    Ok(format!(
        "{}\nJSON.stringify(window.__pageParser.run({}))",
        HELPER_SCRIPT, payload
    ))
}
