//! A static-document environment backed by `scraper`.
//!
//! Useful for offline parsing of saved pages and for tests. Page calls are
//! answered from the current HTML plus a small overlay of element state
//! (typed values, changed styles and attributes). Clicking an anchor whose
//! target was registered with [`HtmlEnvironment::with_page`] navigates to
//! it; clicking an element carrying `data-request` reports a request to
//! that URI. Each scroll serves the next document of the scroll feed.

use crate::core::{Environment, PageCall, PageEvent};
use crate::errors::{ParserError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{debug, trace};

const BLANK_URL: &str = "about:blank";
const ELEMENT_HEIGHT: usize = 20;

pub struct HtmlEnvironment {
    state: Mutex<PageState>,
    events: broadcast::Sender<PageEvent>,
}

#[derive(Default)]
struct PageState {
    url: String,
    html: String,
    pages: HashMap<String, String>,
    history: Vec<(String, String)>,
    scroll_feed: VecDeque<String>,
    overrides: HashMap<usize, ElementOverride>,
    focused: Option<usize>,
    interactions: Vec<String>,
    snapshots: Vec<String>,
    prepared: usize,
    torn_down: usize,
    helper_injections: usize,
}

#[derive(Debug, Clone, Default)]
struct ElementOverride {
    value: Option<String>,
    attrs: HashMap<String, Option<String>>,
    style: HashMap<String, String>,
}

impl HtmlEnvironment {
    pub fn new(html: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(PageState {
                url: BLANK_URL.to_string(),
                html: html.into(),
                ..Default::default()
            }),
            events,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.state.lock().url = url.into();
        self
    }

    /// Register a document reachable by `open` or by clicking a link.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.state.lock().pages.insert(url.into(), html.into());
        self
    }

    /// Documents served one by one on each scroll.
    pub fn with_scroll_feed(self, documents: Vec<String>) -> Self {
        self.state.lock().scroll_feed = documents.into();
        self
    }

    /// Replace the current document in place, as a script on the page would.
    pub fn set_content(&self, html: impl Into<String>) {
        let mut state = self.state.lock();
        state.html = html.into();
        state.overrides.clear();
    }

    pub fn content(&self) -> String {
        self.state.lock().html.clone()
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    /// Deliver an event to current subscribers.
    pub fn emit(&self, event: PageEvent) {
        let _ = self.events.send(event);
    }

    /// Interactions performed so far, as `kind:selector`.
    pub fn interactions(&self) -> Vec<String> {
        self.state.lock().interactions.clone()
    }

    pub fn snapshots(&self) -> Vec<String> {
        self.state.lock().snapshots.clone()
    }

    /// Number of `prepare` and `tear_down` calls so far.
    pub fn lifecycle(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.prepared, state.torn_down)
    }

    pub fn helper_injections(&self) -> usize {
        self.state.lock().helper_injections
    }

    /// Current value of the first field matching `selector`.
    pub fn value_of(&self, selector: &str) -> Option<String> {
        let state = self.state.lock();
        let document = Html::parse_document(&state.html);
        let element = select_all(&document, selector).ok()?.into_iter().next()?;
        state.effective_value(&document, &element)
    }

    fn navigate(&self, state: &mut PageState, url: String) -> Result<Value> {
        let html = state
            .pages
            .get(&url)
            .cloned()
            .ok_or_else(|| ParserError::NavigationFailed(format!("no document for {}", url)))?;
        let previous = (std::mem::take(&mut state.url), std::mem::take(&mut state.html));
        state.history.push(previous);
        state.url = url.clone();
        state.html = html;
        state.overrides.clear();
        state.focused = None;

        debug!(url = %url, "navigated");
        self.emit(PageEvent::Request { url: url.clone() });
        self.emit(PageEvent::Navigated { url: url.clone() });
        Ok(Value::String(url))
    }

    fn dispatch(&self, call: PageCall) -> Result<Value> {
        let mut state = self.state.lock();
        trace!(call = ?call, "page call");

        match call {
            PageCall::Query {
                selector,
                attr,
                prop,
            } => Ok(state.query(&selector, attr.as_deref(), prop.as_deref())),
            PageCall::Count { selector } => {
                let document = Html::parse_document(&state.html);
                Ok(Value::from(select_all(&document, &selector)?.len()))
            }
            PageCall::Visible { selector } => {
                let document = Html::parse_document(&state.html);
                let visible = select_all(&document, &selector)?
                    .iter()
                    .any(|element| state.is_visible(&document, element));
                Ok(Value::Bool(visible))
            }
            PageCall::Click { selector } => {
                state.interactions.push(format!("click:{}", selector));
                let (request, link) = {
                    let document = Html::parse_document(&state.html);
                    let matched = select_all(&document, &selector)?;
                    let first = match matched.first() {
                        Some(element) => element.value(),
                        None => return Ok(Value::Bool(false)),
                    };
                    let link = match first.name() {
                        "a" => first.attr("href").map(|href| resolve_link(&state.url, href)),
                        _ => None,
                    };
                    (first.attr("data-request").map(str::to_string), link)
                };

                if let Some(url) = request {
                    self.emit(PageEvent::Request { url });
                }
                if let Some(url) = link.filter(|url| state.pages.contains_key(url)) {
                    self.navigate(&mut state, url)?;
                }
                Ok(Value::Bool(true))
            }
            PageCall::MouseDown { selector } => state.touch("mouseDown", &selector),
            PageCall::MouseUp { selector } => state.touch("mouseUp", &selector),
            PageCall::Focus { selector } => {
                let document = Html::parse_document(&state.html);
                let first = select_all(&document, &selector)?
                    .first()
                    .map(|element| element_index(&document, element));
                state.interactions.push(format!("focus:{}", selector));
                state.focused = first;
                Ok(Value::Bool(first.is_some()))
            }
            PageCall::Blur { selector } => {
                state.interactions.push(format!("blur:{}", selector));
                let indices = state.indices(&selector)?;
                let blurred = matches!(state.focused, Some(focused) if indices.contains(&focused));
                if blurred {
                    state.focused = None;
                }
                Ok(Value::Bool(blurred))
            }
            PageCall::Type { selector, text } => {
                state.interactions.push(format!("type:{}", selector));
                let indices = state.indices(&selector)?;
                for index in &indices {
                    state.overrides.entry(*index).or_default().value = Some(text.clone());
                }
                Ok(Value::Bool(!indices.is_empty()))
            }
            PageCall::ChangeElement {
                selector,
                style,
                attr,
            } => {
                state.interactions.push(format!("changeElement:{}", selector));
                let indices = state.indices(&selector)?;
                for index in &indices {
                    let entry = state.overrides.entry(*index).or_default();
                    apply_style(entry, &style);
                    apply_attrs(entry, &attr);
                }
                Ok(Value::Bool(!indices.is_empty()))
            }
            PageCall::Scroll { selector } => {
                state.interactions.push(format!(
                    "scroll:{}",
                    selector.as_deref().unwrap_or("window")
                ));
                if let Some(next) = state.scroll_feed.pop_front() {
                    state.html = next;
                    state.overrides.clear();
                }
                Ok(Value::Bool(true))
            }
            PageCall::ScrollHeight { selector } => {
                let document = Html::parse_document(&state.html);
                let elements = match selector {
                    Some(selector) => select_all(&document, &selector)?
                        .iter()
                        .map(|element| element.descendants().count())
                        .sum(),
                    None => document.tree.root().descendants().count(),
                };
                Ok(Value::from(elements * ELEMENT_HEIGHT))
            }
            PageCall::Url => Ok(Value::String(state.url.clone())),
            PageCall::Open { url } => {
                state.interactions.push(format!("open:{}", url));
                self.navigate(&mut state, url)
            }
            PageCall::Back => match state.history.pop() {
                Some((url, html)) => {
                    state.url = url.clone();
                    state.html = html;
                    state.overrides.clear();
                    self.emit(PageEvent::Navigated { url: url.clone() });
                    Ok(Value::String(url))
                }
                None => Ok(Value::Bool(false)),
            },
            PageCall::ReadyState => Ok(Value::String("complete".to_string())),
            PageCall::InjectHelpers => {
                state.helper_injections += 1;
                Ok(Value::Bool(true))
            }
        }
    }
}

impl PageState {
    fn query(&self, selector: &str, attr: Option<&str>, prop: Option<&str>) -> Value {
        let document = Html::parse_document(&self.html);
        let matched = match select_all(&document, selector) {
            Ok(matched) => matched,
            Err(_) => return Value::Null,
        };

        let values = matched
            .iter()
            .filter_map(|element| match (attr, prop) {
                (Some(name), _) => self.effective_attr(&document, element, name),
                (None, Some(prop)) => self.property(&document, element, prop),
                (None, None) => Some(text_of(element)),
            })
            .map(|text| Value::String(text.trim().to_string()))
            .collect();
        Value::Array(values)
    }

    fn property(&self, document: &Html, element: &ElementRef<'_>, prop: &str) -> Option<String> {
        match prop {
            "value" => self.effective_value(document, element),
            "innerHTML" => Some(element.inner_html()),
            "outerHTML" => Some(element.html()),
            "textContent" | "innerText" => Some(text_of(element)),
            other => self.effective_attr(document, element, other),
        }
    }

    fn override_for(&self, document: &Html, element: &ElementRef<'_>) -> Option<&ElementOverride> {
        if self.overrides.is_empty() {
            return None;
        }
        self.overrides.get(&element_index(document, element))
    }

    fn effective_attr(&self, document: &Html, element: &ElementRef<'_>, name: &str) -> Option<String> {
        if let Some(changed) = self
            .override_for(document, element)
            .and_then(|o| o.attrs.get(name))
        {
            return changed.clone();
        }
        element.value().attr(name).map(str::to_string)
    }

    fn effective_value(&self, document: &Html, element: &ElementRef<'_>) -> Option<String> {
        if let Some(value) = self
            .override_for(document, element)
            .and_then(|o| o.value.clone())
        {
            return Some(value);
        }
        match element.value().name() {
            "textarea" => Some(text_of(element)),
            _ => self.effective_attr(document, element, "value"),
        }
    }

    fn is_visible(&self, document: &Html, element: &ElementRef<'_>) -> bool {
        let chain = std::iter::once(*element).chain(element.ancestors().filter_map(ElementRef::wrap));
        for node in chain {
            if self.effective_attr(document, &node, "hidden").is_some() {
                return false;
            }
            if node.value().name() == "input"
                && self.effective_attr(document, &node, "type").as_deref() == Some("hidden")
            {
                return false;
            }
            let mut style = parse_style(
                self.effective_attr(document, &node, "style")
                    .as_deref()
                    .unwrap_or(""),
            );
            if let Some(changed) = self.override_for(document, &node) {
                style.extend(changed.style.clone());
            }
            if style.get("display").map(String::as_str) == Some("none")
                || style.get("visibility").map(String::as_str) == Some("hidden")
            {
                return false;
            }
        }
        true
    }

    fn indices(&self, selector: &str) -> Result<Vec<usize>> {
        let document = Html::parse_document(&self.html);
        Ok(select_all(&document, selector)?
            .iter()
            .map(|element| element_index(&document, element))
            .collect())
    }

    fn touch(&mut self, kind: &str, selector: &str) -> Result<Value> {
        self.interactions.push(format!("{}:{}", kind, selector));
        self.touch_count(selector)
    }

    fn touch_count(&self, selector: &str) -> Result<Value> {
        let document = Html::parse_document(&self.html);
        Ok(Value::Bool(!select_all(&document, selector)?.is_empty()))
    }
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Position of `element` in document order.
fn element_index(document: &Html, element: &ElementRef<'_>) -> usize {
    let id = element.id();
    document
        .tree
        .root()
        .descendants()
        .position(|node| node.id() == id)
        .unwrap_or(usize::MAX)
}

fn parse_style(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            Some((name.trim().to_lowercase(), value.trim().to_lowercase()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn apply_style(entry: &mut ElementOverride, style: &Map<String, Value>) {
    for (name, value) in style {
        let value = match value {
            Value::String(s) => s.trim().to_lowercase(),
            other => other.to_string(),
        };
        entry.style.insert(name.to_lowercase(), value);
    }
}

fn apply_attrs(entry: &mut ElementOverride, attrs: &Map<String, Value>) {
    for (name, value) in attrs {
        let value = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        entry.attrs.insert(name.clone(), value);
    }
}

fn resolve_link(current: &str, href: &str) -> String {
    match url::Url::parse(current).and_then(|base| base.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}

fn invalid_selector(selector: &str) -> ParserError {
    ParserError::Environment(format!("invalid selector `{}`", selector))
}

/// Next `:eq(n)` in `rest` as (start, end, n).
fn next_position_filter(rest: &str) -> Option<(usize, usize, usize)> {
    let mut from = 0;
    while let Some(found) = rest[from..].find(":eq(") {
        let start = from + found;
        let digits = start + ":eq(".len();
        let close = digits + rest[digits..].find(')')?;
        if let Ok(position) = rest[digits..close].trim().parse::<usize>() {
            return Some((start, close + 1, position));
        }
        from = digits;
    }
    None
}

/// Select with CSS plus jQuery-style `:eq(n)` positional filters.
///
/// The selector is split at each `:eq(n)`; each piece is matched against
/// the set produced so far, then narrowed to its n-th member.
pub(crate) fn select_all<'a>(document: &'a Html, selector: &str) -> Result<Vec<ElementRef<'a>>> {
    let mut current: Option<Vec<ElementRef<'a>>> = None;
    let mut rest = selector;

    loop {
        let (segment, position, remainder) = match next_position_filter(rest) {
            Some((start, end, position)) => (&rest[..start], Some(position), &rest[end..]),
            None => (rest, None, ""),
        };

        current = Some(match current {
            None => {
                let parsed = Selector::parse(segment.trim()).map_err(|_| invalid_selector(selector))?;
                document.select(&parsed).collect()
            }
            Some(context) => narrow(context, segment, selector)?,
        });

        if let (Some(position), Some(set)) = (position, current.as_mut()) {
            *set = set.get(position).copied().into_iter().collect();
        }
        if position.is_none() || remainder.is_empty() {
            break;
        }
        rest = remainder;
    }

    let mut matched = current.unwrap_or_default();
    let mut seen = Vec::new();
    matched.retain(|element| {
        let id = element.id();
        if seen.contains(&id) {
            false
        } else {
            seen.push(id);
            true
        }
    });
    Ok(matched)
}

fn narrow<'a>(context: Vec<ElementRef<'a>>, segment: &str, whole: &str) -> Result<Vec<ElementRef<'a>>> {
    if segment.trim().is_empty() {
        return Ok(context);
    }

    let starts_descendant = segment.starts_with(char::is_whitespace);
    let trimmed = segment.trim();
    if let Some(child) = trimmed.strip_prefix('>') {
        let parsed = Selector::parse(child.trim()).map_err(|_| invalid_selector(whole))?;
        return Ok(context
            .iter()
            .flat_map(|element| element.children().filter_map(ElementRef::wrap))
            .filter(|child| parsed.matches(child))
            .collect());
    }

    let parsed = Selector::parse(trimmed).map_err(|_| invalid_selector(whole))?;
    if starts_descendant {
        Ok(context
            .iter()
            .flat_map(|element| element.select(&parsed))
            .collect())
    } else {
        Ok(context.into_iter().filter(|element| parsed.matches(element)).collect())
    }
}

#[async_trait]
impl Environment for HtmlEnvironment {
    async fn prepare(&self) -> Result<()> {
        self.state.lock().prepared += 1;
        Ok(())
    }

    async fn tear_down(&self) -> Result<()> {
        self.state.lock().torn_down += 1;
        Ok(())
    }

    async fn evaluate(&self, call: PageCall) -> Result<Value> {
        self.dispatch(call)
    }

    async fn snapshot(&self, label: &str) -> Result<()> {
        self.state.lock().snapshots.push(label.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }
}
