/// One level of selector context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    pub scope: String,
    pub parent_scope: Option<String>,
}

impl ScopeFrame {
    pub fn new(scope: impl Into<String>, parent_scope: Option<String>) -> Self {
        Self {
            scope: scope.into(),
            parent_scope,
        }
    }
}

/// Nested selector context, one frame per level of rule recursion.
///
/// Owned by a single evaluation; never shared between parses.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack whose outermost frame is an already-resolved selector.
    pub fn rooted_at(selector: &str) -> Self {
        let mut stack = Self::new();
        if !selector.trim().is_empty() {
            stack.push(ScopeFrame::new(selector, None));
        }
        stack
    }

    pub fn push(&mut self, frame: ScopeFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost to outermost, prepending each frame's scope and stopping
    /// after the first frame that carries a `parent_scope`.
    pub fn selector(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for frame in self.frames.iter().rev() {
            parts.push(&frame.scope);
            if let Some(parent) = &frame.parent_scope {
                parts.push(parent);
                break;
            }
        }
        parts.reverse();
        join_selectors(&parts)
    }
}

/// Join selector fragments with the descendant combinator.
pub fn join_selectors(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_concatenates_frames() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeFrame::new(".list", None));
        stack.push(ScopeFrame::new(".item:eq(2)", None));
        stack.push(ScopeFrame::new(".title", None));
        assert_eq!(stack.selector(), ".list .item:eq(2) .title");
    }

    #[test]
    fn parent_scope_cuts_the_chain() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeFrame::new(".outer", None));
        stack.push(ScopeFrame::new(".popup", Some("body".to_string())));
        stack.push(ScopeFrame::new(".title", None));
        assert_eq!(stack.selector(), "body .popup .title");
    }

    #[test]
    fn push_pop_tracks_depth() {
        let mut stack = ScopeStack::rooted_at("#root");
        assert_eq!(stack.depth(), 1);
        stack.push(ScopeFrame::new("a", None));
        assert_eq!(stack.pop(), Some(ScopeFrame::new("a", None)));
        assert_eq!(stack.selector(), "#root");
        assert!(ScopeStack::rooted_at("  ").is_empty());
    }
}
