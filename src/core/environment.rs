use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// A page routine plus its serializable arguments.
///
/// This is what gets shipped into the page context; each variant maps to
/// one function of the injected helper script (or its static equivalent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum PageCall {
    /// Trimmed text (or `attr`/`prop` value) of every matched node.
    /// Resolves to `null` when the query itself could not be run.
    Query {
        selector: String,
        attr: Option<String>,
        prop: Option<String>,
    },
    Count {
        selector: String,
    },
    /// `true` when at least one matched node is visible.
    Visible {
        selector: String,
    },
    Click {
        selector: String,
    },
    MouseDown {
        selector: String,
    },
    MouseUp {
        selector: String,
    },
    Focus {
        selector: String,
    },
    Blur {
        selector: String,
    },
    Type {
        selector: String,
        text: String,
    },
    ChangeElement {
        selector: String,
        #[serde(default)]
        style: Map<String, Value>,
        #[serde(default)]
        attr: Map<String, Value>,
    },
    Scroll {
        selector: Option<String>,
    },
    ScrollHeight {
        selector: Option<String>,
    },
    Url,
    Open {
        url: String,
    },
    Back,
    ReadyState,
    InjectHelpers,
}

impl PageCall {
    pub fn query(selector: impl Into<String>) -> Self {
        PageCall::Query {
            selector: selector.into(),
            attr: None,
            prop: None,
        }
    }

    pub fn count(selector: impl Into<String>) -> Self {
        PageCall::Count {
            selector: selector.into(),
        }
    }
}

/// Events delivered by the environment to event-based waits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PageEvent {
    Navigated { url: String },
    Request { url: String },
    Error { message: String },
}

/// The live document the parser drives.
///
/// Implementations own ordering of page calls; the parser never issues
/// two mutating calls at once except from racing `cases` chains.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Bring the document up before a parse.
    async fn prepare(&self) -> Result<()>;

    /// Release everything acquired in `prepare`.
    async fn tear_down(&self) -> Result<()>;

    /// Run a page routine and return its JSON result.
    async fn evaluate(&self, call: PageCall) -> Result<Value>;

    /// Best-effort diagnostic capture.
    async fn snapshot(&self, label: &str) -> Result<()>;

    /// Subscribe to page events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<PageEvent>;
}
