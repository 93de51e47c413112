use crate::browser::helpers::{page_expression, HELPER_SCRIPT};
use crate::core::{ChromeConfig, Environment, PageCall, PageEvent};
use crate::errors::{ParserError, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::{Browser, LaunchOptions, Tab};
use parking_lot::Mutex;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Live Chrome tab driven over the DevTools protocol.
pub struct ChromeEnvironment {
    config: ChromeConfig,
    start_url: Option<String>,
    browser: Mutex<Option<Browser>>,
    tab: Mutex<Option<Arc<Tab>>>,
    events: broadcast::Sender<PageEvent>,
}

impl ChromeEnvironment {
    pub fn new(config: ChromeConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            config,
            start_url: None,
            browser: Mutex::new(None),
            tab: Mutex::new(None),
            events,
        }
    }

    /// Page opened by `prepare`.
    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    fn launch(&self) -> Result<Browser> {
        let window_size_arg = format!(
            "--window-size={},{}",
            self.config.viewport.width, self.config.viewport.height
        );

        let user_agent_arg = self
            .config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if self.config.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &self.config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .args(args)
            .build()
            .map_err(|e| ParserError::LaunchFailed(e.to_string()))?;

        Browser::new(launch_options).map_err(|e| ParserError::LaunchFailed(e.to_string()))
    }

    fn tab(&self) -> Result<Arc<Tab>> {
        self.tab
            .lock()
            .clone()
            .ok_or_else(|| ParserError::Environment("browser not prepared".to_string()))
    }

    fn run_script(tab: &Tab, script: &str) -> Result<Value> {
        let result = tab
            .evaluate(script, false)
            .map_err(|e| ParserError::JavaScriptFailed(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn navigated(&self, tab: &Tab) -> Result<Value> {
        tab.wait_until_navigated()
            .map_err(|e| ParserError::NavigationFailed(e.to_string()))?;
        let url = tab.get_url();
        let _ = self.events.send(PageEvent::Navigated { url: url.clone() });
        Ok(Value::String(url))
    }
}

#[async_trait]
impl Environment for ChromeEnvironment {
    async fn prepare(&self) -> Result<()> {
        let browser = self.launch()?;
        let tab = browser
            .new_tab()
            .map_err(|e| ParserError::LaunchFailed(e.to_string()))?;

        let events = self.events.clone();
        tab.register_response_handling(
            "page-parser",
            Box::new(
                move |params: ResponseReceivedEventParams,
                      _body: &dyn Fn() -> anyhow::Result<GetResponseBodyReturnObject>| {
                    let _ = events.send(PageEvent::Request {
                        url: params.response.url,
                    });
                },
            ),
        )
        .map_err(|e| ParserError::LaunchFailed(e.to_string()))?;

        tab.enable_runtime()
            .map_err(|e| ParserError::LaunchFailed(e.to_string()))?;
        let errors = self.events.clone();
        tab.add_event_listener(Arc::new(move |event: &Event| {
            if let Some(message) = page_error(event) {
                warn!(message = %message, "page error");
                let _ = errors.send(PageEvent::Error { message });
            }
        }))
        .map_err(|e| ParserError::LaunchFailed(e.to_string()))?;

        if let Some(url) = &self.start_url {
            info!(url = %url, "opening start page");
            tab.navigate_to(url)
                .map_err(|e| ParserError::NavigationFailed(e.to_string()))?;
            self.navigated(&tab)?;
            Self::run_script(&tab, HELPER_SCRIPT)?;
        }

        *self.tab.lock() = Some(tab);
        *self.browser.lock() = Some(browser);
        Ok(())
    }

    async fn tear_down(&self) -> Result<()> {
        if let Some(tab) = self.tab.lock().take() {
            if let Err(e) = tab.close(true) {
                warn!(error = %e, "closing tab failed");
            }
        }
        self.browser.lock().take();
        debug!("browser released");
        Ok(())
    }

    async fn evaluate(&self, call: PageCall) -> Result<Value> {
        let tab = self.tab()?;
        match call {
            PageCall::Url => Ok(Value::String(tab.get_url())),
            PageCall::Open { url } => {
                tab.navigate_to(&url)
                    .map_err(|e| ParserError::NavigationFailed(e.to_string()))?;
                self.navigated(&tab)
            }
            PageCall::Back => {
                Self::run_script(&tab, "history.back()")?;
                self.navigated(&tab)
            }
            PageCall::InjectHelpers => {
                Self::run_script(&tab, HELPER_SCRIPT)?;
                Ok(Value::Bool(true))
            }
            call => {
                let raw = Self::run_script(&tab, &page_expression(&call)?)?;
                match raw {
                    Value::String(json) => Ok(serde_json::from_str(&json)?),
                    other => Ok(other),
                }
            }
        }
    }

    async fn snapshot(&self, label: &str) -> Result<()> {
        let tab = self.tab()?;
        let png = tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| ParserError::Environment(e.to_string()))?;

        tokio::fs::create_dir_all(&self.config.snapshot_dir).await?;
        let file = self.config.snapshot_dir.join(format!(
            "{}-{}.png",
            label,
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        tokio::fs::write(&file, png).await?;
        info!(path = %file.display(), "snapshot saved");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }
}

/// Uncaught exceptions and crashes, as messages for `PageEvent::Error`.
fn page_error(event: &Event) -> Option<String> {
    match event {
        Event::RuntimeExceptionThrown(thrown) => {
            let details = &thrown.params.exception_details;
            Some(
                details
                    .exception
                    .as_ref()
                    .and_then(|exception| exception.description.clone())
                    .unwrap_or_else(|| details.text.clone()),
            )
        }
        Event::InspectorTargetCrashed(_) => Some("page crashed".to_string()),
        _ => None,
    }
}
