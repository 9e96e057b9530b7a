//! Chromium implementation of the browser traits
//!
//! Each browsing context is a separate CDP browser context (its own cookie
//! jar and cache) holding a single page. Navigation is considered finished
//! once Chrome reports the `networkAlmostIdle` lifecycle event, i.e. no more
//! than two connections have been active for half a second, so pages that
//! poll in the background still count as loaded.

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, BrowsingContext, ContextSetup};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Lifecycle event marking a quiet network
const NETWORK_IDLE_EVENT: &str = "networkAlmostIdle";

impl From<CdpError> for BrowserError {
    fn from(err: CdpError) -> Self {
        BrowserError::Protocol(err.to_string())
    }
}

/// Launches Chromium with chromiumoxide
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    /// Creates a launcher for the given browser settings
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let launch_config = build_launch_config(&self.config)?;

        let (browser, mut handler) = Browser::launch(launch_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        tracing::info!(
            "Browser launched ({})",
            if self.config.headless { "headless" } else { "headed" }
        );

        Ok(Box::new(ChromiumSession {
            browser: Arc::new(browser),
            handler: Some(handler),
        }))
    }
}

/// Translates browser settings into a chromiumoxide launch configuration
fn build_launch_config(config: &BrowserConfig) -> Result<LaunchConfig, BrowserError> {
    let mut builder = LaunchConfig::builder()
        .no_sandbox()
        .arg("--disable-setuid-sandbox");

    if !config.headless {
        builder = builder.with_head();
    }

    if let Some(path) = &config.executable {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(BrowserError::Launch)
}

/// A running Chromium instance
pub struct ChromiumSession {
    browser: Arc<Browser>,
    handler: Option<JoinHandle<()>>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_context(&self, setup: &ContextSetup) -> Result<Box<dyn BrowsingContext>, BrowserError> {
        if self.handler.is_none() {
            return Err(BrowserError::Closed);
        }

        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?;

        let mut context = ChromiumContext {
            browser: Arc::clone(&self.browser),
            context_id: Some(created.result.browser_context_id.clone()),
            page: None,
        };

        if let Err(e) = context.open(setup).await {
            if let Err(close_err) = context.close().await {
                tracing::warn!("Failed to release half-open browsing context: {}", close_err);
            }
            return Err(e);
        }

        Ok(Box::new(context))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let handler = self.handler.take().ok_or(BrowserError::Closed)?;

        let result = match Arc::get_mut(&mut self.browser) {
            Some(browser) => match browser.close().await {
                Ok(_) => browser
                    .wait()
                    .await
                    .map(|_| ())
                    .map_err(|e| BrowserError::Protocol(e.to_string())),
                Err(e) => Err(e.into()),
            },
            None => {
                // A context outlived its visit; ask Chrome to exit over CDP instead.
                tracing::warn!("Browser still shared at shutdown, closing over CDP");
                self.browser
                    .execute(CloseParams::default())
                    .await
                    .map(|_| ())
                    .map_err(BrowserError::from)
            }
        };

        handler.abort();
        tracing::info!("Browser closed");
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// Frame and document a navigation was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
struct NavigationTarget {
    frame_id: String,
    loader_id: Option<String>,
}

impl NavigationTarget {
    /// Whether a lifecycle event marks this navigation's document as idle
    ///
    /// Events from child frames or from the document being replaced do not
    /// count. Same-document navigations have no loader, so any idle event
    /// on the main frame settles them.
    fn is_settled_by(&self, name: &str, frame_id: &str, loader_id: &str) -> bool {
        name == NETWORK_IDLE_EVENT
            && frame_id == self.frame_id
            && self
                .loader_id
                .as_deref()
                .map_or(true, |loader| loader == loader_id)
    }
}

/// A single page inside its own CDP browser context
pub struct ChromiumContext {
    browser: Arc<Browser>,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
}

impl ChromiumContext {
    /// Creates the page and applies identity, viewport and headers
    async fn open(&mut self, setup: &ContextSetup) -> Result<(), BrowserError> {
        let context_id = self.context_id.clone().ok_or(BrowserError::Closed)?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(BrowserError::Protocol)?;

        let page = self.browser.new_page(target).await?;
        self.page = Some(page.clone());

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(setup.user_agent.clone())
            .accept_language(setup.accept_language.clone())
            .build()
            .map_err(BrowserError::Protocol)?;
        page.execute(user_agent).await?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(setup.viewport.width),
            i64::from(setup.viewport.height),
            1.0,
            false,
        ))
        .await?;

        let headers = Headers::new(serde_json::json!({
            "Accept-Language": setup.accept_language,
        }));
        page.execute(SetExtraHttpHeadersParams::new(headers)).await?;

        page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;

        tracing::trace!(
            "Browsing context ready ({}x{})",
            setup.viewport.width,
            setup.viewport.height
        );
        Ok(())
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::Closed)
    }
}

#[async_trait]
impl BrowsingContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let page = self.page()?;

        // Subscribe before navigating so the idle event cannot be missed.
        let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

        let navigation = async {
            let navigated = page
                .execute(NavigateParams::new(url))
                .await
                .map_err(BrowserError::from)?
                .result;
            if let Some(error) = navigated.error_text {
                return Err(BrowserError::Protocol(format!("{} at {}", error, url)));
            }

            let target = NavigationTarget {
                frame_id: navigated.frame_id.inner().clone(),
                loader_id: navigated.loader_id.map(|id| id.inner().clone()),
            };

            while let Some(event) = lifecycle.next().await {
                if target.is_settled_by(
                    &event.name,
                    event.frame_id.inner(),
                    event.loader_id.inner(),
                ) {
                    return Ok(());
                }
            }
            Err::<(), BrowserError>(BrowserError::Closed)
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn scroll_by(&mut self, pixels: u32) -> Result<(), BrowserError> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {})", pixels))
            .await?;
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), BrowserError> {
        self.page()?.evaluate("window.scrollTo(0, 0)").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.page.is_none() && self.context_id.is_none() {
            return Err(BrowserError::Closed);
        }

        let mut first_error: Option<BrowserError> = None;

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                first_error = Some(e.into());
            }
        }

        if let Some(context_id) = self.context_id.take() {
            if let Err(e) = self
                .browser
                .execute(DisposeBrowserContextParams::new(context_id))
                .await
            {
                first_error.get_or_insert(e.into());
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        let page = self.page.take();
        let context_id = self.context_id.take();
        if page.is_none() && context_id.is_none() {
            return;
        }

        // Dropped without close(); release in the background if a runtime is around.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let browser = Arc::clone(&self.browser);
        runtime.spawn(async move {
            if let Some(page) = page {
                if let Err(e) = page.close().await {
                    tracing::warn!("Background page cleanup failed: {}", e);
                }
            }
            if let Some(context_id) = context_id {
                if let Err(e) = browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await
                {
                    tracing::warn!("Background context cleanup failed: {}", e);
                }
            }
        });
    }
}
