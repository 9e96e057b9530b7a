//! Shared helpers for the integration tests

use async_trait::async_trait;
use sitemap_walker::browser::{
    BrowserError, BrowserLauncher, BrowserSession, BrowsingContext, ContextSetup,
};
use sitemap_walker::config::Config;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls observed by a [`RecordingBrowser`]
#[derive(Debug, Default)]
pub struct Recording {
    pub launches: usize,
    pub closes: usize,
    pub open_contexts: usize,
    pub navigations: Vec<String>,
    pub user_agents: Vec<String>,
}

/// Browser that records navigations instead of rendering pages
#[derive(Clone, Default)]
pub struct RecordingBrowser {
    recording: Arc<Mutex<Recording>>,
    failing: Arc<HashSet<String>>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation to any of `urls` fails
    pub fn failing(urls: &[String]) -> Self {
        Self {
            recording: Arc::default(),
            failing: Arc::new(urls.iter().cloned().collect()),
        }
    }

    pub fn launches(&self) -> usize {
        self.recording.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.recording.lock().unwrap().closes
    }

    pub fn open_contexts(&self) -> usize {
        self.recording.lock().unwrap().open_contexts
    }

    pub fn navigations(&self) -> Vec<String> {
        self.recording.lock().unwrap().navigations.clone()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.recording.lock().unwrap().user_agents.clone()
    }
}

#[async_trait]
impl BrowserLauncher for RecordingBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.recording.lock().unwrap().launches += 1;
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl BrowserSession for RecordingBrowser {
    async fn new_context(&self, setup: &ContextSetup) -> Result<Box<dyn BrowsingContext>, BrowserError> {
        let mut recording = self.recording.lock().unwrap();
        recording.open_contexts += 1;
        recording.user_agents.push(setup.user_agent.clone());
        Ok(Box::new(RecordingContext {
            browser: self.clone(),
        }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.recording.lock().unwrap().closes += 1;
        Ok(())
    }
}

struct RecordingContext {
    browser: RecordingBrowser,
}

#[async_trait]
impl BrowsingContext for RecordingContext {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.browser
            .recording
            .lock()
            .unwrap()
            .navigations
            .push(url.to_string());

        if self.browser.failing.contains(url) {
            return Err(BrowserError::Protocol(format!("net::ERR_CONNECTION_RESET at {}", url)));
        }
        Ok(())
    }

    async fn scroll_by(&mut self, _pixels: u32) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.browser.recording.lock().unwrap().open_contexts -= 1;
        Ok(())
    }
}

/// Configuration with every delay shrunk to a few milliseconds
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.visit.delay_min = 5;
    config.visit.delay_max = 15;
    config.visit.load_wait_time = 10;
    config.visit.user_agent = "WalkerTest/1.0".to_string();
    config.sitemap.delay_min = 0;
    config.sitemap.delay_max = 5;
    config.sitemap.request_timeout = 5000;
    config.browser.post_visit_delay_min = 0;
    config.browser.post_visit_delay_max = 5;
    config
}

/// `<urlset>` document listing `pages`
pub fn urlset(pages: &[String]) -> String {
    let entries: String = pages
        .iter()
        .map(|page| format!("  <url><loc>{}</loc></url>\n", page))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>\n",
        entries
    )
}

/// `<sitemapindex>` document listing `children`
pub fn sitemap_index(children: &[String]) -> String {
    let entries: String = children
        .iter()
        .map(|child| format!("  <sitemap><loc>{}</loc></sitemap>\n", child))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>\n",
        entries
    )
}

/// `count` page URLs under `base` with a distinguishing `prefix`
pub fn pages(base: &str, prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}/{}/{}", base, prefix, i))
        .collect()
}
