//! In-memory browser used by the crawler unit tests

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, BrowsingContext, ContextSetup};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One navigation seen by the fake browser
#[derive(Debug, Clone)]
pub struct VisitRecord {
    pub url: String,
    pub started: Instant,
    pub closed: Option<Instant>,
}

/// Everything the fake browser was asked to do
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    pub launches: usize,
    pub session_closes: usize,
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub setups: Vec<ContextSetup>,
    pub visits: Vec<VisitRecord>,
    pub scrolls: Vec<u32>,
    pub scrolls_to_top: usize,
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    load_time: Duration,
    refuse_contexts: bool,
    refuse_launch: bool,
}

/// Launcher whose sessions record calls instead of driving Chrome
#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    log: Arc<Mutex<FakeLog>>,
    behavior: Behavior,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation to `url` fails with a protocol error
    pub fn failing(mut self, url: &str) -> Self {
        self.behavior.failing.insert(url.to_string());
        self
    }

    /// Navigation to `url` panics
    pub fn panicking(mut self, url: &str) -> Self {
        self.behavior.panicking.insert(url.to_string());
        self
    }

    /// Every navigation takes this long
    pub fn load_time(mut self, load_time: Duration) -> Self {
        self.behavior.load_time = load_time;
        self
    }

    /// Opening a browsing context always fails
    pub fn refuse_contexts(mut self) -> Self {
        self.behavior.refuse_contexts = true;
        self
    }

    /// Launching always fails
    pub fn refuse_launch(mut self) -> Self {
        self.behavior.refuse_launch = true;
        self
    }

    pub fn log(&self) -> FakeLog {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.behavior.refuse_launch {
            return Err(BrowserError::Launch("no chrome executable found".to_string()));
        }
        self.log.lock().unwrap().launches += 1;
        Ok(Box::new(FakeSession {
            log: Arc::clone(&self.log),
            behavior: self.behavior.clone(),
            closed: false,
        }))
    }
}

struct FakeSession {
    log: Arc<Mutex<FakeLog>>,
    behavior: Behavior,
    closed: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_context(&self, setup: &ContextSetup) -> Result<Box<dyn BrowsingContext>, BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        if self.behavior.refuse_contexts {
            return Err(BrowserError::Protocol("target closed".to_string()));
        }

        {
            let mut log = self.log.lock().unwrap();
            log.contexts_opened += 1;
            log.setups.push(setup.clone());
        }

        Ok(Box::new(FakeContext {
            log: Arc::clone(&self.log),
            behavior: self.behavior.clone(),
            visit: None,
        }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        self.closed = true;
        self.log.lock().unwrap().session_closes += 1;
        Ok(())
    }
}

struct FakeContext {
    log: Arc<Mutex<FakeLog>>,
    behavior: Behavior,
    visit: Option<usize>,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        {
            let mut log = self.log.lock().unwrap();
            log.visits.push(VisitRecord {
                url: url.to_string(),
                started: Instant::now(),
                closed: None,
            });
            self.visit = Some(log.visits.len() - 1);
        }

        tokio::time::sleep(self.behavior.load_time).await;

        if self.behavior.panicking.contains(url) {
            panic!("renderer crashed while loading {}", url);
        }
        if self.behavior.failing.contains(url) {
            return Err(BrowserError::Protocol(format!(
                "net::ERR_NAME_NOT_RESOLVED at {}",
                url
            )));
        }
        Ok(())
    }

    async fn scroll_by(&mut self, pixels: u32) -> Result<(), BrowserError> {
        self.log.lock().unwrap().scrolls.push(pixels);
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), BrowserError> {
        self.log.lock().unwrap().scrolls_to_top += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let mut log = self.log.lock().unwrap();
        log.contexts_closed += 1;
        if let Some(index) = self.visit.take() {
            log.visits[index].closed = Some(Instant::now());
        }
        Ok(())
    }
}
