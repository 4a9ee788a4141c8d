//! Scripted in-memory session for exercising the scrapers without a browser.

use super::{BrowserSession, Element, Locator, SessionLauncher};
use crate::error::ScrapeError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeBrowser {
    options: HashMap<Locator, Vec<String>>,
    fields: Vec<Locator>,
    texts: HashMap<Locator, String>,
    elements: HashMap<Locator, Vec<Element>>,
    html_pages: HashMap<Locator, Vec<String>>,
    page: usize,
    pager: Option<Locator>,
    expanders: HashMap<Locator, VecDeque<Vec<(Locator, Element)>>>,
    broken: Option<String>,
    log: Arc<Mutex<Vec<String>>>,
    closed: Option<Arc<AtomicUsize>>,
}

impl FakeBrowser {
    pub fn with_options(mut self, locator: Locator, labels: &[&str]) -> Self {
        self.options
            .insert(locator, labels.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_field(mut self, locator: Locator) -> Self {
        self.fields.push(locator);
        self
    }

    pub fn with_text(mut self, locator: Locator, text: &str) -> Self {
        self.texts.insert(locator, text.to_string());
        self
    }

    pub fn with_elements(mut self, locator: Locator, elements: Vec<Element>) -> Self {
        self.elements.insert(locator, elements);
        self
    }

    /// Successive HTML bodies for `locator`; clicking `pager` moves to the next one.
    pub fn with_pages(mut self, locator: Locator, pager: Locator, pages: Vec<String>) -> Self {
        self.html_pages.insert(locator, pages);
        self.pager = Some(pager);
        self
    }

    /// Each click on `locator` reveals the next batch of elements.
    pub fn with_expansion(mut self, locator: Locator, batch: Vec<(Locator, Element)>) -> Self {
        self.expanders.entry(locator).or_default().push_back(batch);
        self
    }

    /// Every navigation fails with this message.
    pub fn broken(mut self, message: &str) -> Self {
        self.broken = Some(message.to_string());
        self
    }

    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    fn record(&self, entry: String) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
    }

    fn page_count(&self) -> usize {
        self.html_pages.values().map(Vec::len).max().unwrap_or(0)
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        if let Some(msg) = &self.broken {
            return Err(ScrapeError::Browser(msg.clone()));
        }
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn select_option(&mut self, locator: Locator, visible_text: &str) -> Result<(), ScrapeError> {
        let labels = self.options.get(&locator).ok_or_else(|| ScrapeError::ElementNotFound {
            locator: locator.to_string(),
        })?;
        if !labels.iter().any(|l| l == visible_text) {
            return Err(ScrapeError::OptionNotFound {
                locator: locator.to_string(),
                label: visible_text.to_string(),
            });
        }
        self.record(format!("select {} {}", locator, visible_text));
        Ok(())
    }

    async fn set_text(&mut self, locator: Locator, value: &str) -> Result<(), ScrapeError> {
        if !self.fields.contains(&locator) {
            return Err(ScrapeError::ElementNotFound { locator: locator.to_string() });
        }
        self.record(format!("type {} {}", locator, value));
        Ok(())
    }

    async fn submit(&mut self, locator: Locator) -> Result<(), ScrapeError> {
        if !self.fields.contains(&locator) {
            return Err(ScrapeError::ElementNotFound { locator: locator.to_string() });
        }
        self.record(format!("enter {}", locator));
        Ok(())
    }

    async fn click_if_present(&mut self, locator: Locator) -> Result<bool, ScrapeError> {
        if self.pager == Some(locator) {
            if self.page + 1 < self.page_count() {
                self.page += 1;
                self.record(format!("click {}", locator));
                return Ok(true);
            }
            return Ok(false);
        }

        let Some(batch) = self.expanders.get_mut(&locator).and_then(VecDeque::pop_front) else {
            return Ok(false);
        };
        for (target, element) in batch {
            self.elements.entry(target).or_default().push(element);
        }
        self.record(format!("click {}", locator));
        Ok(true)
    }

    async fn find_all(&mut self, locator: Locator) -> Result<Vec<Element>, ScrapeError> {
        Ok(self.elements.get(&locator).cloned().unwrap_or_default())
    }

    async fn text_of(&mut self, locator: Locator) -> Result<String, ScrapeError> {
        self.texts
            .get(&locator)
            .cloned()
            .ok_or_else(|| ScrapeError::ElementNotFound { locator: locator.to_string() })
    }

    async fn outer_html(&mut self, locator: Locator) -> Result<Option<String>, ScrapeError> {
        Ok(self
            .html_pages
            .get(&locator)
            .and_then(|pages| pages.get(self.page))
            .cloned())
    }

    async fn close(self: Box<Self>) -> Result<(), ScrapeError> {
        if let Some(closed) = &self.closed {
            closed.fetch_add(1, Ordering::SeqCst);
        }
        self.record("close".to_string());
        Ok(())
    }
}

type Factory = dyn Fn(usize) -> FakeBrowser + Send + Sync;

/// Hands out `FakeBrowser`s built by a factory given the launch index.
pub struct FakeLauncher {
    factory: Box<Factory>,
    launched: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(usize) -> FakeBrowser + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            launched: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        let index = self.launched.fetch_add(1, Ordering::SeqCst);
        let mut browser = (self.factory)(index);
        browser.closed = Some(Arc::clone(&self.closed));
        Ok(Box::new(browser))
    }
}
