use super::{BrowserSession, Element, Locator, SessionLauncher};
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

fn to_wd(locator: Locator) -> fantoccini::Locator<'static> {
    match locator {
        Locator::Id(s) => fantoccini::Locator::Id(s),
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
    }
}

fn is_missing(e: &CmdError) -> bool {
    e.is_no_such_element() || matches!(e, CmdError::WaitTimeout)
}

/// Map a command error, reporting absence of `locator` as `ElementNotFound`.
fn map_err(locator: Locator, e: CmdError) -> ScrapeError {
    if is_missing(&e) {
        ScrapeError::ElementNotFound { locator: locator.to_string() }
    } else {
        ScrapeError::Browser(format!("{}: {}", locator, e))
    }
}

// ── Launcher ──────────────────────────────────────────────────────────────────

/// Connects to a running chromedriver and starts Chrome with `browser_args`.
pub struct WebDriverLauncher {
    webdriver_url: String,
    browser_args: Vec<String>,
    element_timeout: Duration,
}

impl WebDriverLauncher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            browser_args: config.browser_args.clone(),
            element_timeout: config.element_timeout(),
        }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": self.browser_args }),
        );
        caps
    }
}

#[async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        debug!("Connecting to WebDriver at {}", self.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| ScrapeError::Launch(format!("{}: {}", self.webdriver_url, e)))?;

        Ok(Box::new(WebDriverSession {
            client,
            element_timeout: self.element_timeout,
        }))
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct WebDriverSession {
    client: Client,
    element_timeout: Duration,
}

impl WebDriverSession {
    /// Block until `locator` is rendered, up to the configured timeout.
    async fn wait_for(&self, locator: Locator) -> Result<fantoccini::elements::Element, ScrapeError> {
        self.client
            .wait()
            .at_most(self.element_timeout)
            .for_element(to_wd(locator))
            .await
            .map_err(|e| map_err(locator, e))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        info!("Opening {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| ScrapeError::Browser(format!("goto {}: {}", url, e)))
    }

    async fn select_option(&mut self, locator: Locator, visible_text: &str) -> Result<(), ScrapeError> {
        let select = self.wait_for(locator).await?;
        select.select_by_label(visible_text).await.map_err(|e| {
            if is_missing(&e) {
                ScrapeError::OptionNotFound {
                    locator: locator.to_string(),
                    label: visible_text.to_string(),
                }
            } else {
                map_err(locator, e)
            }
        })
    }

    async fn set_text(&mut self, locator: Locator, value: &str) -> Result<(), ScrapeError> {
        let field = self.wait_for(locator).await?;
        field.clear().await.map_err(|e| map_err(locator, e))?;
        field.send_keys(value).await.map_err(|e| map_err(locator, e))
    }

    async fn submit(&mut self, locator: Locator) -> Result<(), ScrapeError> {
        let field = self.wait_for(locator).await?;
        let enter: char = Key::Enter.into();
        field
            .send_keys(&enter.to_string())
            .await
            .map_err(|e| map_err(locator, e))
    }

    async fn click_if_present(&mut self, locator: Locator) -> Result<bool, ScrapeError> {
        match self.client.find(to_wd(locator)).await {
            Ok(element) => {
                element.click().await.map_err(|e| map_err(locator, e))?;
                Ok(true)
            }
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(map_err(locator, e)),
        }
    }

    async fn find_all(&mut self, locator: Locator) -> Result<Vec<Element>, ScrapeError> {
        let found = self
            .client
            .find_all(to_wd(locator))
            .await
            .map_err(|e| map_err(locator, e))?;

        let mut elements = Vec::with_capacity(found.len());
        for el in found {
            let id = el.attr("id").await.map_err(|e| map_err(locator, e))?;
            let text = el.text().await.map_err(|e| map_err(locator, e))?;
            elements.push(Element { id, text });
        }
        Ok(elements)
    }

    async fn text_of(&mut self, locator: Locator) -> Result<String, ScrapeError> {
        let element = self.wait_for(locator).await?;
        element.text().await.map_err(|e| map_err(locator, e))
    }

    async fn outer_html(&mut self, locator: Locator) -> Result<Option<String>, ScrapeError> {
        match self.client.find(to_wd(locator)).await {
            Ok(element) => element
                .html(false)
                .await
                .map(Some)
                .map_err(|e| map_err(locator, e)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(map_err(locator, e)),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), ScrapeError> {
        self.client
            .close()
            .await
            .map_err(|e| ScrapeError::Browser(format!("close: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_carry_browser_args() {
        let launcher = WebDriverLauncher::new(&ScraperConfig::default());
        let caps = launcher.capabilities();
        let args = &caps["goog:chromeOptions"]["args"];
        assert_eq!(args[0], "--headless");
        assert_eq!(args.as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn test_timeout_maps_to_element_not_found() {
        let err = map_err(Locator::Id("txtDate"), CmdError::WaitTimeout);
        assert!(matches!(err, ScrapeError::ElementNotFound { locator } if locator == "id=txtDate"));
    }
}
