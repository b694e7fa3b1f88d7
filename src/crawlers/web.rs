use crate::crawlers::source::{NavigateOptions, PageSource, WaitStrategy};
use crate::error::{HarvestError, NavigationError};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::time::timeout;

type Capabilities = Map<String, Value>;

/// Interval between `document.readyState` polls for the `load` strategy
const READY_STATE_POLL: Duration = Duration::from_millis(250);

/// Page source backed by a WebDriver session
pub struct WebDriverSource {
    client: Option<Client>,
    webdriver_url: String,
    capabilities: Capabilities,
}

impl WebDriverSource {
    /// Opens a WebDriver session, trying common local endpoints if the configured one refuses
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self, HarvestError> {
        let capabilities = session_capabilities(headless);

        if let Some((client, url)) = connect_to_webdriver(webdriver_url, &capabilities).await {
            return Ok(Self {
                client: Some(client),
                webdriver_url: url,
                capabilities,
            });
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(HarvestError::Browser(format!(
            "no WebDriver server reachable at {} or the fallback endpoints",
            webdriver_url
        )))
    }

    fn client(&self) -> Result<Client, NavigationError> {
        self.client
            .clone()
            .ok_or_else(|| NavigationError::SessionLost("session already closed".to_string()))
    }

    /// Replaces a dead session so the next attempt has a working client
    async fn attempt_reconnect(&mut self) -> bool {
        ::log::warn!("Attempting to reconnect WebDriver session");
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());
        match builder.connect(&self.webdriver_url).await {
            Ok(new_client) => {
                self.client = Some(new_client);
                ::log::info!("Successfully reconnected to WebDriver");
                true
            }
            Err(e) => {
                ::log::error!("Failed to reconnect to WebDriver: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl PageSource for WebDriverSource {
    async fn navigate(
        &mut self,
        url: &str,
        options: &NavigateOptions,
    ) -> Result<String, NavigationError> {
        let client = self.client()?;
        let started = std::time::Instant::now();
        ::log::debug!("NAVIGATE: {} ({:?})", url, options.wait_strategy);

        let navigation = async {
            client.goto(url).await.map_err(|e| classify(e, "accessing", url))?;
            if options.wait_strategy == WaitStrategy::Load {
                wait_for_ready_state(&client, url).await?;
            }
            client
                .source()
                .await
                .map_err(|e| classify(e, "getting source for", url))
        };

        let result = match timeout(options.timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(NavigationError::Timeout {
                url: url.to_string(),
                timeout_ms: options.timeout.as_millis() as u64,
            }),
        };

        match &result {
            Ok(source) => ::log::debug!(
                "Loaded {} ({} bytes) in {:.2} seconds",
                url,
                source.len(),
                started.elapsed().as_secs_f64()
            ),
            Err(NavigationError::SessionLost(_)) => {
                self.attempt_reconnect().await;
            }
            Err(_) => {}
        }

        result
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
        let client = self.client()?;
        client
            .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await
            .map_err(|e| classify(e, "scrolling", "current page"))?;
        Ok(())
    }

    async fn current_content(&mut self) -> Result<String, NavigationError> {
        let client = self.client()?;
        client
            .source()
            .await
            .map_err(|e| classify(e, "getting source for", "current page"))
    }

    async fn close(&mut self) -> Result<(), NavigationError> {
        match self.client.take() {
            Some(client) => {
                client
                    .close()
                    .await
                    .map_err(|e| NavigationError::SessionLost(e.to_string()))?;
                ::log::debug!("WebDriver session closed");
                Ok(())
            }
            None => Err(NavigationError::SessionLost(
                "session already closed".to_string(),
            )),
        }
    }
}

/// Capabilities for a new session: eager page loads plus optional headless flags
fn session_capabilities(headless: bool) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("pageLoadStrategy".to_string(), json!("eager"));
    if headless {
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--window-size=1920,1080"] }),
        );
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
    }
    caps
}

/// Connects to the WebDriver instance, returning the client and the endpoint that answered
async fn connect_to_webdriver(
    webdriver_url: &str,
    capabilities: &Capabilities,
) -> Option<(Client, String)> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities.clone());

    match builder.connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Some((client, webdriver_url.to_string()));
        }
        Err(e) => {
            ::log::error!(
                "Failed to connect to WebDriver at {}: {}",
                webdriver_url,
                e
            );
        }
    }

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // Selenium / geckodriver default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = builder.connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Some((client, url.to_string()));
        }
    }

    ::log::error!("Failed to connect to any WebDriver servers");
    None
}

/// Polls until the document reports `complete`; bounded by the caller's timeout
async fn wait_for_ready_state(client: &Client, url: &str) -> Result<(), NavigationError> {
    loop {
        let state = client
            .execute("return document.readyState;", vec![])
            .await
            .map_err(|e| classify(e, "waiting for", url))?;
        if state.as_str() == Some("complete") {
            return Ok(());
        }
        tokio::time::sleep(READY_STATE_POLL).await;
    }
}

/// Maps WebDriver command errors, separating lost sessions from ordinary failures
fn classify(error: fantoccini::error::CmdError, context: &str, url: &str) -> NavigationError {
    let message = error.to_string();
    if message.contains("Unable to find session") || message.contains("invalid session id") {
        ::log::warn!("Lost session while {} {}", context, url);
        NavigationError::SessionLost(message)
    } else {
        ::log::error!("Failed {} {}: {}", context, url, message);
        NavigationError::Failed {
            url: url.to_string(),
            message,
        }
    }
}
