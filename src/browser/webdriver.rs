use super::{Browser, BrowserKind};
use crate::config::TesterConfig;
use crate::error::{TesterError, TesterResult};
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Browser session driven over WebDriver.
///
/// fantoccini is async; the session owns a current-thread runtime and blocks on
/// every command so the rest of the harness stays synchronous.
pub struct WebDriverBrowser {
    runtime: Runtime,
    client: Option<Client>,
    driver: Option<Child>,
    kind: BrowserKind,
}

impl WebDriverBrowser {
    /// Connect to `config.webdriver_url`; if that fails, start
    /// `config.driver_command` on a free local port and connect to it instead.
    /// When both fail, both errors are reported.
    pub fn connect(config: &TesterConfig) -> TesterResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let caps = capabilities(config.browser, config.headless);

        log::debug!("Connecting to WebDriver at {}", config.webdriver_url);
        let primary = match runtime.block_on(connect_client(&config.webdriver_url, caps.clone())) {
            Ok(client) => {
                log::info!(
                    "🌐 {:?} session started via {}",
                    config.browser,
                    config.webdriver_url
                );
                return Ok(Self {
                    runtime,
                    client: Some(client),
                    driver: None,
                    kind: config.browser,
                });
            }
            Err(e) => e,
        };

        log::warn!("⚠️ Error initializing {:?} driver: {}", config.browser, primary);
        log::info!("Attempting alternative initialization method...");

        match start_local_driver(&runtime, &config.driver_command, config.browser, caps) {
            Ok((client, child)) => {
                log::info!(
                    "🌐 {:?} session started via local {}",
                    config.browser,
                    config.driver_command
                );
                Ok(Self {
                    runtime,
                    client: Some(client),
                    driver: Some(child),
                    kind: config.browser,
                })
            }
            Err(fallback) => Err(TesterError::BrowserInit { primary, fallback }),
        }
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    fn client(&self, command: &str) -> TesterResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| TesterError::browser(command, "session already closed"))
    }
}

impl Browser for WebDriverBrowser {
    fn navigate(&mut self, url: &str) -> TesterResult<()> {
        let client = self.client("goto")?;
        log::info!("🌐 Navigating to {}", url);
        self.runtime
            .block_on(client.goto(url))
            .map_err(|e| TesterError::browser("goto", e))
    }

    fn current_url(&mut self) -> TesterResult<String> {
        let client = self.client("current_url")?;
        let url = self
            .runtime
            .block_on(client.current_url())
            .map_err(|e| TesterError::browser("current_url", e))?;
        Ok(url.to_string())
    }

    fn close(&mut self) -> TesterResult<()> {
        let mut result = Ok(());
        if let Some(client) = self.client.take() {
            log::debug!("Closing {:?} session", self.kind);
            result = self
                .runtime
                .block_on(client.close())
                .map_err(|e| TesterError::browser("close", e));
        }
        if let Some(mut child) = self.driver.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        result
    }
}

impl Drop for WebDriverBrowser {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("⚠️ Browser close failed: {}", e);
        }
    }
}

fn capabilities(kind: BrowserKind, headless: bool) -> serde_json::Map<String, serde_json::Value> {
    let mut caps = serde_json::Map::new();
    match kind {
        BrowserKind::Chrome => {
            let mut args: Vec<String> = Vec::new();
            if headless {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
                args.push("--disable-dev-shm-usage".to_string());
            }
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            let mut args: Vec<String> = Vec::new();
            if headless {
                args.push("--headless".to_string());
            }
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
    }
    caps
}

async fn connect_client(
    url: &str,
    caps: serde_json::Map<String, serde_json::Value>,
) -> Result<Client, String> {
    ClientBuilder::rustls()
        .capabilities(caps)
        .connect(url)
        .await
        .map_err(|e| format!("could not connect to WebDriver at {url}: {e}"))
}

fn start_local_driver(
    runtime: &Runtime,
    command: &str,
    kind: BrowserKind,
    caps: serde_json::Map<String, serde_json::Value>,
) -> Result<(Client, Child), String> {
    let port = free_port().map_err(|e| format!("no free port for {command}: {e}"))?;
    let args = match kind {
        BrowserKind::Chrome => vec![format!("--port={port}")],
        BrowserKind::Firefox => vec!["--port".to_string(), port.to_string()],
    };

    log::info!("Starting {} on port {}", command, port);
    let mut child = Command::new(command)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to start {command}: {e}"))?;

    let url = format!("http://localhost:{port}");
    let connected = runtime.block_on(async {
        // Driver startup is usually well under the 3s budget
        let mut last_error = String::new();
        for _ in 0..30 {
            match connect_client(&url, caps.clone()).await {
                Ok(client) => return Ok(client),
                Err(e) => last_error = e,
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Err(last_error)
    });

    match connected {
        Ok(client) => Ok((client, child)),
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(format!("{command} did not accept a session: {e}"))
        }
    }
}

fn free_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
