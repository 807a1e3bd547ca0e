use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use hestia_core::error::AppError;
use hestia_core::traits::BrowsingSession;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "fr-FR,fr;q=0.9";

/// Masks the usual headless giveaways before any page script runs.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
window.chrome = window.chrome || {};
window.chrome.runtime = window.chrome.runtime || {};
Object.defineProperty(navigator, 'languages', { get: () => ['fr-FR', 'fr'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
"#;

/// Resource count once the document is complete, -1 while it is still loading.
const QUIESCENCE_PROBE: &str = "document.readyState === 'complete' \
    ? performance.getEntriesByType('resource').length : -1";

const SETTLE_POLL: Duration = Duration::from_millis(250);

/// Number of identical probes after which the page counts as quiet.
const QUIET_POLLS: u32 = 2;

/// How to launch the Chromium process behind a session.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub chrome_binary: Option<PathBuf>,
    pub proxy: Option<String>,
    /// Persistent profile directory. `None` lets Chromium use a throwaway one.
    pub user_data_dir: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_binary: find_chrome_binary(),
            proxy: None,
            user_data_dir: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A headless Chromium process with a single stealth-patched tab.
///
/// Each session owns its own browser process. [`BrowsingSession::close`]
/// shuts it down gracefully; dropping an unclosed session aborts the CDP
/// handler and lets chromiumoxide kill the child process.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    closed: bool,
}

impl BrowserSession {
    pub async fn launch(options: &LaunchOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .request_timeout(options.request_timeout)
            .window_size(1280, 800);

        if let Some(bin) = &options.chrome_binary {
            tracing::debug!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if let Some(dir) = &options.user_data_dir {
            prepare_profile_dir(dir).await?;
            builder = builder.user_data_dir(dir);
        }

        builder = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--ignore-certificate-errors")
            .arg("--lang=fr-FR")
            .arg("--no-first-run");

        if let Some(proxy) = options.proxy.as_deref().and_then(proxy_server_arg) {
            builder = builder.arg(format!("--proxy-server={proxy}"));
        }

        let config = builder
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser CDP handler stopped: {e}");
                    break;
                }
            }
        });

        let page = match open_stealth_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(e);
            }
        };

        Ok(Self {
            browser,
            page,
            handler_task,
            closed: false,
        })
    }
}

async fn open_stealth_page(browser: &Browser) -> Result<Page, AppError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| AppError::BrowserError(format!("Failed to open tab: {e}")))?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await
        .map_err(|e| AppError::BrowserError(format!("Failed to install stealth script: {e}")))?;

    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(DESKTOP_USER_AGENT)
        .accept_language(ACCEPT_LANGUAGE)
        .build()
        .map_err(|e| AppError::BrowserError(format!("User agent override: {e}")))?;
    page.execute(user_agent)
        .await
        .map_err(|e| AppError::BrowserError(format!("Failed to override user agent: {e}")))?;

    Ok(page)
}

impl BrowsingSession for BrowserSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), AppError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::BrowserError(format!(
                "Failed to navigate to {url}: {e}"
            ))),
            Err(_) => Err(AppError::Timeout(timeout.as_secs())),
        }
    }

    async fn settle(&mut self, selectors: &[&str], timeout: Duration) -> Result<bool, AppError> {
        let deadline = Instant::now() + timeout;
        let mut quiet = QuietTracker::default();

        loop {
            for selector in selectors {
                if self.page.find_element(*selector).await.is_ok() {
                    tracing::debug!(%selector, "Settle selector present");
                    return Ok(true);
                }
            }

            let resources = self
                .page
                .evaluate(QUIESCENCE_PROBE)
                .await
                .ok()
                .and_then(|r| r.into_value::<i64>().ok())
                .unwrap_or(-1);
            if quiet.observe(resources) {
                return Ok(false);
            }

            if Instant::now() + SETTLE_POLL >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }

    async fn content(&mut self) -> Result<String, AppError> {
        self.page
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }

    async fn close(mut self) {
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("Tab close failed: {e}");
        }
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        self.closed = true;
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::debug!("Browser session dropped without close, tearing down");
            self.handler_task.abort();
        }
    }
}

/// Tracks the resource probe across polls: quiet once the document is
/// complete and the resource count stops moving.
#[derive(Debug, Default)]
struct QuietTracker {
    last: Option<i64>,
    stable: u32,
}

impl QuietTracker {
    fn observe(&mut self, resources: i64) -> bool {
        if resources < 0 {
            self.last = None;
            self.stable = 0;
            return false;
        }
        if self.last == Some(resources) {
            self.stable += 1;
        } else {
            self.last = Some(resources);
            self.stable = 0;
        }
        self.stable >= QUIET_POLLS
    }
}

/// Creates the profile directory and clears a lock left behind by a
/// crashed run. Sessions are sequential, so a live lock is never ours.
async fn prepare_profile_dir(dir: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        AppError::ConfigError(format!(
            "Cannot create browser profile {}: {e}",
            dir.display()
        ))
    })?;
    let lock = dir.join("SingletonLock");
    if tokio::fs::symlink_metadata(&lock).await.is_ok() {
        tracing::debug!("Removing stale profile lock {}", lock.display());
        let _ = tokio::fs::remove_file(&lock).await;
    }
    Ok(())
}

/// Value for `--proxy-server`. Chromium ignores credentials in this flag,
/// so they are stripped (and reported) rather than passed through.
///
/// A bare `host:port` is taken as an HTTP proxy. Anything that still does
/// not parse to a host is handed to Chromium as written.
pub fn proxy_server_arg(proxy: &str) -> Option<String> {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return None;
    }
    let parsed = if proxy.contains("://") {
        Url::parse(proxy)
    } else {
        Url::parse(&format!("http://{proxy}"))
    };
    let Ok(parsed) = parsed else {
        return Some(proxy.to_string());
    };
    let Some(host) = parsed.host_str() else {
        return Some(proxy.to_string());
    };
    if !parsed.username().is_empty() {
        tracing::warn!(
            "Proxy credentials are not supported by the browser flag; use an IP-allowlisted proxy"
        );
    }
    Some(match parsed.port_or_known_default() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// `CHROME_BIN` wins when it points at an existing file. Otherwise the snap
/// payload comes first (the `/snap/bin` wrapper strips headless flags),
/// then the usual system paths. `None` lets chromiumoxide search itself.
pub fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("CHROME_BIN={p} does not exist, falling back to defaults");
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}
