use std::path::PathBuf;
use std::time::Duration;

use hestia_core::config::FetchConfig;
use hestia_core::error::AppError;
use hestia_core::models::FetchProfile;
use hestia_core::traits::{BrowsingSession, SessionFactory};

use crate::browser_session::{BrowserSession, LaunchOptions, find_chrome_binary};
use crate::http_session::HttpSession;

/// A session of either kind, picked by the strategy's fetch profile.
pub enum ClientSession {
    Browser(BrowserSession),
    Http(HttpSession),
}

impl BrowsingSession for ClientSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), AppError> {
        match self {
            ClientSession::Browser(s) => s.navigate(url, timeout).await,
            ClientSession::Http(s) => s.navigate(url, timeout).await,
        }
    }

    async fn settle(&mut self, selectors: &[&str], timeout: Duration) -> Result<bool, AppError> {
        match self {
            ClientSession::Browser(s) => s.settle(selectors, timeout).await,
            ClientSession::Http(s) => s.settle(selectors, timeout).await,
        }
    }

    async fn content(&mut self) -> Result<String, AppError> {
        match self {
            ClientSession::Browser(s) => s.content().await,
            ClientSession::Http(s) => s.content().await,
        }
    }

    async fn close(self) {
        match self {
            ClientSession::Browser(s) => s.close().await,
            ClientSession::Http(s) => s.close().await,
        }
    }
}

/// Opens real sessions: Chromium for browser profiles, reqwest for `Http`.
#[derive(Debug, Clone)]
pub struct ClientSessionFactory {
    launch: LaunchOptions,
    persistent_profile: PathBuf,
}

impl ClientSessionFactory {
    pub fn new(config: &FetchConfig) -> Self {
        let launch = LaunchOptions {
            chrome_binary: find_chrome_binary(),
            proxy: config.proxy.clone(),
            user_data_dir: None,
            request_timeout: config.navigation_timeout,
        };
        Self {
            launch,
            persistent_profile: config.user_data_dir.clone(),
        }
    }

    /// Launch options for a browser profile.
    pub fn launch_options(&self, profile: FetchProfile) -> LaunchOptions {
        let mut options = self.launch.clone();
        if profile == FetchProfile::PersistentBrowser {
            options.user_data_dir = Some(self.persistent_profile.clone());
        }
        options
    }
}

impl SessionFactory for ClientSessionFactory {
    type Session = ClientSession;

    async fn open(&self, profile: FetchProfile) -> Result<ClientSession, AppError> {
        tracing::debug!(profile = profile.as_str(), "Opening session");
        match profile {
            FetchProfile::PersistentBrowser | FetchProfile::EphemeralBrowser => {
                let options = self.launch_options(profile);
                Ok(ClientSession::Browser(BrowserSession::launch(&options).await?))
            }
            FetchProfile::Http => Ok(ClientSession::Http(HttpSession::new(
                self.launch.proxy.as_deref(),
            )?)),
        }
    }

    fn has_rotation(&self) -> bool {
        self.launch.proxy.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser_session::proxy_server_arg;

    fn config(proxy: Option<&str>) -> FetchConfig {
        FetchConfig {
            proxy: proxy.map(str::to_string),
            user_data_dir: PathBuf::from("/tmp/hestia-profile"),
            ..FetchConfig::default()
        }
    }

    #[test]
    fn rotation_follows_proxy() {
        assert!(!ClientSessionFactory::new(&config(None)).has_rotation());
        assert!(ClientSessionFactory::new(&config(Some("http://proxy.example:8080"))).has_rotation());
    }

    #[test]
    fn rotating_factory_always_passes_a_proxy_flag() {
        for proxy in ["proxy.example:3128", "http://u:p@proxy.example:8080", "socks5://10.0.0.5:1080"] {
            let factory = ClientSessionFactory::new(&config(Some(proxy)));
            assert!(factory.has_rotation());
            let options = factory.launch_options(FetchProfile::EphemeralBrowser);
            assert!(
                options.proxy.as_deref().and_then(proxy_server_arg).is_some(),
                "{proxy} would launch without --proxy-server"
            );
        }
    }

    #[test]
    fn only_persistent_profile_keeps_user_data() {
        let factory = ClientSessionFactory::new(&config(None));
        assert_eq!(
            factory.launch_options(FetchProfile::PersistentBrowser).user_data_dir,
            Some(PathBuf::from("/tmp/hestia-profile"))
        );
        assert_eq!(
            factory.launch_options(FetchProfile::EphemeralBrowser).user_data_dir,
            None
        );
    }

    #[test]
    fn launch_inherits_navigation_timeout_and_proxy() {
        let mut cfg = config(Some("http://proxy.example:8080"));
        cfg.navigation_timeout = Duration::from_secs(12);
        let options = ClientSessionFactory::new(&cfg).launch_options(FetchProfile::EphemeralBrowser);
        assert_eq!(options.request_timeout, Duration::from_secs(12));
        assert_eq!(options.proxy.as_deref(), Some("http://proxy.example:8080"));
    }

    #[tokio::test]
    async fn http_profile_opens_without_a_browser() {
        let factory = ClientSessionFactory::new(&config(None));
        let session = factory.open(FetchProfile::Http).await.unwrap();
        assert!(matches!(session, ClientSession::Http(_)));
        session.close().await;
    }
}
