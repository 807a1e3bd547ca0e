pub mod browser_session;
pub mod http_session;
pub mod notion;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use browser_session::{BrowserSession, LaunchOptions};
pub use http_session::HttpSession;
pub use notion::{NotionClient, PagePayload, SyncStatus};
pub use session::{ClientSession, ClientSessionFactory};
