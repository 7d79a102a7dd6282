pub mod classify;
pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod layout;
pub mod output;
pub mod overrides;
pub mod page;
pub mod respond;
pub mod session;
pub mod storage;

use config::HelperConfig;
use error::HelperError;
use page::Page;
use session::HelperSession;
use storage::Stores;

/// Parse an HTML string into a laid-out page with the configured viewport.
pub fn load_page(html: &str, config: &HelperConfig) -> Result<Page, HelperError> {
    Page::parse(html, config.viewport_width, config.viewport_height)
}

/// Parse a page and start a helper session on it.
/// This is the primary entry point for surveyfill-core.
pub fn start(html: &str, config: HelperConfig, stores: Stores) -> Result<HelperSession, HelperError> {
    let page = load_page(html, &config)?;
    HelperSession::initialize(page, config, stores)
}
