use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Which tab a redirect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabTarget {
    Tab(u32),
    /// The currently active tab.
    Active,
}

impl From<Option<u32>> for TabTarget {
    fn from(tab_id: Option<u32>) -> Self {
        tab_id.map_or(TabTarget::Active, TabTarget::Tab)
    }
}

/// Side effect that points a browser tab at a new URL.
pub trait Navigator: Send + Sync {
    fn update_tab(&self, target: TabTarget, url: &str) -> anyhow::Result<()>;
}

/// Hands redirects to the desktop's default browser.
///
/// The system opener has no notion of tabs, so every redirect opens in
/// whatever window the browser considers current.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNavigator;

impl Navigator for SystemNavigator {
    fn update_tab(&self, target: TabTarget, url: &str) -> anyhow::Result<()> {
        tracing::debug!(?target, %url, "opening with system browser");
        open::that(url).map_err(|e| e.into())
    }
}

/// Issues redirects without blocking the caller.
#[derive(Clone)]
pub struct Dispatcher {
    navigator: Arc<dyn Navigator>,
}

impl Dispatcher {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    /// Redirect synchronously. Failures, such as a tab closed while the
    /// request was in flight, are logged and dropped.
    pub fn redirect_now(&self, tab_id: Option<u32>, url: &str) {
        let target = TabTarget::from(tab_id);
        if let Err(err) = self.navigator.update_tab(target, url) {
            tracing::debug!(?target, %url, "redirect failed: {err:#}");
        }
    }

    /// Redirect on a detached thread. The handle may be dropped.
    pub fn redirect(&self, tab_id: Option<u32>, url: &str) -> JoinHandle<()> {
        let this = self.clone();
        let url = url.to_string();
        thread::spawn(move || this.redirect_now(tab_id, &url))
    }
}
