use crate::catalog::Catalog;
use crate::detect::detect;
use crate::dispatch::Dispatcher;
use crate::extract::RequestDetails;
use crate::store::BangStore;
use crate::synth::synthesize;

/// What the network layer should do with the original request. The engine
/// never blocks or cancels; a redirect supersedes the request instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allow,
}

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    NoQuery,
    NoToken,
    UnknownToken,
    /// The entry's template did not produce an absolute URL.
    InvalidTarget,
    /// The bang store could not be read.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    PassThrough(PassReason),
    Redirect { url: String },
}

impl RedirectDecision {
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            RedirectDecision::Redirect { url } => Some(url.as_str()),
            RedirectDecision::PassThrough(_) => None,
        }
    }
}

/// Decide whether `request` should be redirected. Pure; performs no I/O.
pub fn resolve_redirect(request: &RequestDetails, catalog: &Catalog, symbol: &str) -> RedirectDecision {
    let Some(query) = request.query() else {
        return RedirectDecision::PassThrough(PassReason::NoQuery);
    };
    let Some(found) = detect(&query, symbol) else {
        return RedirectDecision::PassThrough(PassReason::NoToken);
    };
    let Some(entry) = catalog.resolve(&found.token) else {
        return RedirectDecision::PassThrough(PassReason::UnknownToken);
    };
    match synthesize(entry, &found.remainder) {
        Some(url) => RedirectDecision::Redirect { url },
        None => {
            tracing::debug!(token = %found.token, template = %entry.template, "template produced no URL");
            RedirectDecision::PassThrough(PassReason::InvalidTarget)
        }
    }
}

/// Connects request interception to the bang store and the dispatcher.
#[derive(Clone)]
pub struct Interceptor {
    store: BangStore,
    dispatcher: Dispatcher,
}

impl Interceptor {
    pub fn new(store: BangStore, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &BangStore {
        &self.store
    }

    /// Decide against the current catalog and symbol without side effects.
    pub fn decide(&self, request: &RequestDetails) -> RedirectDecision {
        self.store
            .with_state(|catalog, symbol| resolve_redirect(request, catalog, symbol))
            .unwrap_or(RedirectDecision::PassThrough(PassReason::Unavailable))
    }

    /// Decide and, on a match, start the redirect in the background.
    pub fn handle(&self, request: &RequestDetails) -> RedirectDecision {
        let decision = self.decide(request);
        if let RedirectDecision::Redirect { url } = &decision {
            tracing::info!(tab = ?request.tab_id, %url, "redirecting");
            let _ = self.dispatcher.redirect(request.tab_id, url);
        }
        decision
    }

    /// Interception callback: always lets the original request proceed.
    pub fn on_before_request(&self, request: &RequestDetails) -> Disposition {
        self.handle(request);
        Disposition::Allow
    }
}
