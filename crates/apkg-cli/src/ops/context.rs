//! Shared operation context.
//!
//! Groups the services every operation needs so they are passed down
//! explicitly instead of living in globals.

use std::fmt;
use std::sync::Arc;

use apkg_core::{Layout, Reporter};

use crate::LedgerHandle;

/// Groups common state used during reconciliation and maintenance.
#[derive(Clone)]
pub struct Context {
    pub ledger: LedgerHandle,
    pub layout: Layout,
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(
        ledger: LedgerHandle,
        layout: Layout,
        client: reqwest::Client,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            ledger,
            layout,
            client,
            reporter,
        }
    }

    /// HTTP client carrying the apkg user agent.
    pub fn http_client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
    }
}
