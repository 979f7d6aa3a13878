#![allow(dead_code)]

use async_trait::async_trait;
use pinecoin_upgrades::application::initiator::PaymentInitiator;
use pinecoin_upgrades::application::reconciler::PaymentReconciler;
use pinecoin_upgrades::application::status::StatusPoller;
use pinecoin_upgrades::config::MerchantConfig;
use pinecoin_upgrades::domain::package::Catalog;
use pinecoin_upgrades::domain::ports::{PaymentGateway, PushPaymentAck, PushPaymentRequest};
use pinecoin_upgrades::error::{Result, UpgradeError};
use pinecoin_upgrades::infrastructure::in_memory::{InMemoryLedger, InMemoryProfileStore};
use pinecoin_upgrades::interfaces::http::AppState;
use std::sync::{Arc, Mutex};

/// A complete confirmation SMS for the Business Basic package.
pub const GOOD_MESSAGE: &str = "QGH7X8P2RT Confirmed. Ksh200.00 paid to ECERTIFY INC 3106479 \
     on 2/8/26 at 10:30 AM. New M-PESA balance is Ksh15.00.";

/// Gateway double: records every push and answers from a canned script.
pub struct MockGateway {
    reject_with: Mutex<Option<String>>,
    pub requests: Mutex<Vec<PushPaymentRequest>>,
}

impl MockGateway {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            reject_with: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn reject_next(&self, reason: &str) {
        *self.reject_with.lock().unwrap() = Some(reason.to_string());
    }

    pub fn seen(&self) -> Vec<PushPaymentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn push_payment(&self, request: PushPaymentRequest) -> Result<PushPaymentAck> {
        self.requests.lock().unwrap().push(request);
        if let Some(reason) = self.reject_with.lock().unwrap().take() {
            return Err(UpgradeError::Gateway(reason));
        }
        Ok(PushPaymentAck {
            provider_reference: Some("CO-123".to_string()),
            message: "STK push sent".to_string(),
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub ledger: Arc<InMemoryLedger>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub gateway: Arc<MockGateway>,
}

/// Wires the three services around shared in-memory stores and a mock
/// gateway, the way `main` does for production.
pub fn test_app() -> TestApp {
    let ledger = Arc::new(InMemoryLedger::new());
    let profiles = Arc::new(InMemoryProfileStore::new());
    let gateway = MockGateway::accepting();
    let catalog = Arc::new(Catalog::builtin());

    let state = AppState {
        initiator: Arc::new(PaymentInitiator::new(
            ledger.clone(),
            gateway.clone(),
            catalog.clone(),
            "http://localhost:8080/callbacks/payhero".to_string(),
        )),
        reconciler: Arc::new(PaymentReconciler::new(
            ledger.clone(),
            profiles.clone(),
            catalog,
            MerchantConfig::default(),
        )),
        poller: Arc::new(StatusPoller::new(ledger.clone())),
    };

    TestApp {
        state,
        ledger,
        profiles,
        gateway,
    }
}
