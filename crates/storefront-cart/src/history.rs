//! Per-customer order history: which coupons were consumed and whether the
//! customer has ordered before.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::normalize_code;
use crate::coupon::{CustomerContext, Ineligibility};
use crate::error::{CommerceError, Rejection};
use crate::ids::SessionId;

/// Storage for the facts coupon rules need about a customer.
///
/// Implementations are shared across carts, so `consume_coupon` must be
/// atomic: of two concurrent consumes of the same code for one session,
/// exactly one succeeds.
pub trait CustomerHistory: Send + Sync {
    fn used_coupons(&self, session: &SessionId) -> HashSet<String>;

    fn is_first_order(&self, session: &SessionId) -> bool;

    /// Move `code` into the session's used set.
    ///
    /// Fails with `CouponRejected(AlreadyUsed)` if it is already there.
    fn consume_coupon(&self, session: &SessionId, code: &str) -> Result<(), CommerceError>;

    /// Count a completed order against the session.
    fn record_order(&self, session: &SessionId);

    /// Snapshot for the eligibility evaluator.
    fn context(&self, session: &SessionId) -> CustomerContext {
        CustomerContext {
            used_coupons: self.used_coupons(session),
            is_first_order: self.is_first_order(session),
        }
    }
}

/// What [`InMemoryHistory`] keeps per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub used_coupons: HashSet<String>,
    pub completed_orders: u32,
    /// Bumped on every write.
    pub version: u64,
}

/// Process-local history behind a single lock.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Mutex<HashMap<SessionId, CustomerRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a session, e.g. from a persisted profile.
    pub fn with_record(self, session: SessionId, record: CustomerRecord) -> Self {
        self.lock().insert(session, record);
        self
    }

    pub fn record(&self, session: &SessionId) -> Option<CustomerRecord> {
        self.lock().get(session).cloned()
    }

    // Every write is a single insert or increment; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, CustomerRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CustomerHistory for InMemoryHistory {
    fn used_coupons(&self, session: &SessionId) -> HashSet<String> {
        self.lock()
            .get(session)
            .map(|r| r.used_coupons.clone())
            .unwrap_or_default()
    }

    fn is_first_order(&self, session: &SessionId) -> bool {
        self.lock()
            .get(session)
            .map_or(true, |r| r.completed_orders == 0)
    }

    fn consume_coupon(&self, session: &SessionId, code: &str) -> Result<(), CommerceError> {
        let code = normalize_code(code);
        let mut records = self.lock();
        let record = records.entry(session.clone()).or_default();
        if !record.used_coupons.insert(code.clone()) {
            warn!(session = %session, code = %code, "coupon already consumed");
            return Err(Rejection::Ineligible(Ineligibility::AlreadyUsed).into());
        }
        record.version += 1;
        info!(session = %session, code = %code, version = record.version, "coupon consumed");
        Ok(())
    }

    fn record_order(&self, session: &SessionId) {
        let mut records = self.lock();
        let record = records.entry(session.clone()).or_default();
        record.completed_orders = record.completed_orders.saturating_add(1);
        record.version += 1;
        debug!(session = %session, orders = record.completed_orders, "order recorded");
    }
}
