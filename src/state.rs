//! Shared application state: one store, one lock map, and the component
//! services wired over them.

use std::sync::Arc;

use crate::core::{
    Analytics, BalanceLedger, CreditWorkflow, HolidayCalendar, LifecycleEngine, LockMap,
    TypeRegistry,
};
use crate::notify::Notifier;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<Store>,
    pub locks: Arc<LockMap>,
    pub registry: Arc<TypeRegistry>,
    pub calendar: Arc<HolidayCalendar>,
    pub ledger: Arc<BalanceLedger>,
    pub lifecycle: Arc<LifecycleEngine>,
    pub credits: Arc<CreditWorkflow>,
    pub analytics: Arc<Analytics>,
}

impl AppState {
    pub fn new(store: Store, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(store);
        let locks = Arc::new(LockMap::new());
        let registry = Arc::new(TypeRegistry::new(store.clone()));
        let calendar = Arc::new(HolidayCalendar::new(store.clone()));
        let ledger = Arc::new(BalanceLedger::new(store.clone(), locks.clone()));
        let lifecycle = Arc::new(LifecycleEngine::new(
            store.clone(),
            ledger.clone(),
            registry.clone(),
            calendar.clone(),
            locks.clone(),
            notifier.clone(),
        ));
        let credits = Arc::new(CreditWorkflow::new(
            store.clone(),
            ledger.clone(),
            registry.clone(),
            locks.clone(),
            notifier,
        ));
        let analytics = Arc::new(Analytics::new(store.clone()));

        AppState {
            store,
            locks,
            registry,
            calendar,
            ledger,
            lifecycle,
            credits,
            analytics,
        }
    }
}
