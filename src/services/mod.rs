pub mod approval;
pub mod collection;
pub mod completion;
pub mod erp;
pub mod generation;
pub mod lifecycle;
pub mod locks;
pub mod queries;
pub mod reconciliation;
pub mod snapshot;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::repositories::{DocumentStore, PrStore, ShStore, SitStore};

use self::approval::ApprovalService;
use self::collection::BarcodeCollectionService;
use self::completion::CompletionService;
use self::erp::ErpLookup;
use self::generation::OrderGenerationService;
use self::lifecycle::LifecycleService;
use self::locks::HeaderLocks;
use self::queries::OrderQueryService;

/// Collaborators every fulfillment service of one workflow works with.
#[derive(Clone)]
pub struct WorkflowBackend<S: DocumentStore> {
    pub db: Arc<DbPool>,
    pub store: S,
    pub erp: Arc<dyn ErpLookup>,
    pub event_sender: Arc<EventSender>,
    pub locks: Arc<HeaderLocks>,
}

impl<S: DocumentStore> WorkflowBackend<S> {
    pub fn new(
        db: Arc<DbPool>,
        store: S,
        erp: Arc<dyn ErpLookup>,
        event_sender: Arc<EventSender>,
        locks: Arc<HeaderLocks>,
    ) -> Self {
        Self {
            db,
            store,
            erp,
            event_sender,
            locks,
        }
    }
}

/// The fulfillment operations of one workflow.
#[derive(Clone)]
pub struct WorkflowServices<S: DocumentStore> {
    pub generation: OrderGenerationService<S>,
    pub collection: BarcodeCollectionService<S>,
    pub completion: CompletionService<S>,
    pub lifecycle: LifecycleService<S>,
    pub approval: ApprovalService<S>,
    pub queries: OrderQueryService<S>,
}

impl<S: DocumentStore> WorkflowServices<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self {
            generation: OrderGenerationService::new(backend.clone()),
            collection: BarcodeCollectionService::new(backend.clone()),
            completion: CompletionService::new(backend.clone()),
            lifecycle: LifecycleService::new(backend.clone()),
            approval: ApprovalService::new(backend.clone()),
            queries: OrderQueryService::new(backend),
        }
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub production: WorkflowServices<PrStore>,
    pub shipping: WorkflowServices<ShStore>,
    pub subcontracting: WorkflowServices<SitStore>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        erp: Arc<dyn ErpLookup>,
        event_sender: Arc<EventSender>,
        locks: Arc<HeaderLocks>,
    ) -> Self {
        Self {
            production: WorkflowServices::new(WorkflowBackend::new(
                db.clone(),
                PrStore,
                erp.clone(),
                event_sender.clone(),
                locks.clone(),
            )),
            shipping: WorkflowServices::new(WorkflowBackend::new(
                db.clone(),
                ShStore,
                erp.clone(),
                event_sender.clone(),
                locks.clone(),
            )),
            subcontracting: WorkflowServices::new(WorkflowBackend::new(
                db,
                SitStore,
                erp,
                event_sender,
                locks,
            )),
        }
    }
}
