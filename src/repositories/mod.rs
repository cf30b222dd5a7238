pub mod document_store;
pub mod workflow_stores;

pub use document_store::DocumentStore;
pub use workflow_stores::{PrStore, ShStore, SitStore};
