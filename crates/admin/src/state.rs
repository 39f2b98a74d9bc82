//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::{
    BatchServices, BulkDeleteService, Executor, ExportService, HistoryLedger, Normalizer,
    Resolver, Scanner, TagService, UndoService, scanner::PAGE_SIZE,
};
use crate::shopify::{AdminClient, ResourceTypeCatalog};

/// Application state shared across all handlers.
///
/// Every service is built once over the same client and catalog.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    client: AdminClient,
    scanner: Scanner,
    ledger: HistoryLedger,
    batch: BatchServices,
    bulk_delete: BulkDeleteService,
    tags: TagService,
    undo: UndoService,
    export: ExportService,
}

impl AppState {
    /// Build the state around a Shopify client.
    #[must_use]
    pub fn new(client: AdminClient) -> Self {
        let catalog = Arc::new(ResourceTypeCatalog::new());
        let resolver = Resolver::new(client.clone(), Arc::clone(&catalog));
        let normalizer = Normalizer::new(client.clone(), resolver.clone());
        let executor = Executor::new(client.clone());
        let scanner = Scanner::new(client.clone(), Arc::clone(&catalog));
        let ledger = HistoryLedger::new(client.clone());

        Self {
            inner: Arc::new(AppStateInner {
                bulk_delete: BulkDeleteService::new(
                    scanner.clone(),
                    executor.clone(),
                    ledger.clone(),
                ),
                tags: TagService::new(scanner.clone(), executor.clone(), ledger.clone()),
                undo: UndoService::new(
                    resolver.clone(),
                    normalizer.clone(),
                    executor.clone(),
                    ledger.clone(),
                ),
                export: ExportService::new(client.clone(), catalog, PAGE_SIZE),
                batch: BatchServices {
                    resolver,
                    normalizer,
                    executor,
                    ledger: ledger.clone(),
                },
                client,
                scanner,
                ledger,
            }),
        }
    }

    pub fn client(&self) -> &AdminClient {
        &self.inner.client
    }

    pub fn scanner(&self) -> &Scanner {
        &self.inner.scanner
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.inner.ledger
    }

    pub fn batch(&self) -> &BatchServices {
        &self.inner.batch
    }

    pub fn bulk_delete(&self) -> &BulkDeleteService {
        &self.inner.bulk_delete
    }

    pub fn tags(&self) -> &TagService {
        &self.inner.tags
    }

    pub fn undo(&self) -> &UndoService {
        &self.inner.undo
    }

    pub fn export(&self) -> &ExportService {
        &self.inner.export
    }
}
