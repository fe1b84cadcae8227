//! Stock service providing a simplified API for stock operations.

use common::ProductId;
use ledger::{LedgerEntry, LedgerQuery, LedgerStore};

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    AdjustStock, MoveStock, RegisterStock, SetThresholds, StockItem, TransferStock,
};

impl From<super::StockError> for DomainError {
    fn from(e: super::StockError) -> Self {
        DomainError::Stock(e)
    }
}

/// Service for managing stock.
///
/// Provides a high-level API for stock operations, wrapping the command
/// handler. Every mutation loads the aggregate by replay, runs the command,
/// appends with an expected-sequence check, and retries a bounded number of
/// times when a concurrent writer wins the race.
pub struct StockService<S: LedgerStore> {
    handler: CommandHandler<S, StockItem>,
}

impl<S: LedgerStore> StockService<S> {
    /// Creates a new stock service with the given ledger store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, StockItem> {
        &self.handler
    }

    /// Registers a product in the stock ledger.
    #[tracing::instrument(skip(self))]
    pub async fn register(
        &self,
        cmd: RegisterStock,
    ) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.register(
                    cmd.product_id,
                    cmd.warehouse_location.clone(),
                    cmd.minimum_stock,
                    cmd.maximum_stock,
                    cmd.reorder_point,
                    cmd.actor,
                )
            })
            .await
    }

    /// Records incoming stock from a supplier.
    #[tracing::instrument(skip(self))]
    pub async fn receive(&self, cmd: MoveStock) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.receive(cmd.quantity, cmd.details())
            })
            .await
    }

    /// Records outgoing stock.
    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, cmd: MoveStock) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| item.issue(cmd.quantity, cmd.details()))
            .await
    }

    /// Records stock coming back after an issue.
    #[tracing::instrument(skip(self))]
    pub async fn return_stock(
        &self,
        cmd: MoveStock,
    ) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.return_stock(cmd.quantity, cmd.details())
            })
            .await
    }

    /// Corrects the count by a signed delta.
    #[tracing::instrument(skip(self))]
    pub async fn adjust(&self, cmd: AdjustStock) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| item.adjust(cmd.delta, cmd.details()))
            .await
    }

    /// Moves stock to a different warehouse location.
    #[tracing::instrument(skip(self))]
    pub async fn transfer(
        &self,
        cmd: TransferStock,
    ) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.transfer(cmd.quantity, cmd.to_location.clone(), cmd.details())
            })
            .await
    }

    /// Reserves stock against a future issue.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, cmd: MoveStock) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.reserve(cmd.quantity, cmd.details())
            })
            .await
    }

    /// Releases a previous reservation.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, cmd: MoveStock) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.release(cmd.quantity, cmd.details())
            })
            .await
    }

    /// Changes the replenishment thresholds.
    #[tracing::instrument(skip(self))]
    pub async fn set_thresholds(
        &self,
        cmd: SetThresholds,
    ) -> Result<CommandResult<StockItem>, DomainError> {
        self.handler
            .execute_with_retry(cmd.product_id, |item| {
                item.set_thresholds(
                    cmd.minimum_stock,
                    cmd.maximum_stock,
                    cmd.reorder_point,
                    cmd.actor,
                )
            })
            .await
    }

    /// Loads a product's current stock snapshot by replaying its ledger.
    ///
    /// Returns None if the product is not registered.
    #[tracing::instrument(skip(self))]
    pub async fn get_stock_item(
        &self,
        product_id: ProductId,
    ) -> Result<Option<StockItem>, DomainError> {
        self.handler.load_existing(product_id).await
    }

    /// Returns a page of a product's movement ledger, newest first.
    ///
    /// Pages start at 1.
    #[tracing::instrument(skip(self))]
    pub async fn get_movements(
        &self,
        product_id: ProductId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let query = LedgerQuery::for_product(product_id)
            .newest_first()
            .page(page, per_page);
        Ok(self.handler.store().query_entries(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::stock::StockError;
    use ledger::InMemoryLedgerStore;

    async fn registered_service() -> (StockService<InMemoryLedgerStore>, ProductId) {
        let service = StockService::new(InMemoryLedgerStore::new());
        let product_id = ProductId::new();
        service
            .register(
                RegisterStock::new(product_id, "A-01").with_thresholds(5, Some(200), Some(10)),
            )
            .await
            .unwrap();
        (service, product_id)
    }

    #[tokio::test]
    async fn register_creates_stock_record() {
        let (service, product_id) = registered_service().await;

        let item = service.get_stock_item(product_id).await.unwrap().unwrap();
        assert_eq!(item.id(), Some(product_id));
        assert_eq!(item.on_hand(), 0);
    }

    #[tokio::test]
    async fn register_twice_fails() {
        let (service, product_id) = registered_service().await;

        let result = service
            .register(RegisterStock::new(product_id, "B-02"))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Stock(StockError::AlreadyRegistered))
        ));
    }

    #[tokio::test]
    async fn movement_on_unregistered_product_fails() {
        let service = StockService::new(InMemoryLedgerStore::new());

        let result = service.receive(MoveStock::new(ProductId::new(), 10)).await;
        assert!(matches!(
            result,
            Err(DomainError::Stock(StockError::NotRegistered))
        ));
    }

    #[tokio::test]
    async fn receive_then_issue() {
        let (service, product_id) = registered_service().await;

        let result = service.receive(MoveStock::new(product_id, 100)).await.unwrap();
        assert_eq!(result.aggregate.on_hand(), 100);

        let result = service.issue(MoveStock::new(product_id, 30)).await.unwrap();
        assert_eq!(result.aggregate.on_hand(), 70);
    }

    #[tokio::test]
    async fn failed_issue_leaves_no_ledger_entry() {
        let (service, product_id) = registered_service().await;
        service.receive(MoveStock::new(product_id, 100)).await.unwrap();
        service.issue(MoveStock::new(product_id, 30)).await.unwrap();

        let result = service.issue(MoveStock::new(product_id, 1000)).await;
        assert!(matches!(
            result,
            Err(DomainError::Stock(StockError::InsufficientStock { .. }))
        ));

        // Register + receive + issue = 3 entries; the failed issue adds none
        let movements = service.get_movements(product_id, 1, 50).await.unwrap();
        assert_eq!(movements.len(), 3);

        let item = service.get_stock_item(product_id).await.unwrap().unwrap();
        assert_eq!(item.on_hand(), 70);
    }

    #[tokio::test]
    async fn movements_are_newest_first_and_paged() {
        let (service, product_id) = registered_service().await;
        service.receive(MoveStock::new(product_id, 100)).await.unwrap();
        service.issue(MoveStock::new(product_id, 30)).await.unwrap();
        service.adjust(AdjustStock::new(product_id, -5)).await.unwrap();

        let page1 = service.get_movements(product_id, 1, 2).await.unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].entry_type, "Adjusted");
        assert_eq!(page1[1].entry_type, "Issued");

        let page2 = service.get_movements(product_id, 2, 2).await.unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[0].entry_type, "Received");
        assert_eq!(page2[1].entry_type, "Registered");
    }

    #[tokio::test]
    async fn transfer_updates_location() {
        let (service, product_id) = registered_service().await;
        service.receive(MoveStock::new(product_id, 20)).await.unwrap();

        let result = service
            .transfer(TransferStock::new(product_id, 20, "B-07"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.on_hand(), 20);
        assert_eq!(result.aggregate.warehouse_location(), "B-07");
    }

    #[tokio::test]
    async fn reserve_and_release() {
        let (service, product_id) = registered_service().await;
        service.receive(MoveStock::new(product_id, 10)).await.unwrap();

        let result = service.reserve(MoveStock::new(product_id, 6)).await.unwrap();
        assert_eq!(result.aggregate.reserved(), 6);

        let result = service.release(MoveStock::new(product_id, 2)).await.unwrap();
        assert_eq!(result.aggregate.reserved(), 4);
        assert_eq!(result.aggregate.available(), 6);
    }

    #[tokio::test]
    async fn set_thresholds_rejects_max_below_min() {
        let (service, product_id) = registered_service().await;

        let result = service
            .set_thresholds(SetThresholds::new(product_id, 20).with_maximum(10))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Stock(StockError::InvalidThresholds { .. }))
        ));
    }
}
