/*!
 * Transaction Helper Utilities
 *
 * Services open a transaction with `begin()`, run their reads and writes on it and hand the
 * outcome to [`finish`], which commits on success and rolls back on failure.
 */

use sea_orm::{DatabaseTransaction, DbErr};
use tracing::warn;

/// Commits `txn` when `outcome` is `Ok`, rolls it back otherwise.
///
/// A failed rollback is logged and the original error is returned, so callers always see the
/// cause of the failure rather than the cleanup problem.
pub async fn finish<T, E>(txn: DatabaseTransaction, outcome: Result<T, E>) -> Result<T, E>
where
    E: From<DbErr>,
{
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_schema, establish_connection_with_config, DbConfig};
    use crate::entities::pr::parameter;
    use crate::errors::ServiceError;
    use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};

    fn row() -> parameter::ActiveModel {
        parameter::ActiveModel {
            allow_less_quantity_based_on_order: Set(true),
            allow_more_quantity_based_on_order: Set(false),
            require_all_order_items_collected: Set(false),
            require_approval_before_erp: Set(false),
            updated_at: Set(None),
            is_deleted: Set(false),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let db = establish_connection_with_config(&DbConfig::in_memory())
            .await
            .unwrap();
        create_schema(&db).await.unwrap();

        let txn = db.begin().await.unwrap();
        let outcome: Result<_, ServiceError> = row().insert(&txn).await.map_err(Into::into);
        finish(txn, outcome).await.unwrap();

        assert_eq!(parameter::Entity::find().all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_rollback_on_error() {
        let db = establish_connection_with_config(&DbConfig::in_memory())
            .await
            .unwrap();
        create_schema(&db).await.unwrap();

        let txn = db.begin().await.unwrap();
        row().insert(&txn).await.unwrap();
        let outcome: Result<(), ServiceError> =
            Err(ServiceError::ValidationError("rejected".into()));
        let err = finish(txn, outcome).await.unwrap_err();

        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert!(parameter::Entity::find().all(&db).await.unwrap().is_empty());
    }
}
