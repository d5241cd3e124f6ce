use store::Transaction;

use crate::error::DomainError;

/// Commits `tx` if `result` is Ok, otherwise rolls it back.
///
/// A failed rollback is logged and the original error is returned; the
/// connection drops the transaction either way.
pub(crate) async fn finish<T, R>(tx: T, result: Result<R, DomainError>) -> Result<R, DomainError>
where
    T: Transaction,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
