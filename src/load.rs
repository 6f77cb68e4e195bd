//! Bulk load execution
//!
//! [`BulkLoader`] resolves the effective batch size and hands the buffer
//! to the transfer mechanism. It never retries: a failed transfer
//! surfaces unchanged, and whatever partial batches the mechanism already
//! wrote stay where they landed.

use tracing::{debug, info};

use crate::records::TabularBuffer;
use crate::store::{BulkCopy, StoreSession, TransferError};

/// Executes bulk transfers with resolved batch sizes
pub struct BulkLoader<C> {
    mechanism: C,
}

impl<C> BulkLoader<C> {
    /// Create a loader over a transfer mechanism
    pub fn new(mechanism: C) -> Self {
        Self { mechanism }
    }

    /// Reference to the transfer mechanism
    pub fn mechanism(&self) -> &C {
        &self.mechanism
    }

    /// Load every row of a buffer into a destination table
    ///
    /// # Arguments
    /// * `session` - open session the transfer rides on
    /// * `buffer` - validated tabular data
    /// * `destination` - table receiving the rows
    /// * `batch_size` - rows per transfer batch; `None` sends all rows in
    ///   a single batch
    /// * `timeout_secs` - server-side timeout for the whole transfer
    ///
    /// # Returns
    /// Number of rows written
    pub async fn load<S>(
        &self,
        session: &mut S,
        buffer: &TabularBuffer,
        destination: &str,
        batch_size: Option<usize>,
        timeout_secs: u32,
    ) -> Result<u64, TransferError>
    where
        S: StoreSession,
        C: BulkCopy<S>,
    {
        let batch = batch_size.unwrap_or_else(|| buffer.row_count());
        debug!(
            "Bulk transfer of {} rows into '{}' (batch size {}, timeout {}s)",
            buffer.row_count(),
            destination,
            batch,
            timeout_secs
        );
        let written = self
            .mechanism
            .transfer(session, destination, buffer, batch, timeout_secs)
            .await?;
        info!("Bulk load into '{}' wrote {} rows", destination, written);
        Ok(written)
    }
}
