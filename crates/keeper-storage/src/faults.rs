//! Failure injection for the in-memory stores.
//!
//! Lets tests make a named operation fail so compensation and rollback
//! paths can be exercised without a real backend outage.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// A shared set of operation names that should fail.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    ops: Arc<Mutex<HashSet<&'static str>>>,
}

impl Faults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail until cleared.
    pub async fn inject(&self, op: &'static str) {
        self.ops.lock().await.insert(op);
    }

    pub async fn clear(&self, op: &'static str) {
        self.ops.lock().await.remove(op);
    }

    pub async fn clear_all(&self) {
        self.ops.lock().await.clear();
    }

    /// Returns the injected error for `op`, if one is armed.
    pub async fn check(&self, op: &'static str) -> Result<(), StorageError> {
        if self.ops.lock().await.contains(op) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("injected fault: {op}"),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inject_and_clear() {
        let faults = Faults::new();
        assert!(faults.check("upload").await.is_ok());

        faults.inject("upload").await;
        let shared = faults.clone();
        assert!(shared.check("upload").await.is_err());
        assert!(shared.check("delete").await.is_ok());

        faults.clear("upload").await;
        assert!(shared.check("upload").await.is_ok());
    }
}
