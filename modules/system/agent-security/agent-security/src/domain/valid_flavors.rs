use std::future::Future;
use std::sync::Arc;

use agent_security_sdk::AuthFlavor;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::error::DomainError;

/// Flavors the server accepts, populated from the first successful attach
/// info query and never refreshed.
///
/// Callers arriving while a query is in flight wait for it. A failed query,
/// or one that yields no usable flavor, leaves the set unpopulated and the
/// next caller queries again.
#[derive(Default)]
pub struct ValidFlavorSet {
    flavors: OnceCell<Arc<[AuthFlavor]>>,
}

impl ValidFlavorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the populated set, running `query` for the raw flavor ids
    /// first if needed. Ids this agent does not know are skipped.
    ///
    /// # Errors
    ///
    /// - whatever `query` fails with
    /// - `NoValidFlavors` if none of the returned ids is usable
    pub async fn get_or_populate<F, Fut>(&self, query: F) -> Result<Arc<[AuthFlavor]>, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<i32>, DomainError>>,
    {
        let flavors = self
            .flavors
            .get_or_try_init(|| async {
                let known = usable_flavors(query().await?);
                if known.is_empty() {
                    return Err(DomainError::NoValidFlavors);
                }
                info!(flavors = ?known, "retrieved valid authentication flavors from server");
                Ok(known.into())
            })
            .await?;
        Ok(Arc::clone(flavors))
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<[AuthFlavor]>> {
        self.flavors.get().cloned()
    }
}

fn usable_flavors(ids: Vec<i32>) -> Vec<AuthFlavor> {
    let mut known: Vec<AuthFlavor> = Vec::with_capacity(ids.len());
    for id in ids {
        match AuthFlavor::try_from(id) {
            Ok(flavor) if !known.contains(&flavor) => known.push(flavor),
            Ok(_) => {}
            Err(_) => warn!(flavor = id, "ignoring unknown authentication flavor"),
        }
    }
    known
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tracing_test::traced_test;

    use super::*;

    const SYS: i32 = 1;
    const AM: i32 = 2;

    #[tokio::test]
    async fn concurrent_callers_share_one_query() {
        let set = Arc::new(ValidFlavorSet::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let set = Arc::clone(&set);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                set.get_or_populate(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(vec![SYS])
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(&*handle.await.unwrap().unwrap(), &[AuthFlavor::AuthSys]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_query_is_retried_by_next_caller() {
        let set = ValidFlavorSet::new();

        let first = set
            .get_or_populate(|| async { Err(DomainError::AttachInfo("unreachable".into())) })
            .await;
        assert!(matches!(first, Err(DomainError::AttachInfo(_))));
        assert!(set.get().is_none());

        let second = set.get_or_populate(|| async { Ok(vec![SYS, AM]) }).await.unwrap();
        assert_eq!(&*second, &[AuthFlavor::AuthSys, AuthFlavor::AuthAm]);
    }

    #[tokio::test]
    async fn populated_set_is_not_queried_again() {
        let set = ValidFlavorSet::new();
        set.get_or_populate(|| async { Ok(vec![SYS]) }).await.unwrap();

        let again = set.get_or_populate(|| async { Ok(vec![AM]) }).await.unwrap();
        assert_eq!(&*again, &[AuthFlavor::AuthSys]);
    }

    #[tokio::test]
    #[traced_test]
    async fn unknown_ids_are_skipped() {
        let set = ValidFlavorSet::new();
        let flavors = set
            .get_or_populate(|| async { Ok(vec![42, AM, AM]) })
            .await
            .unwrap();

        assert_eq!(&*flavors, &[AuthFlavor::AuthAm]);
        assert!(logs_contain("ignoring unknown authentication flavor"));
    }

    #[tokio::test]
    async fn only_unknown_ids_leave_set_unpopulated() {
        let set = ValidFlavorSet::new();

        let result = set.get_or_populate(|| async { Ok(vec![42, 77]) }).await;
        assert!(matches!(result, Err(DomainError::NoValidFlavors)));
        assert!(set.get().is_none());
    }
}
