//! Hierarchical cancellation
//!
//! A [`CancelScope`] is cancelled explicitly or when any ancestor is. Child
//! scopes let a sub-operation be torn down without touching its caller.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Returned when work is cut short by its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

struct ScopeState {
    sender: watch::Sender<bool>,
    parent: Option<CancelScope>,
}

/// Cloneable cancellation token. Clones share state.
#[derive(Clone)]
pub struct CancelScope {
    state: Arc<ScopeState>,
}

impl CancelScope {
    /// A root scope that is only cancelled explicitly
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<CancelScope>) -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            state: Arc::new(ScopeState { sender, parent }),
        }
    }

    /// A scope cancelled with this one, that can also be cancelled alone
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    pub fn cancel(&self) {
        self.state.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.sender.borrow()
            || self
                .state
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_cancelled())
    }

    /// Err if this scope is already cancelled
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once this scope or an ancestor is cancelled
    pub fn cancelled(&self) -> BoxFuture<'static, ()> {
        let mut receiver = self.state.sender.subscribe();
        let parent = self.state.parent.clone();

        Box::pin(async move {
            let own = async move {
                if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
                    // Every handle to this scope is gone, so it can no
                    // longer be cancelled directly
                    std::future::pending::<()>().await;
                }
            };

            match parent {
                Some(parent) => {
                    tokio::select! {
                        _ = own => {}
                        _ = parent.cancelled() => {}
                    }
                }
                None => own.await,
            }
        })
    }

    /// Run `fut` unless the scope is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Cancelled>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            value = fut => Ok(value),
        }
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelScope")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let scope = CancelScope::new();
        let waiter = tokio::spawn(scope.cancelled());

        scope.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancels_child() {
        let parent = CancelScope::new();
        let child = parent.child();
        let grandchild = child.child();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), grandchild.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_child_does_not_cancel_parent() {
        let parent = CancelScope::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(
            tokio::time::timeout(Duration::from_millis(20), parent.cancelled())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_run_returns_value_or_cancelled() {
        let scope = CancelScope::new();
        assert_eq!(scope.run(async { 7 }).await, Ok(7));

        let slow = CancelScope::new();
        let canceller = slow.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = slow
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(Cancelled));

        assert_eq!(slow.run(async { 7 }).await, Err(Cancelled));
    }
}
