//! Ordered fail-fast task group
//!
//! Runs a fixed set of fallible futures concurrently, returns their results in
//! input order, and short-circuits on the first error. Remaining tasks are
//! aborted when the group is dropped.

use std::future::Future;

use tokio::task::JoinSet;

/// Failure of an ordered join
#[derive(Debug, thiserror::Error)]
pub enum JoinFailure<E> {
    /// The future at `index` resolved to an error
    #[error("task {index} failed: {error}")]
    Failed { index: usize, error: E },
    /// A task panicked or was cancelled before producing a result
    #[error("task did not complete: {0}")]
    Incomplete(String),
}

/// Await every future concurrently and collect results by input position.
///
/// Completion order does not affect output order. The first error resolves
/// the join immediately; sibling tasks still in flight are aborted.
///
/// Must be called from within a tokio runtime.
pub async fn join_ordered<T, E, F>(futures: Vec<F>) -> Result<Vec<T>, JoinFailure<E>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let count = futures.len();
    let mut set = JoinSet::new();
    for (index, future) in futures.into_iter().enumerate() {
        set.spawn(async move { (index, future.await) });
    }

    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(value))) => slots[index] = Some(value),
            Ok((index, Err(error))) => {
                set.abort_all();
                return Err(JoinFailure::Failed { index, error });
            }
            Err(join_error) => {
                set.abort_all();
                return Err(JoinFailure::Incomplete(join_error.to_string()));
            }
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| JoinFailure::Incomplete("task finished without a result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_empty_join() {
        let futures: Vec<std::future::Ready<Result<u32, String>>> = Vec::new();
        let result = join_ordered(futures).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let mut senders = Vec::new();
        let mut futures = Vec::new();
        for _ in 0..6 {
            let (tx, rx) = oneshot::channel::<usize>();
            senders.push(tx);
            futures.push(async move { rx.await.map_err(|e| e.to_string()) });
        }

        let handle = tokio::spawn(join_ordered(futures));

        // Complete in reverse order, yielding so each task observes its value.
        for (i, tx) in senders.into_iter().enumerate().rev() {
            tx.send(i * 10).unwrap();
            tokio::task::yield_now().await;
        }

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result, vec![0, 10, 20, 30, 40, 50]);
    }

    async fn ready(value: u32) -> Result<u32, String> {
        Ok(value)
    }

    async fn fail(message: &'static str) -> Result<u32, String> {
        Err(message.to_string())
    }

    async fn crash() -> Result<u32, String> {
        panic!("decoder crashed")
    }

    async fn wait_for(rx: oneshot::Receiver<u32>) -> Result<u32, String> {
        rx.await.map_err(|e| e.to_string())
    }

    #[tokio::test]
    async fn test_first_error_short_circuits() {
        let (mut pending_tx, pending_rx) = oneshot::channel::<u32>();

        let futures: Vec<BoxFuture<'static, Result<u32, String>>> = vec![
            wait_for(pending_rx).boxed(),
            fail("mesh 1 unreachable").boxed(),
            ready(2).boxed(),
        ];

        let result = tokio::time::timeout(Duration::from_secs(5), join_ordered(futures))
            .await
            .expect("join must not wait for the pending task");

        match result {
            Err(JoinFailure::Failed { index, error }) => {
                assert_eq!(index, 1);
                assert_eq!(error, "mesh 1 unreachable");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // The still-pending sibling is aborted, dropping its receiver.
        tokio::time::timeout(Duration::from_secs(5), pending_tx.closed())
            .await
            .expect("pending task should be aborted");
    }

    #[tokio::test]
    async fn test_panicking_task_is_incomplete() {
        let futures: Vec<BoxFuture<'static, Result<u32, String>>> =
            vec![ready(0).boxed(), crash().boxed()];

        let result = join_ordered(futures).await;
        assert!(matches!(result, Err(JoinFailure::Incomplete(_))));
    }
}
