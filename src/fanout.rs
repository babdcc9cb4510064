use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run `f` for every item with at most `limit` calls in flight.
///
/// Results come back in input order paired with their item. Nothing is
/// retried or cancelled; a task that panics yields `None` for its slot
/// and callers decide what a failure is worth.
pub async fn bounded_fan_out<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<(T, Option<R>)>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, item) in items.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let fut = f(item);
        tasks.spawn(async move {
            // The semaphore is never closed, so acquire can't fail
            let _permit = semaphore.acquire_owned().await.ok();
            (idx, fut.await)
        });
    }

    let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => log::warn!("fan-out task failed: {e}"),
        }
    }

    items.into_iter().zip(slots).collect()
}
