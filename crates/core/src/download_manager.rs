use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Run `work` over `items` on at most `concurrency` worker tasks.
///
/// Results come back in input order. Workers live in a `JoinSet`, so dropping
/// the returned future aborts every job still in flight. A job whose worker
/// panics is logged and left out of the result.
pub async fn run_pool<T, R, F, Fut>(items: Vec<T>, concurrency: usize, work: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let concurrency = concurrency.clamp(1, total);

    // Both channels hold every item, so neither side ever waits on the other.
    let (tx, rx) = mpsc::channel::<(usize, T)>(total);
    let (result_tx, mut result_rx) = mpsc::channel::<(usize, R)>(total);
    for job in items.into_iter().enumerate() {
        // Capacity covers every item and `rx` is still alive.
        if let Err(e) = tx.try_send(job) {
            log::error!("job queue rejected an item: {e}");
        }
    }
    drop(tx); // Close channel

    let rx = Arc::new(Mutex::new(rx));
    let work = Arc::new(work);

    let mut workers = JoinSet::new();
    for _ in 0..concurrency {
        let rx = Arc::clone(&rx);
        let result_tx = result_tx.clone();
        let work = Arc::clone(&work);
        workers.spawn(async move {
            loop {
                let job = {
                    let mut rx = rx.lock().await;
                    rx.recv().await
                };
                let Some((idx, item)) = job else { break };
                let out = work(item).await;
                if result_tx.send((idx, out)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            log::error!("worker task failed: {e}");
        }
    }

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    while let Some((idx, out)) = result_rx.recv().await {
        slots[idx] = Some(out);
    }
    slots.into_iter().flatten().collect()
}
