use std::fmt::Display;
use std::future::Future;

/// Run a side effect whose failure must never fail the request around it.
///
/// Errors are logged and swallowed.
pub async fn best_effort<F, T, E>(label: &'static str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(task = label, error = %e, "Best-effort task failed");
            None
        }
    }
}

/// Fire-and-forget variant for work nobody waits on.
pub fn spawn_best_effort<F, T, E>(label: &'static str, fut: F)
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        best_effort(label, fut).await;
    });
}
