//! Per-operation time bound and panic boundary for awaited parts and actions

use asi_core::Error;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Await `fut`, failing with `Error::Timeout` once `limit` elapses. A panic
/// inside `fut` is caught and returned as an error. The abandoned future is
/// dropped.
pub(crate) async fn bounded<F>(what: &str, limit: Option<Duration>, fut: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let guarded = async {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!("{} panicked: {}", what, panic_message(panic.as_ref()))),
        }
    };
    let Some(limit) = limit else {
        return guarded.await;
    };
    match tokio::time::timeout(limit, guarded).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(what, limit.as_millis() as u64).into()),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
