//! Platform glue for timers and task spawning.
//!
//! The browser build runs on the single-threaded JS event loop, the native
//! build on a tokio runtime. Both sides are hidden behind the same two
//! functions so the rest of the crate never branches on target.

use std::future::Future;
use std::time::Duration;

/// Spawn a fire-and-forget task on the host scheduler.
#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Spawn a fire-and-forget task on the host scheduler.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(future);
}

/// Sleep for the given duration without blocking the executor.
pub(crate) async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    {
        gloo_timers::future::TimeoutFuture::new(duration.as_millis() as u32).await;
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::time::sleep(duration).await;
    }
}
