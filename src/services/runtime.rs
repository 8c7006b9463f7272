//! Tokio Runtime Bridge
//!
//! The client itself is synchronous and runs on a single thread, but the MQTT
//! transport and signal handling need tokio. This module owns one shared
//! runtime those tasks are spawned on.
//!
//! ## Pattern
//!
//! ```text
//! client thread (tick / dispatch)
//!       │
//!       ▼
//! spawn_named_in_tokio("mqtt-pump", ...)
//!       │
//!       ▼
//! tokio::Runtime::spawn()
//!       │
//!       ▼
//! SessionEvent ──crossbeam──► client thread
//! ```

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// Global tokio runtime instance
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or initialize the global tokio runtime
fn get_runtime() -> &'static Runtime {
    TOKIO_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("bambu-beacon-io")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Spawn a named background task in the tokio runtime
///
/// Used for long-running loops like the MQTT event pump. The returned handle
/// lets the owner abort the task or check whether it is still running.
pub fn spawn_named_in_tokio<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::debug!("Spawning tokio task: {}", name);
    get_runtime().spawn(async move {
        future.await;
        tracing::debug!("Tokio task completed: {}", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_named_in_tokio() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        let handle = spawn_named_in_tokio("test-task", async move {
            flag_clone.store(true, Ordering::SeqCst);
        });

        get_runtime().block_on(async { handle.await.expect("task") });
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_abort_long_running_task() {
        let handle = spawn_named_in_tokio("sleeper", async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        handle.abort();
        let result = get_runtime().block_on(handle);
        assert!(result.is_err_and(|e| e.is_cancelled()));
    }
}
