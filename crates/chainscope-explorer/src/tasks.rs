use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use tokio::task::JoinHandle;

/// Spawner for data-state fetches on the current tokio `LocalSet`.
///
/// Keeps the handles so a render pass can wait until every fetch it
/// launched has finished. Spawning outside a `LocalSet` panics (tokio).
#[derive(Clone, Default)]
pub struct LocalTasks {
    handles: Rc<RefCell<Vec<JoinHandle<()>>>>,
}

impl LocalSpawn for LocalTasks {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        let handle = tokio::task::spawn_local(future);
        self.handles.borrow_mut().push(handle);
        Ok(())
    }
}

impl LocalTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Awaits every spawned task, including tasks spawned meanwhile, and
    /// returns how many there were.
    pub async fn drain(&self) -> usize {
        let mut finished = 0;
        loop {
            let batch = std::mem::take(&mut *self.handles.borrow_mut());
            if batch.is_empty() {
                return finished;
            }
            for handle in batch {
                finished += 1;
                if let Err(e) = handle.await {
                    log::warn!("fetch task failed: {e}");
                }
            }
        }
    }
}
