use std::future::Future;
use tokio::task::JoinHandle;

/// Background tasks bound to one transport (reader, heartbeat).
///
/// Replacing or closing the transport aborts them together; dropping the manager does too.
pub struct TaskManager {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Spawns `future` under `name`, forgetting tasks that already ended
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|(_, handle)| !handle.is_finished());
        self.tasks.push((name, tokio::spawn(future)));
        tracing::debug!("Spawned {} task", name);
    }

    /// Aborts every tracked task without waiting for it
    pub fn abort_all(&mut self) {
        for (name, handle) in self.tasks.drain(..) {
            if !handle.is_finished() {
                tracing::debug!("Aborting {} task", name);
                handle.abort();
            }
        }
    }

    /// Names of tracked tasks still running
    pub fn running(&self) -> Vec<&'static str> {
        self.tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
