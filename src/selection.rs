use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::Backend;
use crate::models::ItemKind;

/// How long a card must stay pressed before it becomes selected.
pub const LONG_PRESS: Duration = Duration::from_millis(1000);

// ── Selection set ──────────────────────────────────────────────────────────

/// Unique item identifiers in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<i64>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Append `id` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, id: i64) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove every occurrence of `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| *existing != id);
        self.ids.len() != before
    }

    /// Remove each of `ids`, keeping the order of what remains.
    pub fn remove_all(&mut self, ids: &[i64]) {
        self.ids.retain(|existing| !ids.contains(existing));
    }

    /// Replace the contents, dropping duplicates from `ids`.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.ids.clear();
        for id in ids {
            self.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.ids
    }
}

// ── Controller ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selecting,
}

/// What a press release means to the card that received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Nothing is selected: the release is a plain click that opens the item.
    Open(i64),
    /// Selection mode is active, navigation is suppressed.
    Ignored,
}

/// Result of a bulk delete. The batch's ids leave the selection whatever the
/// outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub deleted: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

impl BulkDeleteReport {
    pub fn requested(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-view selection state plus the long-press timers that feed it.
///
/// Timers run as tokio tasks holding only a weak reference to the selection,
/// and are aborted when the controller is dropped, so a pending long press can
/// never touch the state of a view that has gone away. Arming a timer needs a
/// tokio runtime.
pub struct SelectionController {
    selected: Arc<Mutex<SelectionSet>>,
    timers: HashMap<i64, JoinHandle<()>>,
    long_press: Duration,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionController {
    pub fn new() -> Self {
        Self::with_long_press(LONG_PRESS)
    }

    pub fn with_long_press(long_press: Duration) -> Self {
        Self {
            selected: Arc::new(Mutex::new(SelectionSet::new())),
            timers: HashMap::new(),
            long_press,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SelectionSet> {
        // Every mutation is a single Vec operation, so a poisoned set is still consistent
        self.selected.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SelectionState {
        if self.lock().is_empty() {
            SelectionState::Idle
        } else {
            SelectionState::Selecting
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SelectionState::Idle
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.lock().contains(id)
    }

    /// Snapshot of the selected ids in insertion order.
    pub fn selected(&self) -> Vec<i64> {
        self.lock().as_slice().to_vec()
    }

    #[cfg(test)]
    fn pending_presses(&self) -> usize {
        self.timers.values().filter(|t| !t.is_finished()).count()
    }

    /// Start a press on card `id`. Unless [`end_press`](Self::end_press) comes
    /// first, `id` is selected once the long-press threshold elapses.
    pub fn begin_press(&mut self, id: i64) {
        self.timers.retain(|_, timer| !timer.is_finished());
        if let Some(previous) = self.timers.remove(&id) {
            previous.abort();
        }

        let selected: Weak<Mutex<SelectionSet>> = Arc::downgrade(&self.selected);
        let deadline = tokio::time::Instant::now() + self.long_press;
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(selected) = selected.upgrade() {
                let mut set = selected.lock().unwrap_or_else(|e| e.into_inner());
                if set.insert(id) {
                    debug!(id, "long press selected item");
                }
            }
        });
        self.timers.insert(id, timer);
    }

    /// Release a press on card `id`, cancelling its pending long-press timer.
    pub fn end_press(&mut self, id: i64) -> PressOutcome {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
        if self.is_idle() {
            PressOutcome::Open(id)
        } else {
            PressOutcome::Ignored
        }
    }

    /// Checkbox handler: add `id` when checked (no duplicates), remove it
    /// otherwise.
    pub fn toggle(&self, id: i64, checked: bool) {
        let mut set = self.lock();
        if checked {
            set.insert(id);
        } else {
            set.remove(id);
        }
    }

    pub fn select_all(&self, ids: impl IntoIterator<Item = i64>) {
        self.lock().replace(ids);
    }

    /// Leave selection mode.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Delete every selected item of `kind` concurrently and wait for the
    /// whole batch. Failures are logged and reported. The ids of the batch
    /// are then deselected regardless; anything selected meanwhile stays.
    pub async fn delete_selected<B: Backend>(&self, backend: &B, kind: ItemKind) -> BulkDeleteReport {
        let ids = self.selected();
        let results = join_all(ids.iter().map(|&id| async move {
            (id, backend.delete_item(kind, id).await)
        }))
        .await;

        let mut report = BulkDeleteReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.deleted.push(id),
                Err(e) => {
                    warn!(%kind, id, "failed to delete item: {}", e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        self.lock().remove_all(&ids);
        report
    }
}

impl Drop for SelectionController {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}
