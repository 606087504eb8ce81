use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{ProcessName, StatusTable};
use crate::services::ProcessMonitor;

/// Result of adding a name to the watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    AlreadyMonitored,
}

/// Result of removing a name from the watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    NotMonitored,
}

#[derive(Default)]
struct WatchStateInner {
    watchlist: Vec<ProcessName>,
    status: StatusTable,
}

/// Watchlist and published status table behind a single lock.
///
/// Every operation takes the lock for the duration of one copy, mutation or
/// swap, so readers never see a half-updated watchlist and a publish can never
/// bring back an entry that a concurrent removal deleted.
#[derive(Default)]
pub struct WatchState {
    inner: Mutex<WatchStateInner>,
}

impl WatchState {
    /// Seeds the watchlist, keeping the first occurrence of each name.
    pub fn new(names: impl IntoIterator<Item = ProcessName>) -> Self {
        let mut seen = HashSet::new();
        let watchlist = names
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Self {
            inner: Mutex::new(WatchStateInner {
                watchlist,
                status: StatusTable::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatchStateInner> {
        // 状态始终保持一致，中毒的锁可以直接继续使用
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn watchlist(&self) -> Vec<ProcessName> {
        self.lock().watchlist.clone()
    }

    pub fn add(&self, name: ProcessName) -> AddOutcome {
        let mut inner = self.lock();
        if inner.watchlist.contains(&name) {
            return AddOutcome::AlreadyMonitored;
        }
        inner.watchlist.push(name);
        AddOutcome::Added
    }

    /// Drops `name` from the watchlist and its status entry in one step.
    pub fn remove(&self, name: &ProcessName) -> RemoveOutcome {
        let mut inner = self.lock();
        match inner.watchlist.iter().position(|n| n == name) {
            Some(index) => {
                inner.watchlist.remove(index);
                inner.status.remove(name);
                RemoveOutcome::Removed
            }
            None => RemoveOutcome::NotMonitored,
        }
    }

    /// Deep copy of the current status table.
    pub fn get_status(&self) -> StatusTable {
        self.lock().status.clone()
    }

    /// Installs `table` as the published state.
    ///
    /// Entries for names that left the watchlist after the cycle read it are
    /// dropped, so a removal racing a cycle stays removed.
    pub fn replace(&self, mut table: StatusTable) {
        let mut inner = self.lock();
        let watched: HashSet<&ProcessName> = inner.watchlist.iter().collect();
        table.retain(|name, _| watched.contains(name));
        inner.status = table;
    }
}

pub type AppState = Arc<ProcessMonitor>;
