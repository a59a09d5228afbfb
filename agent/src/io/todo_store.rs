//! Persistent todo list kept as `tasks.json` at the workspace root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::io::atomic::write_atomic;

pub const TODO_FILE: &str = "tasks.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: u64,
    pub task: String,
    pub priority: String,
    pub status: TodoStatus,
    /// RFC 3339 UTC timestamp.
    pub created: String,
}

/// Read-modify-write access to the todo file.
///
/// Updates hold the store lock for the whole cycle and replace the file
/// atomically, so concurrent tool calls in one process never lose writes.
#[derive(Debug)]
pub struct TodoStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TodoStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<TodoItem>> {
        let _guard = self.lock();
        read_items(&self.path)
    }

    /// Append a pending item with the next free id.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn add(&self, task: &str, priority: &str) -> Result<TodoItem> {
        let _guard = self.lock();
        let mut items = read_items(&self.path)?;
        let id = items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        let item = TodoItem {
            id,
            task: task.to_string(),
            priority: priority.to_lowercase(),
            status: TodoStatus::Pending,
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        items.push(item.clone());
        write_items(&self.path, &items)?;
        debug!(id, "todo added");
        Ok(item)
    }

    /// Mark an item completed. Returns `None` when no item has `id`.
    #[instrument(skip_all, fields(path = %self.path.display(), id))]
    pub fn complete(&self, id: u64) -> Result<Option<TodoItem>> {
        let _guard = self.lock();
        let mut items = read_items(&self.path)?;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        item.status = TodoStatus::Completed;
        let updated = item.clone();
        write_items(&self.path, &items)?;
        debug!("todo completed");
        Ok(Some(updated))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no bad state.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_items(path: &Path) -> Result<Vec<TodoItem>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn write_items(path: &Path, items: &[TodoItem]) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(items).context("serialize todos")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
