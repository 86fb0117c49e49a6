//! Storage connection.
//!
//! One SQLite connection per result file. `open` and `close` are reference
//! counted so nested scopes can each open the file without closing it
//! under one another; the connection is dropped when the count reaches
//! zero.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::config::StorageSettings;
use crate::error::{EdsError, EdsResult};

/// Schema name the view store is attached under.
pub const VIEW_SCHEMA: &str = "view_store";

/// Result file connection with reference-counted open/close.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    storage: StorageSettings,
    conn: Option<Connection>,
    refs: usize,
    view_path: Option<PathBuf>,
    view_refs: Cell<usize>,
}

impl Database {
    /// Wrap an existing result file. Nothing is opened yet.
    pub fn new(path: impl AsRef<Path>, storage: StorageSettings) -> EdsResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(EdsError::ConnectionState(format!(
                "result file does not exist: {}",
                path.display()
            )));
        }

        let view_path = if storage.attach_view {
            let candidate = storage.view_path(&path)?;
            candidate.exists().then_some(candidate)
        } else {
            None
        };

        Ok(Self {
            path,
            storage,
            conn: None,
            refs: 0,
            view_path,
            view_refs: Cell::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// View store that will be attached for view columns, if any.
    pub fn view_path(&self) -> Option<&Path> {
        self.view_path.as_deref()
    }

    pub fn has_view_store(&self) -> bool {
        self.view_path.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Increase the reference count, connecting if necessary. Returns
    /// whether a new connection was established.
    pub fn open(&mut self) -> EdsResult<bool> {
        self.refs += 1;
        if self.conn.is_some() {
            return Ok(false);
        }

        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(err) => {
                self.refs -= 1;
                return Err(err);
            }
        };
        info!(path = %self.path.display(), "opened result file");
        self.conn = Some(conn);
        Ok(true)
    }

    fn connect(&self) -> EdsResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let foreign_keys = if self.storage.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
        conn.busy_timeout(Duration::from_millis(self.storage.busy_timeout_ms))?;

        Ok(conn)
    }

    /// Decrease the reference count, disconnecting when it reaches zero.
    pub fn close(&mut self) {
        self.refs = self.refs.saturating_sub(1);
        if self.refs == 0 {
            self.disconnect();
        }
    }

    /// Disconnect regardless of the reference count.
    pub fn force_close(&mut self) {
        self.refs = 0;
        self.disconnect();
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                warn!(error = %err, "closing result file failed");
            }
            info!(path = %self.path.display(), "closed result file");
        }
    }

    /// The open connection.
    pub fn connection(&self) -> EdsResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| EdsError::ConnectionState("result file is not open".to_string()))
    }

    /// Copy the result file to `<file>_<local time>.bak` and return the
    /// copy's path.
    ///
    /// The copy is written by SQLite from the open connection, so it holds
    /// only committed data. The view store is not copied.
    pub fn backup(&self) -> EdsResult<PathBuf> {
        let conn = self.connection()?;
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!("_{}.bak", Local::now().format("%Y-%m-%d_%H-%M-%S")));
        let target = PathBuf::from(name);
        let Some(target_str) = target.to_str() else {
            return Err(EdsError::Validation(format!(
                "backup path is not valid UTF-8: {}",
                target.display()
            )));
        };

        debug!(path = target_str, "backing up result file");
        conn.execute("VACUUM main INTO ?1", [target_str])?;
        info!(path = %target.display(), "backed up result file");
        Ok(target)
    }

    /// Attach the view store for the lifetime of the returned guard.
    ///
    /// Only the outermost guard attaches and detaches.
    pub fn attach_view(&self) -> EdsResult<ViewGuard<'_>> {
        let conn = self.connection()?;
        let Some(view_path) = &self.view_path else {
            return Err(EdsError::ConnectionState(
                "view store is not available".to_string(),
            ));
        };

        if self.view_refs.get() == 0 {
            let path = view_path.to_string_lossy();
            conn.execute(&format!("ATTACH DATABASE ?1 AS {VIEW_SCHEMA}"), [path.as_ref()])?;
            info!(path = %path, "attached view store");
        }
        self.view_refs.set(self.view_refs.get() + 1);

        Ok(ViewGuard { db: self })
    }

    /// Number of live [`ViewGuard`]s.
    pub fn view_depth(&self) -> usize {
        self.view_refs.get()
    }

    fn release_view(&self) {
        let depth = self.view_refs.get().saturating_sub(1);
        self.view_refs.set(depth);
        if depth > 0 {
            return;
        }
        let Some(conn) = self.conn.as_ref() else {
            return;
        };
        match conn.execute_batch(&format!("DETACH DATABASE {VIEW_SCHEMA}")) {
            Ok(()) => debug!("detached view store"),
            Err(err) => warn!(error = %err, "detaching view store failed"),
        }
    }
}

/// Keeps the view store attached while alive.
#[derive(Debug)]
#[must_use = "the view store is detached when the guard is dropped"]
pub struct ViewGuard<'a> {
    db: &'a Database,
}

impl Drop for ViewGuard<'_> {
    fn drop(&mut self) {
        self.db.release_view();
    }
}
