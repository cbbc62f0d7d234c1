// src/session.rs
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::Employee;

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence for the one authenticated-employee record. Written on
/// successful login, removed on logout, read once at startup.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Employee>, SessionStoreError>;
    fn save(&self, employee: &Employee) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Stores the session record as JSON under a single file path.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Employee>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Employee>(&raw) {
            Ok(employee) => Ok(Some(employee)),
            Err(e) => {
                // A damaged record is treated as "no session" rather than a
                // startup failure; the user just has to log in again.
                warn!(
                    "Discarding unreadable session record at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, employee: &Employee) -> Result<(), SessionStoreError> {
        let raw = serde_json::to_string_pretty(employee)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the record in memory only. Used by tests.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Employee>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Employee>, SessionStoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, employee: &Employee) -> Result<(), SessionStoreError> {
        *self.slot.lock().unwrap() = Some(employee.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

/// Holds the currently authenticated employee and mirrors lifecycle
/// transitions into the backing store. There is at most one session at a
/// time, matching the single-operator model of the UI this backs.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    current: Mutex<Option<Employee>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// Restore a persisted session, if any. Called once at startup.
    pub fn restore(&self) -> Result<Option<Employee>, SessionStoreError> {
        let restored = self.store.load()?;
        if let Some(employee) = &restored {
            info!("Restored session for {}", employee.username);
        }
        *self.current.lock().unwrap() = restored.clone();
        Ok(restored)
    }

    /// Begin a session for the given employee and persist the record.
    pub fn open(&self, employee: Employee) -> Result<(), SessionStoreError> {
        self.store.save(&employee)?;
        info!("Session opened for {}", employee.username);
        *self.current.lock().unwrap() = Some(employee);
        Ok(())
    }

    /// End the current session and remove the persisted record.
    pub fn close(&self) -> Result<(), SessionStoreError> {
        let previous = self.current.lock().unwrap().take();
        if let Some(employee) = previous {
            info!("Session closed for {}", employee.username);
        }
        self.store.clear()
    }

    pub fn current(&self) -> Option<Employee> {
        self.current.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Employee, Role};
    use chrono::NaiveDate;

    fn employee() -> Employee {
        Employee {
            username: "user1".into(),
            id: "E-01".into(),
            name: "Anna Nilsson".into(),
            email: "anna.nilsson@example.com".into(),
            department: "Training".into(),
            position: "Coordinator".into(),
            role: Role::User,
            manager: Some("E-02".into()),
            start_date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            active: true,
        }
    }

    fn temp_session_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "staffdesk-session-test-{}-{}.json",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn file_store_round_trips_the_record() {
        let path = temp_session_path("roundtrip");
        let store = FileSessionStore::new(path.clone());
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());
        store.save(&employee()).unwrap();
        let loaded = store.load().unwrap().expect("record should be present");
        assert_eq!(loaded.username, "user1");
        assert_eq!(loaded.role, Role::User);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn file_store_treats_damaged_record_as_absent() {
        let path = temp_session_path("damaged");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileSessionStore::new(path.clone());
        assert!(store.load().unwrap().is_none());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn manager_restores_then_clears() {
        let store = Arc::new(MemorySessionStore::new());
        store.save(&employee()).unwrap();

        let manager = SessionManager::new(store.clone());
        let restored = manager.restore().unwrap();
        assert_eq!(restored.map(|e| e.username), Some("user1".to_string()));
        assert!(manager.current().is_some());

        manager.close().unwrap();
        assert!(manager.current().is_none());
        assert!(store.load().unwrap().is_none());
    }
}
