//! Local screen lock with idle auto-lock.
//!
//! [`SessionGuard`] owns the lock flag, the idle timeout and the time of the
//! last user activity, and persists all three through a [`KeyValueStore`] so
//! the state survives restarts. It does not listen to input itself: whoever
//! owns the input loop reports activity with [`SessionGuard::record_activity`]
//! and drives the timer with [`SessionGuard::tick`].

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};

use crate::EngineError;

const LOCK_STATE_KEY: &str = "app_locked";
const IDLE_TIME_KEY: &str = "idle_lock_minutes";
const LAST_ACTIVITY_KEY: &str = "last_activity_at";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError>;
    fn remove(&mut self, key: &str) -> Result<(), EngineError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), EngineError> {
        self.values.remove(key);
        Ok(())
    }
}

/// A flat JSON object on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens `path`; a missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|err| EngineError::Store(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(EngineError::Store(format!("{}: {err}", path.display()))),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), EngineError> {
        let store_err = |err: std::io::Error| EngineError::Store(format!("{}: {err}", self.path.display()));
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(store_err)?;
        }
        let payload = serde_json::to_string_pretty(&self.values)
            .map_err(|err| EngineError::Store(err.to_string()))?;
        fs::write(&self.path, payload).map_err(store_err)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<(), EngineError> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SessionGuard<S> {
    store: S,
    locked: bool,
    idle_minutes: u32,
    last_activity: Option<DateTime<Utc>>,
}

impl<S: KeyValueStore> SessionGuard<S> {
    /// Restores the persisted state. Unreadable values fall back to
    /// "unlocked, auto-lock disabled".
    pub fn new(store: S) -> Self {
        let locked = store.get(LOCK_STATE_KEY).as_deref() == Some("true");
        let idle_minutes = store
            .get(IDLE_TIME_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0);
        let last_activity = store
            .get(LAST_ACTIVITY_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));
        Self {
            store,
            locked,
            idle_minutes,
            last_activity,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Auto-lock timeout in minutes, 0 when disabled.
    pub fn auto_lock_minutes(&self) -> u32 {
        self.idle_minutes
    }

    pub fn lock(&mut self) -> Result<(), EngineError> {
        self.store.set(LOCK_STATE_KEY, "true")?;
        self.locked = true;
        tracing::info!("session locked");
        Ok(())
    }

    /// Clears the lock flag. Callers re-authenticate the user first; this only
    /// drops the local state and restarts the idle timer from `now`.
    pub fn unlock(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.store.remove(LOCK_STATE_KEY)?;
        self.locked = false;
        tracing::info!("session unlocked");
        self.record_activity(now)
    }

    /// Enables auto-lock after `minutes` of inactivity; 0 disables it.
    pub fn set_auto_lock(&mut self, minutes: u32, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.idle_minutes = minutes;
        if minutes > 0 {
            self.store.set(IDLE_TIME_KEY, &minutes.to_string())?;
            tracing::info!("auto-lock enabled: {minutes} minutes");
            self.record_activity(now)
        } else {
            self.store.remove(IDLE_TIME_KEY)?;
            self.store.remove(LAST_ACTIVITY_KEY)?;
            self.last_activity = None;
            tracing::info!("auto-lock disabled");
            Ok(())
        }
    }

    /// Restarts the idle timer. Ignored while locked or when auto-lock is off.
    pub fn record_activity(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.locked || self.idle_minutes == 0 {
            return Ok(());
        }
        self.store.set(LAST_ACTIVITY_KEY, &now.to_rfc3339())?;
        self.last_activity = Some(now);
        Ok(())
    }

    /// When the session will lock if no activity is recorded before then.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        if self.locked || self.idle_minutes == 0 {
            return None;
        }
        let idle = Duration::minutes(i64::from(self.idle_minutes));
        self.last_activity
            .and_then(|at| at.checked_add_signed(idle))
    }

    /// Locks the session if the idle deadline has passed. Returns `true` when
    /// this call locked it.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<bool, EngineError> {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                tracing::info!("idle timeout reached");
                self.lock()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn idle_timeout_locks_after_deadline() {
        let mut guard = SessionGuard::new(MemoryStore::default());
        guard.set_auto_lock(5, at(0)).unwrap();
        assert!(!guard.tick(at(4)).unwrap());

        guard.record_activity(at(3)).unwrap();
        assert!(!guard.tick(at(7)).unwrap());
        assert!(guard.tick(at(8)).unwrap());
        assert!(guard.is_locked());
        assert_eq!(guard.deadline(), None);
    }

    #[test]
    fn disabled_auto_lock_never_fires() {
        let mut guard = SessionGuard::new(MemoryStore::default());
        guard.record_activity(at(0)).unwrap();
        assert!(!guard.tick(at(59)).unwrap());
        assert!(!guard.is_locked());
    }

    #[test]
    fn activity_is_ignored_while_locked() {
        let mut guard = SessionGuard::new(MemoryStore::default());
        guard.set_auto_lock(1, at(0)).unwrap();
        guard.lock().unwrap();
        guard.record_activity(at(30)).unwrap();
        assert_eq!(guard.store().get(LAST_ACTIVITY_KEY), Some(at(0).to_rfc3339()));

        guard.unlock(at(40)).unwrap();
        assert!(!guard.is_locked());
        assert_eq!(guard.deadline(), Some(at(41)));
    }

    #[test]
    fn state_survives_reload() {
        let mut guard = SessionGuard::new(MemoryStore::default());
        guard.set_auto_lock(15, at(0)).unwrap();
        guard.lock().unwrap();

        let restored = SessionGuard::new(guard.store().clone());
        assert!(restored.is_locked());
        assert_eq!(restored.auto_lock_minutes(), 15);
    }

    #[test]
    fn garbage_in_store_means_defaults() {
        let mut store = MemoryStore::default();
        store.set(LOCK_STATE_KEY, "yes").unwrap();
        store.set(IDLE_TIME_KEY, "soon").unwrap();
        let guard = SessionGuard::new(store);
        assert!(!guard.is_locked());
        assert_eq!(guard.auto_lock_minutes(), 0);
    }

    #[test]
    fn json_file_store_round_trips_through_disk() {
        let path = std::env::temp_dir()
            .join(format!("persfin_session_{}", std::process::id()))
            .join("state.json");
        let _ = fs::remove_file(&path);

        let mut guard = SessionGuard::new(JsonFileStore::load(&path).unwrap());
        guard.set_auto_lock(10, at(0)).unwrap();
        guard.lock().unwrap();

        let reloaded = SessionGuard::new(JsonFileStore::load(&path).unwrap());
        assert!(reloaded.is_locked());
        assert_eq!(reloaded.auto_lock_minutes(), 10);

        let _ = fs::remove_file(&path);
    }
}
