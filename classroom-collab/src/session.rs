use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{util::random_string, PrimaryKey, Role, UserProfile};

/// Login session data for authentication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserProfile,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    const TOKEN_LENGTH: usize = 32;

    /// Issues a new session with a random token
    pub fn issue(user: UserProfile, duration: Duration) -> Self {
        Self {
            token: random_string(Self::TOKEN_LENGTH),
            user,
            expires_at: Utc::now() + duration,
        }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not persist sessions: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not encode sessions: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Keeps sessions by token. A session that has expired never loads.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: SessionData) -> Result<(), SessionError>;
    fn load(&self, token: &str) -> Option<SessionData>;
    fn clear(&self, token: &str) -> Result<(), SessionError>;
    /// Removes every session belonging to a user
    fn clear_user(&self, user_id: PrimaryKey) -> Result<(), SessionError>;
    fn clear_expired(&self) -> Result<(), SessionError>;

    fn is_authenticated(&self, token: &str) -> bool {
        self.load(token).is_some()
    }

    fn role(&self, token: &str) -> Option<Role> {
        self.load(token).map(|s| s.role())
    }
}

/// Sessions kept in memory, lost on restart
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionData>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: SessionData) -> Result<(), SessionError> {
        self.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    fn load(&self, token: &str) -> Option<SessionData> {
        // The guard has to be dropped before removing
        let session = self.sessions.get(token).map(|s| s.clone())?;

        if session.is_expired() {
            self.sessions.remove(token);
            return None;
        }

        Some(session)
    }

    fn clear(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.remove(token);
        Ok(())
    }

    fn clear_user(&self, user_id: PrimaryKey) -> Result<(), SessionError> {
        self.sessions.retain(|_, s| s.user.id != user_id);
        Ok(())
    }

    fn clear_expired(&self) -> Result<(), SessionError> {
        self.sessions.retain(|_, s| !s.is_expired());
        Ok(())
    }
}

/// Sessions written through to a JSON file, so they survive restarts
pub struct FileSessionStore {
    path: PathBuf,
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl FileSessionStore {
    /// Opens the store, reading existing sessions if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();

        let sessions: HashMap<String, SessionData> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Loaded {} session(s) from {}",
            sessions.len(),
            path.display()
        );

        Ok(Self {
            path,
            sessions: Mutex::new(sessions),
        })
    }

    fn persist(&self, sessions: &HashMap<String, SessionData>) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec_pretty(sessions)?;
        let temporary = self.path.with_extension("tmp");

        fs::write(&temporary, bytes)?;
        fs::rename(&temporary, &self.path)?;

        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut HashMap<String, SessionData>),
    {
        let mut sessions = self.sessions.lock();

        // Memory only changes once the file has it
        let mut changed = sessions.clone();
        change(&mut changed);
        self.persist(&changed)?;

        *sessions = changed;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: SessionData) -> Result<(), SessionError> {
        self.update(|sessions| {
            sessions.insert(session.token.clone(), session);
        })
    }

    fn load(&self, token: &str) -> Option<SessionData> {
        let session = self.sessions.lock().get(token).cloned()?;

        if session.is_expired() {
            if let Err(e) = self.clear(token) {
                warn!("Could not drop expired session: {}", e);
            }

            return None;
        }

        Some(session)
    }

    fn clear(&self, token: &str) -> Result<(), SessionError> {
        self.update(|sessions| {
            sessions.remove(token);
        })
    }

    fn clear_user(&self, user_id: PrimaryKey) -> Result<(), SessionError> {
        self.update(|sessions| sessions.retain(|_, s| s.user.id != user_id))
    }

    fn clear_expired(&self) -> Result<(), SessionError> {
        self.update(|sessions| sessions.retain(|_, s| !s.is_expired()))
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::{FileSessionStore, MemorySessionStore, SessionData, SessionStore};
    use crate::{Role, Status, UserProfile};

    fn profile(id: u32, role: Role) -> UserProfile {
        UserProfile {
            id,
            name: format!("user {}", id),
            email: format!("user{}@example.com", id),
            role,
            status: Status::Active,
            created_at: Utc::now(),
        }
    }

    fn check_round_trip(store: &dyn SessionStore) {
        let session = SessionData::issue(profile(1, Role::Instructor), Duration::days(7));
        store.save(session.clone()).unwrap();

        assert_eq!(store.load(&session.token), Some(session.clone()));
        assert!(store.is_authenticated(&session.token));
        assert_eq!(store.role(&session.token), Some(Role::Instructor));

        store.clear(&session.token).unwrap();

        assert_eq!(store.load(&session.token), None);
        assert!(!store.is_authenticated(&session.token));
        assert_eq!(store.role(&session.token), None);
    }

    #[test]
    fn memory_round_trip() {
        check_round_trip(&MemorySessionStore::new());
    }

    #[test]
    fn file_round_trip_and_reopen() {
        let path = std::env::temp_dir().join(format!(
            "classroom-sessions-{}.json",
            crate::util::random_string(8)
        ));

        check_round_trip(&FileSessionStore::open(&path).unwrap());

        let session = SessionData::issue(profile(2, Role::Student), Duration::days(1));
        FileSessionStore::open(&path)
            .unwrap()
            .save(session.clone())
            .unwrap();

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.load(&session.token), Some(session));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn expired_sessions_never_load() {
        let store = MemorySessionStore::new();
        let session = SessionData::issue(profile(1, Role::Student), Duration::seconds(-1));

        store.save(session.clone()).unwrap();
        assert_eq!(store.load(&session.token), None);
    }

    #[test]
    fn clear_user_only_drops_that_user() {
        let store = MemorySessionStore::new();
        let first = SessionData::issue(profile(1, Role::Student), Duration::days(1));
        let second = SessionData::issue(profile(1, Role::Student), Duration::days(1));
        let other = SessionData::issue(profile(2, Role::Admin), Duration::days(1));

        for session in [&first, &second, &other] {
            store.save(session.clone()).unwrap();
        }

        store.clear_user(1).unwrap();

        assert_eq!(store.load(&first.token), None);
        assert_eq!(store.load(&second.token), None);
        assert!(store.load(&other.token).is_some());
    }

    #[test]
    fn failed_writes_leave_sessions_unchanged() {
        let path = std::env::temp_dir().join(format!(
            "classroom-sessions-{}.json",
            crate::util::random_string(8)
        ));

        let store = FileSessionStore::open(&path).unwrap();
        let session = SessionData::issue(profile(3, Role::Student), Duration::days(1));
        store.save(session.clone()).unwrap();

        // A directory in place of the temporary file makes every write fail
        let blocker = path.with_extension("tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(store.clear(&session.token).is_err());
        assert_eq!(store.load(&session.token), Some(session.clone()));

        std::fs::remove_dir(&blocker).unwrap();

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.load(&session.token), Some(session));

        let _ = std::fs::remove_file(path);
    }
}
