mod admin;
mod auth;
mod catalog;
mod coursework;
mod db;
mod error;
mod events;
mod learning;
mod session;
mod util;

pub mod gate;
pub mod navigation;

use std::sync::Arc;

use chrono::Duration;
use crossbeam::channel::unbounded;
use log::debug;

pub use admin::*;
pub use auth::*;
pub use catalog::*;
pub use coursework::*;
pub use db::*;
pub use error::*;
pub use events::*;
pub use learning::*;
pub use session::*;

/// The classroom collab system, facilitating authentication, courses, coursework, and more.
pub struct Collab {
    context: CollabContext,
    events: EventReceiver,

    pub auth: Auth,
    pub catalog: Catalog,
    pub learning: Learning,
    pub coursework: Coursework,
    pub admin: Admin,
}

#[derive(Debug, Clone)]
pub struct CollabConfig {
    /// How long a session lasts after login
    pub session_duration: Duration,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::days(7),
        }
    }
}

/// A type passed to various components of the collab system, to access state and emit events.
#[derive(Clone)]
pub struct CollabContext {
    pub database: ArcedDatabase,
    pub sessions: Arc<dyn SessionStore>,
    pub config: CollabConfig,

    events: EventSender,
}

impl CollabContext {
    /// A typed view of one collection
    pub fn table<R: Record>(&self) -> Table<'_, R> {
        Table::new(self.database.as_ref())
    }

    pub fn emit(&self, event: CollabEvent) {
        if self.events.send(event).is_err() {
            debug!("Event dropped, nobody is listening");
        }
    }
}

impl Collab {
    pub fn new<Db, S>(database: Db, sessions: S, config: CollabConfig) -> Self
    where
        Db: Database + 'static,
        S: SessionStore + 'static,
    {
        let (sender, receiver) = unbounded();

        let context = CollabContext {
            database: Arc::new(database),
            sessions: Arc::new(sessions),
            config,
            events: sender,
        };

        Self {
            auth: Auth::new(&context),
            catalog: Catalog::new(&context),
            learning: Learning::new(&context),
            coursework: Coursework::new(&context),
            admin: Admin::new(&context),
            events: receiver,
            context,
        }
    }

    /// Returns a receiver of every [CollabEvent]. Each event is delivered to one receiver.
    pub fn events(&self) -> EventReceiver {
        self.events.clone()
    }

    pub fn context(&self) -> &CollabContext {
        &self.context
    }
}
