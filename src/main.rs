use std::sync::Arc;

use classroom_collab::{
    Collab, CollabConfig, Database, DatabaseError, FileSessionStore, MemoryDatabase,
    MemorySessionStore, RestDatabase, SessionError,
};
use classroom_server::{forward_events, run_server, ServerContext};
use colored::Colorize;
use config::{Config, ConfigError, StoreKind};
use log::{error, info, LevelFilter};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

use crate::logging::LogColor;

mod config;
mod logging;

pub struct Classroom {
    collab: Arc<Collab>,
    config: Config,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum ClassroomError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not set up the data store: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not open the session file: {0}")]
    Sessions(#[from] SessionError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Classroom {
    fn new(config: Config) -> Result<Self, ClassroomError> {
        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("classroom-async")
            .build()
            .map_err(|e| ClassroomError::Fatal(e.to_string()))?;

        let collab = match config.store {
            StoreKind::Rest => {
                info!("Using the data store at {}", config.store_url);
                build_collab(RestDatabase::new(&config.store_url)?, &config)?
            }
            StoreKind::Memory => {
                info!(
                    "{}",
                    "Using an in-memory data store, nothing will be kept on exit"
                        .color(LogColor::DIMMED)
                );
                build_collab(MemoryDatabase::new(), &config)?
            }
        };

        Ok(Self {
            collab: Arc::new(collab),
            config,
            runtime,
        })
    }

    fn run(&self) -> Result<(), ClassroomError> {
        let context = ServerContext::new(self.collab.clone());
        forward_events(self.collab.events(), context.sse.clone());

        self.runtime
            .block_on(run_server(context, self.config.port))
            .map_err(|e| ClassroomError::Fatal(e.to_string()))
    }
}

fn build_collab<Db>(database: Db, config: &Config) -> Result<Collab, ClassroomError>
where
    Db: Database + 'static,
{
    let collab_config = CollabConfig {
        session_duration: config.session_duration,
    };

    let collab = match &config.session_file {
        Some(path) => {
            info!("Keeping sessions in {}", path.display());
            Collab::new(database, FileSessionStore::open(path)?, collab_config)
        }
        None => Collab::new(database, MemorySessionStore::new(), collab_config),
    };

    Ok(collab)
}

impl ClassroomError {
    fn hint(&self) -> String {
        match self {
            ClassroomError::Config(_) => "Check the CLASSROOM_* environment variables and try again.".to_string(),
            ClassroomError::Database(_) => "Make sure CLASSROOM_STORE_URL points at a running data store, or set CLASSROOM_STORE=memory.".to_string(),
            ClassroomError::Sessions(_) => "Make sure CLASSROOM_SESSION_FILE is writable and contains valid sessions, or remove it.".to_string(),
            ClassroomError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn report(error: ClassroomError) {
    error!(
        "{} Read the error below to troubleshoot the issue.",
        "Classroom failed!".bold().color(LogColor::RED)
    );
    error!("{}", error);
    error!(
        "{}",
        format!("Hint: {}", error.hint())
            .color(LogColor::DIMMED)
            .italic()
    );
}

fn main() {
    let config = Config::from_env();
    let log_level = config
        .as_ref()
        .map(|c| c.log_level)
        .unwrap_or(LevelFilter::Info);

    if let Err(error) = logging::init_logger(log_level) {
        eprintln!("Could not initialize logging: {error}");
    }

    match config.map_err(ClassroomError::from).and_then(Classroom::new) {
        Ok(classroom) => {
            info!("Initialized successfully.");

            if let Err(error) = classroom.run() {
                report(error);
            }
        }
        Err(error) => report(error),
    }
}
