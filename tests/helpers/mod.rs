#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use server_sessions_seaorm::migration::{Migrator, MigratorTrait};
use server_sessions_seaorm::{
    IdGenerator, ManualClock, MemoryStore, SeaOrmStore, SessionConfig, SessionManager,
    SessionStore,
};
use time::{Duration, OffsetDateTime};

/// Hands out queued identifiers first, then `gen-<n>`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    script: Arc<Mutex<VecDeque<String>>>,
    generated: Arc<AtomicU64>,
}

impl ScriptedGenerator {
    pub fn queue<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(Into::into));
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::SeqCst)
    }
}

impl IdGenerator for ScriptedGenerator {
    fn generate(&self) -> String {
        let n = self.generated.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("gen-{n}"))
    }
}

pub struct Fixture {
    pub store: Arc<dyn SessionStore>,
    pub clock: ManualClock,
    pub ids: ScriptedGenerator,
}

impl Fixture {
    pub fn now(&self) -> OffsetDateTime {
        use server_sessions_seaorm::Clock;
        self.clock.now()
    }

    /// A manager sharing this fixture's store and clock: one hour sessions,
    /// refreshed within five minutes of expiry.
    pub fn manager(&self) -> SessionManager {
        self.manager_with(test_config())
    }

    pub fn manager_with(&self, config: SessionConfig) -> SessionManager {
        SessionManager::builder()
            .shared_store(self.store.clone())
            .clock(self.clock.clone())
            .config(config)
            .build()
            .expect("valid test configuration")
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig::default()
        .with_ttl(Duration::hours(1))
        .with_refresh_window(Duration::minutes(5))
}

pub fn start_time() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap()
}

pub async fn memory_fixture(strict: bool) -> Fixture {
    let clock = ManualClock::new(start_time());
    let ids = ScriptedGenerator::default();
    let store = MemoryStore::new()
        .with_clock(clock.clone())
        .with_id_generator(ids.clone())
        .with_strict_versioning(strict);

    Fixture {
        store: Arc::new(store),
        clock,
        ids,
    }
}

pub async fn sqlite_connection() -> DatabaseConnection {
    // A single pooled connection keeps the in-memory database alive and shared
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let conn = Database::connect(opt).await.expect("sqlite connection");
    Migrator::up(&conn, None).await.expect("session migrations");
    conn
}

pub async fn sqlite_fixture(strict: bool) -> Fixture {
    let conn = sqlite_connection().await;
    let clock = ManualClock::new(start_time());
    let ids = ScriptedGenerator::default();
    let store = SeaOrmStore::new(conn)
        .with_clock(clock.clone())
        .with_id_generator(ids.clone())
        .with_strict_versioning(strict);

    Fixture {
        store: Arc::new(store),
        clock,
        ids,
    }
}

/// Runs each listed `async fn(Fixture)` against both store implementations.
macro_rules! against_both_stores {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::helpers::memory_fixture(false).await).await;
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::helpers::sqlite_fixture(false).await).await;
                }
            )*
        }
    };
}
