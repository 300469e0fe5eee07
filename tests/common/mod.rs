//! Shared test infrastructure for the engine and model layer tests.
//!
//! `setup_test_db()` creates a temporary SQLite database with the full
//! schema applied; the returned handle keeps the backing directory
//! alive for as long as the pool is in use. The seed helpers build the
//! committee/dataset/DAR fixtures most tests start from.

use sqlx::SqlitePool;
use tempfile::TempDir;

use dacgov::config::EngineConfig;
use dacgov::db;
use dacgov::directory::{DatasetRegistry, UserRoleDirectory};
use dacgov::engine::{ElectionLifecycleEngine, RoleDelegationHandler, VoteTallyEngine};
use dacgov::models::enums::RoleName;
use dacgov::models::user::RoleAssignment;
use dacgov::models::{dac, dar, dataset, user};

pub struct TestDb {
    _dir: TempDir,
    pool: SqlitePool,
}

impl TestDb {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Setup a temporary database with migrations applied.
pub async fn setup_test_db() -> TestDb {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = db::init_pool(db_path.to_str().expect("temp path is valid UTF-8"))
        .await
        .expect("Failed to open test DB");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    TestDb { _dir: dir, pool }
}

/// Helper: create a user, returning the user id.
pub async fn create_user(pool: &SqlitePool, name: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    user::queries::create(
        &mut conn,
        &format!("{name}@test.org"),
        name,
        chrono::Utc::now(),
    )
    .await
    .unwrap()
}

/// Helper: create a DAC, returning the dac id.
pub async fn create_dac(pool: &SqlitePool, name: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    dac::queries::create(&mut conn, name, None, chrono::Utc::now())
        .await
        .unwrap()
}

/// Helper: grant a role, committee roles scoped to a DAC.
pub async fn add_role(pool: &SqlitePool, user_id: i64, role: RoleName, dac_id: Option<i64>) {
    let mut conn = pool.acquire().await.unwrap();
    user::queries::add_role(&mut conn, user_id, RoleAssignment { role, dac_id })
        .await
        .unwrap();
}

/// Helper: create a dataset owned by the given DAC, returning its id.
pub async fn create_dataset(pool: &SqlitePool, name: &str, dac_id: i64) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    dataset::queries::create(&mut conn, name, dac_id, chrono::Utc::now())
        .await
        .unwrap()
}

/// Helper: create a DAR over the given datasets.
pub async fn create_dar(
    pool: &SqlitePool,
    reference_id: &str,
    collection_id: i64,
    user_id: i64,
    dataset_ids: &[i64],
) {
    let mut conn = pool.acquire().await.unwrap();
    dar::queries::create(
        &mut conn,
        reference_id,
        collection_id,
        user_id,
        dataset_ids,
        chrono::Utc::now(),
    )
    .await
    .unwrap()
}

pub fn lifecycle_engine(pool: &SqlitePool) -> ElectionLifecycleEngine {
    ElectionLifecycleEngine::new(
        pool.clone(),
        DatasetRegistry::new(pool.clone()),
        UserRoleDirectory::new(pool.clone()),
    )
}

pub fn tally_engine(pool: &SqlitePool) -> VoteTallyEngine {
    VoteTallyEngine::new(pool.clone())
}

pub fn delegation_handler(pool: &SqlitePool) -> RoleDelegationHandler {
    RoleDelegationHandler::new(pool.clone(), EngineConfig::default())
}
