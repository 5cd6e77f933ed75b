//! Fixture entities and a throwaway SQLite database for integration tests.

#![allow(dead_code)]

use socialdesk_db::{AnyRow, Db, DbConfig, Entity, Row, Statement};
use tempfile::TempDir;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE teams (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        created_by TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        team_id INTEGER REFERENCES teams(id),
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        refresh_token TEXT,
        created_by TEXT NOT NULL,
        updated_by TEXT
    )
    "#,
];

/// Keeps the temp directory alive for as long as the pool uses it.
pub struct TestDb {
    pub db: Db,
    _dir: TempDir,
}

impl std::ops::Deref for TestDb {
    type Target = Db;

    fn deref(&self) -> &Db {
        &self.db
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn sqlite_config(dir: &TempDir, max_open: u32) -> DbConfig {
    let path = dir.path().join("socialdesk.db");
    let mut config = DbConfig::new("sqlite", format!("sqlite://{}?mode=rwc", path.display()));
    config.max_open_conns = max_open;
    config.max_idle_conns = 0;
    config.acquire_timeout_secs = 5;
    config
}

pub async fn setup(max_open: u32) -> TestDb {
    init_logging();
    let dir = TempDir::new().expect("temp dir");
    let db = Db::init(&sqlite_config(&dir, max_open))
        .await
        .expect("pool creation failed");

    for ddl in SCHEMA {
        sqlx::query(*ddl)
            .execute(db.pool())
            .await
            .expect("schema setup failed");
    }

    TestDb { db, _dir: dir }
}

pub async fn count(db: &Db, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count failed")
}

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub team_id: Option<i64>,
    pub email: String,
    pub name: String,
    pub refresh_token: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy)]
pub enum UserOp {
    Create,
    ById,
    ByEmail,
    ByRefreshToken,
    ByTeam,
    All,
    Rename,
    SetRefreshToken,
    Delete,
}

const USER_COLUMNS: &str = "id, team_id, email, name, refresh_token, created_by";

impl User {
    pub fn new(id: i64, email: &str, name: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn in_team(mut self, team_id: i64) -> Self {
        self.team_id = Some(team_id);
        self
    }
}

impl Entity for User {
    type Op = UserOp;

    fn select(&self, op: UserOp) -> Option<Statement> {
        match op {
            UserOp::ById => Some(
                Statement::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                    .bind(self.id),
            ),
            UserOp::ByEmail => Some(
                Statement::new(format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                    .bind(&self.email),
            ),
            UserOp::ByRefreshToken => Some(
                Statement::new(format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE refresh_token = ?"
                ))
                .bind(self.refresh_token.clone()),
            ),
            _ => None,
        }
    }

    fn select_many(&self, op: UserOp) -> Option<Statement> {
        match op {
            UserOp::ByTeam => Some(
                Statement::new(format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE team_id = ? ORDER BY id"
                ))
                .bind(self.team_id),
            ),
            UserOp::All => Some(Statement::new(format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY id"
            ))),
            _ => None,
        }
    }

    fn exec(&self, op: UserOp, source: &str) -> Option<Statement> {
        match op {
            UserOp::Create => Some(
                Statement::new(
                    "INSERT INTO users (id, team_id, email, name, refresh_token, created_by) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(self.id)
                .bind(self.team_id)
                .bind(&self.email)
                .bind(&self.name)
                .bind(self.refresh_token.clone())
                .bind(source),
            ),
            UserOp::Rename => Some(
                Statement::new("UPDATE users SET name = ?, updated_by = ? WHERE id = ?")
                    .bind(&self.name)
                    .bind(source)
                    .bind(self.id),
            ),
            UserOp::SetRefreshToken => Some(
                Statement::new("UPDATE users SET refresh_token = ?, updated_by = ? WHERE id = ?")
                    .bind(self.refresh_token.clone())
                    .bind(source)
                    .bind(self.id),
            ),
            UserOp::Delete => {
                Some(Statement::new("DELETE FROM users WHERE id = ?").bind(self.id))
            }
            _ => None,
        }
    }

    fn fresh(&self) -> Self {
        Self::default()
    }

    fn bind_row(&mut self, _op: UserOp, row: &AnyRow) -> Result<(), sqlx::Error> {
        self.id = row.try_get("id")?;
        self.team_id = row.try_get("team_id")?;
        self.email = row.try_get("email")?;
        self.name = row.try_get("name")?;
        self.refresh_token = row.try_get("refresh_token")?;
        self.created_by = row.try_get("created_by")?;
        Ok(())
    }
}

// ============================================================================
// Team
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy)]
pub enum TeamOp {
    Create,
    ById,
    Rename,
}

impl Team {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Team {
    type Op = TeamOp;

    fn select(&self, op: TeamOp) -> Option<Statement> {
        match op {
            TeamOp::ById => Some(
                Statement::new("SELECT id, name, created_by FROM teams WHERE id = ?")
                    .bind(self.id),
            ),
            TeamOp::Create | TeamOp::Rename => None,
        }
    }

    fn exec(&self, op: TeamOp, source: &str) -> Option<Statement> {
        match op {
            TeamOp::Create => Some(
                Statement::new("INSERT INTO teams (id, name, created_by) VALUES (?, ?, ?)")
                    .bind(self.id)
                    .bind(&self.name)
                    .bind(source),
            ),
            TeamOp::Rename => Some(
                Statement::new("UPDATE teams SET name = ? WHERE id = ?")
                    .bind(&self.name)
                    .bind(self.id),
            ),
            TeamOp::ById => None,
        }
    }

    fn fresh(&self) -> Self {
        Self::default()
    }

    fn bind_row(&mut self, _op: TeamOp, row: &AnyRow) -> Result<(), sqlx::Error> {
        self.id = row.try_get("id")?;
        self.name = row.try_get("name")?;
        self.created_by = row.try_get("created_by")?;
        Ok(())
    }
}
