// ==========================================
// 航空主运单草稿 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键级联依赖 foreign_keys）
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - schema 引导（幂等）
// - 调用方截止时间 (Deadline)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version（与 `migrations/v0.*.sql` 对齐）
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1_SQL: &str = include_str!("../migrations/v0.1_draft_mawb.sql");

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启（子表级联删除依赖它）
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库（测试 / 命令行试算）
pub fn open_in_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_V1_SQL)?;

    match read_schema_version(conn)? {
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                found = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 低于当前版本"
            );
        }
        _ => {}
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

// ==========================================
// Deadline - 调用方截止时间
// ==========================================
// 写路径在每个步骤之间检查; 超时即返回错误,
// 未提交的 rusqlite::Transaction 在 drop 时回滚

/// 截止时间已过
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("操作超时: stage={stage}")]
pub struct DeadlineExceeded {
    pub stage: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// 不设截止时间
    pub fn none() -> Self {
        Self { expires_at: None }
    }

    /// 从现在起 `timeout` 后到期
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + timeout),
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: Some(instant),
        }
    }

    /// 剩余时间（None 表示不限）
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|t| t.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(t) if Instant::now() >= t)
    }

    /// 检查是否到期
    ///
    /// # 参数
    /// - stage: 当前步骤名称（写入错误信息,便于定位）
    pub fn check(&self, stage: &str) -> Result<(), DeadlineExceeded> {
        if self.is_expired() {
            tracing::warn!(stage, "截止时间已过,中止操作");
            return Err(DeadlineExceeded {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}
