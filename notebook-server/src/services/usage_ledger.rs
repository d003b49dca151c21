//! Usage ledger
//!
//! Append-only action log plus per-user counters. The ledger never takes
//! part in a course transaction.
//!
//! Failure policy differs per entry point:
//! - [`UsageLedger::record_event`] is best effort. Failures are logged and
//!   swallowed so they never fail the caller's primary operation.
//! - [`UsageLedger::record_model_invocation`] propagates failures.

use chrono::{DateTime, Utc};
use notebook_common::{time, uuid_utils, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default number of rows returned by [`UsageLedger::recent_activity`]
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 10;

/// Recorded user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Login,
    FileUpload,
    FileDownload,
    FileDelete,
    CourseCreate,
    CourseUpdate,
    CourseDelete,
    ModelCall,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Login => "login",
            ActionType::FileUpload => "file_upload",
            ActionType::FileDownload => "file_download",
            ActionType::FileDelete => "file_delete",
            ActionType::CourseCreate => "course_create",
            ActionType::CourseUpdate => "course_update",
            ActionType::CourseDelete => "course_delete",
            ActionType::ModelCall => "model_call",
        }
    }

    /// Counter bumped when this action is recorded.
    ///
    /// `model_call` has none: `total_model_calls` is owned by
    /// [`UsageLedger::record_model_invocation`].
    pub fn counter(&self) -> Option<StatCounter> {
        match self {
            ActionType::FileUpload => Some(StatCounter::TotalFiles),
            ActionType::CourseCreate => Some(StatCounter::TotalCourses),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "login" => Ok(ActionType::Login),
            "file_upload" => Ok(ActionType::FileUpload),
            "file_download" => Ok(ActionType::FileDownload),
            "file_delete" => Ok(ActionType::FileDelete),
            "course_create" => Ok(ActionType::CourseCreate),
            "course_update" => Ok(ActionType::CourseUpdate),
            "course_delete" => Ok(ActionType::CourseDelete),
            "model_call" => Ok(ActionType::ModelCall),
            other => Err(Error::Validation(format!("unknown action type '{}'", other))),
        }
    }
}

/// Per-user counter column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCounter {
    TotalFiles,
    TotalCourses,
    TotalModelCalls,
    TotalTokensUsed,
    TotalProcessingTime,
}

impl StatCounter {
    pub fn column(&self) -> &'static str {
        match self {
            StatCounter::TotalFiles => "total_files",
            StatCounter::TotalCourses => "total_courses",
            StatCounter::TotalModelCalls => "total_model_calls",
            StatCounter::TotalTokensUsed => "total_tokens_used",
            StatCounter::TotalProcessingTime => "total_processing_time",
        }
    }
}

/// Structured event payload.
///
/// Stored as a versioned envelope so the encoding can evolve:
/// `{"v":1,"fields":{"key":<json value>,...}}`. Keys are kept sorted and
/// values are arbitrary JSON, so decode(encode(x)) == x.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDetails {
    fields: BTreeMap<String, Value>,
}

/// Current envelope version
pub const DETAILS_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct DetailsEnvelope {
    v: u32,
    fields: BTreeMap<String, Value>,
}

impl EventDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(&DetailsEnvelope {
            v: DETAILS_VERSION,
            fields: self.fields.clone(),
        })
        .map_err(|e| Error::Validation(format!("unencodable event details: {}", e)))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let envelope: DetailsEnvelope = serde_json::from_str(encoded)
            .map_err(|e| Error::Validation(format!("malformed event details: {}", e)))?;
        if envelope.v != DETAILS_VERSION {
            return Err(Error::Validation(format!(
                "unsupported event details version {}",
                envelope.v
            )));
        }
        Ok(Self {
            fields: envelope.fields,
        })
    }
}

impl Serialize for EventDetails {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Outcome of an AI gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Success,
    Error,
}

impl InvocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationStatus::Success => "success",
            InvocationStatus::Error => "error",
        }
    }
}

/// One AI gateway invocation to record
#[derive(Debug, Clone)]
pub struct ModelInvocation {
    pub user_id: Uuid,
    pub model_name: String,
    pub engine_name: Option<String>,
    pub tokens_used: i64,
    pub processing_time_ms: i64,
    pub status: InvocationStatus,
    pub error_message: Option<String>,
}

/// Logged action as read back
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: ActionType,
    pub details: EventDetails,
    pub created_at: DateTime<Utc>,
}

/// Aggregated gateway usage for one model
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelUsageStats {
    pub model_name: String,
    pub total_calls: i64,
    pub total_tokens: i64,
    pub total_processing_time: i64,
    pub avg_processing_time: f64,
    pub last_used: Option<DateTime<Utc>>,
    /// Percentage of successful calls, two decimals
    pub success_rate: f64,
}

/// Counters of one user
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub total_files: i64,
    pub total_courses: i64,
    pub total_model_calls: i64,
    pub total_tokens_used: i64,
    pub total_processing_time: i64,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub model_stats: Vec<ModelUsageStats>,
}

/// Usage ledger over an injected store handle
#[derive(Clone)]
pub struct UsageLedger {
    pool: SqlitePool,
}

impl UsageLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an action and bump its counter. Best effort: never fails.
    pub async fn record_event(&self, user_id: Uuid, action: ActionType, details: &EventDetails) {
        if let Err(e) = self.try_record_event(user_id, action, details).await {
            warn!(
                user_id = %user_id,
                action = %action,
                error = %e,
                "Failed to record usage event"
            );
        }
    }

    async fn try_record_event(
        &self,
        user_id: Uuid,
        action: ActionType,
        details: &EventDetails,
    ) -> Result<()> {
        let encoded = details.encode()?;
        let now = time::now_db();
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            INSERT INTO usage_logs (id, user_id, action_type, details, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_utils::generate().to_string())
        .bind(user_id.to_string())
        .bind(action.as_str())
        .bind(&encoded)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        if let Some(counter) = action.counter() {
            increment(&mut conn, user_id, counter, 1, &now).await?;
        }
        if action == ActionType::Login {
            touch_last_login(&mut conn, user_id, &now).await?;
        }

        debug!(user_id = %user_id, action = %action, "Recorded usage event");
        Ok(())
    }

    /// Record a gateway invocation and its counters. Errors propagate.
    pub async fn record_model_invocation(&self, invocation: &ModelInvocation) -> Result<Uuid> {
        let id = uuid_utils::generate();
        let now = time::now_db();
        let user_id = invocation.user_id;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO model_usage (
                id, user_id, model_name, engine_name, tokens_used,
                processing_time_ms, status, error_message, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(&invocation.model_name)
        .bind(invocation.engine_name.as_deref())
        .bind(invocation.tokens_used)
        .bind(invocation.processing_time_ms)
        .bind(invocation.status.as_str())
        .bind(invocation.error_message.as_deref())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        increment(&mut tx, user_id, StatCounter::TotalTokensUsed, invocation.tokens_used, &now).await?;
        increment(&mut tx, user_id, StatCounter::TotalModelCalls, 1, &now).await?;
        increment(
            &mut tx,
            user_id,
            StatCounter::TotalProcessingTime,
            invocation.processing_time_ms,
            &now,
        )
        .await?;

        tx.commit().await?;

        debug!(
            user_id = %user_id,
            model = %invocation.model_name,
            status = invocation.status.as_str(),
            "Recorded model invocation"
        );
        Ok(id)
    }

    /// Create the counter row for a new user. Best effort.
    pub async fn initialize_user_stats(&self, user_id: Uuid) {
        let now = time::now_db();
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_stats (user_id, created_at, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(user_id = %user_id, error = %e, "Failed to initialize user stats");
        }
    }

    /// Counters plus per-model breakdown
    pub async fn user_stats(&self, user_id: Uuid) -> Result<UserStats> {
        let row = sqlx::query(
            r#"
            SELECT user_id, total_files, total_courses, total_model_calls,
                   total_tokens_used, total_processing_time, last_login_at,
                   created_at, updated_at
            FROM user_stats
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User statistics not found".to_string()))?;

        let last_login: Option<String> = row.try_get("last_login_at")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(UserStats {
            user_id,
            total_files: row.try_get("total_files")?,
            total_courses: row.try_get("total_courses")?,
            total_model_calls: row.try_get("total_model_calls")?,
            total_tokens_used: row.try_get("total_tokens_used")?,
            total_processing_time: row.try_get("total_processing_time")?,
            last_login_at: last_login.as_deref().map(time::parse_db).transpose()?,
            created_at: time::parse_db(&created_at)?,
            updated_at: time::parse_db(&updated_at)?,
            model_stats: self.model_usage_stats(user_id).await?,
        })
    }

    /// Per-model aggregates, most used first
    pub async fn model_usage_stats(&self, user_id: Uuid) -> Result<Vec<ModelUsageStats>> {
        let rows = sqlx::query(
            r#"
            SELECT
                model_name,
                COUNT(*) AS total_calls,
                COALESCE(SUM(tokens_used), 0) AS total_tokens,
                COALESCE(SUM(processing_time_ms), 0) AS total_processing_time,
                ROUND(COALESCE(AVG(processing_time_ms), 0.0), 2) AS avg_processing_time,
                MAX(created_at) AS last_used,
                ROUND(
                    (SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END) * 100.0) / COUNT(*),
                    2
                ) AS success_rate
            FROM model_usage
            WHERE user_id = ?
            GROUP BY model_name
            ORDER BY total_calls DESC, model_name
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ModelUsageStats> {
                let last_used: Option<String> = row.try_get("last_used")?;
                Ok(ModelUsageStats {
                    model_name: row.try_get("model_name")?,
                    total_calls: row.try_get("total_calls")?,
                    total_tokens: row.try_get("total_tokens")?,
                    total_processing_time: row.try_get("total_processing_time")?,
                    avg_processing_time: row.try_get("avg_processing_time")?,
                    last_used: last_used.as_deref().map(time::parse_db).transpose()?,
                    success_rate: row.try_get("success_rate")?,
                })
            })
            .collect()
    }

    /// Latest actions, newest first. Best effort: failures yield an empty list.
    pub async fn recent_activity(&self, user_id: Uuid, limit: i64) -> Vec<UsageEvent> {
        match self.try_recent_activity(user_id, limit).await {
            Ok(events) => events,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load recent activity");
                Vec::new()
            }
        }
    }

    async fn try_recent_activity(&self, user_id: Uuid, limit: i64) -> Result<Vec<UsageEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, action_type, details, created_at
            FROM usage_logs
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<UsageEvent> {
                let id: String = row.try_get("id")?;
                let user: String = row.try_get("user_id")?;
                let action: String = row.try_get("action_type")?;
                let details: Option<String> = row.try_get("details")?;
                let created_at: String = row.try_get("created_at")?;

                Ok(UsageEvent {
                    id: uuid_utils::parse_stored(&id)?,
                    user_id: uuid_utils::parse_stored(&user)?,
                    action_type: action.parse()?,
                    details: match details {
                        Some(text) => EventDetails::decode(&text)?,
                        None => EventDetails::default(),
                    },
                    created_at: time::parse_db(&created_at)?,
                })
            })
            .collect()
    }
}

/// Upsert-increment one counter column
async fn increment(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    counter: StatCounter,
    amount: i64,
    now: &str,
) -> Result<()> {
    // Column names come from a closed enum, never from input
    let column = counter.column();
    let sql = format!(
        "INSERT INTO user_stats (user_id, {col}, created_at, updated_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET {col} = {col} + excluded.{col}, updated_at = excluded.updated_at",
        col = column
    );

    sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(amount)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn touch_last_login(conn: &mut SqliteConnection, user_id: Uuid, now: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_stats (user_id, last_login_at, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            last_login_at = excluded.last_login_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id.to_string())
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
