//! SQLite-backed ledger store and daily cap tracker.
//!
//! The two concurrency-critical invariants are enforced by the schema, not by
//! application checks: a partial unique index on
//! `(user_id, kind, source_ref_id)` over non-reversed rows makes crediting
//! idempotent under concurrent retries, and the daily cap reservation is a
//! single guarded `UPDATE`, so check-and-increment cannot interleave.

use std::fmt;
use std::path::Path;

use contracts::{
    CommissionDetail, EntryKind, EntryStatus, LedgerEntryRecord, ReferralLevelStats, TaskState,
};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// A non-reversed row with the same `(user_id, kind, source_ref_id)`
    /// already exists.
    DuplicateSourceRef,
    NotFound(i64),
    AlreadyReversed(i64),
    /// A persisted kind/status string failed to parse back into its enum.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::DuplicateSourceRef => write!(f, "duplicate (user_id, kind, source_ref_id)"),
            Self::NotFound(entry_id) => write!(f, "ledger entry {entry_id} not found"),
            Self::AlreadyReversed(entry_id) => {
                write!(f, "ledger entry {entry_id} already reversed")
            }
            Self::Corrupt(detail) => write!(f, "corrupt ledger row: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Insert payload for `append`. Commission fields ride along only for
/// referral commission rows.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: String,
    pub amount: i64,
    pub kind: EntryKind,
    pub source_ref_id: String,
    pub status: EntryStatus,
    pub description: String,
    pub commission: Option<CommissionDetail>,
    pub created_at: i64,
    pub vested_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceComponents {
    /// Sum of vested credit (positive) entries: lifetime earned.
    pub vested_credits: i64,
    /// Sum of pending credit entries.
    pub pending_credits: i64,
    /// Signed sum of all vested entries; debits are appended at reservation
    /// time, so this never overstates the withdrawable balance.
    pub vested_net: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveOutcome {
    pub accepted: bool,
    pub remaining: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyTotals {
    pub credits_earned: i64,
    pub ads_watched: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstanceRow {
    pub user_id: String,
    pub task_id: String,
    pub attempt: i64,
    pub state: TaskState,
    pub started_at: i64,
    pub expires_at: i64,
    pub completed_day_key: Option<i64>,
}

#[derive(Debug)]
pub struct SqliteLedgerStore {
    conn: Connection,
}

impl SqliteLedgerStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn configure(&mut self) -> Result<(), StoreError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ledger_entries (
                entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                kind TEXT NOT NULL,
                source_ref_id TEXT NOT NULL,
                status TEXT NOT NULL,
                description TEXT NOT NULL,
                from_user_id TEXT,
                level INTEGER,
                percent INTEGER,
                original_amount INTEGER,
                created_at INTEGER NOT NULL,
                vested_at INTEGER
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_user_kind_source
                ON ledger_entries(user_id, kind, source_ref_id)
                WHERE status != 'reversed';

            CREATE INDEX IF NOT EXISTS idx_entries_user_created
                ON ledger_entries(user_id, created_at DESC);

            CREATE INDEX IF NOT EXISTS idx_entries_status_kind
                ON ledger_entries(status, kind, created_at);

            CREATE TABLE IF NOT EXISTS daily_counters (
                user_id TEXT NOT NULL,
                day_key INTEGER NOT NULL,
                credits_earned INTEGER NOT NULL DEFAULT 0,
                ads_watched INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, day_key)
            );

            CREATE TABLE IF NOT EXISTS task_instances (
                user_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                attempt INTEGER NOT NULL,
                state TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                completed_day_key INTEGER,
                PRIMARY KEY (user_id, task_id, attempt)
            );

            CREATE TABLE IF NOT EXISTS frozen_accounts (
                user_id TEXT PRIMARY KEY,
                frozen_at INTEGER NOT NULL,
                reason TEXT NOT NULL
            );
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', 0)",
            [],
        )?;

        Ok(())
    }

    /// Append one ledger entry. The partial unique index turns a concurrent
    /// duplicate into a constraint failure, reported as
    /// `DuplicateSourceRef`.
    pub fn append(&mut self, entry: &NewEntry) -> Result<i64, StoreError> {
        let (from_user_id, level, percent, original_amount) = match &entry.commission {
            Some(detail) => (
                Some(detail.from_user_id.as_str()),
                Some(i64::from(detail.level)),
                Some(detail.percent),
                Some(detail.original_amount),
            ),
            None => (None, None, None, None),
        };

        let result = self.conn.execute(
            "INSERT INTO ledger_entries (
                user_id, amount, kind, source_ref_id, status, description,
                from_user_id, level, percent, original_amount,
                created_at, vested_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                entry.user_id.as_str(),
                entry.amount,
                entry.kind.as_str(),
                entry.source_ref_id.as_str(),
                entry.status.as_str(),
                entry.description.as_str(),
                from_user_id,
                level,
                percent,
                original_amount,
                entry.created_at,
                entry.vested_at,
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateSourceRef)
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn entry(&self, entry_id: i64) -> Result<Option<LedgerEntryRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE entry_id = ?1"),
                params![entry_id],
                map_entry_row,
            )
            .optional()?;

        row.transpose()
    }

    pub fn entry_by_source(
        &self,
        user_id: &str,
        kind: EntryKind,
        source_ref_id: &str,
    ) -> Result<Option<LedgerEntryRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM ledger_entries
                     WHERE user_id = ?1 AND kind = ?2 AND source_ref_id = ?3
                       AND status != 'reversed'"
                ),
                params![user_id, kind.as_str(), source_ref_id],
                map_entry_row,
            )
            .optional()?;

        row.transpose()
    }

    /// Mark an entry reversed. Fails on unknown or already-reversed entries;
    /// cascading to derived commissions is the engine's job.
    pub fn reverse(&mut self, entry_id: i64) -> Result<LedgerEntryRecord, StoreError> {
        let Some(record) = self.entry(entry_id)? else {
            return Err(StoreError::NotFound(entry_id));
        };

        if record.status == EntryStatus::Reversed {
            return Err(StoreError::AlreadyReversed(entry_id));
        }

        self.conn.execute(
            "UPDATE ledger_entries SET status = 'reversed' WHERE entry_id = ?1",
            params![entry_id],
        )?;

        Ok(LedgerEntryRecord {
            status: EntryStatus::Reversed,
            ..record
        })
    }

    /// Newest-first page of a user's ledger. Restartable via the offset
    /// cursor; total count lets the caller compute the next cursor.
    pub fn list_by_user(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<LedgerEntryRecord>, usize), StoreError> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ledger_entries WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries
             WHERE user_id = ?1
             ORDER BY created_at DESC, entry_id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(
            params![
                user_id,
                i64::try_from(limit).unwrap_or(i64::MAX),
                i64::try_from(offset).unwrap_or(i64::MAX)
            ],
            map_entry_row,
        )?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row??);
        }

        Ok((entries, usize::try_from(total).unwrap_or(usize::MAX)))
    }

    pub fn balance_components(&self, user_id: &str) -> Result<BalanceComponents, StoreError> {
        let components = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN status = 'vested' AND amount > 0 THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'pending' AND amount > 0 THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'vested' THEN amount ELSE 0 END), 0)
             FROM ledger_entries WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(BalanceComponents {
                    vested_credits: row.get(0)?,
                    pending_credits: row.get(1)?,
                    vested_net: row.get(2)?,
                })
            },
        )?;

        Ok(components)
    }

    /// Pending entries of one kind whose vesting delay has elapsed. Read
    /// only: the caller settles each entry with `mark_vested` once its
    /// downstream effects have landed, so an interrupted sweep leaves the
    /// entry pending and the next sweep picks it up again.
    pub fn due_pending(
        &self,
        kind: EntryKind,
        created_at_cutoff: i64,
    ) -> Result<Vec<LedgerEntryRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries
             WHERE status = 'pending' AND kind = ?1 AND created_at <= ?2
             ORDER BY entry_id ASC"
        ))?;
        let rows = stmt.query_map(params![kind.as_str(), created_at_cutoff], map_entry_row)?;

        let mut due = Vec::new();
        for row in rows {
            due.push(row??);
        }
        Ok(due)
    }

    /// Settle one pending entry. A no-op when the entry was already vested
    /// or reversed, so re-running after a partial sweep is safe.
    pub fn mark_vested(&mut self, entry_id: i64, vested_at: i64) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE ledger_entries SET status = 'vested', vested_at = ?1
             WHERE entry_id = ?2 AND status = 'pending'",
            params![vested_at, entry_id],
        )?;
        Ok(())
    }

    /// Atomic daily cap reservation: lazy row creation plus one guarded
    /// `UPDATE`. Two racing completions for the same user serialize on the
    /// row; the loser sees the already-incremented counter.
    pub fn try_reserve(
        &mut self,
        user_id: &str,
        day_key: i64,
        amount: i64,
        cap: i64,
        count_ad: bool,
    ) -> Result<ReserveOutcome, StoreError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO daily_counters (user_id, day_key) VALUES (?1, ?2)",
            params![user_id, day_key],
        )?;

        let ad_increment: i64 = if count_ad { 1 } else { 0 };
        let changed = tx.execute(
            "UPDATE daily_counters
             SET credits_earned = credits_earned + ?3,
                 ads_watched = ads_watched + ?4
             WHERE user_id = ?1 AND day_key = ?2
               AND credits_earned + ?3 <= ?5",
            params![user_id, day_key, amount, ad_increment, cap],
        )?;

        let earned: i64 = tx.query_row(
            "SELECT credits_earned FROM daily_counters WHERE user_id = ?1 AND day_key = ?2",
            params![user_id, day_key],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(ReserveOutcome {
            accepted: changed == 1,
            remaining: (cap - earned).max(0),
        })
    }

    pub fn daily_totals(&self, user_id: &str, day_key: i64) -> Result<DailyTotals, StoreError> {
        let totals = self
            .conn
            .query_row(
                "SELECT credits_earned, ads_watched FROM daily_counters
                 WHERE user_id = ?1 AND day_key = ?2",
                params![user_id, day_key],
                |row| {
                    Ok(DailyTotals {
                        credits_earned: row.get(0)?,
                        ads_watched: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(totals.unwrap_or_default())
    }

    pub fn referral_level_stats(
        &self,
        user_id: &str,
        kind: EntryKind,
    ) -> Result<ReferralLevelStats, StoreError> {
        let stats = self.conn.query_row(
            "SELECT COUNT(DISTINCT from_user_id), COALESCE(SUM(amount), 0)
             FROM ledger_entries
             WHERE user_id = ?1 AND kind = ?2 AND status != 'reversed'",
            params![user_id, kind.as_str()],
            |row| {
                Ok(ReferralLevelStats {
                    count: row.get::<_, i64>(0)?.max(0) as u64,
                    total_commission: row.get(1)?,
                })
            },
        )?;

        Ok(stats)
    }

    pub fn active_instance(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<TaskInstanceRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, task_id, attempt, state, started_at, expires_at,
                        completed_day_key
                 FROM task_instances
                 WHERE user_id = ?1 AND task_id = ?2
                   AND state IN ('pending', 'in_progress')
                 ORDER BY attempt DESC LIMIT 1",
                params![user_id, task_id],
                map_instance_row,
            )
            .optional()?;

        row.transpose()
    }

    pub fn latest_instance(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<TaskInstanceRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, task_id, attempt, state, started_at, expires_at,
                        completed_day_key
                 FROM task_instances
                 WHERE user_id = ?1 AND task_id = ?2
                 ORDER BY attempt DESC LIMIT 1",
                params![user_id, task_id],
                map_instance_row,
            )
            .optional()?;

        row.transpose()
    }

    /// Create the next attempt for `(user, task)` in `in_progress`.
    pub fn insert_instance(
        &mut self,
        user_id: &str,
        task_id: &str,
        started_at: i64,
        expires_at: i64,
    ) -> Result<TaskInstanceRow, StoreError> {
        let tx = self.conn.transaction()?;

        let next_attempt: i64 = tx.query_row(
            "SELECT COALESCE(MAX(attempt), 0) + 1 FROM task_instances
             WHERE user_id = ?1 AND task_id = ?2",
            params![user_id, task_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO task_instances
                (user_id, task_id, attempt, state, started_at, expires_at)
             VALUES (?1, ?2, ?3, 'in_progress', ?4, ?5)",
            params![user_id, task_id, next_attempt, started_at, expires_at],
        )?;

        tx.commit()?;

        Ok(TaskInstanceRow {
            user_id: user_id.to_string(),
            task_id: task_id.to_string(),
            attempt: next_attempt,
            state: TaskState::InProgress,
            started_at,
            expires_at,
            completed_day_key: None,
        })
    }

    pub fn set_instance_state(
        &mut self,
        user_id: &str,
        task_id: &str,
        attempt: i64,
        state: TaskState,
        completed_day_key: Option<i64>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE task_instances
             SET state = ?4, completed_day_key = ?5
             WHERE user_id = ?1 AND task_id = ?2 AND attempt = ?3",
            params![user_id, task_id, attempt, state.as_str(), completed_day_key],
        )?;
        Ok(())
    }

    pub fn completions_on_day(
        &self,
        user_id: &str,
        task_id: &str,
        day_key: i64,
    ) -> Result<u32, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM task_instances
             WHERE user_id = ?1 AND task_id = ?2
               AND state = 'completed' AND completed_day_key = ?3",
            params![user_id, task_id, day_key],
            |row| row.get(0),
        )?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Locate a commission entry by kind and derived source ref. Commission
    /// refs embed the earner and the originating ref, so this lookup does
    /// not need the recipient id (the reversal cascade does not know it).
    pub fn commission_by_source(
        &self,
        kind: EntryKind,
        source_ref_id: &str,
    ) -> Result<Option<LedgerEntryRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM ledger_entries
                     WHERE kind = ?1 AND source_ref_id = ?2 AND status != 'reversed'"
                ),
                params![kind.as_str(), source_ref_id],
                map_entry_row,
            )
            .optional()?;

        row.transpose()
    }

    /// Sequence number for withdrawal source refs. Counts all withdrawal
    /// rows including reversed ones so a reference is never reused.
    pub fn withdrawal_seq(&self, user_id: &str) -> Result<i64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ledger_entries
             WHERE user_id = ?1 AND kind = 'withdrawal_debit'",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(count + 1)
    }

    /// Durable halt switch for a user whose ledger violated an invariant.
    pub fn freeze_account(
        &mut self,
        user_id: &str,
        frozen_at: i64,
        reason: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO frozen_accounts (user_id, frozen_at, reason)
             VALUES (?1, ?2, ?3)",
            params![user_id, frozen_at, reason],
        )?;
        Ok(())
    }

    /// Admin release of a freeze once corrective entries have landed.
    pub fn unfreeze_account(&mut self, user_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM frozen_accounts WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    pub fn is_frozen(&self, user_id: &str) -> Result<bool, StoreError> {
        let row: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM frozen_accounts WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(row.is_some())
    }
}

const ENTRY_COLUMNS: &str = "entry_id, user_id, amount, kind, source_ref_id, status, description,
     from_user_id, level, percent, original_amount, created_at, vested_at";

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<LedgerEntryRecord, StoreError>> {
    let entry_id: i64 = row.get(0)?;
    let kind_raw: String = row.get(3)?;
    let status_raw: String = row.get(5)?;

    let Some(kind) = EntryKind::parse(&kind_raw) else {
        return Ok(Err(StoreError::Corrupt(format!(
            "entry {entry_id}: unknown kind {kind_raw}"
        ))));
    };
    let Some(status) = EntryStatus::parse(&status_raw) else {
        return Ok(Err(StoreError::Corrupt(format!(
            "entry {entry_id}: unknown status {status_raw}"
        ))));
    };

    let from_user_id: Option<String> = row.get(7)?;
    let level: Option<i64> = row.get(8)?;
    let percent: Option<i64> = row.get(9)?;
    let original_amount: Option<i64> = row.get(10)?;

    let commission = match (from_user_id, level, percent, original_amount) {
        (Some(from_user_id), Some(level), Some(percent), Some(original_amount)) => {
            Some(CommissionDetail {
                from_user_id,
                level: u8::try_from(level).unwrap_or(0),
                percent,
                original_amount,
            })
        }
        _ => None,
    };

    Ok(Ok(LedgerEntryRecord {
        entry_id,
        user_id: row.get(1)?,
        amount: row.get(2)?,
        kind,
        source_ref_id: row.get(4)?,
        status,
        description: row.get(6)?,
        created_at: row.get(11)?,
        vested_at: row.get(12)?,
        commission,
    }))
}

fn map_instance_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<TaskInstanceRow, StoreError>> {
    let state_raw: String = row.get(3)?;
    let Some(state) = TaskState::parse(&state_raw) else {
        return Ok(Err(StoreError::Corrupt(format!(
            "task instance: unknown state {state_raw}"
        ))));
    };

    Ok(Ok(TaskInstanceRow {
        user_id: row.get(0)?,
        task_id: row.get(1)?,
        attempt: row.get(2)?,
        state,
        started_at: row.get(4)?,
        expires_at: row.get(5)?,
        completed_day_key: row.get(6)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credit(user: &str, amount: i64, kind: EntryKind, source_ref: &str) -> NewEntry {
        NewEntry {
            user_id: user.to_string(),
            amount,
            kind,
            source_ref_id: source_ref.to_string(),
            status: EntryStatus::Pending,
            description: "test credit".to_string(),
            commission: None,
            created_at: 1_000,
            vested_at: None,
        }
    }

    #[test]
    fn duplicate_source_ref_is_rejected_until_reversed() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");
        let entry = credit("u1", 10, EntryKind::TaskCompletion, "task:ad:a1");

        let first = store.append(&entry).expect("first append");
        let duplicate = store.append(&entry);
        assert!(matches!(duplicate, Err(StoreError::DuplicateSourceRef)));

        store.reverse(first).expect("reverse");
        store
            .append(&entry)
            .expect("re-append allowed once prior entry is reversed");
    }

    #[test]
    fn reverse_rejects_unknown_and_double_reversal() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");
        assert!(matches!(store.reverse(42), Err(StoreError::NotFound(42))));

        let id = store
            .append(&credit("u1", 10, EntryKind::TaskCompletion, "task:ad:a1"))
            .expect("append");
        store.reverse(id).expect("first reversal");
        assert!(matches!(
            store.reverse(id),
            Err(StoreError::AlreadyReversed(_))
        ));
    }

    #[test]
    fn try_reserve_enforces_cap_and_reports_headroom() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");

        for expected_remaining in [20, 10, 0] {
            let outcome = store
                .try_reserve("u1", 19_000, 10, 30, true)
                .expect("reserve");
            assert!(outcome.accepted);
            assert_eq!(outcome.remaining, expected_remaining);
        }

        let rejected = store
            .try_reserve("u1", 19_000, 10, 30, true)
            .expect("reserve call");
        assert!(!rejected.accepted);
        assert_eq!(rejected.remaining, 0);

        let totals = store.daily_totals("u1", 19_000).expect("totals");
        assert_eq!(totals.credits_earned, 30);
        assert_eq!(totals.ads_watched, 3);
    }

    #[test]
    fn counters_roll_over_lazily_per_day() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");
        store
            .try_reserve("u1", 19_000, 30, 30, false)
            .expect("reserve");

        let next_day = store
            .try_reserve("u1", 19_001, 10, 30, false)
            .expect("reserve");
        assert!(next_day.accepted);
        assert_eq!(next_day.remaining, 20);
    }

    #[test]
    fn due_pending_selects_only_matured_entries_of_kind() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");
        let due = store
            .append(&credit("u1", 10, EntryKind::TaskCompletion, "task:a:a1"))
            .expect("append due");
        let mut late = credit("u1", 10, EntryKind::TaskCompletion, "task:a:a2");
        late.created_at = 90_000;
        store.append(&late).expect("append late");

        let matured = store
            .due_pending(EntryKind::TaskCompletion, 50_000)
            .expect("due query");
        assert_eq!(matured.len(), 1);
        assert_eq!(matured[0].entry_id, due);
        assert_eq!(matured[0].status, EntryStatus::Pending);

        store.mark_vested(due, 87_400).expect("settle");
        // Settling is idempotent for an already vested entry.
        store.mark_vested(due, 99_999).expect("re-settle");

        let entry = store.entry(due).expect("load").expect("exists");
        assert_eq!(entry.status, EntryStatus::Vested);
        assert_eq!(entry.vested_at, Some(87_400));

        let components = store.balance_components("u1").expect("components");
        assert_eq!(components.vested_credits, 10);
        assert_eq!(components.pending_credits, 10);

        assert!(store
            .due_pending(EntryKind::TaskCompletion, 50_000)
            .expect("due query")
            .is_empty());
    }

    #[test]
    fn list_by_user_pages_newest_first() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");
        for n in 0..5 {
            let mut entry = credit("u1", 10, EntryKind::TaskCompletion, &format!("task:a:a{n}"));
            entry.created_at = 1_000 + n;
            store.append(&entry).expect("append");
        }

        let (page, total) = store.list_by_user("u1", 0, 2).expect("page 1");
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].source_ref_id, "task:a:a4");
        assert_eq!(page[1].source_ref_id, "task:a:a3");

        let (rest, _) = store.list_by_user("u1", 4, 2).expect("last page");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].source_ref_id, "task:a:a0");
    }

    #[test]
    fn frozen_flag_round_trips() {
        let mut store = SqliteLedgerStore::open_in_memory().expect("open store");
        assert!(!store.is_frozen("u1").expect("check"));
        store
            .freeze_account("u1", 1_000, "negative withdrawable")
            .expect("freeze");
        assert!(store.is_frozen("u1").expect("check"));

        store.unfreeze_account("u1").expect("unfreeze");
        assert!(!store.is_frozen("u1").expect("check"));
        // Releasing an account that is not frozen is a no-op.
        store.unfreeze_account("u1").expect("repeat unfreeze");
    }
}
