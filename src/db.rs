// 🗄️ Record Store - SQLite-backed tables for the classroom economy
//
// Every helper here is a single-statement, single-table operation. The
// engine composes them in a fixed order and never opens a multi-table
// transaction: the underlying store is treated as a generic record store
// with no cross-table atomic commit. Guarded UPDATEs (balance >= amount,
// stock > 0, status = ...) are the per-row compare-and-set that keeps
// concurrent writers from losing updates.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::model::{
    AccountSlot, Actor, GoodsItem, LedgerEntry, LedgerKind, Quiz, QuizAttempt, Seat, SeatStatus,
    SessionSettings, Student,
};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Sessions (class settings, read by estate + quiz modules)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            code TEXT PRIMARY KEY,
            teacher_id TEXT NOT NULL,
            school_level TEXT NOT NULL,
            quiz_count_per_day INTEGER NOT NULL DEFAULT 1,
            auto_approve_estate INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Students (three balance slots + salary)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            session_code TEXT NOT NULL,
            salary INTEGER NOT NULL DEFAULT 0,
            balance INTEGER NOT NULL DEFAULT 0,
            bank_balance INTEGER NOT NULL DEFAULT 0,
            brokerage_balance INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Ledger (append-only; no update/delete helper exists for this table)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_uuid TEXT UNIQUE NOT NULL,
            session_code TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            receiver_id TEXT NOT NULL,
            receiver_name TEXT NOT NULL,
            amount INTEGER NOT NULL CHECK (amount >= 0),
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Goods catalog (NULL stock = unlimited)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            session_code TEXT NOT NULL,
            name TEXT NOT NULL,
            price INTEGER NOT NULL CHECK (price >= 0),
            stock INTEGER
        )",
        [],
    )?;

    // ==========================================================================
    // Seats (estate grid; one state machine per row)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS seats (
            id TEXT PRIMARY KEY,
            session_code TEXT NOT NULL,
            seat_row INTEGER NOT NULL,
            seat_col INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'available',
            owner_id TEXT,
            owner_name TEXT,
            price_at_buy INTEGER NOT NULL DEFAULT 0,
            UNIQUE (session_code, seat_row, seat_col)
        )",
        [],
    )?;

    // ==========================================================================
    // Quiz bank + attempts + memoized daily draws
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS quizzes (
            id TEXT PRIMARY KEY,
            session_code TEXT NOT NULL,
            question TEXT NOT NULL,
            options TEXT NOT NULL,
            answer INTEGER NOT NULL CHECK (answer BETWEEN 1 AND 4),
            reward INTEGER NOT NULL CHECK (reward >= 0),
            usage_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            quiz_id TEXT NOT NULL,
            attempt_date TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            UNIQUE (student_id, quiz_id, attempt_date)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_draws (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_code TEXT NOT NULL,
            draw_date TEXT NOT NULL,
            quiz_ids TEXT NOT NULL,
            UNIQUE (session_code, draw_date)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_session ON students(session_code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_session ON ledger(session_code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_parties ON ledger(sender_id, receiver_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_quizzes_session ON quizzes(session_code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_seats_session ON seats(session_code)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SESSIONS
// ============================================================================

pub fn insert_session(conn: &Connection, session: &SessionSettings) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (code, teacher_id, school_level, quiz_count_per_day, auto_approve_estate)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.code,
            session.teacher_id,
            session.school_level,
            session.quiz_count_per_day,
            session.auto_approve_estate as i64,
        ],
    )
    .context("Failed to insert session")?;

    Ok(())
}

pub fn get_session(conn: &Connection, code: &str) -> rusqlite::Result<Option<SessionSettings>> {
    let mut stmt = conn.prepare(
        "SELECT code, teacher_id, school_level, quiz_count_per_day, auto_approve_estate
         FROM sessions WHERE code = ?1",
    )?;

    let mut rows = stmt.query_map(params![code], |row| {
        Ok(SessionSettings {
            code: row.get(0)?,
            teacher_id: row.get(1)?,
            school_level: row.get(2)?,
            quiz_count_per_day: row.get(3)?,
            auto_approve_estate: row.get::<_, i64>(4)? != 0,
        })
    })?;

    rows.next().transpose()
}

// ============================================================================
// STUDENTS
// ============================================================================

pub fn insert_student(conn: &Connection, student: &Student) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO students (id, name, session_code, salary, balance, bank_balance, brokerage_balance)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            student.id,
            student.name,
            student.session_code,
            student.salary,
            student.cash,
            student.bank,
            student.brokerage,
        ],
    )?;

    Ok(())
}

fn map_student_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        session_code: row.get(2)?,
        salary: row.get(3)?,
        cash: row.get(4)?,
        bank: row.get(5)?,
        brokerage: row.get(6)?,
    })
}

pub fn get_student(conn: &Connection, id: &str) -> rusqlite::Result<Option<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, session_code, salary, balance, bank_balance, brokerage_balance
         FROM students WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map(params![id], map_student_row)?;
    rows.next().transpose()
}

pub fn list_students(conn: &Connection, session_code: &str) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, session_code, salary, balance, bank_balance, brokerage_balance
         FROM students WHERE session_code = ?1 ORDER BY id",
    )?;

    let students = stmt
        .query_map(params![session_code], map_student_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(students)
}

/// Deletes the student row only. Dependent records (ledger history, seats,
/// attempts) are NOT cascaded; the caller decides what happens to them.
pub fn delete_student(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute("DELETE FROM students WHERE id = ?1", params![id])?;
    Ok(changed == 1)
}

// ============================================================================
// BALANCE MUTATION (per-row compare-and-set)
// ============================================================================

/// Debit a balance slot, guarded: the write only fires if the current
/// balance covers the amount. Returns false when the guard rejected the
/// debit - callers pre-read the student, so false means the balance moved
/// underneath us (or the row is gone).
pub fn debit_slot(
    conn: &Connection,
    student_id: &str,
    slot: AccountSlot,
    amount: i64,
) -> rusqlite::Result<bool> {
    let col = slot.column();
    let sql = format!("UPDATE students SET {col} = {col} - ?1 WHERE id = ?2 AND {col} >= ?1");
    let changed = conn.execute(&sql, params![amount, student_id])?;
    Ok(changed == 1)
}

/// Debit without the solvency guard. Used only by fines, which apply
/// regardless of the resulting balance.
pub fn debit_slot_unchecked(
    conn: &Connection,
    student_id: &str,
    slot: AccountSlot,
    amount: i64,
) -> rusqlite::Result<bool> {
    let col = slot.column();
    let sql = format!("UPDATE students SET {col} = {col} - ?1 WHERE id = ?2");
    let changed = conn.execute(&sql, params![amount, student_id])?;
    Ok(changed == 1)
}

pub fn credit_slot(
    conn: &Connection,
    student_id: &str,
    slot: AccountSlot,
    amount: i64,
) -> rusqlite::Result<bool> {
    let col = slot.column();
    let sql = format!("UPDATE students SET {col} = {col} + ?1 WHERE id = ?2");
    let changed = conn.execute(&sql, params![amount, student_id])?;
    Ok(changed == 1)
}

// ============================================================================
// LEDGER (append-only)
// ============================================================================

pub fn insert_ledger_entry(conn: &Connection, entry: &LedgerEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO ledger (
            entry_uuid, session_code, sender_id, sender_name,
            receiver_id, receiver_name, amount, kind, description, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.id,
            entry.session_code,
            entry.sender.as_wire(),
            entry.sender_name,
            entry.receiver.as_wire(),
            entry.receiver_name,
            entry.amount,
            entry.kind.as_str(),
            entry.description,
            entry.created_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

const LEDGER_COLUMNS: &str = "entry_uuid, session_code, sender_id, sender_name, \
     receiver_id, receiver_name, amount, kind, description, created_at";

fn map_ledger_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let sender_id: String = row.get(2)?;
    let receiver_id: String = row.get(4)?;
    let kind_str: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;

    Ok(LedgerEntry {
        id: row.get(0)?,
        session_code: row.get(1)?,
        sender: Actor::from_wire(&sender_id),
        sender_name: row.get(3)?,
        receiver: Actor::from_wire(&receiver_id),
        receiver_name: row.get(5)?,
        amount: row.get(6)?,
        kind: LedgerKind::from_str(&kind_str).ok_or(rusqlite::Error::InvalidQuery)?,
        description: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

/// Full ledger for a session, newest first.
pub fn ledger_for_session(
    conn: &Connection,
    session_code: &str,
) -> rusqlite::Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger WHERE session_code = ?1 ORDER BY id DESC"
    ))?;

    let entries = stmt
        .query_map(params![session_code], map_ledger_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

/// Entries where the student is sender or receiver, newest first.
pub fn ledger_for_student(
    conn: &Connection,
    student_id: &str,
) -> rusqlite::Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger
         WHERE sender_id = ?1 OR receiver_id = ?1 ORDER BY id DESC"
    ))?;

    let entries = stmt
        .query_map(params![student_id], map_ledger_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

// ============================================================================
// GOODS
// ============================================================================

pub fn insert_item(conn: &Connection, item: &GoodsItem) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO items (id, session_code, name, price, stock)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item.id, item.session_code, item.name, item.price, item.stock],
    )?;

    Ok(())
}

pub fn get_item(conn: &Connection, id: &str) -> rusqlite::Result<Option<GoodsItem>> {
    let mut stmt =
        conn.prepare("SELECT id, session_code, name, price, stock FROM items WHERE id = ?1")?;

    let mut rows = stmt.query_map(params![id], |row| {
        Ok(GoodsItem {
            id: row.get(0)?,
            session_code: row.get(1)?,
            name: row.get(2)?,
            price: row.get(3)?,
            stock: row.get(4)?,
        })
    })?;

    rows.next().transpose()
}

/// Guarded decrement: only fires while stock is still positive. Items with
/// NULL stock are unlimited and never reach this helper.
pub fn decrement_stock(conn: &Connection, item_id: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE items SET stock = stock - 1 WHERE id = ?1 AND stock > 0",
        params![item_id],
    )?;
    Ok(changed == 1)
}

// ============================================================================
// SEATS
// ============================================================================

pub fn insert_seat(conn: &Connection, seat: &Seat) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO seats (id, session_code, seat_row, seat_col, status, owner_id, owner_name, price_at_buy)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            seat.id,
            seat.session_code,
            seat.row,
            seat.col,
            seat.status.as_str(),
            seat.owner_id,
            seat.owner_name,
            seat.price_at_buy,
        ],
    )?;

    Ok(())
}

fn map_seat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Seat> {
    let status_str: String = row.get(4)?;
    Ok(Seat {
        id: row.get(0)?,
        session_code: row.get(1)?,
        row: row.get(2)?,
        col: row.get(3)?,
        status: SeatStatus::from_str(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        owner_id: row.get(5)?,
        owner_name: row.get(6)?,
        price_at_buy: row.get(7)?,
    })
}

pub fn get_seat(conn: &Connection, id: &str) -> rusqlite::Result<Option<Seat>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_code, seat_row, seat_col, status, owner_id, owner_name, price_at_buy
         FROM seats WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map(params![id], map_seat_row)?;
    rows.next().transpose()
}

pub fn list_seats(conn: &Connection, session_code: &str) -> rusqlite::Result<Vec<Seat>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_code, seat_row, seat_col, status, owner_id, owner_name, price_at_buy
         FROM seats WHERE session_code = ?1 ORDER BY seat_row, seat_col",
    )?;

    let seats = stmt
        .query_map(params![session_code], map_seat_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(seats)
}

/// Compare-and-set on the seat state machine: the write only fires if the
/// seat is still in `expected` status. Returns false when another writer
/// got there first.
pub fn update_seat_state(
    conn: &Connection,
    seat_id: &str,
    expected: SeatStatus,
    next: SeatStatus,
    owner_id: Option<&str>,
    owner_name: Option<&str>,
    price_at_buy: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE seats SET status = ?1, owner_id = ?2, owner_name = ?3, price_at_buy = ?4
         WHERE id = ?5 AND status = ?6",
        params![
            next.as_str(),
            owner_id,
            owner_name,
            price_at_buy,
            seat_id,
            expected.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

// ============================================================================
// QUIZZES, ATTEMPTS, DAILY DRAWS
// ============================================================================

pub fn insert_quiz(conn: &Connection, quiz: &Quiz) -> Result<()> {
    let options_json = serde_json::to_string(&quiz.options)?;

    conn.execute(
        "INSERT INTO quizzes (id, session_code, question, options, answer, reward, usage_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            quiz.id,
            quiz.session_code,
            quiz.question,
            options_json,
            quiz.answer,
            quiz.reward,
            quiz.usage_count,
        ],
    )
    .context("Failed to insert quiz")?;

    Ok(())
}

fn map_quiz_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Quiz> {
    let options_json: String = row.get(3)?;
    let options: [String; 4] =
        serde_json::from_str(&options_json).map_err(|_| rusqlite::Error::InvalidQuery)?;

    Ok(Quiz {
        id: row.get(0)?,
        session_code: row.get(1)?,
        question: row.get(2)?,
        options,
        answer: row.get(4)?,
        reward: row.get(5)?,
        usage_count: row.get(6)?,
    })
}

pub fn get_quiz(conn: &Connection, id: &str) -> rusqlite::Result<Option<Quiz>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_code, question, options, answer, reward, usage_count
         FROM quizzes WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map(params![id], map_quiz_row)?;
    rows.next().transpose()
}

pub fn list_quizzes(conn: &Connection, session_code: &str) -> rusqlite::Result<Vec<Quiz>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_code, question, options, answer, reward, usage_count
         FROM quizzes WHERE session_code = ?1 ORDER BY id",
    )?;

    let quizzes = stmt
        .query_map(params![session_code], map_quiz_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(quizzes)
}

pub fn increment_quiz_usage(conn: &Connection, quiz_id: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE quizzes SET usage_count = usage_count + 1 WHERE id = ?1",
        params![quiz_id],
    )?;
    Ok(changed == 1)
}

/// Insert an attempt record. Returns false if an attempt already exists for
/// this (student, quiz, date) - the UNIQUE constraint backs the
/// one-attempt-per-day rule even under racing submissions.
pub fn insert_attempt(conn: &Connection, attempt: &QuizAttempt) -> rusqlite::Result<bool> {
    let result = conn.execute(
        "INSERT INTO quiz_attempts (student_id, quiz_id, attempt_date, is_correct)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            attempt.student_id,
            attempt.quiz_id,
            attempt.attempt_date.to_string(),
            attempt.is_correct as i64,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

pub fn get_attempt(
    conn: &Connection,
    student_id: &str,
    quiz_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Option<QuizAttempt>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, quiz_id, attempt_date, is_correct
         FROM quiz_attempts
         WHERE student_id = ?1 AND quiz_id = ?2 AND attempt_date = ?3",
    )?;

    let mut rows = stmt.query_map(params![student_id, quiz_id, date.to_string()], |row| {
        let date_str: String = row.get(2)?;
        Ok(QuizAttempt {
            student_id: row.get(0)?,
            quiz_id: row.get(1)?,
            attempt_date: date_str
                .parse::<NaiveDate>()
                .map_err(|_| rusqlite::Error::InvalidQuery)?,
            is_correct: row.get::<_, i64>(3)? != 0,
        })
    })?;

    rows.next().transpose()
}

pub fn count_attempts(conn: &Connection, student_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM quiz_attempts WHERE student_id = ?1",
        params![student_id],
        |row| row.get(0),
    )
}

/// Record a day's draw. Returns false if a draw for (session, date) already
/// exists - the first writer wins and every later caller replays its result.
pub fn insert_daily_draw(
    conn: &Connection,
    session_code: &str,
    date: NaiveDate,
    quiz_ids: &[String],
) -> crate::error::EngineResult<bool> {
    let ids_json = serde_json::to_string(quiz_ids)?;

    let result = conn.execute(
        "INSERT INTO daily_draws (session_code, draw_date, quiz_ids)
         VALUES (?1, ?2, ?3)",
        params![session_code, date.to_string(), ids_json],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_daily_draw(
    conn: &Connection,
    session_code: &str,
    date: NaiveDate,
) -> rusqlite::Result<Option<Vec<String>>> {
    let mut stmt = conn
        .prepare("SELECT quiz_ids FROM daily_draws WHERE session_code = ?1 AND draw_date = ?2")?;

    let mut rows = stmt.query_map(params![session_code, date.to_string()], |row| {
        let ids_json: String = row.get(0)?;
        serde_json::from_str::<Vec<String>>(&ids_json).map_err(|_| rusqlite::Error::InvalidQuery)
    })?;

    rows.next().transpose()
}

// ============================================================================
// BALANCE SHEET (session-wide re-read surface)
// ============================================================================

/// Per-student balances plus the session aggregate - what a dashboard
/// re-reads after every action instead of trusting client-cached values.
#[derive(Debug, Clone)]
pub struct BalanceSheet {
    pub students: Vec<Student>,
    pub total_cash: i64,
    pub total_bank: i64,
    pub total_brokerage: i64,
}

impl BalanceSheet {
    pub fn total(&self) -> i64 {
        self.total_cash + self.total_bank + self.total_brokerage
    }
}

pub fn balance_sheet(conn: &Connection, session_code: &str) -> rusqlite::Result<BalanceSheet> {
    let students = list_students(conn, session_code)?;

    let total_cash = students.iter().map(|s| s.cash).sum();
    let total_bank = students.iter().map(|s| s.bank).sum();
    let total_brokerage = students.iter().map(|s| s.brokerage).sum();

    Ok(BalanceSheet {
        students,
        total_cash,
        total_bank,
        total_brokerage,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_guarded_debit_respects_balance() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 100);

        // Covered debit fires
        assert!(debit_slot(&conn, "s1", AccountSlot::Cash, 60).unwrap());
        assert_eq!(cash_of(&conn, "s1"), 40);

        // Uncovered debit is rejected by the guard, balance untouched
        assert!(!debit_slot(&conn, "s1", AccountSlot::Cash, 41).unwrap());
        assert_eq!(cash_of(&conn, "s1"), 40);
    }

    #[test]
    fn test_unchecked_debit_goes_negative() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 200);

        assert!(debit_slot_unchecked(&conn, "s1", AccountSlot::Cash, 500).unwrap());
        assert_eq!(cash_of(&conn, "s1"), -300);
    }

    #[test]
    fn test_ledger_round_trip() {
        let conn = test_conn();

        let entry = LedgerEntry::new(
            "ABCD",
            Actor::Government,
            "Government",
            Actor::Student("s1".to_string()),
            "Alice",
            250,
            LedgerKind::Reward,
            "weekly reward",
        );
        insert_ledger_entry(&conn, &entry).unwrap();

        let entries = ledger_for_session(&conn, "ABCD").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sender, Actor::Government);
        assert_eq!(entries[0].receiver, Actor::Student("s1".to_string()));
        assert_eq!(entries[0].amount, 250);
        assert_eq!(entries[0].kind, LedgerKind::Reward);

        let for_student = ledger_for_student(&conn, "s1").unwrap();
        assert_eq!(for_student.len(), 1);
    }

    #[test]
    fn test_attempt_unique_constraint() {
        let conn = test_conn();

        let attempt = QuizAttempt {
            student_id: "s1".to_string(),
            quiz_id: "q1".to_string(),
            attempt_date: "2024-05-01".parse().unwrap(),
            is_correct: true,
        };

        assert!(insert_attempt(&conn, &attempt).unwrap());
        // Second insert for the same triple is rejected, not overwritten
        assert!(!insert_attempt(&conn, &attempt).unwrap());
        assert_eq!(count_attempts(&conn, "s1").unwrap(), 1);
    }

    #[test]
    fn test_daily_draw_first_writer_wins() {
        let conn = test_conn();
        let date = "2024-05-01".parse().unwrap();

        let first = vec!["q1".to_string(), "q2".to_string()];
        let second = vec!["q3".to_string()];

        assert!(insert_daily_draw(&conn, "ABCD", date, &first).unwrap());
        assert!(!insert_daily_draw(&conn, "ABCD", date, &second).unwrap());

        let stored = get_daily_draw(&conn, "ABCD", date).unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[test]
    fn test_balance_sheet_totals() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 100);
        seed_student(&conn, "s2", "Bob", "ABCD", 300);
        credit_slot(&conn, "s2", AccountSlot::Bank, 50).unwrap();

        let sheet = balance_sheet(&conn, "ABCD").unwrap();
        assert_eq!(sheet.students.len(), 2);
        assert_eq!(sheet.total_cash, 400);
        assert_eq!(sheet.total_bank, 50);
        assert_eq!(sheet.total(), 450);
    }
}
