// 🏦 Domain Model - Students, ledger entries, goods, seats, quizzes
//
// Balances are signed integers in minor currency units. The engine never
// drives a balance negative, with one documented exception: fines apply
// regardless of solvency (see economy.rs).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT SLOTS
// ============================================================================

/// The three balance slots every student holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountSlot {
    Cash,
    Bank,
    Brokerage,
}

impl AccountSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountSlot::Cash => "cash",
            AccountSlot::Bank => "bank",
            AccountSlot::Brokerage => "brokerage",
        }
    }

    /// Column name in the students table.
    pub fn column(&self) -> &'static str {
        match self {
            AccountSlot::Cash => "balance",
            AccountSlot::Bank => "bank_balance",
            AccountSlot::Brokerage => "brokerage_balance",
        }
    }
}

// ============================================================================
// STUDENT
// ============================================================================

/// A participant: externally assigned id (student number), three balances,
/// and a periodic salary (informational in this core - no accrual here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub session_code: String,
    pub salary: i64,
    pub cash: i64,
    pub bank: i64,
    pub brokerage: i64,
}

impl Student {
    pub fn balance(&self, slot: AccountSlot) -> i64 {
        match slot {
            AccountSlot::Cash => self.cash,
            AccountSlot::Bank => self.bank,
            AccountSlot::Brokerage => self.brokerage,
        }
    }
}

// ============================================================================
// LEDGER ACTORS & ENTRIES
// ============================================================================

/// A ledger counterparty. Non-participant parties are tagged variants
/// rather than magic strings in the participant-id namespace; the sentinel
/// spellings only exist at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Student(String),
    Government,
    Market,
}

pub const GOVERNMENT_SENTINEL: &str = "GOVERNMENT";
pub const MARKET_SENTINEL: &str = "MARKET";

impl Actor {
    /// Stored identifier: the student id, or a sentinel for the abstract
    /// actors.
    pub fn as_wire(&self) -> &str {
        match self {
            Actor::Student(id) => id,
            Actor::Government => GOVERNMENT_SENTINEL,
            Actor::Market => MARKET_SENTINEL,
        }
    }

    pub fn from_wire(id: &str) -> Actor {
        match id {
            GOVERNMENT_SENTINEL => Actor::Government,
            MARKET_SENTINEL => Actor::Market,
            other => Actor::Student(other.to_string()),
        }
    }
}

/// Kind of value movement a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerKind {
    Transfer,
    Reward,
    Fine,
    Quiz,
    Market,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Transfer => "transfer",
            LedgerKind::Reward => "reward",
            LedgerKind::Fine => "fine",
            LedgerKind::Quiz => "quiz",
            LedgerKind::Market => "market",
        }
    }

    pub fn from_str(s: &str) -> Option<LedgerKind> {
        match s {
            "transfer" => Some(LedgerKind::Transfer),
            "reward" => Some(LedgerKind::Reward),
            "fine" => Some(LedgerKind::Fine),
            "quiz" => Some(LedgerKind::Quiz),
            "market" => Some(LedgerKind::Market),
            _ => None,
        }
    }
}

/// Immutable record of one value movement. Name snapshots are denormalized
/// on purpose: history stays readable after a student is renamed or deleted.
/// Created exactly once per logical movement; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub session_code: String,
    pub sender: Actor,
    pub sender_name: String,
    pub receiver: Actor,
    pub receiver_name: String,
    pub amount: i64,
    pub kind: LedgerKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        session_code: &str,
        sender: Actor,
        sender_name: impl Into<String>,
        receiver: Actor,
        receiver_name: impl Into<String>,
        amount: i64,
        kind: LedgerKind,
        description: &str,
    ) -> Self {
        LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_code: session_code.to_string(),
            sender,
            sender_name: sender_name.into(),
            receiver,
            receiver_name: receiver_name.into(),
            amount,
            kind,
            description: description.to_string(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// GOODS
// ============================================================================

/// A purchasable catalog item. `stock: None` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsItem {
    pub id: String,
    pub session_code: String,
    pub name: String,
    pub price: i64,
    pub stock: Option<i64>,
}

// ============================================================================
// SEATS (estate)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatStatus {
    Available,
    Pending,
    Sold,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Pending => "pending",
            SeatStatus::Sold => "sold",
        }
    }

    pub fn from_str(s: &str) -> Option<SeatStatus> {
        match s {
            "available" => Some(SeatStatus::Available),
            "pending" => Some(SeatStatus::Pending),
            "sold" => Some(SeatStatus::Sold),
            _ => None,
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scarce, ownable grid slot. Invariant: owner fields are set if and only
/// if status is Pending or Sold. `price_at_buy` is what the requester paid,
/// kept for the refund on rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub session_code: String,
    pub row: i64,
    pub col: i64,
    pub status: SeatStatus,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub price_at_buy: i64,
}

// ============================================================================
// QUIZZES
// ============================================================================

/// A quiz bank entry: four options, 1-based correct-answer index, a cash
/// reward, and a usage counter the daily selector bumps each time the quiz
/// is drawn (least-used quizzes are preferred, spreading exposure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub session_code: String,
    pub question: String,
    pub options: [String; 4],
    /// Correct option, 1-4.
    pub answer: i64,
    pub reward: i64,
    pub usage_count: i64,
}

/// Per-day, per-quiz, per-student attempt record. Created at most once per
/// (student, quiz, date); never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub student_id: String,
    pub quiz_id: String,
    pub attempt_date: NaiveDate,
    pub is_correct: bool,
}

// ============================================================================
// SESSION SETTINGS
// ============================================================================

/// One class/cohort. The code is human-shareable and uppercase; it scopes
/// students, seats, items, and quizzes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub code: String,
    pub teacher_id: String,
    pub school_level: String,
    pub quiz_count_per_day: i64,
    pub auto_approve_estate: bool,
}

impl SessionSettings {
    pub fn new(code: &str, teacher_id: &str, school_level: &str) -> Self {
        SessionSettings {
            code: code.to_uppercase(),
            teacher_id: teacher_id.to_string(),
            school_level: school_level.to_string(),
            quiz_count_per_day: 1,
            auto_approve_estate: false,
        }
    }
}
