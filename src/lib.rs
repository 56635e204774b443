// Classbank - Classroom Micro-Economy Engine
// Ledger & marketplace core: three-account balances, append-only ledger,
// goods and seat marketplaces, deterministic daily quizzes.
// Library-level engine; no CLI or wire protocol lives here.

pub mod db;
pub mod error;
pub mod model;
pub mod transfer;
pub mod economy;
pub mod market;
pub mod estate;
pub mod quiz;
pub mod content;
pub mod roster;

// Re-export commonly used types
pub use error::{EngineError, EngineResult};
pub use model::{
    AccountSlot, Actor, GoodsItem, LedgerEntry, LedgerKind, Quiz, QuizAttempt, Seat, SeatStatus,
    SessionSettings, Student,
};
pub use db::{
    setup_database, balance_sheet, BalanceSheet,
    insert_session, get_session,
    insert_student, get_student, list_students, delete_student,
    ledger_for_session, ledger_for_student,
    insert_item, get_item,
    insert_seat, get_seat, list_seats,
    insert_quiz, get_quiz, list_quizzes,
};
pub use transfer::{transfer, SlotRef, TransferReceipt, TransferRequest};
pub use economy::{apply_bulk, BulkKind, BulkOutcome, BulkTarget};
pub use market::{purchase, PurchaseReceipt};
pub use estate::{approve, init_grid, reject, request_purchase, vacate};
pub use quiz::{pick_daily, select_daily, solve, SolveReceipt};
pub use content::{import_generated, parse_batch, GeneratedQuiz};
pub use roster::{import_roster, load_roster, parse_roster, ImportSummary, RosterRow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
