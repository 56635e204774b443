// 💸 Transfer Engine - Value movement between balance slots
//
// One logical transfer = debit, credit, ledger append, in that fixed order.
// The store offers no multi-row atomic commit, so a failure after the debit
// is surfaced as PartialFailure naming what completed; the ledger entry is
// always the last artifact written, so its absence means the movement did
// not finish.

use rusqlite::Connection;

use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::model::{AccountSlot, Actor, LedgerEntry, LedgerKind, Student};

/// One (participant, slot) endpoint of a transfer.
#[derive(Debug, Clone)]
pub struct SlotRef {
    pub student_id: String,
    pub slot: AccountSlot,
}

impl SlotRef {
    pub fn new(student_id: &str, slot: AccountSlot) -> Self {
        SlotRef {
            student_id: student_id.to_string(),
            slot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from: SlotRef,
    pub to: SlotRef,
    pub amount: i64,
    pub description: String,
}

/// Authoritative post-state of a completed transfer. Callers show these
/// balances instead of trusting anything cached client-side.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub from_balance_after: i64,
    pub to_balance_after: i64,
    pub entry: LedgerEntry,
}

/// Move `amount` from one (student, slot) to another. Self-to-self movement
/// (internal reallocation between a student's own slots) uses the same
/// participant as sender and receiver.
///
/// Preconditions, checked before any write: amount > 0, both students
/// exist, sender slot covers the amount. The debit itself is a guarded
/// update, so a balance that moved between the pre-read and the write is
/// caught as InsufficientFunds rather than a lost update.
pub fn transfer(conn: &Connection, req: &TransferRequest) -> EngineResult<TransferReceipt> {
    if req.amount <= 0 {
        return Err(EngineError::InvalidAmount(req.amount));
    }

    let sender = require_student(conn, &req.from.student_id)?;
    let receiver = if req.to.student_id == req.from.student_id {
        sender.clone()
    } else {
        require_student(conn, &req.to.student_id)?
    };

    let available = sender.balance(req.from.slot);
    if available < req.amount {
        return Err(EngineError::InsufficientFunds {
            balance: available,
            amount: req.amount,
        });
    }

    // Step 1: debit (guarded - re-checks the balance at write time)
    if !db::debit_slot(conn, &sender.id, req.from.slot, req.amount)? {
        let current = require_student(conn, &sender.id)?.balance(req.from.slot);
        return Err(EngineError::InsufficientFunds {
            balance: current,
            amount: req.amount,
        });
    }

    // Step 2: credit
    match db::credit_slot(conn, &receiver.id, req.to.slot, req.amount) {
        Ok(true) => {}
        Ok(false) => {
            return Err(EngineError::partial(
                "transfer",
                &["debit"],
                "credit",
                format!("receiver row missing: {}", receiver.id),
            ))
        }
        Err(e) => {
            return Err(EngineError::partial(
                "transfer",
                &["debit"],
                "credit",
                e.to_string(),
            ))
        }
    }

    // Step 3: ledger append (last artifact written)
    let entry = LedgerEntry::new(
        &sender.session_code,
        Actor::Student(sender.id.clone()),
        sender.name.clone(),
        Actor::Student(receiver.id.clone()),
        receiver.name.clone(),
        req.amount,
        LedgerKind::Transfer,
        &req.description,
    );
    if let Err(e) = db::insert_ledger_entry(conn, &entry) {
        return Err(EngineError::partial(
            "transfer",
            &["debit", "credit"],
            "ledger append",
            e.to_string(),
        ));
    }

    let from_after = require_student(conn, &sender.id)?.balance(req.from.slot);
    let to_after = require_student(conn, &receiver.id)?.balance(req.to.slot);

    Ok(TransferReceipt {
        from_balance_after: from_after,
        to_balance_after: to_after,
        entry,
    })
}

pub(crate) fn require_student(conn: &Connection, id: &str) -> EngineResult<Student> {
    db::get_student(conn, id)?.ok_or_else(|| EngineError::not_found("student", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::model::Actor;

    fn request(from: SlotRef, to: SlotRef, amount: i64) -> TransferRequest {
        TransferRequest {
            from,
            to,
            amount,
            description: "test transfer".to_string(),
        }
    }

    #[test]
    fn test_internal_reallocation_cash_to_bank() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 1000);

        let receipt = transfer(
            &conn,
            &request(
                SlotRef::new("s1", AccountSlot::Cash),
                SlotRef::new("s1", AccountSlot::Bank),
                400,
            ),
        )
        .unwrap();

        assert_eq!(receipt.from_balance_after, 600);
        assert_eq!(receipt.to_balance_after, 400);

        let student = db::get_student(&conn, "s1").unwrap().unwrap();
        assert_eq!(student.cash, 600);
        assert_eq!(student.bank, 400);

        // Exactly one ledger entry, self-to-self
        let entries = db::ledger_for_session(&conn, "ABCD").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sender, Actor::Student("s1".to_string()));
        assert_eq!(entries[0].receiver, Actor::Student("s1".to_string()));
        assert_eq!(entries[0].amount, 400);
        assert_eq!(entries[0].kind, crate::model::LedgerKind::Transfer);
    }

    #[test]
    fn test_transfer_between_students_conserves_value() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 800);
        seed_student(&conn, "s2", "Bob", "ABCD", 100);

        let receipt = transfer(
            &conn,
            &request(
                SlotRef::new("s1", AccountSlot::Cash),
                SlotRef::new("s2", AccountSlot::Cash),
                300,
            ),
        )
        .unwrap();

        assert_eq!(receipt.from_balance_after, 500);
        assert_eq!(receipt.to_balance_after, 400);
        assert_eq!(cash_of(&conn, "s1") + cash_of(&conn, "s2"), 900);
    }

    #[test]
    fn test_insufficient_funds_is_a_no_op() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 50);
        seed_student(&conn, "s2", "Bob", "ABCD", 0);

        let err = transfer(
            &conn,
            &request(
                SlotRef::new("s1", AccountSlot::Cash),
                SlotRef::new("s2", AccountSlot::Cash),
                100,
            ),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::InsufficientFunds {
                balance: 50,
                amount: 100
            }
        ));
        assert_eq!(cash_of(&conn, "s1"), 50);
        assert_eq!(cash_of(&conn, "s2"), 0);
        assert!(db::ledger_for_session(&conn, "ABCD").unwrap().is_empty());
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 50);

        for amount in [0, -10] {
            let err = transfer(
                &conn,
                &request(
                    SlotRef::new("s1", AccountSlot::Cash),
                    SlotRef::new("s1", AccountSlot::Bank),
                    amount,
                ),
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::InvalidAmount(_)));
        }
        assert_eq!(cash_of(&conn, "s1"), 50);
    }

    #[test]
    fn test_unknown_participant() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 50);

        let err = transfer(
            &conn,
            &request(
                SlotRef::new("s1", AccountSlot::Cash),
                SlotRef::new("ghost", AccountSlot::Cash),
                10,
            ),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::NotFound { entity: "student", .. }));
        assert_eq!(cash_of(&conn, "s1"), 50);
    }
}
