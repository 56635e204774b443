// 🏛️ Bulk Economy Operator - Rewards and fines over a target set
//
// NOT all-or-nothing: each student's update is independent. A failure on one
// row is recorded and processing continues with the next; the aggregate
// outcome lists who succeeded and who failed instead of aborting the batch.
//
// Policy note: fines are applied with the unchecked debit and may drive a
// balance negative. This preserves the observed behavior of penalizing
// regardless of solvency - it is a deliberate choice, not a missing guard.

use rusqlite::Connection;

use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::model::{AccountSlot, Actor, LedgerEntry, LedgerKind, Student};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkKind {
    Reward,
    Fine,
}

/// Who the bulk operation applies to.
#[derive(Debug, Clone)]
pub enum BulkTarget {
    /// Every current student of the session.
    AllInSession(String),
    /// An explicit, caller-selected subset of student ids.
    Selected(Vec<String>),
}

/// Aggregate result of a bulk operation. `failed` pairs each id with the
/// reason, so the operator can retry or reconcile individual rows.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Apply a reward or fine of `amount` to every target's cash balance, one
/// ledger entry per student. Rewards are sent by the Government; fines list
/// the student as sender and the Government as receiver.
pub fn apply_bulk(
    conn: &Connection,
    kind: BulkKind,
    amount: i64,
    target: &BulkTarget,
    description: &str,
) -> EngineResult<BulkOutcome> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }

    let ids: Vec<String> = match target {
        BulkTarget::AllInSession(code) => db::list_students(conn, code)?
            .into_iter()
            .map(|s| s.id)
            .collect(),
        BulkTarget::Selected(ids) => ids.clone(),
    };
    if ids.is_empty() {
        return Err(EngineError::NoTarget);
    }

    let mut outcome = BulkOutcome::default();

    for id in &ids {
        match apply_one(conn, kind, amount, id, description) {
            Ok(()) => outcome.succeeded.push(id.clone()),
            Err(e) => outcome.failed.push((id.clone(), e.to_string())),
        }
    }

    Ok(outcome)
}

fn apply_one(
    conn: &Connection,
    kind: BulkKind,
    amount: i64,
    student_id: &str,
    description: &str,
) -> EngineResult<()> {
    let student: Student = db::get_student(conn, student_id)?
        .ok_or_else(|| EngineError::not_found("student", student_id))?;

    let entry = match kind {
        BulkKind::Reward => {
            if !db::credit_slot(conn, &student.id, AccountSlot::Cash, amount)? {
                return Err(EngineError::not_found("student", student_id));
            }
            LedgerEntry::new(
                &student.session_code,
                Actor::Government,
                "Government",
                Actor::Student(student.id.clone()),
                student.name.clone(),
                amount,
                LedgerKind::Reward,
                description,
            )
        }
        BulkKind::Fine => {
            // Unchecked on purpose: fines bypass the solvency guard.
            if !db::debit_slot_unchecked(conn, &student.id, AccountSlot::Cash, amount)? {
                return Err(EngineError::not_found("student", student_id));
            }
            LedgerEntry::new(
                &student.session_code,
                Actor::Student(student.id.clone()),
                student.name.clone(),
                Actor::Government,
                "Government",
                amount,
                LedgerKind::Fine,
                description,
            )
        }
    };

    if let Err(e) = db::insert_ledger_entry(conn, &entry) {
        return Err(EngineError::partial(
            "bulk apply",
            &["balance update"],
            "ledger append",
            e.to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::model::LedgerKind;

    #[test]
    fn test_reward_all_in_session() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 0);
        seed_student(&conn, "s2", "Bob", "ABCD", 100);

        let outcome = apply_bulk(
            &conn,
            BulkKind::Reward,
            250,
            &BulkTarget::AllInSession("ABCD".to_string()),
            "participation reward",
        )
        .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(cash_of(&conn, "s1"), 250);
        assert_eq!(cash_of(&conn, "s2"), 350);

        let entries = db::ledger_for_session(&conn, "ABCD").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.sender == Actor::Government && e.kind == LedgerKind::Reward));
    }

    #[test]
    fn test_fine_bypasses_solvency_guard() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 1000);
        seed_student(&conn, "s2", "Bob", "ABCD", 200);
        seed_student(&conn, "s3", "Cara", "ABCD", 700);

        let ids = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        let outcome = apply_bulk(
            &conn,
            BulkKind::Fine,
            500,
            &BulkTarget::Selected(ids),
            "late homework",
        )
        .unwrap();

        assert_eq!(outcome.succeeded.len(), 3);
        assert_eq!(cash_of(&conn, "s1"), 500);
        // Fine still applies even though s2 could not cover it
        assert_eq!(cash_of(&conn, "s2"), -300);
        assert_eq!(cash_of(&conn, "s3"), 200);

        let entries = db::ledger_for_session(&conn, "ABCD").unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e.receiver == Actor::Government && e.kind == LedgerKind::Fine));
    }

    #[test]
    fn test_empty_target_set_fails() {
        let conn = test_conn();

        let err = apply_bulk(
            &conn,
            BulkKind::Reward,
            100,
            &BulkTarget::Selected(vec![]),
            "nobody",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoTarget));

        // A session with no students is also an empty target set
        let err = apply_bulk(
            &conn,
            BulkKind::Reward,
            100,
            &BulkTarget::AllInSession("EMPTY".to_string()),
            "nobody",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoTarget));
    }

    #[test]
    fn test_one_bad_target_does_not_abort_the_rest() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 0);
        seed_student(&conn, "s3", "Cara", "ABCD", 0);

        let ids = vec!["s1".to_string(), "ghost".to_string(), "s3".to_string()];
        let outcome = apply_bulk(
            &conn,
            BulkKind::Reward,
            100,
            &BulkTarget::Selected(ids),
            "reward",
        )
        .unwrap();

        assert_eq!(outcome.succeeded, vec!["s1", "s3"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "ghost");
        assert!(!outcome.is_complete());

        // The students after the bad row were still processed
        assert_eq!(cash_of(&conn, "s1"), 100);
        assert_eq!(cash_of(&conn, "s3"), 100);
    }

    #[test]
    fn test_invalid_amount_rejected() {
        let conn = test_conn();
        seed_student(&conn, "s1", "Alice", "ABCD", 0);

        let err = apply_bulk(
            &conn,
            BulkKind::Fine,
            0,
            &BulkTarget::Selected(vec!["s1".to_string()]),
            "zero fine",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(0)));
    }
}
