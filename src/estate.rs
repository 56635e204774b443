// 🪑 Estate Marketplace - Seat state machine
//
// available → pending   purchase request (funds debited, price recorded)
// pending   → sold      teacher approval, or automatic when the session's
//                       auto-approve flag is set; no balance change
// pending   → available teacher rejection; compensating refund of
//                       price_at_buy to the requester's cash
// sold      → available administrative vacate; manual override, NO refund
//
// Every transition is a compare-and-set on the seat row, so two racing
// requests for the same seat resolve to one winner.

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::model::{AccountSlot, Actor, LedgerEntry, LedgerKind, Seat, SeatStatus};
use crate::transfer::require_student;

/// Bulk-create an empty rows x cols grid for a session. Grid layout is a
/// class setting, not part of the economy core; this helper exists so the
/// table can be populated at all.
pub fn init_grid(conn: &Connection, session_code: &str, rows: i64, cols: i64) -> Result<usize> {
    let mut created = 0;

    for row in 1..=rows {
        for col in 1..=cols {
            let seat = Seat {
                id: uuid::Uuid::new_v4().to_string(),
                session_code: session_code.to_string(),
                row,
                col,
                status: SeatStatus::Available,
                owner_id: None,
                owner_name: None,
                price_at_buy: 0,
            };
            db::insert_seat(conn, &seat)?;
            created += 1;
        }
    }

    Ok(created)
}

fn require_seat(conn: &Connection, seat_id: &str) -> EngineResult<Seat> {
    db::get_seat(conn, seat_id)?.ok_or_else(|| EngineError::not_found("seat", seat_id))
}

fn wrong_state(seat: &Seat, expected: &'static str) -> EngineError {
    EngineError::WrongSeatState {
        seat_id: seat.id.clone(),
        expected,
        found: seat.status,
    }
}

/// A student requests an available seat at `price`. The price is debited
/// from cash up front and recorded on the seat for a possible refund. When
/// the session has auto-approve set, the seat continues straight to Sold in
/// the same call; otherwise it waits Pending for the teacher's decision.
pub fn request_purchase(
    conn: &Connection,
    seat_id: &str,
    student_id: &str,
    price: i64,
) -> EngineResult<Seat> {
    if price <= 0 {
        return Err(EngineError::InvalidAmount(price));
    }

    let seat = require_seat(conn, seat_id)?;
    if seat.status != SeatStatus::Available {
        return Err(wrong_state(&seat, "available"));
    }

    let student = require_student(conn, student_id)?;
    if student.cash < price {
        return Err(EngineError::InsufficientFunds {
            balance: student.cash,
            amount: price,
        });
    }

    // Step 1: debit the requester (guarded)
    if !db::debit_slot(conn, &student.id, AccountSlot::Cash, price)? {
        let current = require_student(conn, &student.id)?.cash;
        return Err(EngineError::InsufficientFunds {
            balance: current,
            amount: price,
        });
    }

    // Step 2: available → pending. Losing this CAS means another request
    // won the seat between our read and write; compensate the debit and
    // report the state the seat is actually in.
    let moved = db::update_seat_state(
        conn,
        &seat.id,
        SeatStatus::Available,
        SeatStatus::Pending,
        Some(&student.id),
        Some(&student.name),
        price,
    )?;
    if !moved {
        if let Err(e) = db::credit_slot(conn, &student.id, AccountSlot::Cash, price) {
            return Err(EngineError::partial(
                "seat request",
                &["debit"],
                "compensating credit",
                e.to_string(),
            ));
        }
        let current = require_seat(conn, &seat.id)?;
        return Err(wrong_state(&current, "available"));
    }

    // Step 3: ledger append for the debit
    let entry = LedgerEntry::new(
        &student.session_code,
        Actor::Student(student.id.clone()),
        student.name.clone(),
        Actor::Market,
        "Market",
        price,
        LedgerKind::Market,
        &format!("seat purchase request ({}, {})", seat.row, seat.col),
    );
    if let Err(e) = db::insert_ledger_entry(conn, &entry) {
        return Err(EngineError::partial(
            "seat request",
            &["debit", "seat pending"],
            "ledger append",
            e.to_string(),
        ));
    }

    // Auto-approve sessions skip the teacher decision
    let auto = db::get_session(conn, &student.session_code)?
        .map(|s| s.auto_approve_estate)
        .unwrap_or(false);
    if auto {
        db::update_seat_state(
            conn,
            &seat.id,
            SeatStatus::Pending,
            SeatStatus::Sold,
            Some(&student.id),
            Some(&student.name),
            price,
        )?;
    }

    require_seat(conn, &seat.id)
}

/// Teacher approval: pending → sold. No balance change - the debit already
/// happened on request.
pub fn approve(conn: &Connection, seat_id: &str) -> EngineResult<Seat> {
    let seat = require_seat(conn, seat_id)?;
    if seat.status != SeatStatus::Pending {
        return Err(wrong_state(&seat, "pending"));
    }

    db::update_seat_state(
        conn,
        &seat.id,
        SeatStatus::Pending,
        SeatStatus::Sold,
        seat.owner_id.as_deref(),
        seat.owner_name.as_deref(),
        seat.price_at_buy,
    )?;

    require_seat(conn, &seat.id)
}

/// Teacher rejection: pending → available. Compensating action: refund
/// price_at_buy to the requester's cash, then clear owner fields and price.
/// The ledger records the refund as the last artifact.
pub fn reject(conn: &Connection, seat_id: &str) -> EngineResult<Seat> {
    let seat = require_seat(conn, seat_id)?;
    if seat.status != SeatStatus::Pending {
        return Err(wrong_state(&seat, "pending"));
    }

    // Invariant: a pending seat always carries its requester
    let owner_id = seat
        .owner_id
        .clone()
        .ok_or_else(|| EngineError::not_found("seat owner", &seat.id))?;
    let owner_name = seat.owner_name.clone().unwrap_or_else(|| owner_id.clone());

    // Step 1: refund
    if !db::credit_slot(conn, &owner_id, AccountSlot::Cash, seat.price_at_buy)? {
        return Err(EngineError::not_found("student", &owner_id));
    }

    // Step 2: clear the seat
    let cleared = db::update_seat_state(
        conn,
        &seat.id,
        SeatStatus::Pending,
        SeatStatus::Available,
        None,
        None,
        0,
    )?;
    if !cleared {
        return Err(EngineError::partial(
            "seat reject",
            &["refund"],
            "seat clear",
            format!("seat {} left pending state concurrently", seat.id),
        ));
    }

    // Step 3: ledger append for the refund
    let entry = LedgerEntry::new(
        &seat.session_code,
        Actor::Market,
        "Market",
        Actor::Student(owner_id.clone()),
        owner_name,
        seat.price_at_buy,
        LedgerKind::Market,
        &format!("seat refund ({}, {})", seat.row, seat.col),
    );
    if let Err(e) = db::insert_ledger_entry(conn, &entry) {
        return Err(EngineError::partial(
            "seat reject",
            &["refund", "seat clear"],
            "ledger append",
            e.to_string(),
        ));
    }

    require_seat(conn, &seat.id)
}

/// Administrative reassignment: sold → available with NO refund. This is a
/// manual override, not a purchase reversal, so no value moves and nothing
/// is appended to the ledger.
pub fn vacate(conn: &Connection, seat_id: &str) -> EngineResult<Seat> {
    let seat = require_seat(conn, seat_id)?;
    if seat.status != SeatStatus::Sold {
        return Err(wrong_state(&seat, "sold"));
    }

    db::update_seat_state(
        conn,
        &seat.id,
        SeatStatus::Sold,
        SeatStatus::Available,
        None,
        None,
        0,
    )?;

    require_seat(conn, &seat.id)
}
