// 🛒 Goods Marketplace - Catalog purchases with finite or unlimited stock
//
// Purchase order is fixed: debit cash, decrement stock (finite items only),
// append the ledger entry. A stock decrement that fails after the debit
// succeeded is NOT rolled back - the purchase is complete from the ledger's
// perspective and the receipt flags the stock step for reconciliation;
// callers must re-read item state afterward.

use rusqlite::Connection;

use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::model::{AccountSlot, Actor, GoodsItem, LedgerEntry, LedgerKind};
use crate::transfer::require_student;

/// Authoritative post-state of a purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub cash_after: i64,
    pub stock_after: Option<i64>,
    /// False when the item has finite stock but the decrement step did not
    /// take effect after the debit - a reconciliation signal, not an error.
    pub stock_adjusted: bool,
    pub entry: LedgerEntry,
}

/// Buy one unit of `item_id` for `student_id`, paying from cash.
///
/// Preconditions, checked before any write: student and item exist, cash
/// covers the price, finite stock is positive.
pub fn purchase(conn: &Connection, student_id: &str, item_id: &str) -> EngineResult<PurchaseReceipt> {
    let student = require_student(conn, student_id)?;
    let item: GoodsItem =
        db::get_item(conn, item_id)?.ok_or_else(|| EngineError::not_found("item", item_id))?;

    if student.cash < item.price {
        return Err(EngineError::InsufficientFunds {
            balance: student.cash,
            amount: item.price,
        });
    }
    if let Some(stock) = item.stock {
        if stock <= 0 {
            return Err(EngineError::OutOfStock(item.id.clone()));
        }
    }

    // Step 1: debit cash (guarded)
    if !db::debit_slot(conn, &student.id, AccountSlot::Cash, item.price)? {
        let current = require_student(conn, &student.id)?.cash;
        return Err(EngineError::InsufficientFunds {
            balance: current,
            amount: item.price,
        });
    }

    // Step 2: decrement stock, finite items only. A failure here does not
    // undo the debit; the receipt carries the flag instead.
    let stock_adjusted = if item.stock.is_some() {
        db::decrement_stock(conn, &item.id).unwrap_or(false)
    } else {
        true
    };

    // Step 3: ledger append
    let entry = LedgerEntry::new(
        &student.session_code,
        Actor::Student(student.id.clone()),
        student.name.clone(),
        Actor::Market,
        "Market",
        item.price,
        LedgerKind::Market,
        &format!("purchase: {}", item.name),
    );
    if let Err(e) = db::insert_ledger_entry(conn, &entry) {
        return Err(EngineError::partial(
            "purchase",
            &["debit", "stock decrement"],
            "ledger append",
            e.to_string(),
        ));
    }

    let cash_after = require_student(conn, &student.id)?.cash;
    let stock_after = db::get_item(conn, &item.id)?.and_then(|i| i.stock);

    Ok(PurchaseReceipt {
        cash_after,
        stock_after,
        stock_adjusted,
        entry,
    })
}
