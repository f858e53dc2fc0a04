use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Order, OrderId, PaymentRecord, PaymentState};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Payment ledger ──

pub fn insert_order(conn: &Connection, order: &Order) -> rusqlite::Result<()> {
    let now = now();
    conn.execute(
        "INSERT INTO payment_orders (order_id, venue_id, item_name, quantity, total_amount, state, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            order.id.as_str(),
            order.venue_id,
            order.item_name,
            order.quantity,
            order.total_amount,
            PaymentState::Created.as_str(),
            now,
        ],
    )?;
    Ok(())
}

pub fn get_order(conn: &Connection, order_id: &OrderId) -> rusqlite::Result<Option<PaymentRecord>> {
    conn.query_row(
        "SELECT order_id, venue_id, item_name, quantity, total_amount, state, redirect_url,
                approval_token, failure_reason, created_at, updated_at
         FROM payment_orders WHERE order_id = ?1",
        params![order_id.as_str()],
        |row| {
            let id: String = row.get(0)?;
            let state: String = row.get(5)?;
            let created_at: String = row.get(9)?;
            let updated_at: String = row.get(10)?;
            Ok(PaymentRecord {
                order_id: OrderId::parse(&id).unwrap_or_else(|| order_id.clone()),
                venue_id: row.get(1)?,
                item_name: row.get(2)?,
                quantity: row.get(3)?,
                total_amount: row.get(4)?,
                state: PaymentState::parse(&state).unwrap_or(PaymentState::Failed),
                redirect_url: row.get(6)?,
                approval_token: row.get(7)?,
                failure_reason: row.get(8)?,
                created_at: parse_ts(&created_at),
                updated_at: parse_ts(&updated_at),
            })
        },
    )
    .optional()
}

/// `Created → Pending`. False when the order is not in `Created`.
pub fn mark_pending(conn: &Connection, order_id: &OrderId, redirect_url: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payment_orders SET state = ?1, redirect_url = ?2, updated_at = ?3
         WHERE order_id = ?4 AND state = ?5",
        params![
            PaymentState::Pending.as_str(),
            redirect_url,
            now(),
            order_id.as_str(),
            PaymentState::Created.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Makes sure a callback for an order this ledger never saw has a row to
/// settle against. Existing rows are left untouched.
pub fn ensure_callback_row(conn: &Connection, order_id: &OrderId) -> rusqlite::Result<()> {
    let now = now();
    conn.execute(
        "INSERT OR IGNORE INTO payment_orders (order_id, state, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![order_id.as_str(), PaymentState::Pending.as_str(), now],
    )?;
    Ok(())
}

/// Claims the single approval call for an open order. Only the first caller
/// gets `true`; reloads of the approve page find the claim taken.
pub fn claim_approval(conn: &Connection, order_id: &OrderId, gateway_token: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payment_orders SET approval_token = ?1, updated_at = ?2
         WHERE order_id = ?3 AND approval_token IS NULL AND state IN (?4, ?5)",
        params![
            gateway_token,
            now(),
            order_id.as_str(),
            PaymentState::Created.as_str(),
            PaymentState::Pending.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Moves an open order to a terminal state. False if it was already settled.
pub fn settle_order(
    conn: &Connection,
    order_id: &OrderId,
    state: PaymentState,
    failure_reason: Option<&str>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payment_orders SET state = ?1, failure_reason = ?2, updated_at = ?3
         WHERE order_id = ?4 AND state IN (?5, ?6)",
        params![
            state.as_str(),
            failure_reason,
            now(),
            order_id.as_str(),
            PaymentState::Created.as_str(),
            PaymentState::Pending.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Like [`settle_order`], but leaves orders whose approval has been claimed
/// alone. Only the approve callback holding the claim may settle those.
pub fn settle_unclaimed(
    conn: &Connection,
    order_id: &OrderId,
    state: PaymentState,
    failure_reason: Option<&str>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payment_orders SET state = ?1, failure_reason = ?2, updated_at = ?3
         WHERE order_id = ?4 AND approval_token IS NULL AND state IN (?5, ?6)",
        params![
            state.as_str(),
            failure_reason,
            now(),
            order_id.as_str(),
            PaymentState::Created.as_str(),
            PaymentState::Pending.as_str(),
        ],
    )?;
    Ok(changed == 1)
}
