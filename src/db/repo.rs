//! Repository layer for decisions, orders, and positions.
//!
//! The decisions table is the idempotency anchor: `record_decision` is an
//! insert-if-absent keyed by signal_id, and everything else the decision
//! produced (outcomes, orders) commits in the same transaction.

use crate::domain::{
    AccountId, Decimal, Decision, Direction, FundId, FundOutcome, Instrument, Order, OrderSide,
    OrderStatus, Position, PositionStatus, RejectReason, Signal, SignalId, StrategyId, Verdict,
};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::collections::HashMap;

/// A persisted position plus its row id, needed for status transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPosition {
    pub position_id: i64,
    pub position: Position,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Connectivity check backing the readiness probe.
    ///
    /// # Errors
    /// Returns an error when the database cannot be reached.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Persist a decision with its outcomes and orders, idempotently.
    ///
    /// Returns false (and writes nothing) when a decision for this
    /// signal_id already exists.
    ///
    /// # Errors
    /// Returns an error if the transaction fails; nothing partial is
    /// committed.
    pub async fn record_decision(
        &self,
        signal: &Signal,
        decision: &Decision,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO decisions (
                signal_id, strategy_id, instrument, action, verdict,
                reason_code, reason_message, decided_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(signal_id) DO NOTHING
            "#,
        )
        .bind(decision.signal_id.as_str())
        .bind(signal.strategy_id.as_str())
        .bind(signal.instrument.as_str())
        .bind(signal.action.to_string())
        .bind(decision.verdict.as_str())
        .bind(decision.reason.as_ref().map(|r| r.code()))
        .bind(decision.reason.as_ref().map(|r| r.to_string()))
        .bind(decision.decided_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for outcome in &decision.outcomes {
            sqlx::query(
                r#"
                INSERT INTO decision_outcomes (
                    signal_id, fund_id, verdict, reason_code, reason_message
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(decision.signal_id.as_str())
            .bind(outcome.fund_id.as_str())
            .bind(outcome.verdict.as_str())
            .bind(outcome.reason.as_ref().map(|r| r.code()))
            .bind(outcome.reason.as_ref().map(|r| r.to_string()))
            .execute(&mut *tx)
            .await?;

            for order in &outcome.orders {
                sqlx::query(
                    r#"
                    INSERT INTO orders (
                        order_id, signal_id, fund_id, account_id, strategy_id,
                        instrument, side, quantity, price, notional_value,
                        status, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(order.order_id.as_str())
                .bind(order.signal_id.as_str())
                .bind(order.fund_id.as_str())
                .bind(order.account_id.as_str())
                .bind(order.strategy_id.as_str())
                .bind(order.instrument.as_str())
                .bind(order.side.as_str())
                .bind(order.quantity.to_canonical_string())
                .bind(order.price.to_canonical_string())
                .bind(order.notional_value.to_canonical_string())
                .bind(order.status.as_str())
                .bind(chrono::Utc::now().timestamp_millis())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Load a decision by signal_id, rebuilt from its outcome and order
    /// rows.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_decision(
        &self,
        signal_id: &SignalId,
    ) -> Result<Option<Decision>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT signal_id, verdict, reason_code, reason_message, decided_at
            FROM decisions WHERE signal_id = ?
            "#,
        )
        .bind(signal_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let verdict: String = row.get("verdict");
        let reason_code: Option<String> = row.get("reason_code");
        let reason_message: Option<String> = row.get("reason_message");
        let decided_at_ms: i64 = row.get("decided_at");

        let mut orders_by_fund: HashMap<String, Vec<Order>> = HashMap::new();
        for order in self.query_orders_for_signal(signal_id).await? {
            orders_by_fund
                .entry(order.fund_id.as_str().to_string())
                .or_default()
                .push(order);
        }

        let outcome_rows = sqlx::query(
            r#"
            SELECT fund_id, verdict, reason_code, reason_message
            FROM decision_outcomes WHERE signal_id = ?
            ORDER BY fund_id ASC
            "#,
        )
        .bind(signal_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let outcomes = outcome_rows
            .iter()
            .map(|r| {
                let fund_id: String = r.get("fund_id");
                let verdict: String = r.get("verdict");
                let reason_code: Option<String> = r.get("reason_code");
                let reason_message: Option<String> = r.get("reason_message");
                FundOutcome {
                    fund_id: FundId::new(fund_id.clone()),
                    verdict: Verdict::parse(&verdict).unwrap_or(Verdict::Rejected),
                    reason: parse_reason(reason_code, reason_message),
                    orders: orders_by_fund.remove(&fund_id).unwrap_or_default(),
                }
            })
            .collect();

        Ok(Some(Decision {
            signal_id: signal_id.clone(),
            verdict: Verdict::parse(&verdict).unwrap_or(Verdict::Rejected),
            reason: parse_reason(reason_code, reason_message),
            outcomes,
            decided_at: chrono::DateTime::from_timestamp_millis(decided_at_ms)
                .unwrap_or_default(),
        }))
    }

    /// All orders produced for a signal, ordered deterministically.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_orders_for_signal(
        &self,
        signal_id: &SignalId,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, signal_id, fund_id, account_id, strategy_id,
                   instrument, side, quantity, price, notional_value, status
            FROM orders WHERE signal_id = ?
            ORDER BY fund_id ASC, account_id ASC, order_id ASC
            "#,
        )
        .bind(signal_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(order_from_row).collect())
    }

    /// Insert a standalone order (outside a decision transaction).
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_order(&self, order: &Order) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, signal_id, fund_id, account_id, strategy_id,
                instrument, side, quantity, price, notional_value,
                status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(order.signal_id.as_str())
        .bind(order.fund_id.as_str())
        .bind(order.account_id.as_str())
        .bind(order.strategy_id.as_str())
        .bind(order.instrument.as_str())
        .bind(order.side.as_str())
        .bind(order.quantity.to_canonical_string())
        .bind(order.price.to_canonical_string())
        .bind(order.notional_value.to_canonical_string())
        .bind(order.status.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn set_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET status = ? WHERE order_id = ?")
            .bind(status.as_str())
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Capital currently committed by (fund, strategy): the notional sum
    /// of orders still consuming allocation (pending, submitted, filled).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn open_notional(
        &self,
        fund_id: &FundId,
        strategy_id: &StrategyId,
    ) -> Result<Decimal, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT notional_value FROM orders
            WHERE fund_id = ? AND strategy_id = ?
              AND status IN ('pending', 'submitted', 'filled')
            "#,
        )
        .bind(fund_id.as_str())
        .bind(strategy_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let notional: String = r.get("notional_value");
                Decimal::from_str_canonical(&notional).unwrap_or_default()
            })
            .sum())
    }

    /// Append a position; returns its row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_position(&self, position: &Position) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO positions (
                instrument, strategy_id, fund_id, account_id, direction,
                quantity, entry_price, status, opened_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.instrument.as_str())
        .bind(position.strategy_id.as_str())
        .bind(position.fund_id.as_str())
        .bind(position.account_id.as_str())
        .bind(position.direction.as_str())
        .bind(position.quantity.to_canonical_string())
        .bind(position.entry_price.to_canonical_string())
        .bind(position.status.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Find the live (open or closing) position for (fund, strategy,
    /// instrument), if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_live_position(
        &self,
        fund_id: &FundId,
        strategy_id: &StrategyId,
        instrument: &Instrument,
    ) -> Result<Option<StoredPosition>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT position_id, instrument, strategy_id, fund_id, account_id,
                   direction, quantity, entry_price, status
            FROM positions
            WHERE fund_id = ? AND strategy_id = ? AND instrument = ?
              AND status IN ('open', 'closing')
            ORDER BY position_id DESC
            LIMIT 1
            "#,
        )
        .bind(fund_id.as_str())
        .bind(strategy_id.as_str())
        .bind(instrument.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let direction: String = r.get("direction");
            let quantity: String = r.get("quantity");
            let entry_price: String = r.get("entry_price");
            let status: String = r.get("status");
            StoredPosition {
                position_id: r.get("position_id"),
                position: Position {
                    instrument: Instrument::new(r.get::<String, _>("instrument")),
                    strategy_id: StrategyId::new(r.get::<String, _>("strategy_id")),
                    fund_id: FundId::new(r.get::<String, _>("fund_id")),
                    account_id: AccountId::new(r.get::<String, _>("account_id")),
                    direction: Direction::parse(&direction).unwrap_or(Direction::Long),
                    quantity: Decimal::from_str_canonical(&quantity).unwrap_or_default(),
                    entry_price: Decimal::from_str_canonical(&entry_price).unwrap_or_default(),
                    status: PositionStatus::parse(&status).unwrap_or(PositionStatus::Open),
                },
            }
        }))
    }

    /// Move a position to a new status; stamps closed_at when closing out.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn set_position_status(
        &self,
        position_id: i64,
        status: PositionStatus,
    ) -> Result<(), sqlx::Error> {
        let closed_at = match status {
            PositionStatus::Closed => Some(chrono::Utc::now().timestamp_millis()),
            _ => None,
        };
        sqlx::query("UPDATE positions SET status = ?, closed_at = ? WHERE position_id = ?")
            .bind(status.as_str())
            .bind(closed_at)
            .bind(position_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn parse_reason(code: Option<String>, message: Option<String>) -> Option<RejectReason> {
    let code = code?;
    RejectReason::from_parts(&code, message.as_deref().unwrap_or(""))
}

fn order_from_row(row: &sqlx::sqlite::SqliteRow) -> Order {
    let side: String = row.get("side");
    let quantity: String = row.get("quantity");
    let price: String = row.get("price");
    let notional: String = row.get("notional_value");
    let status: String = row.get("status");
    Order {
        order_id: row.get("order_id"),
        signal_id: SignalId::new(row.get::<String, _>("signal_id")),
        fund_id: FundId::new(row.get::<String, _>("fund_id")),
        account_id: AccountId::new(row.get::<String, _>("account_id")),
        strategy_id: StrategyId::new(row.get::<String, _>("strategy_id")),
        instrument: Instrument::new(row.get::<String, _>("instrument")),
        side: OrderSide::parse(&side).unwrap_or(OrderSide::Buy),
        quantity: Decimal::from_str_canonical(&quantity).unwrap_or_default(),
        price: Decimal::from_str_canonical(&price).unwrap_or_default(),
        notional_value: Decimal::from_str_canonical(&notional).unwrap_or_default(),
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Pending),
    }
}
