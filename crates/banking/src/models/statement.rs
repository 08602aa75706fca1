use rust_decimal::Decimal;
use serde::Serialize;

use super::transaction::{Transaction, TransactionType};
use super::types::Institution;

/// Derived totals over a statement's transaction sequence.
///
/// Always the fold of the transactions it ships with, never independently
/// sourced from the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub net_amount: Decimal,
    pub transaction_count: usize,
}

impl StatementSummary {
    pub fn of(transactions: &[Transaction]) -> Self {
        let mut total_credits = Decimal::ZERO;
        let mut total_debits = Decimal::ZERO;
        for transaction in transactions {
            match transaction.transaction_type {
                TransactionType::Credit => total_credits += transaction.amount,
                TransactionType::Debit => total_debits += transaction.amount,
            }
        }
        Self {
            total_credits,
            total_debits,
            net_amount: total_credits - total_debits,
            transaction_count: transactions.len(),
        }
    }
}

/// A page of account movements in the standard model.
///
/// Transactions are ordered most-recent-first. Callers paginate and diff by
/// position, so the ordering is part of the contract.
#[derive(Clone, Debug, Serialize)]
pub struct Statement {
    pub institution: Institution,
    pub account_id: String,
    pub transactions: Vec<Transaction>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub total: Option<u64>,
    pub summary: StatementSummary,
}

impl Statement {
    /// Build a statement from translated transactions.
    ///
    /// Sorts descending by timestamp and computes the summary fold. This is
    /// the only constructor; adapters must not assemble the struct by hand.
    pub fn assemble(
        institution: Institution,
        account_id: String,
        mut transactions: Vec<Transaction>,
        cursor: Option<String>,
        has_more: bool,
        total: Option<u64>,
    ) -> Self {
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let summary = StatementSummary::of(&transactions);
        Self {
            institution,
            account_id,
            transactions,
            cursor,
            has_more,
            total,
            summary,
        }
    }
}
