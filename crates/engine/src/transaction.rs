//! Transaction and statement boundary payloads
//!
//! Engines receive these at every boundary hook. Durable per-transaction
//! state lives inside the engine, keyed by the transaction id; the types
//! here only describe the boundary being crossed.

use keel_common::{SpaceId, TransactionId};
use keel_tuple::Tuple;

/// One row-level mutation within a transaction.
#[derive(Debug, Clone)]
pub struct Statement {
    /// Space the mutation touched
    pub space_id: SpaceId,
    /// Row displaced by the mutation, if any
    pub old_tuple: Option<Tuple>,
    /// Row written by the mutation, if any
    pub new_tuple: Option<Tuple>,
}

impl Statement {
    pub fn new(space_id: SpaceId, old_tuple: Option<Tuple>, new_tuple: Option<Tuple>) -> Self {
        Self {
            space_id,
            old_tuple,
            new_tuple,
        }
    }
}

/// A transaction as storage engines see it: an id plus the statements
/// executed so far, in order.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    statements: Vec<Statement>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            statements: Vec::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn push_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}
