//! Latest-request-wins guard for layouts applied to a shared graph store.

use std::cell::{Cell, RefCell};

use crate::graph::Graph;

use super::engine::LayoutEngine;
use super::solver::LayeredSolver;
use super::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Single pending-request slot for one graph store.
///
/// Every request takes a ticket; only a result whose ticket is still the
/// newest is written back.
#[derive(Debug, Default)]
pub struct LayoutSlot {
    latest: Cell<u64>,
}

impl LayoutSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        let next = self.latest.get() + 1;
        self.latest.set(next);
        Ticket(next)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get() == ticket.0
    }

    /// Lay out a snapshot of `store` and apply the positions if no newer
    /// request started meanwhile. Returns `None` for a superseded result.
    pub async fn run<S: LayeredSolver>(
        &self,
        engine: &LayoutEngine<S>,
        store: &RefCell<Graph>,
    ) -> Result<Option<Graph>, LayoutError> {
        let ticket = self.issue();
        let snapshot = store.borrow().clone();
        let laid_out = engine.layout(&snapshot).await?;

        if !self.is_current(ticket) {
            tracing::warn!(ticket = ticket.0, latest = self.latest.get(), "discarding stale layout");
            return Ok(None);
        }
        store.borrow_mut().apply_positions(&laid_out);
        Ok(Some(laid_out))
    }
}
