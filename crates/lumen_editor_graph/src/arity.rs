// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input renumbering for variadic operator nodes.
//!
//! A variadic node's inbound edges always occupy a contiguous run of lettered
//! handles (`a`, `b`, `c`, ...) assigned in current edge order. The pass below
//! is a normalization step run after every structural change, so removing a
//! middle input shifts the later inputs down one letter instead of leaving a
//! gap. The canonical graph and the flow projection both run it, over
//! `input` and `target_handle` respectively.

use crate::edge::Edge;
use crate::node::NodeId;
use crate::port::HandleId;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Edge view the collapsing pass operates on
pub trait ArityEdge {
    /// Node key the edge targets
    type Key: Eq + Hash + Clone;

    /// Target node
    fn target(&self) -> &Self::Key;

    /// Input handle on the target node
    fn target_handle(&self) -> &HandleId;

    /// Rewrite the input handle on the target node
    fn set_target_handle(&mut self, handle: HandleId);

    /// Stage links never occupy an input slot
    fn is_link(&self) -> bool {
        false
    }
}

impl ArityEdge for Edge {
    type Key = NodeId;

    fn target(&self) -> &NodeId {
        &self.to
    }

    fn target_handle(&self) -> &HandleId {
        &self.input
    }

    fn set_target_handle(&mut self, handle: HandleId) {
        self.input = handle;
    }

    fn is_link(&self) -> bool {
        Edge::is_link(self)
    }
}

// Unchanged edges keep their allocation so callers can diff by pointer.
impl<E: ArityEdge + Clone> ArityEdge for Arc<E> {
    type Key = E::Key;

    fn target(&self) -> &E::Key {
        (**self).target()
    }

    fn target_handle(&self) -> &HandleId {
        (**self).target_handle()
    }

    fn set_target_handle(&mut self, handle: HandleId) {
        Arc::make_mut(self).set_target_handle(handle);
    }

    fn is_link(&self) -> bool {
        (**self).is_link()
    }
}

/// Handle name for the `index`th input of a variadic node.
///
/// `0 -> a`, `25 -> z`, `26 -> aa`, `27 -> ab`, ...
pub fn handle_for_index(index: usize) -> HandleId {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'a' + (n % 26) as u8));
        n /= 26;
    }
    HandleId(letters.into_iter().rev().collect())
}

/// Inverse of [`handle_for_index`]
pub fn index_of_handle(handle: &HandleId) -> Option<usize> {
    let s = handle.as_str();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_lowercase()) {
        return None;
    }
    let n = s
        .bytes()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(26)?.checked_add(usize::from(b - b'a') + 1)
        })?;
    Some(n - 1)
}

/// Input handles a variadic node should expose for `arity` connected edges:
/// one per edge plus a free slot, never fewer than two.
pub fn variadic_handles(arity: usize) -> Vec<HandleId> {
    (0..(arity + 1).max(2)).map(handle_for_index).collect()
}

/// Outcome of a collapsing pass
#[derive(Debug, Clone)]
pub struct CollapseSummary<K> {
    /// Number of edges whose handle changed
    pub rewritten: usize,
    arity: HashMap<K, usize>,
}

impl<K: Eq + Hash> CollapseSummary<K> {
    /// Connected input count of a variadic node
    pub fn arity(&self, key: &K) -> usize {
        self.arity.get(key).copied().unwrap_or(0)
    }
}

/// Renumber the inbound handles of every variadic node.
///
/// Edges are grouped by target in iteration order; the `n`th edge of a
/// group gets [`handle_for_index`]`(n)`. Running the pass twice is the same
/// as running it once.
pub fn collapse_edges<'a, E, I, F>(edges: I, is_variadic: F) -> CollapseSummary<E::Key>
where
    E: ArityEdge + 'a,
    I: IntoIterator<Item = &'a mut E>,
    F: Fn(&E::Key) -> bool,
{
    let mut arity: HashMap<E::Key, usize> = HashMap::new();
    let mut rewritten = 0;

    for edge in edges {
        if edge.is_link() || !is_variadic(edge.target()) {
            continue;
        }

        let handle = {
            let slot = arity.entry(edge.target().clone()).or_insert(0);
            let handle = handle_for_index(*slot);
            *slot += 1;
            handle
        };

        if *edge.target_handle() != handle {
            edge.set_target_handle(handle);
            rewritten += 1;
        }
    }

    CollapseSummary { rewritten, arity }
}
