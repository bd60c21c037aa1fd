//! Chain engine events (§4.6 "Events", §9 "Events are a one-to-many
//! in-process subscription").
//!
//! The teacher crate had no event system at all — `Ledger::apply_block`
//! mutated state and returned. Modeled here the way the spec describes: a
//! list of boxed callbacks invoked synchronously after the commit boundary,
//! deregistered by a handle rather than by value equality (closures aren't
//! comparable).

use crate::block::Block;
use crate::header::BlockHeader;
use crate::Hash;

/// Opaque handle returned by a `subscribe_*` call, used only to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

type ConnectCallback = Box<dyn FnMut(&Block, &BlockHeader) + Send>;
type DisconnectCallback = Box<dyn FnMut(&Block, &BlockHeader) + Send>;
type ReorganizeCallback = Box<dyn FnMut(&Hash, &Hash, &Hash) + Send>;

/// Registry of callbacks the chain engine notifies after each commit.
/// Subscribers observe events in the order the underlying state transitions
/// happened; this type never reorders or batches.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    on_connect: Vec<(SubscriptionId, ConnectCallback)>,
    on_disconnect: Vec<(SubscriptionId, DisconnectCallback)>,
    on_reorganize: Vec<(SubscriptionId, ReorganizeCallback)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers a callback for `onConnectBlock(block, previous_head)`.
    pub fn on_connect_block<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Block, &BlockHeader) + Send + 'static,
    {
        let id = self.next_id();
        self.on_connect.push((id, Box::new(callback)));
        id
    }

    /// Registers a callback for `onDisconnectBlock(block, previous_head)`.
    pub fn on_disconnect_block<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Block, &BlockHeader) + Send + 'static,
    {
        let id = self.next_id();
        self.on_disconnect.push((id, Box::new(callback)));
        id
    }

    /// Registers a callback for `onReorganize(old_head, new_head, common_ancestor)`.
    pub fn on_reorganize<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Hash, &Hash, &Hash) + Send + 'static,
    {
        let id = self.next_id();
        self.on_reorganize.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.on_connect.retain(|(i, _)| *i != id);
        self.on_disconnect.retain(|(i, _)| *i != id);
        self.on_reorganize.retain(|(i, _)| *i != id);
    }

    pub(crate) fn emit_connect(&mut self, block: &Block, previous_head: &BlockHeader) {
        for (_, callback) in self.on_connect.iter_mut() {
            callback(block, previous_head);
        }
    }

    pub(crate) fn emit_disconnect(&mut self, block: &Block, previous_head: &BlockHeader) {
        for (_, callback) in self.on_disconnect.iter_mut() {
            callback(block, previous_head);
        }
    }

    pub(crate) fn emit_reorganize(&mut self, old_head: &Hash, new_head: &Hash, common_ancestor: &Hash) {
        for (_, callback) in self.on_reorganize.iter_mut() {
            callback(old_head, new_head, common_ancestor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TreeCommitment;
    use primitive_types::U256;
    use std::sync::{Arc, Mutex};

    fn dummy_header() -> BlockHeader {
        BlockHeader {
            sequence: 1,
            previous_hash: [0u8; 32],
            note_commitment: TreeCommitment::new([0u8; 32], 0),
            nullifier_commitment: TreeCommitment::new([0u8; 32], 0),
            target: U256::MAX,
            randomness: 0,
            timestamp: 0,
            graffiti: [0u8; 32],
            transactions_hash: [0u8; 32],
        }
    }

    fn dummy_block() -> Block {
        Block {
            header: dummy_header(),
            transactions: vec![],
        }
    }

    #[test]
    fn connect_callback_fires_in_order() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen1 = seen.clone();
        bus.on_connect_block(move |block, _| seen1.lock().unwrap().push(block.header.sequence));
        let block = dummy_block();
        bus.emit_connect(&block, &dummy_header());
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let count1 = count.clone();
        let id = bus.on_connect_block(move |_, _| *count1.lock().unwrap() += 1);
        bus.unsubscribe(id);
        bus.emit_connect(&dummy_block(), &dummy_header());
        assert_eq!(*count.lock().unwrap(), 0);
    }
}
