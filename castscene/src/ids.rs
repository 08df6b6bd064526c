use std::sync::atomic::{AtomicU64, Ordering};

// Node hashes are process-global and monotonically increasing from the base Cast writers use.
const NODE_HASH_BASE: u64 = 0x534E_4957_5254_5250;

static NEXT_NODE_HASH: AtomicU64 = AtomicU64::new(NODE_HASH_BASE);

pub(crate) fn next_node_hash() -> u64 {
    NEXT_NODE_HASH.fetch_add(1, Ordering::Relaxed)
}
