//! Adapter identity matching
//!
//! Adapter identities are not stable across driver reinstalls, GPU
//! swaps, dock reconnects, or enumeration-order changes, but the
//! relative position of an adapter among identically-modeled adapters
//! usually is. `match_adapter` exploits that: it maps "the Nth
//! modelX adapter of the recorded inventory" onto "the Nth modelX
//! adapter present now", and refuses to guess across models.

use tracing::debug;

use crate::adapter::{AdapterDescriptor, AdapterLuid};

/// Decide which currently-present adapter identity should replace
/// `old`, which appeared in a saved profile.
///
/// Returns `None` when no clean positional candidate exists; a wrong
/// guess is never returned. Two physically distinct adapters that are
/// indistinguishable by model (same vendor, device, memory, and flags)
/// are matched purely by position.
pub fn match_adapter(
    old: AdapterLuid,
    profile_inventory: &[AdapterDescriptor],
    current_inventory: &[AdapterDescriptor],
) -> Option<AdapterLuid> {
    // Identity still present: nothing changed.
    if current_inventory.iter().any(|a| a.adapter_luid == old) {
        return Some(old);
    }

    // Without a recorded inventory there is nothing to position-match
    // against; the caller falls back or fails.
    let recorded = profile_inventory.iter().find(|a| a.adapter_luid == old)?;

    // How many identically-modeled adapters preceded this one in the
    // recorded inventory order.
    let ordinal = profile_inventory
        .iter()
        .take_while(|a| a.adapter_luid != old)
        .filter(|a| a.likely_same_model(recorded))
        .count();

    let matched = current_inventory
        .iter()
        .filter(|a| a.likely_same_model(recorded))
        .nth(ordinal)
        .map(|a| a.adapter_luid);

    match matched {
        Some(new) => debug!(old = %old, new = %new, ordinal, "matched adapter by model ordinal"),
        None => debug!(old = %old, ordinal, "no same-model adapter at ordinal"),
    }
    matched
}
