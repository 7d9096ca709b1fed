//! Profile reconciliation
//!
//! Rewrites every adapter reference in a profile's snapshot onto the
//! adapters present now. All-or-nothing: a single unresolvable
//! reference fails the whole reconciliation, so a self-inconsistent
//! topology can never be produced.

use std::collections::HashMap;

use tracing::debug;

use crate::adapter::{AdapterDescriptor, AdapterLuid};
use crate::matcher::match_adapter;
use crate::profile::Profile;

/// Produce a copy of `profile` remapped onto `current_inventory`, or
/// `None` if any adapter reference has no clean match. The input
/// profile is never modified.
///
/// Matches are memoized per source identity within this one call, so
/// repeated references resolve once and consistently.
pub fn reconcile(profile: &Profile, current_inventory: &[AdapterDescriptor]) -> Option<Profile> {
    let mut memo: HashMap<AdapterLuid, AdapterLuid> = HashMap::new();

    let display_config = profile.display_config.try_remap_adapters(|old| {
        if let Some(&new) = memo.get(&old) {
            return Some(new);
        }
        let new = match_adapter(old, &profile.adapters, current_inventory)?;
        memo.insert(old, new);
        Some(new)
    })?;

    debug!(
        profile = %profile.name,
        remapped = memo.len(),
        "reconciled profile against current adapters"
    );
    Some(Profile {
        adapters: current_inventory.to_vec(),
        display_config,
        ..profile.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_config::test_support::{path, snapshot, source_mode};
    use crate::display_config::DisplayConfigSnapshot;
    use uuid::Uuid;

    const MODEL_X: (u32, u32, u64) = (0x10de, 0x2204, 10 << 30);
    const MODEL_Y: (u32, u32, u64) = (0x1002, 0x744c, 24 << 30);

    fn descriptor(luid: u64, model: (u32, u32, u64)) -> AdapterDescriptor {
        AdapterDescriptor {
            adapter_luid: AdapterLuid(luid),
            description: String::new(),
            vendor_id: model.0,
            device_id: model.1,
            dedicated_video_memory: model.2,
            flags: 0,
        }
    }

    fn profile(adapters: Vec<AdapterDescriptor>, config: DisplayConfigSnapshot) -> Profile {
        Profile {
            guid: Uuid::new_v4(),
            name: "test".to_string(),
            adapters,
            display_config: config,
            path: None,
        }
    }

    #[test]
    fn test_reconcile_rewrites_every_reference_and_inventory() {
        let old = descriptor(1, MODEL_X);
        let current = vec![descriptor(2, MODEL_X)];
        let input = profile(vec![old], snapshot(AdapterLuid(1), AdapterLuid(1)));

        let reconciled = reconcile(&input, &current).unwrap();
        assert!(reconciled
            .display_config
            .adapter_refs()
            .iter()
            .all(|&luid| luid == AdapterLuid(2)));
        assert_eq!(reconciled.adapters, current);
        // Identity and label survive; only inventory and references move.
        assert_eq!(reconciled.guid, input.guid);
        assert_eq!(reconciled.name, input.name);
        assert_eq!(reconciled.path, input.path);
    }

    #[test]
    fn test_reconcile_is_all_or_nothing() {
        // Path adapter resolves, mode adapter does not: the whole
        // reconciliation fails and the input is untouched.
        let current = vec![descriptor(3, MODEL_X)];
        let input = profile(
            vec![descriptor(1, MODEL_X), descriptor(2, MODEL_Y)],
            snapshot(AdapterLuid(1), AdapterLuid(2)),
        );
        let before = input.clone();

        assert!(reconcile(&input, &current).is_none());
        assert_eq!(input, before);
    }

    #[test]
    fn test_repeated_references_resolve_consistently() {
        let current = vec![descriptor(5, MODEL_X), descriptor(6, MODEL_X)];
        let config = DisplayConfigSnapshot {
            paths: vec![path(AdapterLuid(1)), path(AdapterLuid(2)), path(AdapterLuid(1))],
            modes: vec![source_mode(AdapterLuid(1)), source_mode(AdapterLuid(2))],
        };
        let input = profile(
            vec![descriptor(1, MODEL_X), descriptor(2, MODEL_X)],
            config,
        );

        let reconciled = reconcile(&input, &current).unwrap();
        let refs = reconciled.display_config.adapter_refs();
        // Every old 1 became 5 and every old 2 became 6, in every slot.
        let expected: Vec<AdapterLuid> = input
            .display_config
            .adapter_refs()
            .iter()
            .map(|&luid| {
                if luid == AdapterLuid(1) {
                    AdapterLuid(5)
                } else {
                    AdapterLuid(6)
                }
            })
            .collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn test_reconcile_without_inventory_only_keeps_surviving_identities() {
        // No recorded inventory: references resolve only via the
        // identity fast path.
        let current = vec![descriptor(1, MODEL_X)];
        let survives = profile(Vec::new(), snapshot(AdapterLuid(1), AdapterLuid(1)));
        let reconciled = reconcile(&survives, &current).unwrap();
        assert_eq!(reconciled.adapters, current);

        let gone = profile(Vec::new(), snapshot(AdapterLuid(9), AdapterLuid(9)));
        assert!(reconcile(&gone, &current).is_none());
    }
}
