//! Applying a profile to a machine whose adapters may have changed
//!
//! The decision tree, cheapest strategy first: apply as stored, then
//! the single-adapter fallback for profiles with no recorded
//! inventory, then full reconciliation. Every strategy is
//! validate-gated; failure to find any applicable form is a normal
//! outcome reported as [`ApplyOutcome::ConfigurationChanged`].

use tracing::{debug, info};

use crate::adapter::AdapterDescriptor;
use crate::display_api::DisplayApi;
use crate::error::ProfileError;
use crate::profile::Profile;
use crate::reconcile::reconcile;
use crate::store::ProfileStore;

/// How an apply request was satisfied, or that it could not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The profile applied as stored.
    Applied,
    /// A legacy profile with no inventory was retargeted onto the only
    /// real adapter present.
    SoleAdapterFallback,
    /// Reconciliation produced an applicable remapped profile.
    Reconciled,
    /// No strategy produced a configuration the OS would accept.
    ConfigurationChanged,
}

/// Retarget a no-inventory profile onto the machine's only real GPU.
///
/// Applicable only when the profile recorded no adapter inventory and
/// exactly one non-software, non-remote adapter is present; otherwise
/// declines without touching anything. On success, returns the applied
/// profile with its inventory set to `current_inventory`.
fn try_sole_adapter_fallback(
    profile: &Profile,
    current_inventory: &[AdapterDescriptor],
    api: &dyn DisplayApi,
) -> Result<Option<Profile>, ProfileError> {
    if !profile.adapters.is_empty() {
        return Ok(None);
    }
    let mut real = current_inventory.iter().filter(|a| a.is_hardware());
    let (Some(sole), None) = (real.next(), real.next()) else {
        debug!(profile = %profile.name, "sole-adapter fallback declined: not exactly one real adapter");
        return Ok(None);
    };

    // Only one candidate, so every reference rewrites unconditionally.
    let candidate = Profile {
        adapters: current_inventory.to_vec(),
        display_config: profile
            .display_config
            .remap_adapters(|_| sole.adapter_luid),
        ..profile.clone()
    };

    if !candidate.can_apply(api) {
        debug!(profile = %profile.name, adapter = %sole.adapter_luid, "sole-adapter candidate failed validation");
        return Ok(None);
    }
    candidate.apply(api)?;
    info!(profile = %profile.name, adapter = %sole.adapter_luid, "applied profile via sole-adapter fallback");
    Ok(Some(candidate))
}

/// Run the full apply decision tree for one profile.
///
/// With `update` set, a profile corrected by the fallback or by
/// reconciliation is persisted back through `store` after it applies,
/// so future applies take the fast path.
pub fn apply_profile(
    profile: &Profile,
    api: &dyn DisplayApi,
    store: &ProfileStore,
    update: bool,
) -> Result<ApplyOutcome, ProfileError> {
    if profile.can_apply(api) {
        profile.apply(api)?;
        return Ok(ApplyOutcome::Applied);
    }

    let current_inventory = api.enumerate_adapters()?;
    debug!(
        profile = %profile.name,
        adapters = current_inventory.len(),
        references = profile.display_config.adapter_refs().len(),
        "profile not applicable as stored, trying adapter remapping"
    );

    if let Some(applied) = try_sole_adapter_fallback(profile, &current_inventory, api)? {
        if update {
            store.save(&applied)?;
        }
        return Ok(ApplyOutcome::SoleAdapterFallback);
    }

    if let Some(candidate) = reconcile(profile, &current_inventory)
        && candidate.can_apply(api)
    {
        candidate.apply(api)?;
        if update {
            store.save(&candidate)?;
        }
        return Ok(ApplyOutcome::Reconciled);
    }

    Ok(ApplyOutcome::ConfigurationChanged)
}
