//! Display topology snapshot data model
//!
//! A snapshot is the ordered set of source-to-target paths plus the mode
//! records they index into, each tagged with the identity of the adapter
//! that owns it. A snapshot is only applicable while every referenced
//! adapter identity is present in the OS; restoring that property after
//! an identity change is the reconciler's job.

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterLuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointL {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectL {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeL {
    pub cx: u32,
    pub cy: u32,
}

/// Frequency as an exact ratio, e.g. 60000/1001
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

/// The source half of a path: which adapter renders the desktop surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSourceInfo {
    pub adapter_id: AdapterLuid,
    pub id: u32,
    #[serde(default)]
    pub clone_group_id: u32,
    #[serde(default)]
    pub source_mode_info_idx: u32,
    #[serde(default)]
    pub status_flags: u32,
}

/// The target half of a path: which output the source is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathTargetInfo {
    pub adapter_id: AdapterLuid,
    pub id: u32,
    #[serde(default)]
    pub desktop_mode_info_idx: u32,
    #[serde(default)]
    pub target_mode_info_idx: u32,
    pub output_technology: u32,
    pub rotation: u32,
    pub scaling: u32,
    pub refresh_rate: Rational,
    pub scan_line_ordering: u32,
    pub target_available: bool,
    #[serde(default)]
    pub status_flags: u32,
}

/// One source-to-target connection in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPath {
    pub source_info: PathSourceInfo,
    pub target_info: PathTargetInfo,
    #[serde(default)]
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMode {
    pub width: u32,
    pub height: u32,
    pub pixel_format: u32,
    pub position: PointL,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMode {
    pub pixel_rate: u64,
    pub h_sync_freq: Rational,
    pub v_sync_freq: Rational,
    pub active_size: SizeL,
    pub total_size: SizeL,
    pub video_standard: u32,
    pub scan_line_ordering: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopImageMode {
    pub path_source_size: PointL,
    pub desktop_image_region: RectL,
    pub desktop_image_clip: RectL,
}

/// Payload of a mode record, discriminated by the record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "infoType", rename_all = "camelCase")]
pub enum ModeInfo {
    Source(SourceMode),
    Target(TargetMode),
    DesktopImage(DesktopImageMode),
}

/// A source, target, or desktop-image mode record owned by one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMode {
    pub adapter_id: AdapterLuid,
    pub id: u32,
    #[serde(flatten)]
    pub info: ModeInfo,
}

/// Ordered paths and modes captured from (or destined for) the OS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfigSnapshot {
    pub paths: Vec<DisplayPath>,
    pub modes: Vec<DisplayMode>,
}

impl DisplayConfigSnapshot {
    /// Returns a copy with every adapter reference rewritten through
    /// `remap`. Mode records are visited first, then each path's source
    /// and target info, in snapshot order.
    pub fn remap_adapters(&self, mut remap: impl FnMut(AdapterLuid) -> AdapterLuid) -> Self {
        let mut out = self.clone();
        for mode in &mut out.modes {
            mode.adapter_id = remap(mode.adapter_id);
        }
        for path in &mut out.paths {
            path.source_info.adapter_id = remap(path.source_info.adapter_id);
            path.target_info.adapter_id = remap(path.target_info.adapter_id);
        }
        out
    }

    /// Fallible variant of [`Self::remap_adapters`]: if any reference
    /// fails to remap the whole rewrite is discarded and `None` is
    /// returned, so a partially-remapped topology can never escape.
    pub fn try_remap_adapters(
        &self,
        mut remap: impl FnMut(AdapterLuid) -> Option<AdapterLuid>,
    ) -> Option<Self> {
        let mut failed = false;
        let out = self.remap_adapters(|luid| match remap(luid) {
            Some(new) => new,
            None => {
                failed = true;
                luid
            }
        });
        (!failed).then_some(out)
    }

    /// Every adapter identity referenced by any path or mode, in visit
    /// order, with repeats.
    pub fn adapter_refs(&self) -> Vec<AdapterLuid> {
        let mut refs = Vec::with_capacity(self.modes.len() + self.paths.len() * 2);
        for mode in &self.modes {
            refs.push(mode.adapter_id);
        }
        for path in &self.paths {
            refs.push(path.source_info.adapter_id);
            refs.push(path.target_info.adapter_id);
        }
        refs
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_remap_rewrites_modes_and_both_path_sides() {
        let old = AdapterLuid(10);
        let new = AdapterLuid(20);
        let remapped = snapshot(old, old).remap_adapters(|_| new);
        assert!(remapped.adapter_refs().iter().all(|&luid| luid == new));
    }

    #[test]
    fn test_try_remap_fails_whole_snapshot_on_single_miss() {
        let resolvable = AdapterLuid(1);
        let unresolvable = AdapterLuid(2);
        let snap = snapshot(resolvable, unresolvable);
        let result = snap.try_remap_adapters(|luid| (luid == resolvable).then_some(AdapterLuid(9)));
        assert!(result.is_none());
    }

    #[test]
    fn test_mode_payload_json_is_tagged() {
        let mode = source_mode(AdapterLuid(7));
        let json = serde_json::to_value(&mode).unwrap();
        assert_eq!(json["infoType"], "source");
        assert_eq!(json["adapterId"], 7);
        assert_eq!(json["width"], 2560);
        let back: DisplayMode = serde_json::from_value(json).unwrap();
        assert_eq!(back, mode);
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let snap = snapshot(AdapterLuid(3), AdapterLuid(4));
        let json = serde_json::to_string(&snap).unwrap();
        let back: DisplayConfigSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
