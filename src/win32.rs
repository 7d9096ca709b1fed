//! Win32 implementation of the display collaborators
//!
//! Adapter inventory comes from DXGI, enumerated by high-performance
//! preference so the order does not depend on the current power
//! profile. Topology query/set go through the CCD API
//! (QueryDisplayConfig / SetDisplayConfig).

use tracing::{debug, warn};
use windows::Win32::Devices::Display::{
    GetDisplayConfigBufferSizes, QueryDisplayConfig, SetDisplayConfig,
    DISPLAYCONFIG_2DREGION, DISPLAYCONFIG_DESKTOP_IMAGE_INFO, DISPLAYCONFIG_MODE_INFO,
    DISPLAYCONFIG_MODE_INFO_TYPE_DESKTOP_IMAGE, DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE,
    DISPLAYCONFIG_MODE_INFO_TYPE_TARGET, DISPLAYCONFIG_PATH_INFO, DISPLAYCONFIG_PATH_SOURCE_INFO,
    DISPLAYCONFIG_PATH_TARGET_INFO, DISPLAYCONFIG_PIXELFORMAT, DISPLAYCONFIG_RATIONAL,
    DISPLAYCONFIG_ROTATION, DISPLAYCONFIG_SCALING, DISPLAYCONFIG_SCANLINE_ORDERING,
    DISPLAYCONFIG_SOURCE_MODE, DISPLAYCONFIG_TARGET_MODE, DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY,
    DISPLAYCONFIG_VIDEO_SIGNAL_INFO, QDC_ONLY_ACTIVE_PATHS, QDC_VIRTUAL_MODE_AWARE, SDC_APPLY,
    SDC_USE_SUPPLIED_DISPLAY_CONFIG, SDC_VALIDATE, SDC_VIRTUAL_MODE_AWARE,
    SDC_VIRTUAL_REFRESH_RATE_AWARE,
};
use windows::Win32::Foundation::{ERROR_SUCCESS, LUID, POINTL, RECTL};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory2, IDXGIAdapter1, IDXGIFactory6, DXGI_ADAPTER_DESC1,
    DXGI_CREATE_FACTORY_FLAGS, DXGI_GPU_PREFERENCE_HIGH_PERFORMANCE,
};

use crate::adapter::{AdapterDescriptor, AdapterLuid};
use crate::constants::query::MAX_ATTEMPTS;
use crate::display_api::{DisplayApi, SetMode};
use crate::display_config::{
    DesktopImageMode, DisplayConfigSnapshot, DisplayMode, DisplayPath, ModeInfo, PathSourceInfo,
    PathTargetInfo, PointL, Rational, RectL, SizeL, SourceMode, TargetMode,
};
use crate::error::ProfileError;

pub struct Win32Display;

impl Win32Display {
    pub fn new() -> Self {
        Self
    }
}

fn luid_to_u64(luid: LUID) -> AdapterLuid {
    AdapterLuid(((luid.HighPart as u32 as u64) << 32) | luid.LowPart as u64)
}

fn luid_from_u64(luid: AdapterLuid) -> LUID {
    LUID {
        LowPart: luid.0 as u32,
        HighPart: (luid.0 >> 32) as i32,
    }
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn point_from(p: POINTL) -> PointL {
    PointL { x: p.x, y: p.y }
}

fn point_to(p: PointL) -> POINTL {
    POINTL { x: p.x, y: p.y }
}

fn rect_from(r: RECTL) -> RectL {
    RectL {
        left: r.left,
        top: r.top,
        right: r.right,
        bottom: r.bottom,
    }
}

fn rect_to(r: RectL) -> RECTL {
    RECTL {
        left: r.left,
        top: r.top,
        right: r.right,
        bottom: r.bottom,
    }
}

fn rational_from(r: DISPLAYCONFIG_RATIONAL) -> Rational {
    Rational {
        numerator: r.Numerator,
        denominator: r.Denominator,
    }
}

fn rational_to(r: Rational) -> DISPLAYCONFIG_RATIONAL {
    DISPLAYCONFIG_RATIONAL {
        Numerator: r.numerator,
        Denominator: r.denominator,
    }
}

// With QDC_VIRTUAL_MODE_AWARE the mode-index unions hold two 16-bit
// fields; the first bitfield member occupies the low bits.
fn split_idx(bitfield: u32) -> (u32, u32) {
    (bitfield & 0xffff, bitfield >> 16)
}

fn join_idx(low: u32, high: u32) -> u32 {
    (low & 0xffff) | (high << 16)
}

fn path_from_raw(raw: &DISPLAYCONFIG_PATH_INFO) -> DisplayPath {
    let (clone_group_id, source_mode_info_idx) =
        split_idx(unsafe { raw.sourceInfo.Anonymous.Anonymous._bitfield });
    let (desktop_mode_info_idx, target_mode_info_idx) =
        split_idx(unsafe { raw.targetInfo.Anonymous.Anonymous._bitfield });
    DisplayPath {
        source_info: PathSourceInfo {
            adapter_id: luid_to_u64(raw.sourceInfo.adapterId),
            id: raw.sourceInfo.id,
            clone_group_id,
            source_mode_info_idx,
            status_flags: raw.sourceInfo.statusFlags,
        },
        target_info: PathTargetInfo {
            adapter_id: luid_to_u64(raw.targetInfo.adapterId),
            id: raw.targetInfo.id,
            desktop_mode_info_idx,
            target_mode_info_idx,
            output_technology: raw.targetInfo.outputTechnology.0 as u32,
            rotation: raw.targetInfo.rotation.0 as u32,
            scaling: raw.targetInfo.scaling.0 as u32,
            refresh_rate: rational_from(raw.targetInfo.refreshRate),
            scan_line_ordering: raw.targetInfo.scanLineOrdering.0 as u32,
            target_available: raw.targetInfo.targetAvailable.as_bool(),
            status_flags: raw.targetInfo.statusFlags,
        },
        flags: raw.flags,
    }
}

fn path_to_raw(path: &DisplayPath) -> DISPLAYCONFIG_PATH_INFO {
    let mut raw = DISPLAYCONFIG_PATH_INFO::default();
    raw.sourceInfo = DISPLAYCONFIG_PATH_SOURCE_INFO {
        adapterId: luid_from_u64(path.source_info.adapter_id),
        id: path.source_info.id,
        ..Default::default()
    };
    raw.sourceInfo.Anonymous.Anonymous._bitfield = join_idx(
        path.source_info.clone_group_id,
        path.source_info.source_mode_info_idx,
    );
    raw.sourceInfo.statusFlags = path.source_info.status_flags;

    raw.targetInfo = DISPLAYCONFIG_PATH_TARGET_INFO {
        adapterId: luid_from_u64(path.target_info.adapter_id),
        id: path.target_info.id,
        outputTechnology: DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY(
            path.target_info.output_technology as i32,
        ),
        rotation: DISPLAYCONFIG_ROTATION(path.target_info.rotation as i32),
        scaling: DISPLAYCONFIG_SCALING(path.target_info.scaling as i32),
        refreshRate: rational_to(path.target_info.refresh_rate),
        scanLineOrdering: DISPLAYCONFIG_SCANLINE_ORDERING(
            path.target_info.scan_line_ordering as i32,
        ),
        targetAvailable: path.target_info.target_available.into(),
        statusFlags: path.target_info.status_flags,
        ..Default::default()
    };
    raw.targetInfo.Anonymous.Anonymous._bitfield = join_idx(
        path.target_info.desktop_mode_info_idx,
        path.target_info.target_mode_info_idx,
    );

    raw.flags = path.flags;
    raw
}

fn mode_from_raw(raw: &DISPLAYCONFIG_MODE_INFO) -> Option<DisplayMode> {
    let info = match raw.infoType {
        DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE => {
            let source = unsafe { raw.Anonymous.sourceMode };
            ModeInfo::Source(SourceMode {
                width: source.width,
                height: source.height,
                pixel_format: source.pixelFormat.0 as u32,
                position: point_from(source.position),
            })
        }
        DISPLAYCONFIG_MODE_INFO_TYPE_TARGET => {
            let signal = unsafe { raw.Anonymous.targetMode }.targetVideoSignalInfo;
            ModeInfo::Target(TargetMode {
                pixel_rate: signal.pixelRate,
                h_sync_freq: rational_from(signal.hSyncFreq),
                v_sync_freq: rational_from(signal.vSyncFreq),
                active_size: SizeL {
                    cx: signal.activeSize.cx,
                    cy: signal.activeSize.cy,
                },
                total_size: SizeL {
                    cx: signal.totalSize.cx,
                    cy: signal.totalSize.cy,
                },
                video_standard: unsafe { signal.Anonymous.videoStandard },
                scan_line_ordering: signal.scanLineOrdering.0 as u32,
            })
        }
        DISPLAYCONFIG_MODE_INFO_TYPE_DESKTOP_IMAGE => {
            let image = unsafe { raw.Anonymous.desktopImageInfo };
            ModeInfo::DesktopImage(DesktopImageMode {
                path_source_size: point_from(image.PathSourceSize),
                desktop_image_region: rect_from(image.DesktopImageRegion),
                desktop_image_clip: rect_from(image.DesktopImageClip),
            })
        }
        other => {
            warn!(info_type = other.0, "skipping mode record of unknown type");
            return None;
        }
    };
    Some(DisplayMode {
        adapter_id: luid_to_u64(raw.adapterId),
        id: raw.id,
        info,
    })
}

fn mode_to_raw(mode: &DisplayMode) -> DISPLAYCONFIG_MODE_INFO {
    let mut raw = DISPLAYCONFIG_MODE_INFO {
        id: mode.id,
        adapterId: luid_from_u64(mode.adapter_id),
        ..Default::default()
    };
    match &mode.info {
        ModeInfo::Source(source) => {
            raw.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE;
            raw.Anonymous.sourceMode = DISPLAYCONFIG_SOURCE_MODE {
                width: source.width,
                height: source.height,
                pixelFormat: DISPLAYCONFIG_PIXELFORMAT(source.pixel_format as i32),
                position: point_to(source.position),
            };
        }
        ModeInfo::Target(target) => {
            raw.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_TARGET;
            let mut signal = DISPLAYCONFIG_VIDEO_SIGNAL_INFO {
                pixelRate: target.pixel_rate,
                hSyncFreq: rational_to(target.h_sync_freq),
                vSyncFreq: rational_to(target.v_sync_freq),
                activeSize: DISPLAYCONFIG_2DREGION {
                    cx: target.active_size.cx,
                    cy: target.active_size.cy,
                },
                totalSize: DISPLAYCONFIG_2DREGION {
                    cx: target.total_size.cx,
                    cy: target.total_size.cy,
                },
                scanLineOrdering: DISPLAYCONFIG_SCANLINE_ORDERING(
                    target.scan_line_ordering as i32,
                ),
                ..Default::default()
            };
            signal.Anonymous.videoStandard = target.video_standard;
            raw.Anonymous.targetMode = DISPLAYCONFIG_TARGET_MODE {
                targetVideoSignalInfo: signal,
            };
        }
        ModeInfo::DesktopImage(image) => {
            raw.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_DESKTOP_IMAGE;
            raw.Anonymous.desktopImageInfo = DISPLAYCONFIG_DESKTOP_IMAGE_INFO {
                PathSourceSize: point_to(image.path_source_size),
                DesktopImageRegion: rect_to(image.desktop_image_region),
                DesktopImageClip: rect_to(image.desktop_image_clip),
            };
        }
    }
    raw
}

impl DisplayApi for Win32Display {
    fn enumerate_adapters(&self) -> Result<Vec<AdapterDescriptor>, ProfileError> {
        let factory: IDXGIFactory6 = unsafe { CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0)) }
            .map_err(|e| ProfileError::AdapterEnumeration {
                message: e.message().to_string(),
            })?;

        let mut adapters = Vec::new();
        let mut index = 0u32;
        // Enumerate by high-performance preference so the order does not
        // depend on the current power profile.
        while let Ok(adapter) = unsafe {
            factory.EnumAdapterByGpuPreference::<IDXGIAdapter1>(
                index,
                DXGI_GPU_PREFERENCE_HIGH_PERFORMANCE,
            )
        } {
            let mut desc = DXGI_ADAPTER_DESC1::default();
            unsafe { adapter.GetDesc1(&mut desc) }.map_err(|e| {
                ProfileError::AdapterEnumeration {
                    message: e.message().to_string(),
                }
            })?;
            adapters.push(AdapterDescriptor {
                adapter_luid: luid_to_u64(desc.AdapterLuid),
                description: wide_to_string(&desc.Description),
                vendor_id: desc.VendorId,
                device_id: desc.DeviceId,
                dedicated_video_memory: desc.DedicatedVideoMemory as u64,
                flags: desc.Flags,
            });
            index += 1;
        }
        debug!(count = adapters.len(), "enumerated graphics adapters");
        Ok(adapters)
    }

    fn query_display_config(&self) -> Result<DisplayConfigSnapshot, ProfileError> {
        let flags = QDC_ONLY_ACTIVE_PATHS | QDC_VIRTUAL_MODE_AWARE;

        // The topology can change between the size query and the data
        // query; retry the pair a bounded number of times.
        for _ in 0..MAX_ATTEMPTS {
            let mut num_paths = 0u32;
            let mut num_modes = 0u32;
            let result =
                unsafe { GetDisplayConfigBufferSizes(flags, &mut num_paths, &mut num_modes) };
            if result != ERROR_SUCCESS {
                return Err(ProfileError::BufferSizes {
                    code: result.0 as i32,
                });
            }

            let mut paths = vec![DISPLAYCONFIG_PATH_INFO::default(); num_paths as usize];
            let mut modes = vec![DISPLAYCONFIG_MODE_INFO::default(); num_modes as usize];
            let result = unsafe {
                QueryDisplayConfig(
                    flags,
                    &mut num_paths,
                    paths.as_mut_ptr(),
                    &mut num_modes,
                    modes.as_mut_ptr(),
                    None,
                )
            };
            if result == ERROR_SUCCESS {
                paths.truncate(num_paths as usize);
                modes.truncate(num_modes as usize);
                return Ok(DisplayConfigSnapshot {
                    paths: paths.iter().map(path_from_raw).collect(),
                    modes: modes.iter().filter_map(mode_from_raw).collect(),
                });
            }
            debug!(code = result.0, "QueryDisplayConfig raced a topology change, retrying");
        }
        Err(ProfileError::Query {
            attempts: MAX_ATTEMPTS,
        })
    }

    fn set_display_config(
        &self,
        config: &DisplayConfigSnapshot,
        mode: SetMode,
    ) -> Result<(), ProfileError> {
        let paths: Vec<DISPLAYCONFIG_PATH_INFO> =
            config.paths.iter().map(path_to_raw).collect();
        let modes: Vec<DISPLAYCONFIG_MODE_INFO> =
            config.modes.iter().map(mode_to_raw).collect();

        let base = SDC_USE_SUPPLIED_DISPLAY_CONFIG
            | SDC_VIRTUAL_MODE_AWARE
            | SDC_VIRTUAL_REFRESH_RATE_AWARE;
        let flags = match mode {
            SetMode::Validate => base | SDC_VALIDATE,
            SetMode::Apply => base | SDC_APPLY,
        };

        let result = unsafe { SetDisplayConfig(Some(&paths), Some(&modes), flags) };
        if result != 0 {
            return Err(ProfileError::SetDisplayConfig { code: result });
        }
        Ok(())
    }
}
