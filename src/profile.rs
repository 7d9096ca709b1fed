//! Named, persisted display profiles
//!
//! A profile is a value: reconciliation produces a new `Profile`, never
//! an in-place mutation. The GUID is the durable identity; the name is
//! a mutable label.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::adapter::AdapterDescriptor;
use crate::display_api::{DisplayApi, SetMode};
use crate::display_config::{DisplayConfigSnapshot, DisplayMode, DisplayPath};
use crate::error::ProfileError;

/// A captured display topology plus the adapter inventory present at
/// capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Assigned once at creation; identifies "the same profile" on disk
    /// across renames.
    pub guid: Uuid,
    pub name: String,
    /// Empty means the profile predates inventory tracking, which
    /// changes which reconciliation strategy applies.
    pub adapters: Vec<AdapterDescriptor>,
    pub display_config: DisplayConfigSnapshot,
    /// Where this profile was loaded from, if it came from storage.
    pub path: Option<PathBuf>,
}

/// On-disk shape. `Adapters` is optional on read for profiles captured
/// before inventory tracking existed.
#[derive(Serialize, Deserialize)]
struct ProfileFile {
    #[serde(rename = "GUID")]
    guid: Uuid,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Adapters", default)]
    adapters: Vec<AdapterDescriptor>,
    #[serde(rename = "Paths")]
    paths: Vec<DisplayPath>,
    #[serde(rename = "Modes")]
    modes: Vec<DisplayMode>,
}

impl Profile {
    /// Capture the live OS state as a new profile with a fresh GUID.
    pub fn capture(name: impl Into<String>, api: &dyn DisplayApi) -> Result<Self, ProfileError> {
        let name = name.into();
        let adapters = api.enumerate_adapters()?;
        let display_config = api.query_display_config()?;
        info!(
            profile = %name,
            adapters = adapters.len(),
            paths = display_config.paths.len(),
            modes = display_config.modes.len(),
            "captured active display configuration"
        );
        Ok(Self {
            guid: Uuid::new_v4(),
            name,
            adapters,
            display_config,
            path: None,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| ProfileError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)
            .map_err(|source| ProfileError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let parsed: ProfileFile =
            serde_json::from_str(&buffer).map_err(|source| ProfileError::FileParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            guid: parsed.guid,
            name: parsed.name,
            adapters: parsed.adapters,
            display_config: DisplayConfigSnapshot {
                paths: parsed.paths,
                modes: parsed.modes,
            },
            path: Some(path.to_path_buf()),
        })
    }

    /// Write this profile to `path`, creating parent directories on
    /// demand. Does not change `self.path`.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ProfileError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let record = ProfileFile {
            guid: self.guid,
            name: self.name.clone(),
            adapters: self.adapters.clone(),
            paths: self.display_config.paths.clone(),
            modes: self.display_config.modes.clone(),
        };
        let json =
            serde_json::to_string_pretty(&record).map_err(|source| ProfileError::Encode {
                path: path.to_path_buf(),
                source,
            })?;

        let mut file = File::create(path).map_err(|source| ProfileError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        file.write_all(json.as_bytes())
            .map_err(|source| ProfileError::FileWrite {
                path: path.to_path_buf(),
                source,
            })?;
        info!(profile = %self.name, path = %path.display(), "saved profile");
        Ok(())
    }

    /// Ask the OS whether this profile's topology would apply, without
    /// changing anything. A rejected configuration is an expected
    /// outcome, not a fault.
    pub fn can_apply(&self, api: &dyn DisplayApi) -> bool {
        api.set_display_config(&self.display_config, SetMode::Validate)
            .is_ok()
    }

    /// Re-validate and then commit this profile's topology. The commit
    /// only runs after validation succeeds on the same snapshot; a
    /// commit failure is fatal and surfaced as-is.
    pub fn apply(&self, api: &dyn DisplayApi) -> Result<(), ProfileError> {
        api.set_display_config(&self.display_config, SetMode::Validate)
            .map_err(|cause| ProfileError::Validation(cause.to_string()))?;
        api.set_display_config(&self.display_config, SetMode::Apply)?;
        info!(profile = %self.name, "applied display configuration");
        Ok(())
    }
}
