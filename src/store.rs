//! Identity-keyed profile persistence
//!
//! Profiles live as JSON files in one directory. The GUID, not the
//! name, decides what "the same profile" means for re-saving; names
//! only seed the initial filename.

use std::fs;
use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use crate::constants::store::{APP_DIR, PROFILES_DIR, PROFILE_EXTENSION};
use crate::error::ProfileError;
use crate::profile::Profile;

pub struct ProfileStore {
    dir: PathBuf,
}

/// Parse a textual GUID, tolerating an optional surrounding pair of
/// braces (`{...}`).
pub fn parse_guid(text: &str) -> Option<Uuid> {
    let text = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(text);
    Uuid::parse_str(text).ok()
}

fn sanitize_name(name: &str) -> String {
    // Known-safe filename characters only
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect()
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The per-user store under the local data directory.
    pub fn at_default_location() -> Self {
        let mut dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push(APP_DIR);
        dir.push(PROFILES_DIR);
        Self::new(dir)
    }

    /// Every profile file in the store. A missing directory is an empty
    /// store, not an error.
    pub fn enumerate(&self) -> Result<Vec<Profile>, ProfileError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|source| ProfileError::FileRead {
            path: self.dir.clone(),
            source,
        })?;

        let mut profiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProfileError::FileRead {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            profiles.push(Profile::load(&path)?);
        }
        Ok(profiles)
    }

    /// Save a profile, resolving where it belongs:
    /// its own storage path if it has one, else the file of the stored
    /// profile with the same GUID, else a fresh filename synthesized
    /// from the name with a 4-hex-digit disambiguator on collision.
    ///
    /// Returns the path written.
    pub fn save(&self, profile: &Profile) -> Result<PathBuf, ProfileError> {
        if let Some(path) = &profile.path {
            profile.save_to(path)?;
            return Ok(path.clone());
        }

        for existing in self.enumerate()? {
            if existing.guid == profile.guid
                && let Some(path) = existing.path
            {
                debug!(profile = %profile.name, path = %path.display(), "re-saving over stored profile with same GUID");
                profile.save_to(&path)?;
                return Ok(path);
            }
        }

        let basename = sanitize_name(&profile.name);
        let path = self.dir.join(format!("{basename}.{PROFILE_EXTENSION}"));
        if !path.exists() {
            profile.save_to(&path)?;
            return Ok(path);
        }

        let mut suffix: u32 = 1;
        loop {
            let path = self
                .dir
                .join(format!("{basename}-{suffix:04x}.{PROFILE_EXTENSION}"));
            if !path.exists() {
                profile.save_to(&path)?;
                return Ok(path);
            }
            suffix += 1;
        }
    }

    /// Exact name match first, case-insensitive fallback second.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Profile>, ProfileError> {
        let mut profiles = self.enumerate()?;
        if let Some(i) = profiles.iter().position(|p| p.name == name) {
            return Ok(Some(profiles.swap_remove(i)));
        }
        Ok(profiles
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name)))
    }

    pub fn find_by_guid(&self, guid: Uuid) -> Result<Option<Profile>, ProfileError> {
        Ok(self.enumerate()?.into_iter().find(|p| p.guid == guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterLuid;
    use crate::display_config::test_support::snapshot;

    fn named_profile(name: &str) -> Profile {
        Profile {
            guid: Uuid::new_v4(),
            name: name.to_string(),
            adapters: Vec::new(),
            display_config: snapshot(AdapterLuid(1), AdapterLuid(1)),
            path: None,
        }
    }

    fn store_files(store_dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(store_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_enumerate_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("does-not-exist"));
        assert!(store.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_skips_non_profile_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&named_profile("Desk")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a profile").unwrap();
        fs::create_dir(dir.path().join("subdir.json")).unwrap();

        let profiles = store.enumerate().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "Desk");
    }

    #[test]
    fn test_saving_same_guid_twice_overwrites_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let profile = named_profile("Desk");

        let first = store.save(&profile).unwrap();
        let second = store.save(&profile).unwrap();
        assert_eq!(first, second);
        assert_eq!(store_files(dir.path()), vec!["Desk.json"]);
    }

    #[test]
    fn test_colliding_name_with_different_guid_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        store.save(&named_profile("Desk")).unwrap();
        store.save(&named_profile("Desk")).unwrap();
        store.save(&named_profile("Desk")).unwrap();

        assert_eq!(
            store_files(dir.path()),
            vec!["Desk-0001.json", "Desk-0002.json", "Desk.json"]
        );
    }

    #[test]
    fn test_save_prefers_profile_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("store"));
        let mut profile = named_profile("Elsewhere");
        let explicit = dir.path().join("explicit.json");
        profile.path = Some(explicit.clone());

        let written = store.save(&profile).unwrap();
        assert_eq!(written, explicit);
        assert!(explicit.exists());
        assert!(!dir.path().join("store").exists());
    }

    #[test]
    fn test_unsafe_characters_are_stripped_from_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&named_profile("Desk: 4k/120Hz?")).unwrap();
        assert_eq!(store_files(dir.path()), vec!["Desk 4k120Hz.json"]);
    }

    #[test]
    fn test_find_by_name_prefers_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&named_profile("desk")).unwrap();
        let exact = named_profile("Desk");
        store.save(&exact).unwrap();

        assert_eq!(store.find_by_name("Desk").unwrap().unwrap().guid, exact.guid);
        // Case-insensitive fallback still resolves unknown casings.
        assert!(store.find_by_name("DESK").unwrap().is_some());
        assert!(store.find_by_name("Office").unwrap().is_none());
    }

    #[test]
    fn test_find_by_guid() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let profile = named_profile("Desk");
        store.save(&profile).unwrap();

        assert!(store.find_by_guid(profile.guid).unwrap().is_some());
        assert!(store.find_by_guid(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_parse_guid_tolerates_braces() {
        let plain = parse_guid("5b2c4d66-9d81-4b8e-a687-586f3bdbb0a8").unwrap();
        let braced = parse_guid("{5b2c4d66-9d81-4b8e-a687-586f3bdbb0a8}").unwrap();
        assert_eq!(plain, braced);
        assert!(parse_guid("{unbalanced").is_none());
        assert!(parse_guid("not a guid").is_none());
    }
}
