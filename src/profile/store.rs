//! Owner of the live `Profile` and its serialized blob

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::config::bridge::sync_profile_from_settings;
use crate::config::settings::{HotbarSettings, SettingsStore};
use crate::profile::model::Profile;

#[derive(Debug)]
pub struct ProfileStore {
    profile: Profile,
}

impl ProfileStore {
    /// Parse the stored blob, or build and persist a default profile when it
    /// is missing or unreadable
    pub fn load(settings: &mut SettingsStore) -> Self {
        let profile = match parse_profile(settings.profile_blob()) {
            Ok(Some(mut profile)) => {
                if sync_profile_from_settings(settings.values(), &mut profile) {
                    debug!("Stored profile adjusted to current settings");
                }
                info!(
                    rows = profile.rows,
                    slots_per_row = profile.slots_per_row,
                    hotbars = profile.hotbars.len(),
                    "Loaded hotbar profile"
                );
                profile
            }
            Ok(None) => {
                info!("No stored hotbar profile, creating default");
                default_profile(settings.values())
            }
            Err(e) => {
                warn!(error = ?e, "Stored hotbar profile unreadable, creating default");
                default_profile(settings.values())
            }
        };

        let store = Self { profile };
        store.save(settings);
        store
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Swap in a whole profile (used when the settings source changes)
    pub fn replace(&mut self, profile: Profile) {
        self.profile = profile;
    }

    /// Write the profile blob if its serialization changed; true if written
    pub fn save(&self, settings: &mut SettingsStore) -> bool {
        match serde_json::to_string(&self.profile) {
            Ok(blob) => {
                let written = settings.set_profile_blob(blob);
                if written {
                    debug!("Persisted hotbar profile");
                }
                written
            }
            Err(e) => {
                error!(error = ?e, "Failed to serialize hotbar profile");
                false
            }
        }
    }
}

/// Structurally valid profile with dimensions and options taken from
/// `settings`; slot bindings are assigned in index order
pub fn default_profile(settings: &HotbarSettings) -> Profile {
    let mut profile = Profile::default();
    sync_profile_from_settings(settings, &mut profile);
    profile
}

fn parse_profile(blob: &str) -> Result<Option<Profile>> {
    if blob.trim().is_empty() {
        return Ok(None);
    }
    let profile = serde_json::from_str(blob).context("Failed to parse hotbar profile JSON")?;
    Ok(Some(profile))
}
