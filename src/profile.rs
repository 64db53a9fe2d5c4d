// src/profile.rs
//! The user's interest profile: positive terms and excluded terms, read
//! from the store. Loaded once per digest run — profile changes made while
//! a run is in flight are not guaranteed to apply to that run.

use anyhow::Result;

use crate::store::ItemStore;

#[derive(Debug, Clone, Default)]
pub struct InterestProfile {
    pub interests: Vec<String>,
    pub excluded: Vec<String>,
}

impl InterestProfile {
    pub fn load(store: &ItemStore) -> Result<Self> {
        Ok(Self {
            interests: store.load_interests()?,
            excluded: store.load_excluded()?,
        })
    }

    /// A run with no positive interests has nothing to classify against.
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty()
    }
}
