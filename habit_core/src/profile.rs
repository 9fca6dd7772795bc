//! User profile persistence with file locking.
//!
//! A profile holds a user's habits, XP and achievement progress. It is
//! read under a shared lock and replaced atomically on save.

use crate::{Error, Result, UserProfile};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl UserProfile {
    /// Load a profile from a file with shared locking
    ///
    /// Returns a fresh profile for `user_id` if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns a fresh profile.
    pub fn load(path: &Path, user_id: &str) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No profile for {}, starting fresh", user_id);
            return Ok(Self::new(user_id));
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open profile {:?}: {}. Using defaults.", path, e);
                return Ok(Self::new(user_id));
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock profile {:?}: {}. Using defaults.", path, e);
            return Ok(Self::new(user_id));
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read profile {:?}: {}. Using defaults.", path, e);
            return Ok(Self::new(user_id));
        }

        file.unlock()?;

        match serde_json::from_str::<UserProfile>(&contents) {
            Ok(profile) if profile.user_id == user_id => {
                tracing::debug!("Loaded profile for {} from {:?}", user_id, path);
                Ok(profile.sanitized())
            }
            Ok(profile) => {
                tracing::warn!(
                    "Profile {:?} belongs to {}, not {}. Using defaults.",
                    path,
                    profile.user_id,
                    user_id
                );
                Ok(Self::new(user_id))
            }
            Err(e) => {
                tracing::warn!("Failed to parse profile {:?}: {}. Using defaults.", path, e);
                Ok(Self::new(user_id))
            }
        }
    }

    /// Save the profile with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "profile path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved profile for {} to {:?}", self.user_id, path);
        Ok(())
    }

    /// Load a profile, modify it, and save it back
    pub fn update<F>(path: &Path, user_id: &str, f: F) -> Result<Self>
    where
        F: FnOnce(&mut UserProfile) -> Result<()>,
    {
        let mut profile = Self::load(path, user_id)?;
        f(&mut profile)?;
        profile.save(path)?;
        Ok(profile)
    }

    /// Drop records that fail validation or belong to another user
    fn sanitized(mut self) -> Self {
        let user_id = self.user_id.clone();
        self.habits.retain(|h| match h.validate() {
            Ok(()) if h.user_id == user_id => true,
            Ok(()) => {
                tracing::warn!("Dropping habit {} owned by {}", h.id, h.user_id);
                false
            }
            Err(e) => {
                tracing::warn!("Dropping invalid habit: {}", e);
                false
            }
        });
        self.achievements
            .retain(|id, p| p.achievement_id == *id && p.user_id == user_id);
        if self.xp.level == 0 {
            self.xp.level = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Habit, UserAchievementProgress, XpLevel};
    use chrono::Utc;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("profiles").join("alice.json");

        let mut profile = UserProfile::new("alice");
        profile.habits.push(Habit::new("alice", "Read", Utc::now()));
        profile.xp = XpLevel { xp: 40, level: 3 };
        profile.achievements.insert(
            "streak_7".into(),
            UserAchievementProgress::new("alice", "streak_7"),
        );

        profile.save(&path).unwrap();
        let loaded = UserProfile::load(&path, "alice").unwrap();

        assert_eq!(loaded.habits.len(), 1);
        assert_eq!(loaded.habits[0].title, "Read");
        assert_eq!(loaded.xp, XpLevel { xp: 40, level: 3 });
        assert!(loaded.achievements.contains_key("streak_7"));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let profile = UserProfile::load(&temp_dir.path().join("none.json"), "alice").unwrap();
        assert_eq!(profile.user_id, "alice");
        assert!(profile.habits.is_empty());
        assert_eq!(profile.xp, XpLevel::default());
    }

    #[test]
    fn test_corrupted_profile_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alice.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let profile = UserProfile::load(&path, "alice").unwrap();
        assert!(profile.habits.is_empty());
    }

    #[test]
    fn test_profile_for_other_user_is_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alice.json");
        let mut bob = UserProfile::new("bob");
        bob.xp.xp = 90;
        bob.save(&path).unwrap();

        let profile = UserProfile::load(&path, "alice").unwrap();
        assert_eq!(profile.user_id, "alice");
        assert_eq!(profile.xp.xp, 0);
    }

    #[test]
    fn test_invalid_records_dropped_on_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alice.json");

        let mut profile = UserProfile::new("alice");
        let mut blank = Habit::new("alice", "Read", Utc::now());
        blank.title = "  ".into();
        profile.habits.push(blank);
        profile.habits.push(Habit::new("alice", "Run", Utc::now()));
        profile.achievements.insert(
            "streak_7".into(),
            UserAchievementProgress::new("alice", "streak_3"),
        );
        profile.xp.level = 0;
        profile.save(&path).unwrap();

        let loaded = UserProfile::load(&path, "alice").unwrap();
        assert_eq!(loaded.habits.len(), 1);
        assert_eq!(loaded.habits[0].title, "Run");
        assert!(loaded.achievements.is_empty());
        assert_eq!(loaded.xp.level, 1);
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alice.json");

        UserProfile::update(&path, "alice", |profile| {
            profile.xp.xp = 70;
            Ok(())
        })
        .unwrap();

        let loaded = UserProfile::load(&path, "alice").unwrap();
        assert_eq!(loaded.xp.xp, 70);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alice.json");

        UserProfile::new("alice").save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "alice.json")
            .collect();
        assert!(extras.is_empty(), "Found extras: {:?}", extras);
    }
}
