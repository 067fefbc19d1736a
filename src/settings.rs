use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserSettings {
    reminder: ReminderSettings,
    default_goal_minutes: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            reminder: ReminderSettings::default(),
            default_goal_minutes: 25,
        }
    }
}

/// User preferences persisted as JSON next to the session store. A missing
/// or unparseable file falls back to defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn reminder(&self) -> ReminderSettings {
        self.read().reminder.clone()
    }

    pub fn default_goal_minutes(&self) -> u32 {
        self.read().default_goal_minutes
    }

    pub fn update_reminder(&self, settings: ReminderSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.reminder = settings;
        self.persist(&guard)
    }

    pub fn update_default_goal_minutes(&self, minutes: u32) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.default_goal_minutes = minutes;
        self.persist(&guard)
    }

    fn read(&self) -> UserSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))
    }
}
