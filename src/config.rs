use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "beevent.yaml";

/// YAML-backed settings. A missing file means defaults; nothing is written until
/// the first update.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<AppSettings> {
        if !self.path.exists() {
            return Ok(AppSettings::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(AppSettings::default());
        }
        let settings: AppSettings = serde_yaml::from_str(&raw)?;
        validate(&settings)?;
        Ok(settings)
    }

    pub fn save(&self, settings: &AppSettings) -> AppResult<()> {
        validate(settings)?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(settings).map_err(|error| AppError::Internal(error.to_string()))?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Merges a partial JSON object into the current settings and persists the result.
    pub fn update(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.load()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings =
            serde_json::from_value(merged).map_err(|error| AppError::Validation(error.to_string()))?;
        self.save(&settings)?;
        tracing::info!(path = %self.path.to_string_lossy(), "settings updated");
        Ok(settings)
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

fn validate(settings: &AppSettings) -> AppResult<()> {
    if settings.spreadsheet_id.trim().is_empty() {
        return Err(AppError::Validation("spreadsheetId must not be empty".to_string()));
    }
    if settings
        .spreadsheet_id
        .chars()
        .any(|c| !(c.is_alphanumeric() || c == '-' || c == '_'))
    {
        return Err(AppError::Validation(format!(
            "spreadsheetId {} may only contain letters, digits, '-' and '_'",
            settings.spreadsheet_id
        )));
    }
    if settings.revenue_target < 0.0 || settings.gross_profit_target < 0.0 {
        return Err(AppError::Validation("targets must not be negative".to_string()));
    }
    if !(0.0..=1.0).contains(&settings.gross_margin_ratio) || !(0.0..=1.0).contains(&settings.operating_cost_ratio) {
        return Err(AppError::Validation("ratios must lie within 0..1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ConfigFile;
    use crate::models::{AppSettings, DataSource};
    use serde_json::json;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ConfigFile::new(dir.path().join("beevent.yaml"));
        let settings = config.load().expect("load");
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.cache_ttl_seconds, 60);
        assert_eq!(settings.revenue_target, 80_000_000_000.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("beevent.yaml");
        std::fs::write(&path, "spreadsheetId: demo\ndataSource: sample\n").expect("write");
        let settings = ConfigFile::new(&path).load().expect("load");
        assert_eq!(settings.spreadsheet_id, "demo");
        assert_eq!(settings.data_source, DataSource::Sample);
        assert_eq!(settings.csat_target, 4.2);
    }

    #[test]
    fn update_merges_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ConfigFile::new(dir.path().join("nested").join("beevent.yaml"));
        let updated = config
            .update(json!({ "revenueTarget": 90_000_000_000.0_f64, "cacheTtlSeconds": 5 }))
            .expect("update");
        assert_eq!(updated.cache_ttl_seconds, 5);
        let reloaded = config.load().expect("reload");
        assert_eq!(reloaded.revenue_target, 90_000_000_000.0);
        assert_eq!(reloaded.spreadsheet_id, "beevent-2026");
    }

    #[test]
    fn invalid_updates_are_rejected_and_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ConfigFile::new(dir.path().join("beevent.yaml"));
        let error = config
            .update(json!({ "spreadsheetId": "../escape" }))
            .expect_err("rejected");
        assert!(error.to_string().starts_with("VALIDATION_FAILED"));
        assert!(!config.path().exists());

        let error = config.update(json!({ "cacheTtlSeconds": "soon" })).expect_err("rejected");
        assert!(error.to_string().starts_with("VALIDATION_FAILED"));
    }
}
