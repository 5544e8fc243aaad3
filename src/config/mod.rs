use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "inpaint-canvas";
const APP_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub debounce_ms: u64,
    pub min_interval_ms: u64,
    pub post_transform_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 600,
            min_interval_ms: 2000,
            post_transform_ms: 1500,
        }
    }
}

/// Engine settings from `config.json`; every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Smallest committed width/height for drag-drawn shapes.
    pub min_shape_size: f64,
    pub hit_padding: f64,
    pub history_capacity: usize,
    pub autosave: AutosaveConfig,
    pub notice_ttl_ms: u64,
    pub crop_overlay_opacity: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_shape_size: 5.0,
            hit_padding: 4.0,
            history_capacity: 20,
            autosave: AutosaveConfig::default(),
            notice_ttl_ms: 4000,
            crop_overlay_opacity: 0.35,
            canvas_width: 1024,
            canvas_height: 1024,
        }
    }
}

pub fn load_editor_config() -> EditorConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_editor_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_editor_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> EditorConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return EditorConfig::default(),
    };
    if !path.exists() {
        return EditorConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            EditorConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            EditorConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "inpaint-canvas",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(
            path,
            PathBuf::from("/tmp/config-root/inpaint-canvas/config.json")
        );
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path(
            "inpaint-canvas",
            "config.json",
            None,
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(
            path,
            PathBuf::from("/tmp/home/.config/inpaint-canvas/config.json")
        );
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("inpaint-canvas", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let app_dir = dir.path().join(APP_DIR);
        std::fs::create_dir_all(&app_dir).expect("config dir should be created");
        std::fs::write(
            app_dir.join(APP_CONFIG_FILE),
            r#"{ "history_capacity": 5, "autosave": { "debounce_ms": 100 } }"#,
        )
        .expect("config should be written");

        let config = load_editor_config_with(Some(dir.path()), None);
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.autosave.debounce_ms, 100);
        assert_eq!(config.autosave.min_interval_ms, 2000);
        assert_eq!(config.min_shape_size, 5.0);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let app_dir = dir.path().join(APP_DIR);
        std::fs::create_dir_all(&app_dir).expect("config dir should be created");
        std::fs::write(app_dir.join(APP_CONFIG_FILE), "{ not json").expect("write config");

        assert_eq!(
            load_editor_config_with(Some(dir.path()), None),
            EditorConfig::default()
        );
    }
}
