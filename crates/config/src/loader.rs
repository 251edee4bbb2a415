use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::AfkConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["afk.toml", "afk.yaml", "afk.yml", "afk.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<AfkConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./afk.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/afk/afk.{toml,yaml,yml,json}` (user-global)
///
/// Returns `AfkConfig::default()` if no config file is found or it fails to
/// parse.
pub fn discover_and_load() -> AfkConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return AfkConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        AfkConfig::default()
    })
}

/// Returns the user-global config directory (`~/.config/afk/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "afk").map(|d| d.config_dir().to_path_buf())
}

pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<AfkConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afk.toml");
        std::fs::write(
            &path,
            "[responder]\nsend_greeting = false\n\n[endpoint]\nurl = \"http://127.0.0.1:9/api\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert!(!cfg.responder.send_greeting);
        assert_eq!(cfg.endpoint.url, "http://127.0.0.1:9/api");
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afk.yaml");
        std::fs::write(&path, "user:\n  id: \"7\"\n  global_name: Ada\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.user.id, "7");
        assert_eq!(cfg.user.global_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afk.json");
        std::fs::write(&path, r#"{"responder": {"auto_respond_all_dms": true}}"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert!(cfg.responder.auto_respond_all_dms);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afk.ini");
        std::fs::write(&path, "x=1").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/afk.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/afk.toml"));
    }
}
