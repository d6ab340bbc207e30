use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

use crate::transport::EndpointMap;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub endpoints: EndpointMap,
    pub state_dir: Option<String>,
    pub output_dir: Option<String>,
    pub connect_delay_ms: Option<u64>,
    pub timeout: Option<u64>,
    pub rate: Option<u32>,
    pub proxy: Option<String>,
    pub data_source: Option<String>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".lookout").join("config.yml"))
}

/// History and statistics live here unless `state_dir` says otherwise.
pub fn default_state_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".lookout").join("state"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn parse_config(contents: &str, path: &Path) -> Result<ConfigFile, String> {
    serde_yaml::from_str::<ConfigFile>(contents)
        .map_err(|e| format!("failed to parse config '{}': {e}", path.display()))
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# Lookout config
#
# Location (default):
#   ~/.lookout/config.yml

# Lookup endpoints, one per record type. The identifier is sent as a query
# parameter named after the record type unless `param` says otherwise.
# Record types: mobile, aadhaar, gst, tg, vehicle, ifsc
endpoints: {}
#   mobile:
#     url: https://lookup.example/api
#     param: number
#   vehicle:
#     url: https://lookup.example/vehicle

# State (history and statistics)
# state_dir: ~/.lookout/state

# Reports (optional)
# output_dir: ./reports

# Lookup behaviour
connect_delay_ms: 2000
# timeout: 30
# rate: 5

# HTTP (optional)
# proxy: http://127.0.0.1:8080

# Report labelling
data_source: "Secure OSINT Database"

# Output styling
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
