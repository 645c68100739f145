use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;

pub const STABILITY_API_KEY: &str = "STABILITY_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const VIDEO_API_KEY: &str = "VIDEO_API_KEY";
pub const ELEVENLABS_API_KEY: &str = "ELEVENLABS_API_KEY";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read dotenv file '{path}': {source}")]
    ReadDotenv {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// API keys per provider. A missing key leaves that backend unconfigured.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub stability: Option<String>,
    pub openai: Option<String>,
    pub video: Option<String>,
    pub elevenlabs: Option<String>,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        f.debug_struct("ProviderCredentials")
            .field("stability", &state(&self.stability))
            .field("openai", &state(&self.openai))
            .field("video", &state(&self.video))
            .field("elevenlabs", &state(&self.elevenlabs))
            .finish()
    }
}

impl ProviderCredentials {
    /// Process environment first, then `<app_root>/.env`.
    pub fn load(app_root: &Path) -> Result<Self, CredentialsError> {
        let dotenv = load_dotenv_map(app_root)?;
        Ok(Self::from_sources(|key| std::env::var(key).ok(), &dotenv))
    }

    pub fn from_sources<F>(env: F, dotenv: &HashMap<String, String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env(key)
                .or_else(|| dotenv.get(key).cloned())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            stability: lookup(STABILITY_API_KEY),
            openai: lookup(OPENAI_API_KEY),
            video: lookup(VIDEO_API_KEY),
            elevenlabs: lookup(ELEVENLABS_API_KEY),
        }
    }
}

pub fn load_dotenv_map(app_root: &Path) -> Result<HashMap<String, String>, CredentialsError> {
    let path = app_root.join(".env");
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let raw = fs::read_to_string(path.as_path()).map_err(|source| CredentialsError::ReadDotenv {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_dotenv_content(raw.as_str()))
}

pub fn parse_dotenv_content(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), dotenv_value(value.trim())))
        })
        .collect()
}

fn dotenv_value(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    match value.split_once(" #") {
        Some((before, _)) => before.trim_end().to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn parses_quotes_exports_and_comments() {
        let parsed = parse_dotenv_content(
            r#"
# comment
export OPENAI_API_KEY="sk-quoted"
STABILITY_API_KEY=sk-plain # trailing
ELEVENLABS_API_KEY='single'
=orphan
"#,
        );

        assert_eq!(parsed.get(OPENAI_API_KEY).map(String::as_str), Some("sk-quoted"));
        assert_eq!(parsed.get(STABILITY_API_KEY).map(String::as_str), Some("sk-plain"));
        assert_eq!(parsed.get(ELEVENLABS_API_KEY).map(String::as_str), Some("single"));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn environment_wins_over_dotenv_and_blank_values_are_unset() {
        let mut dotenv = HashMap::new();
        dotenv.insert(String::from(OPENAI_API_KEY), String::from("from-file"));
        dotenv.insert(String::from(VIDEO_API_KEY), String::from("video-file"));
        dotenv.insert(String::from(ELEVENLABS_API_KEY), String::from("   "));

        let creds = ProviderCredentials::from_sources(
            |key| (key == OPENAI_API_KEY).then(|| String::from("from-env")),
            &dotenv,
        );

        assert_eq!(creds.openai.as_deref(), Some("from-env"));
        assert_eq!(creds.video.as_deref(), Some("video-file"));
        assert_eq!(creds.elevenlabs, None);
        assert_eq!(creds.stability, None);
    }

    #[test]
    fn debug_output_redacts_keys() {
        let creds = ProviderCredentials {
            openai: Some(String::from("sk-secret")),
            ..ProviderCredentials::default()
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("openai: \"set\""));
    }

    #[test]
    fn reads_dotenv_from_app_root() {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("assetsmith_dotenv_{stamp}"));
        fs::create_dir_all(root.as_path()).expect("root dir");
        fs::write(root.join(".env"), "VIDEO_API_KEY=vk-1\n").expect("dotenv write");

        let map = load_dotenv_map(root.as_path()).expect("dotenv loads");
        assert_eq!(map.get(VIDEO_API_KEY).map(String::as_str), Some("vk-1"));

        let _ = fs::remove_dir_all(root);
    }
}
