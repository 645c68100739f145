use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::pipeline::composition::{CompositionOptions, TextPosition, DEFAULT_GRADE_INTENSITY};
use crate::pipeline::image_backends::{
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_IMAGE_MODEL, DEFAULT_STABILITY_ENDPOINT,
};

pub const DEFAULT_OUTPUT_DIR: &str = "output/assets";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_POLL_BUDGET_SECS: u64 = 600;
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_ELEVENLABS_MODEL_ID: &str = "eleven_multilingual_v2";
pub const DEFAULT_COPY_MODEL: &str = "gpt-4o-mini";

/// One settings layer; `None` means "not set here, ask the next layer".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationSettingsOverlay {
    pub output_dir: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub poll_budget_secs: Option<u64>,
    pub image_endpoint: Option<String>,
    pub image_secondary_base_url: Option<String>,
    pub image_secondary_model: Option<String>,
    pub image_output_format: Option<String>,
    pub video_base_url: Option<String>,
    pub video_model: Option<String>,
    pub audio_base_url: Option<String>,
    pub audio_model_id: Option<String>,
    pub copy_base_url: Option<String>,
    pub copy_model: Option<String>,
    pub text_position: Option<TextPosition>,
    pub font_path: Option<String>,
    pub brand_grade: Option<bool>,
    pub grade_intensity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSettings {
    pub stability_endpoint: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub output_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoSettings {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSettings {
    pub base_url: String,
    pub model_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySettings {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    pub poll_budget: Duration,
    pub image: ImageSettings,
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub copy: CopySettings,
    pub composition: CompositionOptions,
    pub font_path: Option<PathBuf>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_budget: Duration::from_secs(DEFAULT_POLL_BUDGET_SECS),
            image: ImageSettings {
                stability_endpoint: String::from(DEFAULT_STABILITY_ENDPOINT),
                openai_base_url: String::from(DEFAULT_OPENAI_BASE_URL),
                openai_model: String::from(DEFAULT_OPENAI_IMAGE_MODEL),
                output_format: String::from("png"),
            },
            video: VideoSettings::default(),
            audio: AudioSettings {
                base_url: String::from(DEFAULT_ELEVENLABS_BASE_URL),
                model_id: String::from(DEFAULT_ELEVENLABS_MODEL_ID),
            },
            copy: CopySettings {
                base_url: String::from(DEFAULT_OPENAI_BASE_URL),
                model: String::from(DEFAULT_COPY_MODEL),
            },
            composition: CompositionOptions::default(),
            font_path: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsLayerError {
    #[error("failed to read generation settings '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse generation settings JSON '{path}': {message}")]
    ParseJson { path: String, message: String },
    #[error("failed to parse generation settings TOML '{path}': {message}")]
    ParseToml { path: String, message: String },
    #[error("generation settings root must be an object")]
    RootMustBeObject,
    #[error("generation settings field '{field}' has invalid type")]
    InvalidFieldType { field: String },
    #[error("generation settings field '{field}' is invalid: {message}")]
    InvalidValue { field: String, message: String },
}

/// Explicit path (relative to `app_root`) wins; otherwise
/// `config/generation.settings.toml`, then the `.json` sibling.
pub fn load_generation_settings_file(
    app_root: &Path,
    explicit_path: Option<&str>,
) -> Result<GenerationSettingsOverlay, SettingsLayerError> {
    if let Some(path) = explicit_path
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .map(|p| if p.is_absolute() { p } else { app_root.join(p) })
    {
        if !path.exists() {
            return Err(SettingsLayerError::ReadFile {
                path: path.display().to_string(),
                message: String::from("file not found"),
            });
        }
        return load_optional_overlay_by_extension(path.as_path());
    }

    let toml_path = app_root.join("config/generation.settings.toml");
    if toml_path.exists() {
        return load_optional_overlay_from_toml_path(toml_path.as_path());
    }
    load_optional_overlay_from_json_path(app_root.join("config/generation.settings.json").as_path())
}

pub fn merge_generation_settings_overlays(
    file: &GenerationSettingsOverlay,
    overrides: &GenerationSettingsOverlay,
) -> GenerationSettingsOverlay {
    let pick = |a: &Option<String>, b: &Option<String>| a.clone().or_else(|| b.clone());
    GenerationSettingsOverlay {
        output_dir: pick(&overrides.output_dir, &file.output_dir),
        poll_interval_secs: overrides.poll_interval_secs.or(file.poll_interval_secs),
        poll_budget_secs: overrides.poll_budget_secs.or(file.poll_budget_secs),
        image_endpoint: pick(&overrides.image_endpoint, &file.image_endpoint),
        image_secondary_base_url: pick(
            &overrides.image_secondary_base_url,
            &file.image_secondary_base_url,
        ),
        image_secondary_model: pick(&overrides.image_secondary_model, &file.image_secondary_model),
        image_output_format: pick(&overrides.image_output_format, &file.image_output_format),
        video_base_url: pick(&overrides.video_base_url, &file.video_base_url),
        video_model: pick(&overrides.video_model, &file.video_model),
        audio_base_url: pick(&overrides.audio_base_url, &file.audio_base_url),
        audio_model_id: pick(&overrides.audio_model_id, &file.audio_model_id),
        copy_base_url: pick(&overrides.copy_base_url, &file.copy_base_url),
        copy_model: pick(&overrides.copy_model, &file.copy_model),
        text_position: overrides.text_position.or(file.text_position),
        font_path: pick(&overrides.font_path, &file.font_path),
        brand_grade: overrides.brand_grade.or(file.brand_grade),
        grade_intensity: overrides.grade_intensity.or(file.grade_intensity),
    }
}

/// Applies defaults and cross-field checks.
pub fn resolve_generation_settings(
    overlay: &GenerationSettingsOverlay,
) -> Result<GenerationSettings, SettingsLayerError> {
    let defaults = GenerationSettings::default();
    let poll_interval_secs = overlay
        .poll_interval_secs
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    let poll_budget_secs = overlay.poll_budget_secs.unwrap_or(DEFAULT_POLL_BUDGET_SECS);
    if poll_interval_secs == 0 {
        return Err(invalid("poll_interval_secs", "must be greater than zero"));
    }
    if poll_budget_secs < poll_interval_secs {
        return Err(invalid(
            "poll_budget_secs",
            "must be at least poll_interval_secs",
        ));
    }
    let grade_intensity = overlay.grade_intensity.unwrap_or(DEFAULT_GRADE_INTENSITY);
    if !(grade_intensity > 0.0 && grade_intensity <= 0.6) {
        return Err(invalid(
            "composition.grade_intensity",
            "must be within (0, 0.6]",
        ));
    }
    let output_format = overlay
        .image_output_format
        .clone()
        .unwrap_or(defaults.image.output_format);

    Ok(GenerationSettings {
        output_dir: overlay
            .output_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir),
        poll_interval: Duration::from_secs(poll_interval_secs),
        poll_budget: Duration::from_secs(poll_budget_secs),
        image: ImageSettings {
            stability_endpoint: overlay
                .image_endpoint
                .clone()
                .unwrap_or(defaults.image.stability_endpoint),
            openai_base_url: overlay
                .image_secondary_base_url
                .clone()
                .unwrap_or(defaults.image.openai_base_url),
            openai_model: overlay
                .image_secondary_model
                .clone()
                .unwrap_or(defaults.image.openai_model),
            output_format,
        },
        video: VideoSettings {
            base_url: overlay.video_base_url.clone(),
            model: overlay.video_model.clone(),
        },
        audio: AudioSettings {
            base_url: overlay
                .audio_base_url
                .clone()
                .unwrap_or(defaults.audio.base_url),
            model_id: overlay
                .audio_model_id
                .clone()
                .unwrap_or(defaults.audio.model_id),
        },
        copy: CopySettings {
            base_url: overlay
                .copy_base_url
                .clone()
                .unwrap_or(defaults.copy.base_url),
            model: overlay.copy_model.clone().unwrap_or(defaults.copy.model),
        },
        composition: CompositionOptions {
            position: overlay
                .text_position
                .unwrap_or(defaults.composition.position),
            brand_grade: overlay
                .brand_grade
                .unwrap_or(defaults.composition.brand_grade),
            grade_intensity,
        },
        font_path: overlay.font_path.as_deref().map(PathBuf::from),
    })
}

pub fn parse_generation_settings_overlay_json(
    value: &Value,
) -> Result<GenerationSettingsOverlay, SettingsLayerError> {
    let root = value
        .as_object()
        .ok_or(SettingsLayerError::RootMustBeObject)?;
    let generation = root
        .get("generation")
        .unwrap_or(value)
        .as_object()
        .ok_or(SettingsLayerError::RootMustBeObject)?;

    let mut out = GenerationSettingsOverlay::default();
    if let Some(v) = generation.get("output_dir") {
        out.output_dir = Some(parse_string(v, "output_dir")?);
    }
    if let Some(v) = generation.get("poll_interval_secs") {
        out.poll_interval_secs = Some(parse_u64(v, "poll_interval_secs")?);
    }
    if let Some(v) = generation.get("poll_budget_secs") {
        out.poll_budget_secs = Some(parse_u64(v, "poll_budget_secs")?);
    }
    if let Some(image) = section(generation, "image")? {
        if let Some(v) = image.get("endpoint") {
            out.image_endpoint = Some(parse_string(v, "image.endpoint")?);
        }
        if let Some(v) = image.get("secondary_base_url") {
            out.image_secondary_base_url = Some(parse_string(v, "image.secondary_base_url")?);
        }
        if let Some(v) = image.get("secondary_model") {
            out.image_secondary_model = Some(parse_string(v, "image.secondary_model")?);
        }
        if let Some(v) = image.get("output_format") {
            out.image_output_format = Some(parse_output_format(v, "image.output_format")?);
        }
    }
    if let Some(video) = section(generation, "video")? {
        if let Some(v) = video.get("base_url") {
            out.video_base_url = Some(parse_string(v, "video.base_url")?);
        }
        if let Some(v) = video.get("model") {
            out.video_model = Some(parse_string(v, "video.model")?);
        }
    }
    if let Some(audio) = section(generation, "audio")? {
        if let Some(v) = audio.get("base_url") {
            out.audio_base_url = Some(parse_string(v, "audio.base_url")?);
        }
        if let Some(v) = audio.get("model_id") {
            out.audio_model_id = Some(parse_string(v, "audio.model_id")?);
        }
    }
    if let Some(copy) = section(generation, "copy")? {
        if let Some(v) = copy.get("base_url") {
            out.copy_base_url = Some(parse_string(v, "copy.base_url")?);
        }
        if let Some(v) = copy.get("model") {
            out.copy_model = Some(parse_string(v, "copy.model")?);
        }
    }
    if let Some(composition) = section(generation, "composition")? {
        if let Some(v) = composition.get("position") {
            let raw = parse_string(v, "composition.position")?;
            out.text_position = Some(TextPosition::parse(raw.as_str()).ok_or_else(|| {
                invalid("composition.position", "expected top, center or bottom")
            })?);
        }
        if let Some(v) = composition.get("font_path") {
            out.font_path = Some(parse_string(v, "composition.font_path")?);
        }
        if let Some(v) = composition.get("brand_grade") {
            out.brand_grade = Some(parse_bool(v, "composition.brand_grade")?);
        }
        if let Some(v) = composition.get("grade_intensity") {
            out.grade_intensity = Some(parse_f32(v, "composition.grade_intensity")?);
        }
    }
    Ok(out)
}

fn section<'a>(
    parent: &'a serde_json::Map<String, Value>,
    name: &str,
) -> Result<Option<&'a serde_json::Map<String, Value>>, SettingsLayerError> {
    match parent.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_object()
            .map(Some)
            .ok_or_else(|| SettingsLayerError::InvalidFieldType {
                field: name.to_string(),
            }),
    }
}

fn load_optional_overlay_by_extension(
    path: &Path,
) -> Result<GenerationSettingsOverlay, SettingsLayerError> {
    match path
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.to_ascii_lowercase())
    {
        Some(ext) if ext == "toml" => load_optional_overlay_from_toml_path(path),
        _ => load_optional_overlay_from_json_path(path),
    }
}

fn load_optional_overlay_from_json_path(
    path: &Path,
) -> Result<GenerationSettingsOverlay, SettingsLayerError> {
    if !path.exists() {
        return Ok(GenerationSettingsOverlay::default());
    }
    let raw = read_settings_file(path)?;
    let parsed = serde_json::from_str::<Value>(raw.as_str()).map_err(|error| {
        SettingsLayerError::ParseJson {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    })?;
    parse_generation_settings_overlay_json(&parsed)
}

fn load_optional_overlay_from_toml_path(
    path: &Path,
) -> Result<GenerationSettingsOverlay, SettingsLayerError> {
    if !path.exists() {
        return Ok(GenerationSettingsOverlay::default());
    }
    let raw = read_settings_file(path)?;
    let toml_error = |message: String| SettingsLayerError::ParseToml {
        path: path.display().to_string(),
        message,
    };
    let parsed = toml::from_str::<toml::Value>(raw.as_str()).map_err(|e| toml_error(e.to_string()))?;
    let json_value = serde_json::to_value(parsed).map_err(|e| toml_error(e.to_string()))?;
    parse_generation_settings_overlay_json(&json_value)
}

fn read_settings_file(path: &Path) -> Result<String, SettingsLayerError> {
    fs::read_to_string(path).map_err(|error| SettingsLayerError::ReadFile {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

fn invalid(field: &str, message: &str) -> SettingsLayerError {
    SettingsLayerError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn invalid_type(field: &str) -> SettingsLayerError {
    SettingsLayerError::InvalidFieldType {
        field: field.to_string(),
    }
}

fn parse_string(value: &Value, field: &str) -> Result<String, SettingsLayerError> {
    let parsed = value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| invalid_type(field))?;
    if parsed.is_empty() {
        return Err(invalid_type(field));
    }
    Ok(parsed.to_string())
}

fn parse_bool(value: &Value, field: &str) -> Result<bool, SettingsLayerError> {
    value.as_bool().ok_or_else(|| invalid_type(field))
}

fn parse_u64(value: &Value, field: &str) -> Result<u64, SettingsLayerError> {
    value.as_u64().ok_or_else(|| invalid_type(field))
}

fn parse_f32(value: &Value, field: &str) -> Result<f32, SettingsLayerError> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| invalid_type(field))
}

fn parse_output_format(value: &Value, field: &str) -> Result<String, SettingsLayerError> {
    let parsed = parse_string(value, field)?.to_ascii_lowercase();
    match parsed.as_str() {
        "png" | "webp" => Ok(parsed),
        "jpg" | "jpeg" => Ok(String::from("jpeg")),
        _ => Err(invalid(field, "expected png, jpeg or webp")),
    }
}
