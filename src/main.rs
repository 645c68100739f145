use std::path::{Path, PathBuf};

use assetsmith_core::assets::{AssetSpecification, BrandContext};
use assetsmith_core::pipeline::build_orchestrator;
use assetsmith_core::pipeline::composition::TextPosition;
use assetsmith_core::pipeline::credentials::ProviderCredentials;
use assetsmith_core::pipeline::settings_layer::{
    load_generation_settings_file, merge_generation_settings_overlays,
    resolve_generation_settings, GenerationSettings, GenerationSettingsOverlay,
};
use assetsmith_core::pipeline::BatchMode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let rest = cli_args.iter().skip(1).cloned().collect::<Vec<_>>();
    match cli_args.first().map(String::as_str) {
        Some("generate") => run_generate_cli(rest).await,
        Some("batch") => run_batch_cli(rest).await,
        Some("validate-spec") => run_validate_spec_cli(rest),
        Some("-h" | "--help") | None => {
            print_usage();
            Ok(())
        }
        Some(unknown) => Err(std::io::Error::other(format!(
            "Unknown command: {unknown}\n\nUse --help for usage."
        ))
        .into()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Default)]
struct GenerateCliArgs {
    spec_path: Option<PathBuf>,
    brand_path: Option<PathBuf>,
    app_root: Option<PathBuf>,
    settings_path: Option<String>,
    variations: bool,
    sequential: bool,
    overrides: GenerationSettingsOverlay,
}

/// `spec_flag` is `--spec` for single generation and `--specs` for batches.
fn parse_generate_cli_args(args: &[String], spec_flag: &str) -> CliResult<GenerateCliArgs> {
    let mut parsed = GenerateCliArgs::default();
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> CliResult<String> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            f if f == spec_flag => {
                parsed.spec_path = Some(PathBuf::from(needs_value(i)?));
                i += 2;
            }
            "--brand" => {
                parsed.brand_path = Some(PathBuf::from(needs_value(i)?));
                i += 2;
            }
            "--app-root" => {
                parsed.app_root = Some(PathBuf::from(needs_value(i)?));
                i += 2;
            }
            "--settings" => {
                parsed.settings_path = Some(needs_value(i)?);
                i += 2;
            }
            "--output" => {
                parsed.overrides.output_dir = Some(needs_value(i)?);
                i += 2;
            }
            "--font" => {
                parsed.overrides.font_path = Some(needs_value(i)?);
                i += 2;
            }
            "--text-position" => {
                let raw = needs_value(i)?;
                let position = TextPosition::parse(raw.as_str()).ok_or_else(|| {
                    std::io::Error::other(format!("Invalid --text-position: {raw}"))
                })?;
                parsed.overrides.text_position = Some(position);
                i += 2;
            }
            "--no-grade" => {
                parsed.overrides.brand_grade = Some(false);
                i += 1;
            }
            "--variations" => {
                parsed.variations = true;
                i += 1;
            }
            "--sequential" if spec_flag == "--specs" => {
                parsed.sequential = true;
                i += 1;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    if parsed.spec_path.is_none() {
        return Err(std::io::Error::other(format!("Missing required {spec_flag}")).into());
    }
    Ok(parsed)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| std::io::Error::other(format!("read '{}': {e}", path.display())))?;
    let value = serde_json::from_str(raw.as_str())
        .map_err(|e| std::io::Error::other(format!("parse '{}': {e}", path.display())))?;
    Ok(value)
}

fn resolve_cli_settings(args: &GenerateCliArgs) -> CliResult<(PathBuf, GenerationSettings)> {
    let app_root = match args.app_root.clone() {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let file = load_generation_settings_file(app_root.as_path(), args.settings_path.as_deref())?;
    let merged = merge_generation_settings_overlays(&file, &args.overrides);
    let settings = resolve_generation_settings(&merged)?;
    Ok((app_root, settings))
}

fn required_spec_path(args: &GenerateCliArgs) -> CliResult<&Path> {
    args.spec_path
        .as_deref()
        .ok_or_else(|| std::io::Error::other("Missing specification path").into())
}

async fn run_generate_cli(args: Vec<String>) -> CliResult<()> {
    if args.iter().any(|arg| matches!(arg.as_str(), "-h" | "--help")) {
        print_usage();
        return Ok(());
    }
    let parsed = parse_generate_cli_args(args.as_slice(), "--spec")?;
    let specification: AssetSpecification = read_json(required_spec_path(&parsed)?)?;
    let brand = parsed
        .brand_path
        .as_deref()
        .map(read_json::<BrandContext>)
        .transpose()?;

    let (app_root, settings) = resolve_cli_settings(&parsed)?;
    let credentials = ProviderCredentials::load(app_root.as_path())?;
    let orchestrator = build_orchestrator(&settings, &credentials)?;

    let asset = orchestrator
        .generate(&specification, brand.as_ref(), parsed.variations)
        .await?;
    println!("{}", serde_json::to_string_pretty(&asset)?);
    Ok(())
}

async fn run_batch_cli(args: Vec<String>) -> CliResult<()> {
    if args.iter().any(|arg| matches!(arg.as_str(), "-h" | "--help")) {
        print_usage();
        return Ok(());
    }
    let parsed = parse_generate_cli_args(args.as_slice(), "--specs")?;
    let specifications: Vec<AssetSpecification> = read_json(required_spec_path(&parsed)?)?;
    let brand = parsed
        .brand_path
        .as_deref()
        .map(read_json::<BrandContext>)
        .transpose()?;

    let (app_root, settings) = resolve_cli_settings(&parsed)?;
    let credentials = ProviderCredentials::load(app_root.as_path())?;
    let orchestrator = build_orchestrator(&settings, &credentials)?;
    let mode = if parsed.sequential {
        BatchMode::Sequential
    } else {
        BatchMode::Concurrent
    };

    let results = orchestrator
        .generate_batch(specifications.as_slice(), brand.as_ref(), parsed.variations, mode)
        .await;
    let entries = results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(asset) => json!({ "index": index, "ok": true, "asset": asset }),
            Err(error) => json!({
                "index": index,
                "ok": false,
                "error_kind": error.kind(),
                "error": error.to_string()
            }),
        })
        .collect::<Vec<_>>();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "mode": mode.as_str(), "results": entries }))?
    );
    Ok(())
}

fn run_validate_spec_cli(args: Vec<String>) -> CliResult<()> {
    if args.iter().any(|arg| matches!(arg.as_str(), "-h" | "--help")) {
        print_usage();
        return Ok(());
    }
    let spec_path = match args.as_slice() {
        [flag, path] if flag == "--spec" => PathBuf::from(path),
        _ => return Err(std::io::Error::other("Usage: validate-spec --spec <path>").into()),
    };
    let specification: AssetSpecification = read_json(spec_path.as_path())?;
    let caps = specification.kind.capabilities();
    match specification.validate() {
        Ok(()) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "ok": true,
                    "kind": specification.kind,
                    "platform": specification.platform,
                    "capabilities": caps
                }))?
            );
            Ok(())
        }
        Err(error) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "ok": false, "error": error.to_string() }))?
            );
            Err(error.into())
        }
    }
}

fn print_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  assetsmith generate --spec <spec.json> [--brand <brand.json>] [--output DIR] ",
        "[--settings PATH] [--app-root DIR] [--font PATH] [--text-position top|center|bottom] ",
        "[--no-grade] [--variations]\n",
        "  assetsmith batch --specs <specs.json> [--sequential] [same options as generate]\n",
        "  assetsmith validate-spec --spec <spec.json>\n\n",
        "Settings default: <app-root>/config/generation.settings.toml ",
        "(fallback: config/generation.settings.json)\n",
        "API keys: STABILITY_API_KEY, OPENAI_API_KEY, VIDEO_API_KEY, ELEVENLABS_API_KEY ",
        "(environment, then <app-root>/.env)\n"
    ));
}
