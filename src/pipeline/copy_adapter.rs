//! Written copy: taken from the specification when supplied, drafted by a chat
//! model otherwise, plus optional A/B headline variations.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assets::{
    AssetSpecification, BrandContext, CopyFormat, CopyPiece, CopyVariation, GeneratedCopy,
};
use crate::error::GenerationError;
use crate::pipeline::http_support::{build_client, describe_failure, join_url, transport_error};
use crate::pipeline::settings_layer::DEFAULT_COPY_MODEL;

const SPECIFICATION_SOURCE: &str = "specification";
const MAX_VARIATIONS: usize = 3;
const VARIATION_LABELS: [&str; MAX_VARIATIONS] = ["B", "C", "D"];

#[derive(Debug, Clone, PartialEq)]
pub struct CopyRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

#[async_trait]
pub trait CopyBackend: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn complete(&self, request: &CopyRequest) -> Result<String, GenerationError>;
}

pub type SharedCopyBackend = Arc<dyn CopyBackend>;

#[derive(Clone, Default)]
pub struct CopyAdapter {
    backend: Option<SharedCopyBackend>,
}

#[derive(Debug, Deserialize)]
struct DraftCopy {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    subheadline: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    call_to_action: Option<String>,
}

impl CopyAdapter {
    pub fn new(backend: Option<SharedCopyBackend>) -> Self {
        Self { backend }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn generate(
        &self,
        specification: &AssetSpecification,
        brand: Option<&BrandContext>,
        variations: bool,
    ) -> Result<GeneratedCopy, GenerationError> {
        let (pieces, source) = if specification.copy.is_empty() {
            let backend = self.backend.as_ref().ok_or_else(|| {
                GenerationError::Configuration(String::from(
                    "specification has no copy and no copy backend is configured",
                ))
            })?;
            (draft_copy(backend.as_ref(), specification, brand).await?, backend.name().to_string())
        } else {
            (specification.copy.clone(), String::from(SPECIFICATION_SOURCE))
        };

        if let Some(brand) = brand {
            for piece in pieces.iter() {
                let banned = brand.banned_terms_in(piece.content.as_str());
                if !banned.is_empty() {
                    return Err(GenerationError::Validation(format!(
                        "{} uses banned brand vocabulary: {}",
                        piece.format.as_str(),
                        banned.join(", ")
                    )));
                }
            }
        }

        let variations = if variations {
            self.variations(pieces.as_slice(), brand).await
        } else {
            Vec::new()
        };
        info!(source = source.as_str(), pieces = pieces.len(), variations = variations.len(), "copy ready");
        Ok(GeneratedCopy {
            pieces,
            variations,
            backend: source,
        })
    }

    async fn variations(&self, pieces: &[CopyPiece], brand: Option<&BrandContext>) -> Vec<CopyVariation> {
        let Some(headline) = pieces
            .iter()
            .find(|p| p.format == CopyFormat::Headline)
            .map(|p| p.content.trim().to_string())
        else {
            return Vec::new();
        };
        let cta = pieces
            .iter()
            .find(|p| p.format == CopyFormat::CallToAction)
            .map(|p| p.content.trim());

        let mut headlines = match self.backend.as_ref() {
            Some(backend) => match backend.complete(&variation_request(headline.as_str(), brand)).await {
                Ok(raw) => parse_string_list(raw.as_str()),
                Err(error) => {
                    warn!(backend = backend.name(), %error, "variation drafting failed; using rewrites");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        if headlines.is_empty() {
            headlines = rewrite_headline(headline.as_str(), cta);
        }

        headlines
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty() && !h.eq_ignore_ascii_case(headline.as_str()))
            .filter(|h| brand.map(|b| b.banned_terms_in(h).is_empty()).unwrap_or(true))
            .take(MAX_VARIATIONS)
            .zip(VARIATION_LABELS)
            .map(|(h, label)| CopyVariation {
                label: label.to_string(),
                pieces: pieces
                    .iter()
                    .map(|p| {
                        if p.format == CopyFormat::Headline {
                            CopyPiece::new(CopyFormat::Headline, h.clone())
                        } else {
                            p.clone()
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}

async fn draft_copy(
    backend: &dyn CopyBackend,
    specification: &AssetSpecification,
    brand: Option<&BrandContext>,
) -> Result<Vec<CopyPiece>, GenerationError> {
    let raw = backend.complete(&draft_request(specification, brand)).await?;
    let draft: DraftCopy = serde_json::from_str(strip_code_fence(raw.as_str())).map_err(|e| {
        GenerationError::backend(backend.name(), format!("copy draft was not valid JSON: {e}"))
    })?;
    let pieces: Vec<CopyPiece> = [
        (CopyFormat::Headline, draft.headline),
        (CopyFormat::Subheadline, draft.subheadline),
        (CopyFormat::Body, draft.body),
        (CopyFormat::CallToAction, draft.call_to_action),
    ]
    .into_iter()
    .filter_map(|(format, content)| {
        content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .map(|c| CopyPiece::new(format, c))
    })
    .collect();
    if pieces.is_empty() {
        return Err(GenerationError::backend(backend.name(), "copy draft was empty"));
    }
    Ok(pieces)
}

fn brand_guidance(brand: Option<&BrandContext>) -> String {
    let Some(brand) = brand else {
        return String::new();
    };
    let mut lines = Vec::new();
    if let Some(name) = brand.name.as_deref() {
        lines.push(format!("Brand: {name}."));
    }
    if !brand.voice_tone.is_empty() {
        lines.push(format!("Voice: {}.", brand.voice_tone.join(", ")));
    }
    if let Some(vocabulary) = brand.vocabulary.as_ref() {
        if !vocabulary.preferred.is_empty() {
            lines.push(format!("Prefer words like: {}.", vocabulary.preferred.join(", ")));
        }
        if !vocabulary.banned.is_empty() {
            lines.push(format!("Never use: {}.", vocabulary.banned.join(", ")));
        }
    }
    lines.join("\n")
}

fn draft_request(specification: &AssetSpecification, brand: Option<&BrandContext>) -> CopyRequest {
    CopyRequest {
        system: format!(
            "You write concise marketing copy.\n{}",
            brand_guidance(brand)
        )
        .trim_end()
        .to_string(),
        prompt: format!(
            "Write copy for a {} on {} about: {}.\nAnswer with a JSON object with keys \
             headline, subheadline, body, call_to_action.",
            specification.kind.as_str(),
            specification.platform.as_str(),
            specification.visual.description.trim()
        ),
        temperature: 0.7,
    }
}

fn variation_request(headline: &str, brand: Option<&BrandContext>) -> CopyRequest {
    CopyRequest {
        system: format!("You write A/B test headlines.\n{}", brand_guidance(brand))
            .trim_end()
            .to_string(),
        prompt: format!(
            "Give {MAX_VARIATIONS} alternative headlines for: \"{headline}\".\n\
             Answer with a JSON array of strings."
        ),
        temperature: 0.9,
    }
}

/// Deterministic alternatives used when no model is available.
pub fn rewrite_headline(headline: &str, call_to_action: Option<&str>) -> Vec<String> {
    let base = headline.trim().trim_end_matches(['.', '!', '?']);
    if base.is_empty() {
        return Vec::new();
    }
    let mut out = vec![
        format!("Ready for {}?", lowercase_first(base)),
        format!("{base}: Limited Time Only"),
    ];
    if let Some(cta) = call_to_action.map(str::trim).filter(|v| !v.is_empty()) {
        out.push(format!("{}: {base}", cta.trim_end_matches(['.', '!'])));
    } else {
        out.push(format!("Don't Miss {base}"));
    }
    out
}

fn lowercase_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}

fn parse_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(strip_code_fence(raw)).unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiChatCopyBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChatCopyBackend {
    pub const NAME: &'static str = "openai-chat";

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(Self::NAME)?,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: String::from(DEFAULT_COPY_MODEL),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl CopyBackend for OpenAiChatCopyBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn complete(&self, request: &CopyRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: self.model.as_str(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system.as_str(),
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt.as_str(),
                },
            ],
            temperature: request.temperature,
        };
        let response = self
            .client
            .post(join_url(self.base_url.as_str(), "/v1/chat/completions"))
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;
        if !response.status().is_success() {
            return Err(GenerationError::backend(Self::NAME, describe_failure(response).await));
        }
        let payload: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::backend(Self::NAME, format!("JSON decode failed: {e}"))
        })?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::backend(Self::NAME, "completion had no content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, Platform, VocabularyConstraints};

    struct CannedBackend(&'static str);

    #[async_trait]
    impl CopyBackend for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &CopyRequest) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    fn spec_with_headline(headline: &str) -> AssetSpecification {
        let mut spec = AssetSpecification::new(AssetKind::SocialPost, Platform::Instagram);
        spec.copy.push(CopyPiece::new(CopyFormat::Headline, headline));
        spec.copy.push(CopyPiece::new(CopyFormat::CallToAction, "Shop now"));
        spec
    }

    fn brand_banning(terms: &[&str]) -> BrandContext {
        BrandContext {
            vocabulary: Some(VocabularyConstraints {
                preferred: Vec::new(),
                banned: terms.iter().map(|t| t.to_string()).collect(),
            }),
            ..BrandContext::default()
        }
    }

    #[tokio::test]
    async fn uses_specification_copy_verbatim() {
        let copy = CopyAdapter::default()
            .generate(&spec_with_headline("Summer Sale"), None, false)
            .await
            .expect("copy should succeed");

        assert_eq!(copy.backend, "specification");
        assert_eq!(copy.piece(CopyFormat::Headline), Some("Summer Sale"));
        assert!(copy.variations.is_empty());
    }

    #[tokio::test]
    async fn deterministic_variations_replace_only_the_headline() {
        let copy = CopyAdapter::default()
            .generate(&spec_with_headline("Summer Sale!"), None, true)
            .await
            .expect("copy should succeed");

        let headlines: Vec<&str> = copy
            .variations
            .iter()
            .map(|v| v.pieces[0].content.as_str())
            .collect();
        assert_eq!(
            headlines,
            vec![
                "Ready for summer Sale?",
                "Summer Sale: Limited Time Only",
                "Shop now: Summer Sale"
            ]
        );
        assert_eq!(copy.variations[0].label, "B");
        assert!(copy
            .variations
            .iter()
            .all(|v| v.pieces[1] == CopyPiece::new(CopyFormat::CallToAction, "Shop now")));
    }

    #[tokio::test]
    async fn banned_terms_fail_primary_copy_and_filter_variations() {
        let err = CopyAdapter::default()
            .generate(&spec_with_headline("Cheap summer deals"), Some(&brand_banning(&["cheap"])), false)
            .await
            .expect_err("banned headline should fail");
        assert!(matches!(err, GenerationError::Validation(_)));

        let copy = CopyAdapter::default()
            .generate(&spec_with_headline("Summer Sale"), Some(&brand_banning(&["limited time"])), true)
            .await
            .expect("copy should succeed");
        assert!(copy
            .variations
            .iter()
            .all(|v| !v.pieces[0].content.contains("Limited Time")));
        assert_eq!(copy.variations.len(), 2);
    }

    #[tokio::test]
    async fn drafts_copy_from_backend_json() {
        let adapter = CopyAdapter::new(Some(Arc::new(CannedBackend(
            "```json\n{\"headline\": \"Sun's Out\", \"body\": \"Deals all week\", \"call_to_action\": \"\"}\n```",
        ))));
        let mut spec = AssetSpecification::new(AssetKind::BlogPost, Platform::Generic);
        spec.visual.description = String::from("summer deals");

        let copy = adapter
            .generate(&spec, None, false)
            .await
            .expect("draft should parse");
        assert_eq!(copy.backend, "canned");
        assert_eq!(
            copy.pieces,
            vec![
                CopyPiece::new(CopyFormat::Headline, "Sun's Out"),
                CopyPiece::new(CopyFormat::Body, "Deals all week"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_copy_without_backend_is_a_configuration_failure() {
        let spec = AssetSpecification::new(AssetKind::BlogPost, Platform::Generic);
        let err = CopyAdapter::default()
            .generate(&spec, None, false)
            .await
            .expect_err("nothing to produce copy from");
        assert!(matches!(err, GenerationError::Configuration(_)));
    }

    #[test]
    fn backend_variation_lists_are_parsed_from_fenced_json() {
        assert_eq!(
            parse_string_list("```\n[\"a\", \"b\"]\n```"),
            vec![String::from("a"), String::from("b")]
        );
        assert!(parse_string_list("not json").is_empty());
    }
}
