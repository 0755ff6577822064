//! Content moderation gate
//!
//! Classifies post and comment text (and post images) with a generative model
//! before anything is persisted. The model is asked for a strict JSON verdict;
//! replies are read in three tiers:
//!
//! 1. the whole reply as JSON,
//! 2. the outermost `{...}` block in the reply,
//! 3. keyword matching when no JSON can be recovered.
//!
//! Any failure to reach the model (missing key, transport error, bad image)
//! allows the content through and logs a warning.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::community::{MODERATION_DECISIONS_TOTAL, MODERATION_DURATION_SECONDS};
use crate::models::moderation::DEFAULT_REJECTION_REASON;
use crate::models::ModerationResult;
use crate::services::llm::{CompletionRequest, InlineImage, LlmError, LlmProvider};

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid JSON block regex"));

/// Words that mark submitted text as inappropriate when the model reply
/// cannot be parsed.
const FLAG_WORDS: &[&str] = &[
    "fuck", "shit", "bitch", "porn", "nude", "naked", "nazi", "whore", "إباحي", "إباحية",
    "جنسي", "شرموط", "عاهرة", "لعنة",
];

/// Whitespace-insensitive marker of a JSON-ish rejection in a free-text reply.
const JSON_REJECTION_MARKER: &str = "\"isappropriate\":false";

/// Phrases in a free-text model reply that signal a rejection, unless a
/// negation precedes them ("no inappropriate content").
const REJECTION_PHRASES: &[&str] = &["not appropriate", "غير لائق", "غير مناسب"];

const NEGATIONS: &[&str] = &[
    "no", "not", "without", "free", "nothing", "never", "isn't", "doesn't", "لا", "ليس",
    "ليست", "بدون", "خال", "خالي", "خالية", "يخلو",
];

/// Words before a phrase that are searched for a negation.
const NEGATION_WINDOW: usize = 5;

const TEXT_SYSTEM_PROMPT: &str = "أنت مشرف على المحتوى لموقع وصفات طعام. مهمتك هي تحديد ما إذا كان النص يحتوي على محتوى غير لائق أو مسيء.

قواعد التحقق:
1. يجب أن يكون المحتوى مناسبًا لجميع الأعمار
2. يجب حظر أي محتوى إباحي أو جنسي
3. يجب حظر الإساءات والشتائم
4. يجب حظر خطاب الكراهية والتمييز
5. يجب حظر العنف الشديد

قم بتقييم النص المقدم وأعد النتيجة بتنسيق JSON فقط يحتوي على:
- isAppropriate: منطقي (true أو false)
- reason: سبب الرفض إذا كان المحتوى غير مناسب (سلسلة نصية)
- confidence: مستوى الثقة (رقم من 0 إلى 1)
- moderatedContent: نسخة معدلة من النص إذا كان يحتوي على كلمات غير لائقة (سلسلة نصية، اختياري)";

const IMAGE_PROMPT: &str = "تحليل الصورة والتحقق من محتواها:
1. هل تحتوي الصورة على محتوى غير لائق أو مسيء؟
2. هل تحتوي الصورة على محتوى إباحي أو جنسي؟
3. هل تحتوي الصورة على عنف أو دماء أو أذى؟
4. هل هذه الصورة مناسبة لتطبيق وصفات طعام عائلي؟

أعد النتيجة بتنسيق JSON التالي فقط:
{
  \"isAppropriate\": boolean,
  \"reason\": string (سبب الرفض إذا كان المحتوى غير مناسب، أو فارغ إذا كان مناسبًا),
  \"confidence\": number (من 0 إلى 1)
}";

const TITLE_LABEL: &str = "العنوان: ";
const CONTENT_LABEL: &str = "\nالمحتوى: ";

#[derive(Debug, Error)]
enum ImageError {
    #[error("malformed data URI")]
    MalformedDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported image URL scheme")]
    UnsupportedScheme,
    #[error("image fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("image fetch returned HTTP {0}")]
    Status(u16),
    #[error("content type '{0}' is not an image")]
    NotAnImage(String),
    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone, Copy)]
enum ContentKind {
    Text,
    Image,
}

impl ContentKind {
    fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
        }
    }
}

pub struct ContentModerator {
    text_model: Arc<dyn LlmProvider>,
    vision_model: Arc<dyn LlmProvider>,
    http: HttpClient,
    max_image_bytes: usize,
}

impl ContentModerator {
    pub fn new(
        text_model: Arc<dyn LlmProvider>,
        vision_model: Arc<dyn LlmProvider>,
        http: HttpClient,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            text_model,
            vision_model,
            http,
            max_image_bytes,
        }
    }

    /// Classify free text. Blank input is always appropriate.
    pub async fn moderate_text(&self, text: &str) -> ModerationResult {
        if text.trim().is_empty() {
            return ModerationResult::appropriate();
        }

        let started = Instant::now();
        let request = CompletionRequest::new(text)
            .with_system(TEXT_SYSTEM_PROMPT)
            .with_temperature(0.1)
            .with_max_tokens(1024)
            .json();

        let outcome = self.text_model.complete(request).await;
        observe_duration(ContentKind::Text, started);

        match outcome {
            Ok(reply) => record(ContentKind::Text, interpret_reply(&reply, Some(text))),
            Err(err) => fail_open(ContentKind::Text, self.text_model.name(), &err),
        }
    }

    /// Classify an image given as an http(s) URL or a `data:` URI.
    pub async fn moderate_image(&self, image_url: &str) -> ModerationResult {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return ModerationResult::appropriate();
        }

        let started = Instant::now();
        let image = match self.load_image(image_url).await {
            Ok(image) => image,
            Err(err) => {
                observe_duration(ContentKind::Image, started);
                warn!(error = %err, "Could not load image for moderation, allowing it");
                MODERATION_DECISIONS_TOTAL
                    .with_label_values(&[ContentKind::Image.as_str(), "fail_open"])
                    .inc();
                return ModerationResult::appropriate();
            }
        };

        let request = CompletionRequest::new(IMAGE_PROMPT)
            .with_image(image)
            .with_temperature(0.1)
            .with_max_tokens(512);

        let outcome = self.vision_model.complete(request).await;
        observe_duration(ContentKind::Image, started);

        match outcome {
            Ok(reply) => record(ContentKind::Image, interpret_reply(&reply, None)),
            Err(err) => fail_open(ContentKind::Image, self.vision_model.name(), &err),
        }
    }

    /// Check a post: title and body together first, then the image.
    ///
    /// A rejected text verdict short-circuits the image check. On acceptance
    /// `moderated_content` holds a cleaned body when the model returned one.
    pub async fn moderate_post(
        &self,
        title: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> ModerationResult {
        let combined = format!("{}{}{}{}", TITLE_LABEL, title, CONTENT_LABEL, content);
        let text_result = self.moderate_text(&combined).await;
        if !text_result.is_appropriate {
            return text_result;
        }

        if let Some(url) = image_url.filter(|u| !u.trim().is_empty()) {
            let image_result = self.moderate_image(url).await;
            if !image_result.is_appropriate {
                return image_result;
            }
        }

        ModerationResult {
            moderated_content: text_result
                .moderated_content
                .as_deref()
                .and_then(extract_post_body)
                .filter(|body| body != content),
            ..text_result
        }
    }

    /// Comments go through the same text classifier.
    pub async fn moderate_comment(&self, text: &str) -> ModerationResult {
        self.moderate_text(text).await
    }

    async fn load_image(&self, url: &str) -> Result<InlineImage, ImageError> {
        if let Some(rest) = url.strip_prefix("data:") {
            return self.decode_data_uri(rest);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ImageError::UnsupportedScheme);
        }

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImageError::Status(response.status().as_u16()));
        }
        if let Some(length) = response.content_length() {
            if length as usize > self.max_image_bytes {
                return Err(ImageError::TooLarge {
                    limit: self.max_image_bytes,
                });
            }
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .unwrap_or_else(|| "image/jpeg".to_string());
        if !mime_type.starts_with("image/") {
            return Err(ImageError::NotAnImage(mime_type));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > self.max_image_bytes {
            return Err(ImageError::TooLarge {
                limit: self.max_image_bytes,
            });
        }

        debug!(mime_type = %mime_type, size = bytes.len(), "Fetched image for moderation");
        Ok(InlineImage {
            mime_type,
            data: BASE64.encode(&bytes),
        })
    }

    fn decode_data_uri(&self, rest: &str) -> Result<InlineImage, ImageError> {
        let (meta, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUri)?;
        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or(ImageError::MalformedDataUri)?
            .trim()
            .to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(ImageError::NotAnImage(mime_type));
        }

        let payload = payload.trim();
        let decoded = BASE64.decode(payload)?;
        if decoded.len() > self.max_image_bytes {
            return Err(ImageError::TooLarge {
                limit: self.max_image_bytes,
            });
        }

        Ok(InlineImage {
            mime_type,
            data: payload.to_string(),
        })
    }
}

/// Turn a raw model reply into a verdict.
///
/// `submitted` is the text that was classified; it is only consulted when the
/// reply contains no parseable JSON.
pub fn interpret_reply(reply: &str, submitted: Option<&str>) -> ModerationResult {
    if let Ok(value) = serde_json::from_str::<Value>(reply.trim()) {
        if value.is_object() {
            return from_json(&value);
        }
    }

    if let Some(block) = JSON_BLOCK.find(reply) {
        if let Ok(value) = serde_json::from_str::<Value>(block.as_str()) {
            if value.is_object() {
                return from_json(&value);
            }
        }
    }

    debug!("Moderation reply was not JSON, falling back to keyword matching");
    keyword_verdict(reply, submitted)
}

fn from_json(value: &Value) -> ModerationResult {
    // Anything other than a literal `true` counts as a rejection.
    let is_appropriate = matches!(value.get("isAppropriate"), Some(Value::Bool(true)));
    let text_field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut result = if is_appropriate {
        ModerationResult::appropriate()
    } else {
        ModerationResult::rejected(
            text_field("reason").unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
        )
    };
    result.confidence = value.get("confidence").and_then(Value::as_f64);
    if is_appropriate {
        result.moderated_content = text_field("moderatedContent");
    }
    result
}

fn keyword_verdict(reply: &str, submitted: Option<&str>) -> ModerationResult {
    if let Some(text) = submitted {
        let lowered = text.to_lowercase();
        if let Some(word) = FLAG_WORDS.iter().find(|w| lowered.contains(*w)) {
            debug!(flag = %word, "Flag word found in submitted text");
            return ModerationResult::rejected("Content contains inappropriate language");
        }
    }

    let lowered = reply.to_lowercase();
    let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
    let flagged = compact.contains(JSON_REJECTION_MARKER)
        || REJECTION_PHRASES.iter().any(|phrase| {
            lowered
                .match_indices(phrase)
                .any(|(idx, _)| !negated(&lowered[..idx]))
        });

    if flagged {
        ModerationResult::rejected("Content flagged by the moderation model")
    } else {
        ModerationResult::appropriate()
    }
}

/// True when one of the last few words of `prefix` is a negation.
fn negated(prefix: &str) -> bool {
    prefix
        .split_whitespace()
        .rev()
        .take(NEGATION_WINDOW)
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .any(|word| NEGATIONS.contains(&word))
}

/// Recover the body from a moderated `title + body` rendering. Without the
/// body label the whole value is the body.
fn extract_post_body(moderated: &str) -> Option<String> {
    let body = match moderated.split_once(CONTENT_LABEL.trim_start()) {
        Some((_, body)) => body,
        None => moderated,
    };
    Some(body.trim().to_string()).filter(|body| !body.is_empty())
}

fn record(kind: ContentKind, result: ModerationResult) -> ModerationResult {
    let outcome = if result.is_appropriate {
        "approved"
    } else {
        "rejected"
    };
    MODERATION_DECISIONS_TOTAL
        .with_label_values(&[kind.as_str(), outcome])
        .inc();

    if !result.is_appropriate {
        info!(
            kind = kind.as_str(),
            reason = result.reason.as_deref().unwrap_or_default(),
            "Content rejected by moderation"
        );
    }
    result
}

fn fail_open(kind: ContentKind, provider: &str, err: &LlmError) -> ModerationResult {
    warn!(
        kind = kind.as_str(),
        provider = provider,
        error = %err,
        "Moderation call failed, allowing content"
    );
    MODERATION_DECISIONS_TOTAL
        .with_label_values(&[kind.as_str(), "fail_open"])
        .inc();
    ModerationResult::appropriate()
}

fn observe_duration(kind: ContentKind, started: Instant) {
    MODERATION_DURATION_SECONDS
        .with_label_values(&[kind.as_str()])
        .observe(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::MockLlmProvider;

    fn moderator(text: MockLlmProvider, vision: MockLlmProvider) -> ContentModerator {
        ContentModerator::new(
            Arc::new(text),
            Arc::new(vision),
            HttpClient::new(),
            1024 * 1024,
        )
    }

    fn replying(reply: &'static str) -> MockLlmProvider {
        let mut mock = MockLlmProvider::new();
        mock.expect_complete()
            .returning(move |_| Ok(reply.to_string()));
        mock.expect_name().return_const("mock");
        mock
    }

    fn failing() -> MockLlmProvider {
        let mut mock = MockLlmProvider::new();
        mock.expect_complete().returning(|_| {
            Err(LlmError::Http {
                status: 503,
                body: "unavailable".to_string(),
            })
        });
        mock.expect_name().return_const("mock");
        mock
    }

    fn unused() -> MockLlmProvider {
        let mut mock = MockLlmProvider::new();
        mock.expect_complete().never();
        mock.expect_name().return_const("mock");
        mock
    }

    #[test]
    fn test_tier_one_full_json() {
        let result = interpret_reply(
            r#"{"isAppropriate": false, "reason": "شتائم", "confidence": 0.9}"#,
            Some("text"),
        );
        assert!(!result.is_appropriate);
        assert_eq!(result.reason.as_deref(), Some("شتائم"));
        assert_eq!(result.confidence, Some(0.9));
    }

    #[test]
    fn test_tier_two_embedded_json() {
        let reply = "Here is my verdict:\n```json\n{\"isAppropriate\": true, \"moderatedContent\": \"clean\"}\n```";
        let result = interpret_reply(reply, Some("text"));
        assert!(result.is_appropriate);
        assert_eq!(result.moderated_content.as_deref(), Some("clean"));
    }

    #[test]
    fn test_only_literal_true_is_appropriate() {
        for reply in [
            r#"{"isAppropriate": "true"}"#,
            r#"{"isAppropriate": 1}"#,
            r#"{"reason": "missing flag"}"#,
        ] {
            assert!(!interpret_reply(reply, None).is_appropriate, "{}", reply);
        }
    }

    #[test]
    fn test_rejection_without_reason_gets_default() {
        let result = interpret_reply(r#"{"isAppropriate": false}"#, None);
        assert_eq!(result.reason.as_deref(), Some(DEFAULT_REJECTION_REASON));
    }

    #[test]
    fn test_tier_three_flag_word_in_submitted_text() {
        let result = interpret_reply("I cannot answer that", Some("This is PORN"));
        assert!(!result.is_appropriate);
    }

    #[test]
    fn test_tier_three_reply_markers() {
        assert!(!interpret_reply("The content is not appropriate.", Some("hello")).is_appropriate);
        assert!(!interpret_reply("المحتوى غير لائق", None).is_appropriate);
        assert!(interpret_reply("Looks fine to me", Some("lovely molokhia")).is_appropriate);
        assert!(!interpret_reply(r#"verdict: { "isAppropriate" : false"#, None).is_appropriate);
    }

    #[test]
    fn test_tier_three_negated_markers_are_clean() {
        for reply in [
            "The text contains no inappropriate content.",
            "This is not inappropriate at all.",
            "لا يحتوي النص على محتوى غير لائق",
            "النص خال من أي محتوى غير مناسب",
        ] {
            assert!(
                interpret_reply(reply, Some("lentil soup")).is_appropriate,
                "{}",
                reply
            );
        }
    }

    #[test]
    fn test_extract_post_body() {
        let moderated = "العنوان: كشري\nالمحتوى: وصفة *** رائعة";
        assert_eq!(extract_post_body(moderated).as_deref(), Some("وصفة *** رائعة"));
        assert_eq!(
            extract_post_body("  soup *** tasty \n").as_deref(),
            Some("soup *** tasty")
        );
        assert_eq!(extract_post_body("   "), None);
    }

    #[tokio::test]
    async fn test_blank_text_skips_model() {
        let moderator = moderator(unused(), unused());
        assert!(moderator.moderate_text("   ").await.is_appropriate);
    }

    #[tokio::test]
    async fn test_flag_word_with_garbage_reply_is_rejected() {
        let moderator = moderator(replying("¯\\_(ツ)_/¯"), unused());
        let result = moderator.moderate_text("what the fuck").await;
        assert!(!result.is_appropriate);
    }

    #[tokio::test]
    async fn test_text_model_error_fails_open() {
        let moderator = moderator(failing(), unused());
        assert!(moderator.moderate_text("anything at all").await.is_appropriate);
    }

    #[tokio::test]
    async fn test_image_model_error_fails_open() {
        let moderator = moderator(unused(), failing());
        let result = moderator
            .moderate_image("data:image/png;base64,aGVsbG8=")
            .await;
        assert!(result.is_appropriate);
    }

    #[tokio::test]
    async fn test_malformed_data_uri_fails_open() {
        let moderator = moderator(unused(), unused());
        assert!(moderator.moderate_image("data:image/png,@@@").await.is_appropriate);
        assert!(moderator.moderate_image("ftp://example.com/a.png").await.is_appropriate);
    }

    #[tokio::test]
    async fn test_post_rejected_text_skips_image() {
        let moderator = moderator(
            replying(r#"{"isAppropriate": false, "reason": "hate speech"}"#),
            unused(),
        );
        let result = moderator
            .moderate_post("title", "body", Some("data:image/png;base64,aGVsbG8="))
            .await;
        assert!(!result.is_appropriate);
        assert_eq!(result.reason.as_deref(), Some("hate speech"));
    }

    #[tokio::test]
    async fn test_post_image_rejection() {
        let moderator = moderator(
            replying(r#"{"isAppropriate": true}"#),
            replying(r#"{"isAppropriate": false, "reason": "violent image"}"#),
        );
        let result = moderator
            .moderate_post("title", "body", Some("data:image/png;base64,aGVsbG8="))
            .await;
        assert!(!result.is_appropriate);
        assert_eq!(result.reason.as_deref(), Some("violent image"));
    }

    #[tokio::test]
    async fn test_post_moderated_body_is_extracted() {
        let moderator = moderator(
            replying(
                r#"{"isAppropriate": true, "moderatedContent": "العنوان: شوربة\nالمحتوى: شوربة *** لذيذة"}"#,
            ),
            unused(),
        );
        let result = moderator
            .moderate_post("شوربة", "شوربة damn لذيذة", None)
            .await;
        assert!(result.is_appropriate);
        assert_eq!(result.moderated_content.as_deref(), Some("شوربة *** لذيذة"));
    }

    #[tokio::test]
    async fn test_post_unlabeled_moderated_content_is_used_whole() {
        let moderator = moderator(
            replying(r#"{"isAppropriate": true, "moderatedContent": "soup *** tasty"}"#),
            unused(),
        );
        let result = moderator.moderate_post("soup", "soup damn tasty", None).await;
        assert!(result.is_appropriate);
        assert_eq!(result.moderated_content.as_deref(), Some("soup *** tasty"));
    }
}
