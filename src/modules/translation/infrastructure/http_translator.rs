use super::http_client::RateLimitClient;
use crate::modules::translation::domain::{
    prompt, TokenCounts, TranslationOutput, TranslationRequest, Translator,
};
use crate::shared::config::{ProviderSettings, TranslationConfig};
use crate::shared::domain::TranslationProvider;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::log_debug;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GOOGLE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEEPL_URL: &str = "https://api.deepl.com/v2/translate";
const DEEPL_FREE_URL: &str = "https://api-free.deepl.com/v2/translate";

const OPENROUTER_REFERER: &str = "http://localhost:5000";
const OPENROUTER_TITLE: &str = "Novel Translator";
const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatUsage {
    prompt_tokens: i32,
    completion_tokens: i32,
    total_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: i32,
    candidates_token_count: i32,
    total_token_count: i32,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    #[serde(default)]
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// `Translator` backed by a provider's HTTP API
pub struct HttpTranslator {
    provider: TranslationProvider,
    settings: ProviderSettings,
    client: RateLimitClient,
}

impl HttpTranslator {
    pub fn new(
        provider: TranslationProvider,
        settings: ProviderSettings,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            provider,
            settings,
            client: RateLimitClient::for_provider(provider, timeout)?,
        })
    }

    /// Translator for the configured provider
    pub fn from_config(config: &TranslationConfig) -> AppResult<Self> {
        let settings = config.active_settings()?.clone();
        Self::new(config.selected_provider, settings, config.request_timeout)
    }

    fn is_reasoning_model(&self) -> bool {
        self.settings.model.contains("o1-")
    }

    fn chat_body(&self, system_prompt: &str, user_prompt: &str, max_tokens: usize) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": max_tokens,
        });

        if self.provider == TranslationProvider::OpenAi && self.is_reasoning_model() {
            body["temperature"] = json!(1);
            if let Some(map) = body.as_object_mut() {
                map.remove("max_tokens");
                map.insert("max_completion_tokens".into(), json!(max_tokens));
            }
        }
        body
    }

    fn google_body(system_prompt: &str, user_prompt: &str, max_tokens: usize) -> Value {
        json!({
            "contents": [
                {"parts": [{"text": format!("{}\n\n{}", system_prompt, user_prompt)}]}
            ],
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": TEMPERATURE,
            },
        })
    }

    fn google_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GOOGLE_URL,
            urlencoding::encode(&self.settings.model),
            urlencoding::encode(&self.settings.api_key)
        )
    }

    fn deepl_url(&self) -> &'static str {
        if self.settings.api_key.trim().ends_with(":fx") {
            DEEPL_FREE_URL
        } else {
            DEEPL_URL
        }
    }

    fn deepl_form(text: &str, source_language: Option<&str>) -> Vec<(&'static str, String)> {
        let detected = prompt::detect_source_language(text, source_language);

        let mut normalized = text
            .split('\n')
            .map(prompt::normalize_informal_korean)
            .collect::<Vec<_>>()
            .join("\n");
        if detected == Some("KO") {
            normalized = prompt::normalize_korean_spacing(&normalized);
        }

        let mut form = vec![("text", normalized), ("target_lang", "EN".to_string())];
        if let Some(lang) = detected {
            form.push(("source_lang", lang.to_string()));
        }
        form.push(("split_sentences", "1".to_string()));
        form.push(("preserve_formatting", "0".to_string()));
        form
    }

    fn token_counts(&self, input: i32, output: i32, total: i32) -> TokenCounts {
        TokenCounts {
            provider: self.provider,
            model: self.settings.model.clone(),
            input_tokens: input,
            output_tokens: output,
            total_tokens: total,
        }
    }

    fn empty_response(&self, what: &str) -> AppError {
        AppError::ApiError(format!(
            "{} API Error: No {} in response.",
            self.provider.display_name(),
            what
        ))
    }

    async fn chat_completion(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        text: &str,
        request: &TranslationRequest,
    ) -> AppResult<(String, Option<TokenCounts>)> {
        let system_prompt = prompt::build_system_prompt(request.custom_prompt_suffix.as_deref());
        let user_prompt = prompt::build_user_prompt(text, request);
        let body = self.chat_body(&system_prompt, &user_prompt, prompt::max_output_tokens(text));

        let response: ChatCompletionResponse = self.client.post_json(url, headers, &body).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| self.empty_response("choices"))?;

        let usage = response
            .usage
            .map(|u| self.token_counts(u.prompt_tokens, u.completion_tokens, u.total_tokens));
        Ok((choice.message.content.unwrap_or_default(), usage))
    }

    async fn generate_content(
        &self,
        text: &str,
        request: &TranslationRequest,
    ) -> AppResult<(String, Option<TokenCounts>)> {
        let system_prompt = prompt::build_system_prompt(request.custom_prompt_suffix.as_deref());
        let user_prompt = prompt::build_user_prompt(text, request);
        let body = Self::google_body(&system_prompt, &user_prompt, prompt::max_output_tokens(text));

        let response: GenerateContentResponse =
            self.client.post_json(&self.google_url(), &[], &body).await?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| self.empty_response("candidates"))?;
        let part = candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .ok_or_else(|| self.empty_response("content"))?;

        let usage = response.usage_metadata.map(|u| {
            self.token_counts(
                u.prompt_token_count,
                u.candidates_token_count,
                u.total_token_count,
            )
        });
        Ok((part.text.unwrap_or_default(), usage))
    }

    async fn deepl(&self, text: &str, request: &TranslationRequest) -> AppResult<String> {
        let headers = [(
            "Authorization",
            format!("DeepL-Auth-Key {}", self.settings.api_key),
        )];
        let form = Self::deepl_form(text, request.source_language.as_deref());

        let response: DeepLResponse = self
            .client
            .post_form(self.deepl_url(), &headers, &form)
            .await?;
        response
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| self.empty_response("translations"))
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    fn provider(&self) -> TranslationProvider {
        self.provider
    }

    fn model(&self) -> String {
        self.settings.model.clone()
    }

    async fn translate(&self, request: &TranslationRequest) -> AppResult<TranslationOutput> {
        let text = prompt::clean_source_text(&request.text);
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput("Nothing to translate".into()));
        }

        let timer = TimedOperation::new(&format!("{} translation", self.provider));
        let bearer = format!("Bearer {}", self.settings.api_key);

        let result = match self.provider {
            TranslationProvider::OpenRouter => {
                let headers = [
                    ("Authorization", bearer),
                    ("HTTP-Referer", OPENROUTER_REFERER.to_string()),
                    ("X-Title", OPENROUTER_TITLE.to_string()),
                ];
                self.chat_completion(OPENROUTER_URL, &headers, &text, request)
                    .await
            }
            TranslationProvider::OpenAi => {
                let headers = [("Authorization", bearer)];
                self.chat_completion(OPENAI_URL, &headers, &text, request)
                    .await
            }
            TranslationProvider::Google => self.generate_content(&text, request).await,
            TranslationProvider::DeepL => self.deepl(&text, request).await.map(|t| (t, None)),
        };

        let duration = timer.finish();
        let status = if result.is_ok() { "ok" } else { "error" };
        LogContext::api_call(
            self.provider.display_name(),
            &self.settings.model,
            status,
            Some(duration),
        );

        let (translated, token_usage) = result?;
        log_debug!(
            "{} translated {} chars into {} chars",
            self.provider.display_name(),
            text.chars().count(),
            translated.chars().count()
        );

        Ok(TranslationOutput {
            text: prompt::clean_translated_text(&translated),
            token_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator(provider: TranslationProvider, model: &str, key: &str) -> HttpTranslator {
        HttpTranslator::new(
            provider,
            ProviderSettings {
                api_key: key.to_string(),
                model: model.to_string(),
            },
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_reasoning_models_use_completion_tokens() {
        let t = translator(TranslationProvider::OpenAi, "o1-mini", "sk");
        let body = t.chat_body("sys", "user", 5000);
        assert_eq!(body["max_completion_tokens"], 5000);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["temperature"], 1);

        let t = translator(TranslationProvider::OpenAi, "gpt-4o-mini", "sk");
        let body = t.chat_body("sys", "user", 5000);
        assert_eq!(body["max_tokens"], 5000);
        assert_eq!(body["temperature"], 0.3);
    }

    #[test]
    fn test_google_request_shape() {
        let t = translator(TranslationProvider::Google, "gemini-2.0-flash", "abc");
        assert_eq!(
            t.google_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=abc"
        );
        let body = HttpTranslator::google_body("sys", "user", 4000);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "sys\n\nuser");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4000);
    }

    #[test]
    fn test_deepl_free_keys_use_free_host() {
        assert_eq!(
            translator(TranslationProvider::DeepL, "deepl", "abc:fx").deepl_url(),
            DEEPL_FREE_URL
        );
        assert_eq!(
            translator(TranslationProvider::DeepL, "deepl", "abc").deepl_url(),
            DEEPL_URL
        );
    }

    #[test]
    fn test_deepl_form_keeps_lines() {
        let form = HttpTranslator::deepl_form("나 는  ㅇㅋ\n둘째 줄", None);
        assert_eq!(form[0], ("text", "나는 응\n둘째 줄".to_string()));
        assert!(form.contains(&("source_lang", "KO".to_string())));
        assert!(form.contains(&("target_lang", "EN".to_string())));
    }

    #[test]
    fn test_chat_response_parsing() {
        let raw = r#"{"choices":[{"message":{"content":"Hello"}}],"usage":{"prompt_tokens":10,"completion_tokens":3,"total_tokens":13}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hello"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 13);

        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hi"}]}}],"usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":1,"totalTokenCount":5}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.usage_metadata.unwrap().candidates_token_count, 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_without_a_request() {
        let t = translator(TranslationProvider::OpenAi, "gpt-4o-mini", "sk");
        let err = t.translate(&TranslationRequest::new("  \n ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
