//! LLM router — holds the registered backends and picks one per request.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;

use knownet_common::config::LlmConfig;

use crate::backend::{
    AnthropicBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, OllamaBackend,
    OpenAiBackend, OpenAiCompatibleBackend, TextStream,
};

/// Routes LLM requests to the configured backend. Callers may hand in their
/// own API key, which selects a transient backend of the same provider.
pub struct LlmRouter {
    backends: HashMap<String, Arc<dyn LlmBackend>>,
    default_backend: String,
    config: LlmConfig,
}

fn resolve_key(cfg: &LlmConfig, api_key: Option<SecretString>) -> Result<SecretString, LlmError> {
    match api_key {
        Some(k) => Ok(k),
        None => std::env::var(&cfg.api_key_env)
            .map(SecretString::from)
            .map_err(|_| LlmError::MissingApiKey(cfg.api_key_env.clone())),
    }
}

fn build_backend(cfg: &LlmConfig, api_key: Option<SecretString>) -> Result<Arc<dyn LlmBackend>, LlmError> {
    match cfg.provider.as_str() {
        "ollama" => {
            let base = cfg.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string());
            Ok(Arc::new(OllamaBackend::new(base, cfg.model.clone())))
        }
        "openai" => Ok(Arc::new(OpenAiBackend::new(
            resolve_key(cfg, api_key)?,
            cfg.model.clone(),
        ))),
        "anthropic" => Ok(Arc::new(AnthropicBackend::new(
            resolve_key(cfg, api_key)?,
            cfg.model.clone(),
        ))),
        "openai-compatible" => {
            let base = cfg.base_url.clone().ok_or_else(|| {
                LlmError::Unavailable("openai-compatible provider requires base_url".to_string())
            })?;
            // A missing key is fine for LMStudio / vLLM style endpoints.
            let k = api_key.or_else(|| std::env::var(&cfg.api_key_env).ok().map(SecretString::from));
            Ok(Arc::new(OpenAiCompatibleBackend::new(base, cfg.model.clone(), k)))
        }
        other => Err(LlmError::Unavailable(format!("unknown LLM provider: {other}"))),
    }
}

impl LlmRouter {
    pub fn new(default_backend: impl Into<String>, config: LlmConfig) -> Self {
        Self {
            backends: HashMap::new(),
            default_backend: default_backend.into(),
            config,
        }
    }

    /// Build a router with the configured provider registered as default.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let backend = build_backend(config, None)?;
        let mut router = Self::new(config.provider.clone(), config.clone());
        router.register_backend(config.provider.clone(), backend);
        Ok(router)
    }

    pub fn register_backend(&mut self, name: impl Into<String>, backend: Arc<dyn LlmBackend>) {
        self.backends.insert(name.into(), backend);
    }

    fn select(&self, name: Option<&str>) -> Result<&Arc<dyn LlmBackend>, LlmError> {
        let name = name.unwrap_or(&self.default_backend);
        self.backends
            .get(name)
            .ok_or_else(|| LlmError::Unavailable(format!("backend not registered: {name}")))
    }

    /// The model the default backend answers with.
    pub fn model_id(&self) -> String {
        self.select(None)
            .map(|b| b.model_id().to_string())
            .unwrap_or_default()
    }

    /// Route a whole-response completion to the default backend.
    pub async fn route(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let backend = self.select(None)?;
        tracing::info!(
            model = backend.model_id(),
            is_local = backend.is_local(),
            "LLM request routed"
        );
        backend.complete(req).await
    }

    /// Route a streaming completion. A caller-supplied API key selects a
    /// transient backend of the configured provider instead of the shared one.
    pub async fn route_stream(
        &self,
        req: LlmRequest,
        api_key: Option<SecretString>,
    ) -> Result<TextStream, LlmError> {
        match api_key {
            Some(key) => {
                let backend = build_backend(&self.config, Some(key))?;
                tracing::info!(
                    model = backend.model_id(),
                    is_local = backend.is_local(),
                    "LLM stream routed with caller key"
                );
                backend.complete_stream(req).await
            }
            None => {
                let backend = self.select(None)?;
                tracing::info!(
                    model = backend.model_id(),
                    is_local = backend.is_local(),
                    "LLM stream routed"
                );
                backend.complete_stream(req).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Message;
    use async_trait::async_trait;

    struct CannedBackend;

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: "ok".to_string(),
                model: "canned".to_string(),
                prompt_tokens: 1,
                completion_tokens: 1,
            })
        }

        async fn complete_stream(&self, _req: LlmRequest) -> Result<TextStream, LlmError> {
            Ok(Box::pin(tokio_stream::once(Ok("ok".to_string()))))
        }

        fn model_id(&self) -> &str { "canned" }
        fn is_local(&self) -> bool { true }
    }

    fn req() -> LlmRequest {
        LlmRequest {
            messages: vec![Message::user("hi")],
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_routes_to_default_backend() {
        let mut router = LlmRouter::new("canned", LlmConfig::default());
        router.register_backend("canned", Arc::new(CannedBackend));
        let resp = router.route(req()).await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(router.model_id(), "canned");
    }

    #[tokio::test]
    async fn test_unregistered_backend_errors() {
        let router = LlmRouter::new("ghost", LlmConfig::default());
        let err = router.route(req()).await;
        assert!(matches!(err, Err(LlmError::Unavailable(_))));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let cfg = LlmConfig {
            provider: "ollama".to_string(),
            base_url: None,
            model: "llama3:8b".to_string(),
            api_key_env: "UNSET_VAR_FOR_TEST".to_string(),
            ..LlmConfig::default()
        };
        assert!(build_backend(&cfg, None).is_ok());
    }

    #[test]
    fn test_unknown_provider_errors() {
        let cfg = LlmConfig { provider: "smoke-signals".to_string(), ..LlmConfig::default() };
        assert!(matches!(build_backend(&cfg, None), Err(LlmError::Unavailable(_))));
    }
}
