use std::sync::Arc;

use agent_gateway::{AgentGateway, GatewayInitError};
use agent_gateway_gemini::{GeminiGateway, GeminiGatewayConfig};
use agent_gateway_mock::EchoGateway;

use crate::config::{HunterConfig, ProviderKind};
use crate::tools::default_tools;

/// Builds the gateway selected by `config`.
pub fn gateway_from_config(config: &HunterConfig) -> Result<Arc<dyn AgentGateway>, GatewayInitError> {
    match config.provider {
        ProviderKind::Mock => Ok(Arc::new(EchoGateway::new(default_tools()))),
        ProviderKind::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| GatewayInitError::new("GOOGLE_API_KEY is required for gemini"))?;

            let mut gemini = GeminiGatewayConfig::new(api_key, config.model.clone());
            if let Some(base_url) = config.base_url.as_deref() {
                gemini = gemini.with_base_url(base_url);
            }
            if let Some(timeout) = config.timeout {
                gemini = gemini.with_timeout(timeout);
            }

            Ok(Arc::new(GeminiGateway::new(gemini, default_tools())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{API_KEY_ENV_VAR, MODEL_ENV_VAR, PROVIDER_ENV_VAR};

    fn config(pairs: &[(&str, &str)]) -> HunterConfig {
        HunterConfig::from_lookup(|key| {
            pairs
                .iter()
                .find(|(candidate, _)| *candidate == key)
                .map(|(_, value)| value.to_string())
        })
        .expect("valid config")
    }

    #[test]
    fn mock_provider_resolves_without_credentials() {
        let gateway = gateway_from_config(&config(&[(PROVIDER_ENV_VAR, "mock")]))
            .expect("mock gateway");

        assert_eq!(gateway.profile().provider_id, "mock");
    }

    #[test]
    fn gemini_provider_reports_configured_model() {
        let gateway = gateway_from_config(&config(&[
            (API_KEY_ENV_VAR, "test-key"),
            (MODEL_ENV_VAR, "gemini-2.0-flash"),
        ]))
        .expect("gemini gateway");

        let profile = gateway.profile();
        assert_eq!(profile.provider_id, "gemini");
        assert_eq!(profile.model_id, "gemini-2.0-flash");
    }

    #[test]
    fn gemini_without_key_is_an_init_error() {
        let mut config = config(&[(PROVIDER_ENV_VAR, "mock")]);
        config.provider = ProviderKind::Gemini;

        let error = match gateway_from_config(&config) {
            Ok(_) => panic!("gemini without a key should fail"),
            Err(error) => error,
        };

        assert!(error.message().contains("GOOGLE_API_KEY"));
    }
}
