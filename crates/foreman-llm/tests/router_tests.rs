#[cfg(test)]
mod tests {
    use foreman_llm::mock::{MockProvider, MockResponse};
    use foreman_llm::provider::{ChatMessage, LlmRequest};
    use foreman_llm::router::ProviderRouter;
    use std::sync::Arc;

    fn make_request(model: &str) -> LlmRequest {
        LlmRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user("Hello")],
            system: None,
            max_tokens: 100,
            temperature: 0.7,
        }
    }

    // ── Router resolve / complete ──────────────────────────────

    #[tokio::test]
    async fn test_complete_with_prefix_resolution() {
        let mock = MockProvider::new("testprovider").with_response("Hello from mock!");
        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(mock));
        let req = make_request("testprovider/gpt-4o");
        let resp = router.complete(&req, None).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("Hello from mock!"));
    }

    #[tokio::test]
    async fn test_model_not_found() {
        let router = ProviderRouter::new();
        let req = make_request("nonexistent/model");
        let result = router.complete(&req, None).await;
        assert!(matches!(
            result.unwrap_err(),
            foreman_core::ForemanError::ModelNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_failover_to_fallback() {
        let primary = MockProvider::new("primary")
            .with_error("HTTP 500: Internal Server Error")
            .with_error("HTTP 500: Internal Server Error")
            .with_error("HTTP 500: Internal Server Error")
            .with_error("HTTP 500: Internal Server Error");

        let fallback = MockProvider::new("fallback").with_response("Fallback reply");

        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(primary));
        router.add_provider(Arc::new(fallback));

        let req = make_request("primary/model");
        let resp = router.complete(&req, Some("fallback/model")).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("Fallback reply"));
    }

    // ── Retry logic ────────────────────────────────────────────

    #[tokio::test]
    async fn test_retry_on_transient_error() {
        let mock = MockProvider::new("retry_test")
            .with_error("HTTP 429: rate limited")
            .with_response("success after retry");

        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(mock));

        let req = make_request("retry_test/model");
        let resp = router.complete(&req, None).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("success after retry"));
    }

    #[tokio::test]
    async fn test_no_retry_on_non_transient_error() {
        let mock = MockProvider::new("no_retry").with_error("Invalid API key");

        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(mock));

        let req = make_request("no_retry/model");
        assert!(router.complete(&req, None).await.is_err());
    }

    // ── Circuit breaker ────────────────────────────────────────

    #[tokio::test]
    async fn test_circuit_opens_after_consecutive_failures() {
        // Five non-transient failures in a row open the primary's circuit.
        let mut primary = MockProvider::new("primary");
        for _ in 0..5 {
            primary = primary.with_error("Invalid API key");
        }
        let primary_requests = primary.recorded_requests();

        let fallback = MockProvider::new("fallback").with_response("fallback reply");
        let fallback_requests = fallback.recorded_requests();

        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(primary));
        router.add_provider(Arc::new(fallback));

        let req = make_request("primary/model");
        for _ in 0..5 {
            let resp = router.complete(&req, Some("fallback/model")).await.unwrap();
            assert!(resp.content.is_some());
        }

        // Sixth call: primary is skipped entirely, fallback serves it
        let resp = router.complete(&req, Some("fallback/model")).await.unwrap();
        assert!(resp.content.is_some());
        assert_eq!(primary_requests.lock().unwrap().len(), 5);
        assert_eq!(fallback_requests.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_open_circuit_without_fallback_is_model_not_found() {
        let mut primary = MockProvider::new("solo");
        for _ in 0..5 {
            primary = primary.with_error("Invalid API key");
        }
        let primary_requests = primary.recorded_requests();

        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(primary));

        let req = make_request("solo/model");
        for _ in 0..5 {
            assert!(router.complete(&req, None).await.is_err());
        }

        let result = router.complete(&req, None).await;
        assert!(matches!(
            result.unwrap_err(),
            foreman_core::ForemanError::ModelNotFound(_)
        ));
        // The open circuit fast-fails without touching the provider
        assert_eq!(primary_requests.lock().unwrap().len(), 5);
    }

    // ── Empty completions ──────────────────────────────────────

    #[tokio::test]
    async fn test_empty_completion_passes_through() {
        let mock = MockProvider::new("empty").with_mock_response(MockResponse::empty());
        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(mock));

        let req = make_request("empty/model");
        let resp = router.complete(&req, None).await.unwrap();
        assert!(resp.content.is_none());
    }

    // ── Request recording ──────────────────────────────────────

    #[tokio::test]
    async fn test_request_recording() {
        let mock = MockProvider::new("recorder").with_response("ok");
        let requests = mock.recorded_requests();

        let mut router = ProviderRouter::new();
        router.add_provider(Arc::new(mock));

        let req = make_request("recorder/model");
        router.complete(&req, None).await.unwrap();

        let recorded = requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].messages[0].content, "Hello");
        // Provider prefix is stripped before dispatch
        assert_eq!(recorded[0].model, "model");
    }
}
