//! End-to-end tests for the weather, currency and shortener pipelines.

#[cfg(test)]
mod tests {
    use crate::config::{Credential, CurrencyConfig, WeatherConfig};
    use crate::core::{FailureKind, PipelineState, StageIndex};
    use crate::currency::{currency_pipeline, CurrencyConverter, CurrencyPair};
    use crate::errors::{TransportError, GENERIC_FETCH_MESSAGE};
    use crate::events::CollectingEventSink;
    use crate::pipeline::RunOutcome;
    use crate::testing::ScriptedTransport;
    use crate::transport::{HttpTransport, JsonResponse};
    use crate::weather::{weather_pipeline, LocationQuery, WeatherSnapshot};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    /// Answers each request with the reply sent through the next gate.
    #[derive(Default)]
    struct GatedTransport {
        gates: Mutex<VecDeque<oneshot::Receiver<JsonResponse>>>,
    }

    impl GatedTransport {
        fn gate(&self) -> oneshot::Sender<JsonResponse> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().push_back(rx);
            tx
        }

        async fn next(&self) -> Result<JsonResponse, TransportError> {
            let gate = self.gates.lock().pop_front();
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| TransportError::Request("gate dropped".into())),
                None => Err(TransportError::Request("no gate".into())),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        async fn get_json(
            &self,
            _url: &str,
            _query: &[(&str, String)],
        ) -> Result<JsonResponse, TransportError> {
            self.next().await
        }

        async fn post_json(
            &self,
            _url: &str,
            _bearer: Option<&str>,
            _body: &serde_json::Value,
        ) -> Result<JsonResponse, TransportError> {
            self.next().await
        }
    }

    fn weather_config() -> WeatherConfig {
        WeatherConfig {
            base_url: "https://wx.test".into(),
            api_key: Some(Credential::new("wx-secret")),
            units: Some("metric".into()),
            ..WeatherConfig::default()
        }
    }

    fn currency_config() -> CurrencyConfig {
        CurrencyConfig {
            base_url: "https://rates.test/v6/latest".into(),
            api_key: None,
        }
    }

    fn paris_geo() -> serde_json::Value {
        serde_json::json!([{"name": "Paris", "lat": 48.8566, "lon": 2.3522, "country": "FR"}])
    }

    fn paris_weather() -> serde_json::Value {
        serde_json::json!({
            "name": "Paris",
            "main": {"temp": 18.5, "feels_like": 17.9, "humidity": 60},
            "weather": [{"description": "clear sky", "icon": "01d"}],
            "wind": {"speed": 3.6},
            "clouds": {"all": 0}
        })
    }

    fn lyon_weather() -> serde_json::Value {
        serde_json::json!({"name": "Lyon", "main": {"temp": 21.0}})
    }

    fn rates_usd() -> serde_json::Value {
        serde_json::json!({"rates": {"EUR": 0.92, "JPY": 149.3}})
    }

    #[tokio::test]
    async fn test_paris_scenario() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route_json("/geo/1.0/direct", paris_geo())
                .route_json("/data/2.5/weather", paris_weather()),
        );
        let pipeline = weather_pipeline(&weather_config(), transport.clone()).unwrap();

        let outcome = pipeline.run(LocationQuery::city("Paris")).await;

        assert!(matches!(outcome, RunOutcome::Succeeded(_)));
        assert_eq!(
            pipeline.current_state(),
            PipelineState::Success(WeatherSnapshot {
                location: Some("Paris".into()),
                temperature: Some(18.5),
                feels_like: Some(17.9),
                description: Some("clear sky".into()),
                icon: Some("01d".into()),
                humidity: Some(60),
                wind_speed: Some(3.6),
                cloudiness: Some(0),
            })
        );

        let requests = transport.requests();
        let weather_call = &requests[1];
        assert_eq!(weather_call.query_value("lat"), Some("48.8566"));
        assert_eq!(weather_call.query_value("lon"), Some("2.3522"));
        assert_eq!(pipeline.intermediate().unwrap().country.as_deref(), Some("FR"));
    }

    #[tokio::test]
    async fn test_minimal_paris_payload_is_kept_verbatim() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route_json("/geo/1.0/direct", serde_json::json!([{"lat": 48.85, "lon": 2.35}]))
                .route_json(
                    "/data/2.5/weather",
                    serde_json::json!({
                        "name": "Paris",
                        "main": {"temp": 290.1},
                        "weather": [{"description": "clear sky", "icon": "01d"}],
                        "wind": {"speed": 3.1},
                        "clouds": {"all": 0}
                    }),
                ),
        );
        let pipeline = weather_pipeline(&weather_config(), transport.clone()).unwrap();

        pipeline.run(LocationQuery::city("Paris")).await;

        assert_eq!(
            pipeline.current_state(),
            PipelineState::Success(WeatherSnapshot {
                location: Some("Paris".into()),
                temperature: Some(290.1),
                feels_like: None,
                description: Some("clear sky".into()),
                icon: Some("01d".into()),
                humidity: None,
                wind_speed: Some(3.1),
                cloudiness: Some(0),
            })
        );
        let requests = transport.requests();
        assert_eq!(requests[1].query_value("lat"), Some("48.85"));
        assert_eq!(requests[1].query_value("lon"), Some("2.35"));
    }

    #[tokio::test]
    async fn test_postal_code_empty_list_is_no_match() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route_json("/geo/1.0/zip", serde_json::json!([]))
                .route_json("/data/2.5/weather", paris_weather()),
        );
        let pipeline = weather_pipeline(&weather_config(), transport.clone()).unwrap();

        let outcome = pipeline.run(LocationQuery::postal_code("99999", "ZZ")).await;

        assert!(matches!(outcome, RunOutcome::Failed(_)));
        let failure = pipeline.current_state().failure().cloned().unwrap();
        assert_eq!(failure.stage, StageIndex::First);
        assert_eq!(failure.kind, FailureKind::NoMatch);
        assert_eq!(transport.call_count("/data/2.5/weather"), 0);
    }

    #[tokio::test]
    async fn test_unknown_postal_code_is_no_match() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("/geo/1.0/zip", Ok(JsonResponse::with_status(404, serde_json::Value::Null)))
                .route_json("/data/2.5/weather", paris_weather()),
        );
        let pipeline = weather_pipeline(&weather_config(), transport.clone()).unwrap();

        pipeline.run(LocationQuery::postal_code("99999", "ZZ")).await;

        let failure = pipeline.current_state().failure().cloned().unwrap();
        assert_eq!(failure.stage, StageIndex::First);
        assert_eq!(failure.kind, FailureKind::NoMatch);
        assert_eq!(failure.message, "No results found for postal code 99999 (ZZ).");
        assert_eq!(transport.call_count("/data/2.5/weather"), 0);
    }

    #[tokio::test]
    async fn test_empty_city_match_list_skips_weather() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route_json("/geo/1.0/direct", serde_json::json!([]))
                .route_json("/data/2.5/weather", paris_weather()),
        );
        let pipeline = weather_pipeline(&weather_config(), transport.clone()).unwrap();

        pipeline.run(LocationQuery::city("Atlantis")).await;

        assert_eq!(
            pipeline.current_state().failure().map(|f| f.kind),
            Some(FailureKind::NoMatch)
        );
        assert_eq!(transport.call_count("/data/2.5/weather"), 0);
        assert!(pipeline.intermediate().is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_hides_details() {
        let transport = Arc::new(ScriptedTransport::new().route(
            "/geo/1.0/direct",
            Err(TransportError::Request("dns error for wx.test?appid=wx-secret".into())),
        ));
        let pipeline = weather_pipeline(&weather_config(), transport).unwrap();

        pipeline.run(LocationQuery::city("Paris")).await;

        let failure = pipeline.current_state().failure().cloned().unwrap();
        assert_eq!(failure.kind, FailureKind::Transport);
        assert_eq!(failure.message, GENERIC_FETCH_MESSAGE);
        assert!(!failure.message.contains("wx-secret"));
    }

    #[tokio::test]
    async fn test_identical_runs_are_idempotent() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route_json("/geo/1.0/direct", paris_geo())
                .route_json("/data/2.5/weather", paris_weather()),
        );
        let pipeline = weather_pipeline(&weather_config(), transport).unwrap();

        pipeline.run(LocationQuery::city("Paris")).await;
        let first = pipeline.current_state();
        pipeline.run(LocationQuery::city("Paris")).await;

        assert_eq!(pipeline.current_state(), first);
        assert!(first.success().is_some());
    }

    #[tokio::test]
    async fn test_newer_weather_run_wins_when_older_finishes_last() {
        let transport = Arc::new(GatedTransport::default());
        let geo_a = transport.gate();
        let wx_a = transport.gate();
        let geo_b = transport.gate();
        let wx_b = transport.gate();
        let pipeline = weather_pipeline(&weather_config(), transport.clone()).unwrap();
        let mut rx = pipeline.subscribe();

        let driver = async {
            geo_a.send(JsonResponse::ok(paris_geo())).unwrap();
            rx.wait_for(|s| *s == PipelineState::Loading(StageIndex::Second))
                .await
                .unwrap();

            let release_b = async {
                geo_b
                    .send(JsonResponse::ok(serde_json::json!([{"name": "Lyon", "lat": 45.76, "lon": 4.83}])))
                    .unwrap();
                wx_b.send(JsonResponse::ok(lyon_weather())).unwrap();
                rx.wait_for(PipelineState::is_terminal).await.unwrap();
                wx_a.send(JsonResponse::ok(paris_weather())).unwrap();
            };
            let (b, ()) = tokio::join!(pipeline.run(LocationQuery::city("Lyon")), release_b);
            b
        };

        let (a, b) = tokio::join!(pipeline.run(LocationQuery::city("Paris")), driver);

        assert!(matches!(a, RunOutcome::Superseded(_)));
        assert!(matches!(b, RunOutcome::Succeeded(_)));
        let snapshot = pipeline.final_result().unwrap();
        assert_eq!(snapshot.location.as_deref(), Some("Lyon"));
        assert_eq!(pipeline.intermediate().unwrap().name.as_deref(), Some("Lyon"));
    }

    #[tokio::test]
    async fn test_currency_scenario() {
        let transport = Arc::new(
            ScriptedTransport::new().route_json("https://rates.test", rates_usd()),
        );
        let pipeline = currency_pipeline(&currency_config(), transport);
        let mut converter = CurrencyConverter::new(50.0);

        pipeline.run(CurrencyPair::new("USD", "EUR")).await;

        let quote = pipeline.final_result().unwrap();
        assert_eq!(quote.currencies, vec!["EUR", "JPY"]);
        let converted = converter.apply_quote(&quote).unwrap();
        assert!((converted - 46.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_currency_pair_from_lowercase_json() {
        let transport = Arc::new(
            ScriptedTransport::new().route_json("https://rates.test", rates_usd()),
        );
        let pipeline = currency_pipeline(&currency_config(), transport.clone());
        let pair: CurrencyPair = serde_json::from_str(r#"{"base":"usd","quote":"eur"}"#).unwrap();

        pipeline.run(pair).await;

        let quote = pipeline.final_result().unwrap();
        assert_eq!(quote.rate, 0.92);
        assert!(quote.data_gap.is_none());
        assert_eq!(transport.requests()[0].query_value("base"), Some("USD"));
    }

    #[tokio::test]
    async fn test_currency_missing_quote_passes_nan_through() {
        let transport = Arc::new(
            ScriptedTransport::new().route_json("https://rates.test", rates_usd()),
        );
        let pipeline = currency_pipeline(&currency_config(), transport);
        let mut converter = CurrencyConverter::new(10.0);

        pipeline.run(CurrencyPair::new("USD", "GBP")).await;

        let quote = pipeline.current_state().success().cloned().unwrap();
        assert!(quote.rate.is_nan());
        assert!(quote.data_gap.is_some());
        assert!(converter.apply_quote(&quote).unwrap().is_nan());
    }

    #[tokio::test]
    async fn test_currency_newer_pair_wins() {
        let transport = Arc::new(GatedTransport::default());
        let usd = transport.gate();
        let gbp = transport.gate();
        let pipeline = currency_pipeline(&currency_config(), transport.clone());

        let release = async {
            tokio::task::yield_now().await;
            gbp.send(JsonResponse::ok(serde_json::json!({"rates": {"EUR": 1.17}})))
                .unwrap();
            tokio::task::yield_now().await;
            usd.send(JsonResponse::ok(rates_usd())).unwrap();
        };

        let (a, b, ()) = tokio::join!(
            pipeline.run(CurrencyPair::new("USD", "EUR")),
            pipeline.run(CurrencyPair::new("GBP", "EUR")),
            release
        );

        assert!(matches!(a, RunOutcome::Superseded(_)));
        assert!(b.is_applied());
        let quote = pipeline.final_result().unwrap();
        assert_eq!(quote.base, "GBP");
        assert_eq!(quote.rate, 1.17);
    }

    #[tokio::test]
    async fn test_event_stream_for_failed_run() {
        let transport = Arc::new(
            ScriptedTransport::new().route_json("/geo/1.0/direct", serde_json::json!([])),
        );
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = weather_pipeline(&weather_config(), transport)
            .unwrap()
            .with_event_sink(sink.clone());

        pipeline.run(LocationQuery::city("Atlantis")).await;

        assert_eq!(
            sink.event_types(),
            vec![
                "pipeline.run_started",
                "pipeline.stage_started",
                "pipeline.run_failed",
            ]
        );
        let failed = sink.events_of_type("pipeline.run_failed").remove(0);
        assert_eq!(failed.data["kind"], serde_json::json!("no_match"));
    }
}
