mod common;

/// End-to-end tests for the housing prediction service
mod integration_tests {
    use anyhow::Result;
    use futures::future::join_all;
    use housing_predictor::api::{
        format_house_value, HousingInputs, PredictionApiServer, PredictionClient,
        RetryConfiguration,
    };
    use housing_predictor::core::{ModelConfig, ServiceConfig};
    use housing_predictor::ml::{train_linear, ModelArtifact, PredictionService, TrainingConfig};
    use housing_predictor::PredictorError;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};
    use warp::test::request;

    use super::common;
    use super::common::{DEFAULT_FEATURES, DEFAULT_PREDICTION};

    fn config_for(model_path: std::path::PathBuf) -> ServiceConfig {
        ServiceConfig {
            model: ModelConfig { path: model_path },
            ..ServiceConfig::default()
        }
    }

    fn serve_fixture(dir: &std::path::Path) -> Result<PredictionApiServer> {
        let path = common::write_artifact(dir);
        Ok(PredictionApiServer::bootstrap(&config_for(path))?)
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_default_inputs_predict() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;
        let routes = server.routes();

        let resp = request()
            .method("POST")
            .path("/predict")
            .json(&json!({ "features": DEFAULT_FEATURES }))
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), 200);
        let prediction = body_json(resp.body())["prediction"].as_f64().unwrap();
        assert!((prediction - DEFAULT_PREDICTION).abs() < 1e-9);
        assert_eq!(format_house_value(prediction), "$204,860");
        Ok(())
    }

    #[tokio::test]
    async fn test_predictions_are_deterministic() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;
        let routes = server.routes();

        let mut bodies = Vec::new();
        for _ in 0..3 {
            let resp = request()
                .method("POST")
                .path("/predict")
                .json(&json!({ "features": DEFAULT_FEATURES }))
                .reply(&routes)
                .await;
            assert_eq!(resp.status(), 200);
            bodies.push(resp.body().clone());
        }

        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
        Ok(())
    }

    #[tokio::test]
    async fn test_liveness() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;

        let resp = request().method("GET").path("/").reply(&server.routes()).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(
            body_json(resp.body()),
            json!({"status": "ok", "message": "California Housing Price Prediction API"})
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_model_fails_bootstrap() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("nope.json");

        match PredictionApiServer::bootstrap(&config_for(missing.clone())) {
            Err(PredictorError::ArtifactMissing { path }) => assert_eq!(path, missing),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("bootstrap succeeded without a model"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_model_fails_bootstrap() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"model\": ")?;

        let err = assert_err!(PredictionService::load(&path));
        assert_eq!(err.code(), "artifact_invalid");
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_feature_count_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;
        let routes = server.routes();

        for features in [&DEFAULT_FEATURES[..7], &[1.0; 9][..], &[][..]] {
            let resp = request()
                .method("POST")
                .path("/predict")
                .json(&json!({ "features": features }))
                .reply(&routes)
                .await;

            assert_eq!(resp.status(), 400, "{} features", features.len());
            let body = body_json(resp.body());
            assert_eq!(body["error"], "invalid_input");
            assert!(body["message"].as_str().unwrap().contains("expected 8 features"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_requests_match_direct_inference() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;
        let service = server.service();
        let routes = server.routes();

        let inputs: Vec<Vec<f64>> = (0..50)
            .map(|i| {
                let mut row = DEFAULT_FEATURES.to_vec();
                row[0] = 1.0 + i as f64 * 0.2;
                row[5] = 1.5 + (i % 5) as f64;
                row[6] = 33.0 + (i % 9) as f64;
                row[7] = -124.0 + (i % 7) as f64;
                row
            })
            .collect();

        let responses = join_all(inputs.iter().map(|features| {
            let routes = routes.clone();
            async move {
                request()
                    .method("POST")
                    .path("/predict")
                    .json(&json!({ "features": features }))
                    .reply(&routes)
                    .await
            }
        }))
        .await;

        for (features, resp) in inputs.iter().zip(responses) {
            assert_eq!(resp.status(), 200);
            let served = body_json(resp.body())["prediction"].as_f64().unwrap();
            assert_eq!(served, service.predict(features)?);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_model_info_endpoint() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;

        let resp = request().method("GET").path("/model").reply(&server.routes()).await;

        assert_eq!(resp.status(), 200);
        let body = body_json(resp.body());
        assert_eq!(body["model_kind"], "gradient_boosting");
        assert_eq!(body["n_features"], 8);
        assert_eq!(body["feature_names"], json!(common::FEATURE_NAMES));
        assert_eq!(body["feature_ranges"].as_array().map(Vec::len), Some(8));
        Ok(())
    }

    #[tokio::test]
    async fn test_train_save_serve_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let dataset = common::linear_dataset(200, 7);
        let report = train_linear(&dataset, &TrainingConfig::default())?;

        assert_eq!(report.train_rows + report.test_rows, 200);
        assert!(report.r2 > 0.999, "r2 = {}", report.r2);

        let path = dir.path().join("out").join("linear.json");
        report.artifact.save(&path)?;
        let reloaded = assert_ok!(ModelArtifact::load(&path));
        assert_eq!(reloaded.feature_names, dataset.feature_names);

        let server = PredictionApiServer::bootstrap(&config_for(path))?;
        let row = &dataset.records[0];
        let resp = request()
            .method("POST")
            .path("/predict")
            .json(&json!({ "features": row }))
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), 200);
        let served = body_json(resp.body())["prediction"].as_f64().unwrap();
        assert!((served - dataset.targets[0]).abs() < 1e-6);
        Ok(())
    }

    #[tokio::test]
    async fn test_client_against_live_server() -> Result<()> {
        let dir = tempdir()?;
        let server = serve_fixture(dir.path())?;
        let (addr, serving) = warp::serve(server.routes()).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serving);

        let client = PredictionClient::new(format!("http://{addr}"), RetryConfiguration::none())?;

        let status = client.status().await?;
        assert_eq!(status.status, "ok");

        let inputs = HousingInputs::default();
        let model = client.model_info().await?;
        assert_ok!(inputs.validate_for(&model));

        let prediction = client.predict(&inputs.to_features()).await?;
        assert!((prediction - DEFAULT_PREDICTION).abs() < 1e-9);

        let err = assert_err!(client.predict(&[1.0, 2.0]).await);
        assert_eq!(err.code(), "invalid_input");
        Ok(())
    }
}
