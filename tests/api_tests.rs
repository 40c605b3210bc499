use std::io::Write;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use nutriswap_api::api::{create_router, AppState};
use nutriswap_api::config::Config;
use nutriswap_api::db::Catalog;
use nutriswap_api::services::{Recommender, TfidfVectorizer};

const CATALOG_CSV: &str = "\
code,product_name,product_name_clean,ingredients_text_clean,nutriscore_filled_n,allergens,allergens_en
111.0,Whole Milk,whole milk,milk sugar,5,lait,en:milk
222,Skim Milk,skim milk,milk sugar,1,,en:milk
333,Chocolate Milk,chocolate milk,milk sugar cocoa,10,,
444,Oat Drink,oat drink,oats water,-2,,
555,Mystery Snack,mystery snack,,unknown,,
601,Cola,cola,water sugar,12,,
602,Cola Light,cola light,water sweetener,0,,
603,Cola Zero,cola zero,water sweetener,0,,
604,Lemonade,lemonade,water sugar lemon,3,,
605,Tonic,tonic,water sugar quinine,4,,
606,Soda,soda,water sugar,2,,
";

fn test_catalog() -> Catalog {
    Catalog::from_reader(CATALOG_CSV.as_bytes()).unwrap()
}

fn test_vectorizer(catalog: &Catalog) -> TfidfVectorizer {
    let texts: Vec<&str> = catalog
        .products()
        .iter()
        .map(|p| p.combined_text.as_str())
        .collect();
    TfidfVectorizer::fit(&texts).unwrap()
}

fn create_test_server() -> TestServer {
    let catalog = test_catalog();
    let vectorizer = test_vectorizer(&catalog);
    let recommender = Recommender::new(Arc::new(catalog), Arc::new(vectorizer));
    let app = create_router(AppState::new(recommender, 4));
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_analyze_returns_better_alternatives() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "111" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["input_barcode"], "111");
    assert_eq!(
        body["product"],
        json!({
            "name": "Whole Milk",
            "code": "111",
            "nutriscore": 5.0,
            "nutrigrade": "C",
            "allergens": "en:milk"
        })
    );

    let recommendations = body["recommendations"].as_array().unwrap();
    assert!(recommendations.len() <= 4);
    assert_eq!(recommendations[0]["code"], "222");
    assert_eq!(recommendations[0]["nutrigrade"], "B");
    assert_eq!(recommendations[0]["allergens"], "en:milk");
    assert!(recommendations[0]["similarity"].as_f64().unwrap() > 0.5);

    for rec in recommendations {
        assert!(rec["nutriscore"].as_f64().unwrap() < 5.0);
        assert_ne!(rec["code"], "333");
        assert_ne!(rec["code"], "555");
    }
}

#[tokio::test]
async fn test_analyze_default_top_n_and_explicit_top_n() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "601" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 4);

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "601", "top_n": 10 }))
        .await;
    let body: Value = response.json();
    // Every other product scores below 12 except the one without a score
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn test_analyze_top_n_zero_returns_product_only() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "111", "top_n": 0 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["product"]["code"], "111");
    assert_eq!(body["recommendations"], json!([]));
}

#[tokio::test]
async fn test_analyze_numeric_barcode() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": 222 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["product"]["name"], "Skim Milk");
}

#[tokio::test]
async fn test_analyze_missing_score_serializes_null() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "555" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["product"]["nutriscore"], Value::Null);
    assert_eq!(body["product"]["nutrigrade"], Value::Null);
    assert_eq!(body["product"]["allergens"], Value::Null);
    assert_eq!(body["recommendations"], json!([]));
}

#[tokio::test]
async fn test_analyze_unknown_barcode_is_not_found() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": " 999 " }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "status": "error",
            "message": "Product not found",
            "barcode": "999"
        })
    );
}

#[tokio::test]
async fn test_analyze_non_digit_barcode_is_not_found() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "abc" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analyze_null_barcode_is_not_found() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": null }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "status": "error",
            "message": "Product not found",
            "barcode": ""
        })
    );
}

#[tokio::test]
async fn test_analyze_missing_barcode_is_bad_request() {
    let server = create_test_server();

    let response = server.post("/api/analyze").json(&json!({ "top_n": 3 })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "barcode is required");

    let response = server.post("/api/analyze").text("barcode=111").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_invalid_top_n_is_bad_request() {
    let server = create_test_server();

    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "111", "top_n": -1 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "6f1c2a3e-8b4d-4f5a-9c7e-1d2b3c4d5e6f";

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_state_from_config_loads_files() {
    let mut catalog_file = tempfile::NamedTempFile::new().unwrap();
    write!(catalog_file, "{}", CATALOG_CSV).unwrap();

    let vectorizer = test_vectorizer(&test_catalog());
    let mut vectorizer_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        vectorizer_file,
        "{}",
        serde_json::to_string(&vectorizer.to_artifact()).unwrap()
    )
    .unwrap();

    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        catalog_path: catalog_file.path().display().to_string(),
        vectorizer_path: vectorizer_file.path().display().to_string(),
        candidate_limit: 1,
        default_top_n: 4,
    };

    let state = AppState::from_config(&config).unwrap();
    assert_eq!(state.recommender.catalog().len(), 11);

    let server = TestServer::new(create_router(state)).unwrap();
    let response = server
        .post("/api/analyze")
        .json(&json!({ "barcode": "601" }))
        .await;
    let body: Value = response.json();
    // Candidate cap of one keeps only the first better product in catalog order
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 1);
    assert_eq!(body["recommendations"][0]["code"], "111");
}

#[tokio::test]
async fn test_state_from_config_fails_without_files() {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        catalog_path: "/nonexistent/ready.csv".to_string(),
        vectorizer_path: "/nonexistent/tfidf.json".to_string(),
        candidate_limit: 3000,
        default_top_n: 4,
    };

    assert!(AppState::from_config(&config).is_err());
}
