mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::Engine;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use photo_classifier::{models::ModelManager, web::create_app};
use std::sync::Once;
use tower::ServiceExt;

static INIT: Once = Once::new();

fn app() -> Router {
    let config = common::config(8, 8, 2, 1);
    INIT.call_once(|| {
        ModelManager::install(
            common::brightness_session(8, 8),
            common::brightness_labels(),
            config.clone(),
        )
        .unwrap();
    });
    create_app(config)
}

fn encoded_image(color: [u8; 3]) -> String {
    let bytes = common::png_bytes(&RgbImage::from_pixel(8, 8, Rgb(color)));
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn json_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn predict_json_returns_ranked_labels() {
    let request = json_request(serde_json::json!({
        "image": encoded_image([0, 0, 0]),
        "top_k": 2
    }));
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);

    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["success"], true);
    let predictions = value["data"]["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["label"], "dark");
    assert_eq!(predictions[1]["label"], "bright");
}

#[tokio::test]
async fn predict_json_text_format() {
    let request = json_request(serde_json::json!({
        "image": format!("data:image/png;base64,{}", encoded_image([255, 255, 255])),
        "output_format": "text"
    }));
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Predicted Class: bright with Confidence: 1");
}

#[tokio::test]
async fn predict_json_validation_errors() {
    let (status, body) = send(app(), json_request(serde_json::json!({ "image": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("VALIDATION_ERROR"));

    let request = json_request(serde_json::json!({
        "image": encoded_image([1, 2, 3]),
        "top_k": 0
    }));
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_json_bad_base64() {
    let (status, body) = send(app(), json_request(serde_json::json!({ "image": "@@@" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("BASE64_DECODE_ERROR"));
}

#[tokio::test]
async fn predict_upload_multipart() {
    let boundary = "XBOUNDARYX";
    let image = common::png_bytes(&RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])));

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"top_k\"\r\n\r\n2\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"output_format\"\r\n\r\ntext\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(&image);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/predict/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "bright: 100.00%\ndark: 0.00%");
}

/// 伪随机噪声图，PNG 几乎无法压缩
fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9E37_79B9;
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        Rgb([channel(), channel(), channel()])
    });
    common::png_bytes(&image)
}

#[tokio::test]
async fn predict_json_accepts_camera_sized_photo() {
    let bytes = noise_png(1100, 1100);
    assert!(bytes.len() > 3 * 1024 * 1024);

    let request = json_request(serde_json::json!({
        "image": base64::engine::general_purpose::STANDARD.encode(bytes),
        "top_k": 2
    }));
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["data"]["predictions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn predict_upload_reports_unreadable_field() {
    let boundary = "XBOUNDARYX";
    // 字段内容未以分隔符结束
    let body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"top_k\"\r\n\r\n2",
        boundary
    );

    let request = Request::builder()
        .method("POST")
        .uri("/predict/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Failed to read top_k field"), "{}", body);
}

#[tokio::test]
async fn health_and_info() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));

    let request = Request::builder().uri("/api/info").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["model"]["num_classes"], 2);
    assert_eq!(value["model"]["backend"], "brightness");
}

#[tokio::test]
async fn index_page_served_with_security_headers() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
