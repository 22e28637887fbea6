//! Tests for the APOD HTTP client against a mock APOD service.

use std::time::Duration;

use apod_desktop::FetchError;
use apod_desktop::services::apod::{ApodClient, ApodProvider, ImageDownloader, MediaKind};
use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApodClient {
    ApodClient::new(
        &format!("{}/planetary/apod", server.uri()),
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
}

#[tokio::test]
async fn test_sends_key_date_and_thumbs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/planetary/apod"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("date", "2024-03-14"))
        .and(query_param("thumbs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "date": "2024-03-14",
            "title": "Pi in the Sky",
            "explanation": "A circular halo.",
            "media_type": "image",
            "url": "https://apod.nasa.gov/apod/image/2403/halo_1024.jpg",
            "hdurl": "https://apod.nasa.gov/apod/image/2403/halo.jpg",
            "service_version": "v1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server).get_apod_info(date()).await.unwrap();
    assert_eq!(record.title, "Pi in the Sky");
    assert_eq!(record.media_kind, MediaKind::Image);
    assert_eq!(
        record.image_url().unwrap(),
        "https://apod.nasa.gov/apod/image/2403/halo.jpg"
    );
}

#[tokio::test]
async fn test_non_success_status_is_remote_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "msg": "Date must be between Jun 16, 1995 and today."
        })))
        .mount(&server)
        .await;

    assert_matches!(
        client(&server).get_apod_info(date()).await,
        Err(FetchError::RemoteUnavailable(msg)) if msg.contains("400")
    );
}

#[tokio::test]
async fn test_unreachable_service_is_remote_unavailable() {
    let client = ApodClient::new("http://127.0.0.1:1/apod", "k", Duration::from_secs(2)).unwrap();
    assert_matches!(
        client.get_apod_info(date()).await,
        Err(FetchError::RemoteUnavailable(_))
    );
}

#[tokio::test]
async fn test_garbage_payload_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    assert_matches!(
        client(&server).get_apod_info(date()).await,
        Err(FetchError::MalformedRecord(_))
    );
}

#[tokio::test]
async fn test_unknown_media_type_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Interactive",
            "explanation": "An embedded page.",
            "media_type": "other",
            "url": "https://apod.nasa.gov/apod/interactive.html"
        })))
        .mount(&server)
        .await;

    assert_matches!(
        client(&server).get_apod_info(date()).await,
        Err(FetchError::MalformedRecord(_))
    );
}

#[tokio::test]
async fn test_downloads_image_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image/halo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .mount(&server)
        .await;

    let bytes = client(&server)
        .download_image(&format!("{}/image/halo.jpg", server.uri()))
        .await
        .unwrap();
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn test_missing_image_is_download_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/image/missing.jpg", server.uri());
    assert_matches!(
        client(&server).download_image(&url).await,
        Err(FetchError::DownloadFailed { url: failed, .. }) if failed == url
    );
}

#[tokio::test]
async fn test_trailing_slash_in_base_url_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/planetary/apod"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Slash",
            "explanation": "Trimmed.",
            "media_type": "image",
            "hdurl": "https://apod.nasa.gov/apod/image/slash.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApodClient::new(
        &format!("{}/planetary/apod/", server.uri()),
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(client.get_apod_info(date()).await.unwrap().title, "Slash");
}
