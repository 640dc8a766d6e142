use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use intake_engine::{
    image_data_url, EngineSettings, HttpRecordSaver, RecordSaver, SaveError, SaveRecordBody,
};

fn settings(server: &MockServer) -> EngineSettings {
    EngineSettings {
        save_endpoint: format!("{}/save", server.uri()),
        auth_token: "sekrit".to_string(),
        ..EngineSettings::default()
    }
}

fn record() -> SaveRecordBody {
    SaveRecordBody {
        original_data: json!({ "output": { "items": [] } }),
        edited_data: json!({ "output": { "items": [ { "qty": { "value": 2 } } ] } }),
        image_data: Some(image_data_url("image/jpeg", &[0xff, 0xd8])),
    }
}

#[tokio::test]
async fn save_posts_the_camel_case_body_with_a_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .and(header("Authorization", "Bearer sekrit"))
        .and(body_partial_json(json!({
            "originalData": { "output": { "items": [] } },
            "editedData": { "output": { "items": [ { "qty": { "value": 2 } } ] } },
            "imageData": "data:image/jpeg;base64,/9g="
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let saver = HttpRecordSaver::new(settings(&server));
    let ack = saver.save(record()).await.expect("save ok");
    assert_eq!(ack.id, Some(json!(7)));
}

#[tokio::test]
async fn a_rejection_surfaces_the_detail_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "missing supplier" })),
        )
        .mount(&server)
        .await;

    let saver = HttpRecordSaver::new(settings(&server));
    let err = saver.save(record()).await.unwrap_err();
    match err {
        SaveError::Rejected { status, detail } => {
            assert_eq!(status, 422);
            assert_eq!(detail, "missing supplier");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn a_plain_text_rejection_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let saver = HttpRecordSaver::new(settings(&server));
    let err = saver.save(record()).await.unwrap_err();
    match err {
        SaveError::Rejected { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
