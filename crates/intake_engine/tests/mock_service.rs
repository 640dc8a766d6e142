use intake_engine::{MockOcrService, OcrQueue, RemoteStatus, StatusFeed};

#[tokio::test]
async fn jobs_report_processing_then_complete_with_a_canned_payload() {
    let service = MockOcrService::new();

    let first = service
        .enqueue("f1.jpg", "image/jpeg", vec![1])
        .await
        .expect("enqueue");
    let second = service
        .enqueue("f2.jpg", "image/jpeg", vec![2])
        .await
        .expect("enqueue");
    assert_ne!(first, second);
    service.start(&first).await.expect("start is always ok");

    let statuses = service.fetch().await.expect("first poll");
    assert_eq!(statuses.len(), 2);
    assert!(statuses
        .iter()
        .all(|s| s.status == RemoteStatus::Processing));

    let statuses = service.fetch().await.expect("second poll");
    assert!(statuses.iter().all(|s| s.status == RemoteStatus::Completed));
    let result = statuses[0].result.as_ref().expect("result block");
    assert_eq!(result.filename.as_deref(), Some("f1.jpg"));
    let ocr = result.ocr_data.as_ref().expect("payload");
    assert_eq!(ocr["output"]["items"].as_array().map(|a| a.len()), Some(2));
}
