//! Tests decoding of `/upload-card` bodies into extraction results.

use card_connect_core::{FieldKey, NOT_AVAILABLE, UploadCardResponse};

#[test]
fn upload_response_decoding_tests_accepts_missing_title() {
    // The reference service omits `title` entirely.
    let raw = br#"{
        "status": "success",
        "message": "Card uploaded successfully",
        "gcp_url": "https://storage.example.test/card.png",
        "extracted_data": {"name": "Jane Doe", "email": "jane@acme.com", "phone": "", "company": "Acme"},
        "boxes": {"name": {"x": 10, "y": 20, "width": 100, "height": 20}, "phone": null},
        "raw_text": "Jane Doe\nAcme"
    }"#;

    let result = UploadCardResponse::from_json_bytes(raw)
        .expect("body should decode")
        .into_result();

    assert_eq!(result.fields.title, None);
    assert_eq!(result.fields.display_value(&FieldKey::Title), NOT_AVAILABLE);
    assert_eq!(result.fields.display_value(&FieldKey::Phone), NOT_AVAILABLE);
    assert_eq!(result.boxes.len(), 1);
    assert_eq!(
        result.stored_url.as_deref(),
        Some("https://storage.example.test/card.png")
    );
    assert_eq!(result.raw_text.as_deref(), Some("Jane Doe\nAcme"));
}

#[test]
fn upload_response_decoding_tests_latest_duplicate_box_wins() {
    let raw = br#"{
        "extracted_data": {},
        "boxes": {
            "name": {"x": 1, "y": 1, "width": 1, "height": 1},
            "name": {"x": 7, "y": 8, "width": 9, "height": 10}
        }
    }"#;

    let result = UploadCardResponse::from_json_bytes(raw)
        .expect("body should decode")
        .into_result();

    let name_box = &result.boxes[&FieldKey::Name];
    assert_eq!((name_box.x, name_box.y), (7.0, 8.0));
    assert!(result.fields.is_empty());
}

#[test]
fn upload_response_decoding_tests_rejects_missing_extracted_data() {
    assert!(UploadCardResponse::from_json_bytes(br#"{"boxes": {}}"#).is_err());
    assert!(UploadCardResponse::from_json_bytes(b"<html>").is_err());
}
