//! Benchmark smoke test for the deterministic decode, overlay, and compose loop.

use std::time::Instant;

use card_connect_composer::derive_personalized;
use card_connect_core::{ImageSize, UploadCardResponse};
use card_connect_overlay::{FitMode, OverlayMapper};

const REPLY: &[u8] = br#"{
    "extracted_data": {"name": "Jane Doe", "title": "CEO", "email": "jane@acme.com",
                       "phone": "555-1212", "company": "Acme"},
    "boxes": {
        "name": {"x": 10, "y": 20, "width": 100, "height": 20},
        "title": {"x": 10, "y": 45, "width": 60, "height": 14},
        "email": {"x": 10, "y": 60, "width": 140, "height": 18},
        "phone": {"x": 10, "y": 80, "width": 90, "height": 18},
        "company": {"x": 200, "y": 20, "width": 120, "height": 30}
    }
}"#;

#[test]
fn benchmark_pipeline_smoke_prints_latency() {
    let mapper = OverlayMapper::new(FitMode::Contain);
    let natural = Some(ImageSize::new(1_600.0, 900.0));
    let displayed = Some(ImageSize::new(480.0, 320.0));

    let start = Instant::now();
    let mut positioned = 0usize;
    let mut message_bytes = 0usize;

    for _ in 0..1_000 {
        let result = UploadCardResponse::from_json_bytes(REPLY)
            .expect("reply should decode")
            .into_result();
        positioned += mapper
            .map_all(&result.boxes, natural, displayed)
            .iter()
            .filter(|annotation| annotation.placement.rect().is_some())
            .count();
        message_bytes += derive_personalized(&result.fields).len();
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_pipeline_elapsed_ms={elapsed_ms}");
    println!("benchmark_positioned_total={positioned}");
    println!("benchmark_message_bytes_total={message_bytes}");

    assert_eq!(positioned, 5_000);
    // Loose bound; strict latency targets depend on the machine.
    assert!(
        elapsed_ms < 5_000,
        "pipeline smoke benchmark should stay bounded"
    );
}
