//! Integration tests for releasing superseded card previews.

mod common;

use card_connect_core::ImageSize;
use card_connect_intake::SelectedFile;

use common::{card_file, controller};

#[test]
fn preview_release_tests_at_most_one_preview_is_live() {
    let (mut controller, surface) = controller();

    for name in ["a.png", "b.png", "c.png"] {
        controller.select_file(card_file(name)).expect("png accepted");
        assert_eq!(surface.live_handles(), 1);
    }

    let handle = controller.card().expect("card selected").handle();
    assert!(surface.is_live(handle));
    assert_eq!(
        controller.view().preview_uri,
        Some(format!("card-preview:{}", handle.id()))
    );
}

#[test]
fn preview_release_tests_rejected_file_keeps_current_preview() {
    let (mut controller, surface) = controller();
    controller.select_file(card_file("a.png")).expect("png accepted");
    let handle = controller.card().expect("card selected").handle();

    let _ = controller.select_file(SelectedFile::new("notes.txt", b"plain".to_vec()));

    assert!(surface.is_live(handle));
    assert_eq!(surface.live_handles(), 1);
}

#[test]
fn preview_release_tests_natural_size_comes_from_image_header() {
    let (mut controller, _surface) = controller();
    controller.select_file(card_file("a.png")).expect("png accepted");

    assert_eq!(
        controller.card().and_then(|card| card.natural_size()),
        Some(ImageSize::new(400.0, 200.0))
    );

    controller.set_natural_size(ImageSize::new(800.0, 400.0));
    assert_eq!(
        controller.card().and_then(|card| card.natural_size()),
        Some(ImageSize::new(800.0, 400.0))
    );
}
