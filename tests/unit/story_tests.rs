// Story loading from files

use reelfork::narrative::{Story, StoryError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_story_loaded_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
nodes:
  - id: start
    media: https://cdn.example.com/intro.mp4
    decision_window_ms: 8000
    choices:
      - {{ label: stay, target: cellar }}
      - {{ label: flee, target: end }}
  - id: cellar
    media: file:///srv/media/cellar.mp4
"#
    )
    .unwrap();

    let story = Story::from_file(file.path()).unwrap();
    assert_eq!(story.len(), 2);
    assert_eq!(story.start().decision_window(), Some(Duration::from_secs(8)));
    assert!(story.start().choice("flee").unwrap().ends_story());
    assert!(story.node("cellar").unwrap().media.is_local());
    assert_eq!(story.media().filter(|m| m.is_remote()).count(), 1);
}

#[test]
fn test_story_file_with_dangling_target_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
nodes:
  - id: start
    media: /a.mp4
    decision_window_ms: 1000
    choices:
      - {{ label: go, target: attic }}
"#
    )
    .unwrap();

    let err = Story::from_file(file.path()).unwrap_err();
    assert!(matches!(err, StoryError::DanglingTarget { .. }));
    assert!(err.to_string().contains("attic"));
}

#[test]
fn test_missing_story_file_is_io_error() {
    assert!(matches!(
        Story::from_file("/nonexistent/story.yaml"),
        Err(StoryError::Io(_))
    ));
}
