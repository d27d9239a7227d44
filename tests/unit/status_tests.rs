// Status projection through the public API

use reelfork::cache::CacheStats;
use reelfork::narrative::NarrativeState;
use reelfork::playback::{PlaybackStatus, Progress};
use reelfork::status::{project, ProjectorInputs};

#[test]
fn test_snapshot_combines_all_inputs() {
    let inputs = ProjectorInputs {
        playback: PlaybackStatus::Playing,
        progress: Progress {
            position_ms: 3_000,
            duration_ms: Some(12_000),
        },
        cache: CacheStats {
            file_count: 2,
            total_size_bytes: 4 * 1024 * 1024,
        },
        narrative: NarrativeState::PlayingNode("forest".to_string()),
        pending_choices: Vec::new(),
    };

    let snapshot = project(&inputs);
    assert_eq!(snapshot.status_text, "Playing 'forest'");
    assert_eq!(snapshot.progress_percent, 25);
    assert_eq!(snapshot.player_state, PlaybackStatus::Playing);
    assert_eq!(snapshot.cache_summary, "2 files, 4.0 MiB");
}

#[test]
fn test_unknown_duration_reports_zero_progress() {
    let inputs = ProjectorInputs {
        progress: Progress {
            position_ms: 5_000,
            duration_ms: None,
        },
        ..Default::default()
    };
    assert_eq!(project(&inputs).progress_percent, 0);
}

#[test]
fn test_snapshot_serializes() {
    let snapshot = project(&ProjectorInputs::default());
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["status_text"], "Idle");
    assert_eq!(json["narrative"]["state"], "inactive");
}
