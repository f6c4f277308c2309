// End-to-end run lifecycle: scripted transport events driven through the
// accumulator, exactly as the main event loop does it

use std::thread;
use std::time::Duration;

use streamscribe::accumulator::{RunPhase, RunStatus, TranscriptAccumulator};
use streamscribe::capture::CapturedAudio;
use streamscribe::transport::{
    OneShotBackend, RunSubscription, ScriptedBackend, TranscriptEvent, TranscriptionBackend,
};

/// Poll a subscription into the accumulator until the run closes
fn drive(accumulator: &mut TranscriptAccumulator, subscription: &RunSubscription) {
    loop {
        match subscription.try_next() {
            Some(event) => {
                if accumulator.handle_event(subscription.run_id(), event) == RunStatus::Closed {
                    return;
                }
            }
            None => thread::sleep(Duration::from_millis(1)),
        }
    }
}

fn url_input() -> CapturedAudio {
    CapturedAudio::Url {
        value: "https://example.com/audio.mp3".to_string(),
    }
}

#[test]
fn test_streamed_fragments_join_in_delivery_order() {
    let backend = ScriptedBackend::from_transcript("Hello world", Duration::from_millis(2));
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    assert!(accumulator.is_loading());

    let subscription = backend.submit(url_input(), run_id).unwrap();
    drive(&mut accumulator, &subscription);

    assert_eq!(accumulator.committed_text(), "Hello world");
    assert_eq!(accumulator.phase(), RunPhase::Completed);
    assert!(!accumulator.is_loading());
}

#[test]
fn test_zero_fragments_then_error() {
    let backend = ScriptedBackend::new(
        vec![TranscriptEvent::Error("timeout".to_string())],
        Duration::ZERO,
    );
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    let subscription = backend.submit(url_input(), run_id).unwrap();
    drive(&mut accumulator, &subscription);

    assert_eq!(accumulator.committed_text(), "Error: timeout");
    assert_eq!(accumulator.phase(), RunPhase::Failed);
    assert!(!accumulator.is_loading());
}

#[test]
fn test_error_after_partial_fragments_discards_partial_text() {
    let backend = ScriptedBackend::new(
        vec![
            TranscriptEvent::Fragment("partial".to_string()),
            TranscriptEvent::Fragment("transcript".to_string()),
            TranscriptEvent::Error("connection reset".to_string()),
        ],
        Duration::ZERO,
    );
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    let subscription = backend.submit(url_input(), run_id).unwrap();
    drive(&mut accumulator, &subscription);

    assert_eq!(accumulator.committed_text(), "Error: connection reset");
    assert_eq!(accumulator.phase(), RunPhase::Failed);
}

#[test]
fn test_new_run_cancels_previous_subscription() {
    let slow_backend =
        ScriptedBackend::from_transcript("stale fragments from the old run", Duration::from_millis(5));
    let fast_backend = ScriptedBackend::from_transcript("fresh", Duration::ZERO);
    let mut accumulator = TranscriptAccumulator::new();

    let old_run = accumulator.begin_run();
    let old_subscription = slow_backend.submit(url_input(), old_run).unwrap();

    // User starts a new run while the old transport is still open
    let new_run = accumulator.begin_run();
    let new_subscription = fast_backend.submit(url_input(), new_run).unwrap();

    drive(&mut accumulator, &new_subscription);

    // Late events from the old run must not leak into the new transcript
    loop {
        match old_subscription.try_next() {
            Some(event) => {
                let terminal = event.is_terminal();
                assert_eq!(
                    accumulator.handle_event(old_subscription.run_id(), event),
                    RunStatus::Closed
                );
                if terminal {
                    break;
                }
            }
            None => thread::sleep(Duration::from_millis(1)),
        }
    }

    assert_eq!(accumulator.committed_text(), "fresh");
    assert_eq!(accumulator.phase(), RunPhase::Completed);
}

#[test]
fn test_progress_events_do_not_mutate_transcript() {
    let backend = ScriptedBackend::new(
        vec![
            TranscriptEvent::Progress(10.0),
            TranscriptEvent::Fragment("Hello".to_string()),
            TranscriptEvent::Progress(90.0),
            TranscriptEvent::Fragment("world".to_string()),
            TranscriptEvent::Completed,
        ],
        Duration::ZERO,
    );
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    let subscription = backend.submit_url("https://example.com/a.mp3", run_id).unwrap();
    drive(&mut accumulator, &subscription);

    assert_eq!(accumulator.committed_text(), "Hello world");
}

#[test]
fn test_one_shot_backend_is_a_single_fragment_run() {
    // A request/response backend must be indistinguishable at this interface:
    // one fragment with the whole transcript, then completion
    let backend = OneShotBackend::new(|_| Ok("The entire transcript at once".to_string()));
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    let subscription = backend.submit(url_input(), run_id).unwrap();
    drive(&mut accumulator, &subscription);

    assert_eq!(accumulator.committed_text(), "The entire transcript at once");
    assert_eq!(accumulator.phase(), RunPhase::Completed);
}

#[test]
fn test_one_shot_backend_error() {
    let backend = OneShotBackend::new(|_| Err("service unavailable".to_string()));
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    let subscription = backend.submit(url_input(), run_id).unwrap();
    drive(&mut accumulator, &subscription);

    assert_eq!(accumulator.committed_text(), "Error: service unavailable");
    assert_eq!(accumulator.phase(), RunPhase::Failed);
}

#[test]
fn test_loading_lifecycle() {
    let backend = ScriptedBackend::from_transcript("one two three", Duration::from_millis(2));
    let mut accumulator = TranscriptAccumulator::new();

    let run_id = accumulator.begin_run();
    assert!(accumulator.is_loading());

    let subscription = backend.submit(url_input(), run_id).unwrap();

    // Loading clears on the first fragment, not on completion
    loop {
        if let Some(event) = subscription.try_next() {
            let is_fragment = matches!(event, TranscriptEvent::Fragment(_));
            accumulator.handle_event(run_id, event);
            if is_fragment {
                break;
            }
        } else {
            thread::sleep(Duration::from_millis(1));
        }
    }
    assert!(!accumulator.is_loading());

    drive(&mut accumulator, &subscription);
    assert_eq!(accumulator.committed_text(), "one two three");
}
