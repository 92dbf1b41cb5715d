use approx::assert_relative_eq;
use glam::Vec3;
use rtsaudio_audio::backend::HeadlessBackend;
use rtsaudio_audio::{PlaybackCoordinator, SoundFileSystem};
use rtsaudio_core::{AudioEvent, Category, EventInfo, EventRegistry};
use rtsaudio_testkit::{tone, MemoryFileSystem};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (PlaybackCoordinator, HeadlessBackend, Arc<MemoryFileSystem>) {
    let mut registry = EventRegistry::new();
    registry.insert(EventInfo {
        positional: true,
        ..EventInfo::new("Gunshot", Category::Effect, "shot.wav")
    });
    registry.insert(EventInfo::new("Click", Category::Effect, "click.wav"));
    registry.insert(EventInfo::new("Theme", Category::Music, "theme.wav"));
    let files = Arc::new(
        MemoryFileSystem::new()
            .with_file("shot.wav", tone(150.0, 400, 8_000))
            .with_file("click.wav", tone(900.0, 250, 8_000))
            .with_file("theme.wav", tone(220.0, 1_500, 8_000)),
    );
    let fs: Arc<dyn SoundFileSystem> = files.clone();
    let backend = HeadlessBackend::new(Arc::clone(&fs));
    let audio = PlaybackCoordinator::new(Box::new(backend.clone()), fs, Arc::new(registry))
        .with_seed(5);
    (audio, backend, files)
}

#[test]
fn concurrent_plays_share_one_decode() {
    let (mut audio, backend, files) = setup();
    for x in 0..5 {
        audio.submit_play(AudioEvent::new("Gunshot").at(Vec3::new(x as f32, 0.0, 0.0)));
    }
    audio.update();
    assert_eq!(audio.active_sound_count(), 5);
    assert_eq!(files.decode_count("shot.wav"), 1);
    assert_eq!(audio.cache().len(), 1);
    assert_eq!(backend.voices_for("shot.wav").len(), 5);
}

#[test]
fn buffer_is_purged_once_the_last_sound_finishes() {
    let (mut audio, backend, files) = setup();
    audio.submit_play(AudioEvent::new("Click"));
    audio.update();
    assert!(audio.cache().contains("click.wav"));

    backend.advance(Duration::from_millis(300));
    audio.update();
    assert_eq!(audio.active_sound_count(), 0);
    assert!(audio.cache().is_empty());

    audio.submit_play(AudioEvent::new("Click"));
    audio.update();
    assert_eq!(files.decode_count("click.wav"), 2);
}

#[test]
fn buffer_survives_while_any_sound_holds_it() {
    let (mut audio, backend, files) = setup();
    audio.submit_play(AudioEvent::new("Click"));
    audio.update();
    backend.advance(Duration::from_millis(200));
    audio.submit_play(AudioEvent::new("Click"));
    audio.update();

    backend.advance(Duration::from_millis(100));
    audio.update();
    assert_eq!(audio.active_sound_count(), 1);
    assert!(audio.cache().contains("click.wav"));

    audio.submit_play(AudioEvent::new("Click"));
    audio.update();
    assert_eq!(files.decode_count("click.wav"), 1);
}

#[test]
fn streams_bypass_the_cache() {
    let (mut audio, _backend, _files) = setup();
    audio.submit_play(AudioEvent::new("Theme"));
    audio.update();
    assert_eq!(audio.stats().streams, 1);
    assert!(!audio.cache().contains("theme.wav"));
}

#[test]
fn file_length_probes() {
    let (mut audio, _backend, files) = setup();
    assert_relative_eq!(audio.get_file_length_ms("click.wav"), 250.0, epsilon = 0.01);
    assert_eq!(audio.get_file_length_ms(""), 0.0);
    assert_eq!(audio.get_file_length_ms("missing.wav"), 0.0);
    assert!(audio.cache().is_empty());

    audio.submit_play(AudioEvent::new("Gunshot").at(Vec3::ZERO));
    audio.update();
    let decodes = files.decode_count("shot.wav");
    assert_relative_eq!(audio.get_file_length_ms("shot.wav"), 400.0, epsilon = 0.01);
    assert_eq!(files.decode_count("shot.wav"), decodes);
}

#[test]
fn stats_count_by_channel_kind() {
    let (mut audio, _backend, _files) = setup();
    audio.submit_play(AudioEvent::new("Click"));
    audio.submit_play(AudioEvent::new("Gunshot").at(Vec3::ZERO));
    audio.submit_play(AudioEvent::new("Gunshot").at(Vec3::ONE));
    audio.submit_play(AudioEvent::new("Theme"));
    let queued = audio.stats();
    assert_eq!(queued.queued_requests, 4);

    audio.update();
    let stats = audio.stats();
    assert_eq!(
        (stats.samples_2d, stats.samples_3d, stats.streams),
        (1, 2, 1)
    );
    assert_eq!(stats.cached_buffers, 2);
    assert_eq!(stats.sample_limit_2d, audio.num_2d_samples());
    assert_eq!(stats.queued_requests, 0);
}
