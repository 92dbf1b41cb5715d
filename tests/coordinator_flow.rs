use approx::assert_relative_eq;
use glam::Vec3;
use proptest::prelude::*;
use rtsaudio_audio::backend::{HeadlessBackend, Placement, VoiceStatus};
use rtsaudio_audio::{AudioSettings, ChannelKind, Control, PlaybackCoordinator, SoundFileSystem};
use rtsaudio_core::{AudioAffect, AudioEvent, AudioHandle, Category, EventInfo, EventRegistry};
use rtsaudio_testkit::{tone, MemoryFileSystem};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn registry() -> EventRegistry {
    let mut registry = EventRegistry::new();
    registry.insert(EventInfo {
        limit: 1,
        volume: 0.8,
        ..EventInfo::new("Wind", Category::Effect, "wind.wav")
    });
    registry.insert(EventInfo {
        positional: true,
        min_distance: 10.0,
        max_distance: 200.0,
        ..EventInfo::new("Explosion", Category::Effect, "boom.wav")
    });
    registry.insert(EventInfo {
        positional: true,
        looping: true,
        ..EventInfo::new("Campfire", Category::Effect, "fire.wav")
    });
    registry.insert(EventInfo {
        attack: vec!["gun_in.wav".into()],
        decay: vec!["gun_out.wav".into()],
        ..EventInfo::new("Minigun", Category::Effect, "gun_loop.wav")
    });
    registry.insert(EventInfo {
        voice: true,
        ..EventInfo::new("TankReady", Category::Speech, "ready.wav")
    });
    registry.insert(EventInfo::new("Click", Category::Effect, "click.wav"));
    registry.insert(EventInfo::new("Theme", Category::Music, "theme.wav"));
    registry.insert(EventInfo::new("Battle", Category::Music, "battle.wav"));
    registry
}

fn files() -> MemoryFileSystem {
    MemoryFileSystem::new()
        .with_file("wind.wav", tone(200.0, 3_000, 8_000))
        .with_file("boom.wav", tone(80.0, 2_000, 8_000))
        .with_file("fire.wav", tone(120.0, 500, 8_000))
        .with_file("gun_in.wav", tone(500.0, 100, 8_000))
        .with_file("gun_loop.wav", tone(500.0, 200, 8_000))
        .with_file("gun_out.wav", tone(500.0, 100, 8_000))
        .with_file("ready.wav", tone(300.0, 800, 8_000))
        .with_file("click.wav", tone(900.0, 60, 8_000))
        .with_file("theme.wav", tone(220.0, 10_000, 8_000))
        .with_file("battle.wav", tone(330.0, 10_000, 8_000))
}

fn coordinator() -> (PlaybackCoordinator, HeadlessBackend) {
    let fs: Arc<dyn SoundFileSystem> = Arc::new(files());
    let backend = HeadlessBackend::new(Arc::clone(&fs));
    let audio = PlaybackCoordinator::new(Box::new(backend.clone()), fs, Arc::new(registry()))
        .with_seed(11);
    (audio, backend)
}

#[test]
fn wind_limit_keeps_one_instance() {
    let (mut audio, _backend) = coordinator();
    let first = audio.submit_play(AudioEvent::new("Wind"));
    let second = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();

    assert_eq!(audio.active_sound_count(), 1);
    assert!(audio.sound(first).is_some());
    assert!(audio.sound(second).is_none());
    let wind = audio.sound(first).unwrap();
    assert_eq!(wind.kind(), ChannelKind::Sample2D);
    assert_relative_eq!(wind.volume(), 0.8);
    assert!(audio.does_violate_limit(&AudioEvent::new("Wind")));
    assert!(!audio.does_violate_limit(&AudioEvent::new("Click")));
}

#[test]
fn stop_before_update_prevents_registration() {
    let (mut audio, _backend) = coordinator();
    let handle = audio.submit_play(AudioEvent::new("Click"));
    audio.submit_control(handle, Control::Stop);
    audio.update();
    assert!(audio.sound(handle).is_none());
}

#[test]
fn pause_resume_stop_interleaving() {
    let (mut audio, backend) = coordinator();
    let handle = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();

    audio.submit_control(handle, Control::Pause);
    audio.update();
    assert_eq!(audio.sound(handle).unwrap().status(), VoiceStatus::Paused);

    backend.advance(Duration::from_secs(10));
    audio.update();
    assert!(audio.sound(handle).is_some());

    audio.submit_control(handle, Control::Resume);
    audio.update();
    assert_eq!(audio.sound(handle).unwrap().status(), VoiceStatus::Playing);

    audio.submit_control(handle, Control::Stop);
    audio.submit_control(handle, Control::Resume);
    audio.update();
    assert!(audio.sound(handle).is_none());
}

#[test]
fn stop_category_music_leaves_other_sounds() {
    let (mut audio, _backend) = coordinator();
    let theme = audio.submit_play(AudioEvent::new("Theme"));
    let battle = audio.submit_play(AudioEvent::new("Battle"));
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    let ready = audio.submit_play(AudioEvent::new("TankReady"));
    let boom = audio.submit_play(AudioEvent::new("Explosion").at(Vec3::new(5.0, 0.0, 0.0)));
    audio.update();
    assert_eq!(audio.active_sound_count(), 5);

    audio.stop_category(AudioAffect::MUSIC);
    assert!(audio.sound(theme).is_none());
    assert!(audio.sound(battle).is_none());
    for handle in [wind, ready, boom] {
        assert!(audio.sound(handle).is_some());
    }
}

#[test]
fn stop_the_music_sentinel_fans_out() {
    let (mut audio, _backend) = coordinator();
    audio.submit_play(AudioEvent::new("Theme"));
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();
    audio.submit_control(AudioHandle::STOP_THE_MUSIC_FADE, Control::Stop);
    audio.update();
    assert_eq!(audio.active_sound_count(), 1);
    assert!(audio.sound(wind).is_some());
}

#[test]
fn pause_category_only_touches_matching_sounds() {
    let (mut audio, _backend) = coordinator();
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    let boom = audio.submit_play(AudioEvent::new("Explosion").at(Vec3::new(5.0, 0.0, 0.0)));
    audio.update();

    audio.pause_category(AudioAffect::SOUND_3D, true);
    assert!(audio.sound(boom).unwrap().is_paused());
    assert!(!audio.sound(wind).unwrap().is_paused());

    audio.pause_category(AudioAffect::ALL, false);
    assert!(!audio.sound(boom).unwrap().is_paused());
}

#[test]
fn volume_override_then_restore() {
    let (mut audio, _backend) = coordinator();
    audio.set_listener(Vec3::ZERO, Vec3::Y);
    let boom = audio.submit_play(AudioEvent::new("Explosion").at(Vec3::new(40.0, 0.0, 0.0)));
    audio.update();
    let computed = audio.sound(boom).unwrap().volume();
    assert_relative_eq!(computed, 0.25);

    audio.adjust_volume_of_playing_audio("Explosion", 0.0);
    audio.update();
    assert_eq!(audio.sound(boom).unwrap().volume(), 0.0);

    audio.adjust_volume_of_playing_audio("Explosion", -1.0);
    audio.update();
    assert_relative_eq!(audio.sound(boom).unwrap().volume(), computed);
}

#[test]
fn settings_change_recomputes_non_positional_volume() {
    let (mut audio, _backend) = coordinator();
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();
    audio.set_sound_volume(0.5);
    audio.update();
    assert_relative_eq!(audio.sound(wind).unwrap().volume(), 0.4);

    audio.update_settings(AudioSettings {
        muted: true,
        ..audio.settings().clone()
    });
    audio.update();
    assert_eq!(audio.sound(wind).unwrap().volume(), 0.0);
}

#[test]
fn positional_sounds_follow_listener_and_cut_off() {
    let (mut audio, backend) = coordinator();
    let boom = audio.submit_play(AudioEvent::new("Explosion").at(Vec3::new(0.0, 20.0, 0.0)));
    audio.update();
    assert_relative_eq!(audio.sound(boom).unwrap().volume(), 0.5);
    let voice = &backend.voices_for("boom.wav")[0];
    assert!(voice.spatial);
    assert_eq!(
        voice.placement,
        Placement::World {
            position: Vec3::new(0.0, 20.0, 0.0),
            min_distance: 10.0
        }
    );

    audio.set_listener(Vec3::new(0.0, -300.0, 0.0), Vec3::Y);
    audio.update();
    assert_eq!(audio.sound(boom).unwrap().volume(), 0.0);
    assert_eq!(backend.listener().position, Vec3::new(0.0, -300.0, 0.0));
    assert_eq!(backend.listener().up, Vec3::Z);
}

#[test]
fn moved_sound_updates_placement_and_volume() {
    let (mut audio, backend) = coordinator();
    let boom = audio.submit_play(AudioEvent::new("Explosion").at(Vec3::new(0.0, 20.0, 0.0)));
    audio.update();
    assert_relative_eq!(audio.sound(boom).unwrap().volume(), 0.5);

    audio.set_audio_event_position(boom, Some(Vec3::new(40.0, 0.0, 0.0)));
    audio.update();
    let voice = &backend.voices_for("boom.wav")[0];
    assert_eq!(
        voice.placement,
        Placement::World {
            position: Vec3::new(40.0, 0.0, 0.0),
            min_distance: 10.0
        }
    );
    assert_relative_eq!(audio.sound(boom).unwrap().volume(), 0.25);
    assert_relative_eq!(voice.volume, 0.25);

    audio.set_audio_event_position(boom, Some(Vec3::new(0.0, 0.0, 250.0)));
    audio.update();
    assert_eq!(audio.sound(boom).unwrap().volume(), 0.0);
    assert_eq!(
        audio.sound(boom).unwrap().event().position(),
        Some(Vec3::new(0.0, 0.0, 250.0))
    );
}

#[test]
fn kill_stops_without_waiting_for_update() {
    let (mut audio, backend) = coordinator();
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();

    audio.kill_audio_event_immediately(wind);
    assert!(audio.sound(wind).is_none());
    assert_eq!(audio.active_sound_count(), 0);
    assert!(backend.voices_for("wind.wav").is_empty());
}

#[test]
fn attack_and_decay_play_around_main_sample() {
    let (mut audio, backend) = coordinator();
    let gun = audio.submit_play(AudioEvent::new("Minigun"));
    audio.update();
    assert_eq!(audio.sound(gun).unwrap().sample_channel().unwrap().pending(), 2);

    let mut heard = Vec::new();
    for _ in 0..20 {
        if let Some(sound) = audio.sound(gun) {
            let file = sound.sample_channel().unwrap().current().filename.clone();
            if heard.last() != Some(&file) {
                heard.push(file);
            }
        }
        backend.advance(Duration::from_millis(50));
        audio.update();
    }
    assert_eq!(heard, vec!["gun_in.wav", "gun_loop.wav", "gun_out.wav"]);
    assert!(audio.sound(gun).is_none());
}

#[test]
fn looping_sound_is_not_finalized() {
    let (mut audio, backend) = coordinator();
    let fire = audio.submit_play(AudioEvent::new("Campfire").at(Vec3::ZERO));
    audio.update();
    for _ in 0..10 {
        backend.advance(Duration::from_millis(250));
        audio.update();
    }
    assert!(audio.sound(fire).is_some());
    assert!(backend.voices_for("fire.wav")[0].loops >= 4);
}

#[test]
fn ambient_pause_is_idempotent_and_covers_new_sounds() {
    let (mut audio, _backend) = coordinator();
    let fire = audio.submit_play(AudioEvent::new("Campfire").at(Vec3::ZERO));
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();

    audio.pause_ambient(true);
    audio.pause_ambient(true);
    assert!(audio.sound(fire).unwrap().is_paused());
    assert!(!audio.sound(wind).unwrap().is_paused());

    let boom = audio.submit_play(AudioEvent::new("Explosion").at(Vec3::ONE));
    audio.update();
    assert!(audio.sound(boom).unwrap().is_paused());

    audio.pause_ambient(false);
    assert!(!audio.sound(fire).unwrap().is_paused());
    assert!(!audio.sound(boom).unwrap().is_paused());
}

#[test]
fn owner_queries_and_bulk_stops() {
    let (mut audio, _backend) = coordinator();
    audio.submit_play(AudioEvent::new("TankReady").from_object(3));
    audio.submit_play(AudioEvent::new("Explosion").at(Vec3::ZERO).from_object(3));
    let other = audio.submit_play(AudioEvent::new("Click").from_drawable(9));
    audio.update();

    assert!(audio.is_object_playing_voice(3));
    assert!(!audio.is_object_playing_voice(4));
    assert!(audio.is_playing_already("Explosion"));

    audio.stop_all_ambients_by_object(3);
    assert!(!audio.is_object_playing_voice(3));
    assert_eq!(audio.active_sound_count(), 1);

    audio.stop_all_ambients_by_drawable(9);
    assert!(audio.sound(other).is_none());
}

#[test]
fn persistent_override_applies_to_future_plays() {
    let (mut audio, _backend) = coordinator();
    audio.set_event_volume_override("Click", 0.0);
    let muted = audio.submit_play(AudioEvent::new("Click"));
    let wind = audio.submit_play(AudioEvent::new("Wind"));
    audio.update();
    assert_eq!(audio.sound(muted).unwrap().volume(), 0.0);

    audio.remove_all_disabled_audio();
    assert!(audio.sound(muted).is_none());
    assert!(audio.sound(wind).is_some());

    audio.set_event_volume_override("Click", -1.0);
    let audible = audio.submit_play(AudioEvent::new("Click"));
    audio.update();
    assert_relative_eq!(audio.sound(audible).unwrap().volume(), 1.0);
}

#[test]
fn remove_playing_audio_and_reset() {
    let (mut audio, _backend) = coordinator();
    audio.submit_play(AudioEvent::new("Click"));
    audio.submit_play(AudioEvent::new("Click"));
    audio.submit_play(AudioEvent::new("Theme"));
    audio.update();
    audio.remove_playing_audio("Click");
    assert!(!audio.is_playing_already("Click"));
    assert_eq!(audio.active_sound_count(), 1);

    audio.submit_play(AudioEvent::new("Wind"));
    audio.reset();
    audio.update();
    assert_eq!(audio.active_sound_count(), 0);
    assert_eq!(audio.music_track_name(), "");
}

#[derive(Debug, Clone)]
enum Op {
    Play(u8),
    Pause(u8),
    Resume(u8),
    Stop(u8),
    Update,
    Advance(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4).prop_map(Op::Play),
        (0u8..16).prop_map(Op::Pause),
        (0u8..16).prop_map(Op::Resume),
        (0u8..16).prop_map(Op::Stop),
        Just(Op::Update),
        (10u16..400).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn handles_map_to_at_most_one_sound(ops in proptest::collection::vec(op(), 1..60)) {
        let (mut audio, backend) = coordinator();
        let events = ["Click", "Wind", "Explosion", "Theme"];
        let mut submitted: Vec<AudioHandle> = Vec::new();
        let mut stop_pending: HashSet<AudioHandle> = HashSet::new();
        let mut stopped: HashSet<AudioHandle> = HashSet::new();

        for op in ops {
            match op {
                Op::Play(i) => {
                    let event = AudioEvent::new(events[usize::from(i) % events.len()])
                        .at(Vec3::new(15.0, 0.0, 0.0));
                    submitted.push(audio.submit_play(event));
                }
                Op::Pause(k) | Op::Resume(k) | Op::Stop(k) if submitted.is_empty() => {
                    let _ = k;
                }
                Op::Pause(k) => {
                    let handle = submitted[usize::from(k) % submitted.len()];
                    audio.submit_control(handle, Control::Pause);
                }
                Op::Resume(k) => {
                    let handle = submitted[usize::from(k) % submitted.len()];
                    audio.submit_control(handle, Control::Resume);
                }
                Op::Stop(k) => {
                    let handle = submitted[usize::from(k) % submitted.len()];
                    audio.submit_control(handle, Control::Stop);
                    stop_pending.insert(handle);
                }
                Op::Update => {
                    audio.update();
                    stopped.extend(stop_pending.drain());
                }
                Op::Advance(ms) => backend.advance(Duration::from_millis(u64::from(ms))),
            }

            let mut seen = HashSet::new();
            for sound in audio.sounds() {
                prop_assert!(seen.insert(sound.handle()));
            }
            for handle in &stopped {
                prop_assert!(audio.sound(*handle).is_none());
            }
            prop_assert_eq!(seen.len(), audio.active_sound_count());
            prop_assert!(audio.sounds().filter(|s| s.event().name() == "Wind").count() <= 1);
        }
    }
}
