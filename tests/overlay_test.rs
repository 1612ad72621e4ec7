mod common;

use common::ScriptedSource;
use emote_overlay::assets::{EmoteIdentity, FrameTexture, LoadState, Provider};
use emote_overlay::config::{OverlaySettings, PoolSettings, StreamParams};
use emote_overlay::networking::{ChatMessage, EmoteTable, EmoteTags};
use emote_overlay::world::SlotPhase;
use emote_overlay::EmoteOverlay;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

fn overlay_with(settings: &OverlaySettings, source: &Arc<ScriptedSource>) -> EmoteOverlay {
    EmoteOverlay::with_rng(
        settings,
        source.clone(),
        FrameTexture::placeholder(128, 128),
        StreamParams::new(Some("forsen".to_string()), None),
        StdRng::seed_from_u64(42),
    )
}

fn seven_tv_table(names: &[&str]) -> EmoteTable {
    names
        .iter()
        .map(|name| (name.to_string(), EmoteIdentity::new(format!("7tv-{}", name), Provider::new("7TV"))))
        .collect()
}

#[tokio::test]
async fn test_slot_adopts_real_frames_without_rebinding() {
    let source = Arc::new(ScriptedSource::new());
    source.serve("PogChamp", 2, Some(vec![100, 100]), 128, 64);
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);
    let emote = EmoteIdentity::twitch("PogChamp");

    let slot = overlay.spawn(&emote).unwrap();
    let visuals = overlay.visuals();
    assert_eq!(visuals.len(), 1);
    assert!(visuals[0].texture.same_as(overlay.cache().placeholder()));
    assert!((visuals[0].scale.x - 0.15).abs() < 1e-6);
    assert!((visuals[0].scale.y - 0.15).abs() < 1e-6);

    overlay.settle_fetches().await;
    overlay.tick(Duration::from_millis(16));

    let visuals = overlay.visuals();
    assert_eq!(visuals[0].slot, slot);
    assert!(!visuals[0].texture.same_as(overlay.cache().placeholder()));
    assert!((visuals[0].scale.x - 0.3).abs() < 1e-6);
    assert_eq!(overlay.pool().slot(slot).unwrap().asset(), Some(&emote.id));
    assert_eq!(overlay.cache().get(&emote.id).unwrap().frame_count(), 2);
}

#[tokio::test]
async fn test_three_frame_animation_wraps() {
    let source = Arc::new(ScriptedSource::new());
    source.serve("25", 3, Some(vec![100, 100, 100]), 28, 28);
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);
    let emote = EmoteIdentity::twitch("25");

    overlay.spawn(&emote).unwrap();
    overlay.settle_fetches().await;
    assert_eq!(overlay.cache().state(&emote.id), Some(LoadState::Ready));

    let mut observed = vec![0];
    let mut advances = 0;
    for _ in 0..100 {
        advances += overlay.tick(Duration::from_millis(10)).frames_advanced;
        let frame = overlay.cache().get(&emote.id).unwrap().current_frame();
        if observed.last() != Some(&frame) {
            observed.push(frame);
        }
    }

    // Strictly-greater comparison: flips at 110ms, 210ms, ... 910ms.
    assert_eq!(advances, 9);
    assert_eq!(observed, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
}

#[tokio::test]
async fn test_animation_keeps_pace_with_tick_rate() {
    let source = Arc::new(ScriptedSource::new());
    source.serve("25", 3, Some(vec![100, 100, 100]), 28, 28);
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);
    let emote = EmoteIdentity::twitch("25");

    overlay.spawn(&emote).unwrap();
    overlay.settle_fetches().await;

    let advanced: Vec<usize> = (0..10)
        .map(|_| overlay.tick(Duration::from_millis(100)).frames_advanced)
        .collect();
    assert_eq!(advanced, vec![0, 1, 1, 1, 1, 1, 1, 1, 1, 1]);
    assert_eq!(overlay.cache().get(&emote.id).unwrap().current_frame(), 0);
}

#[tokio::test]
async fn test_request_beyond_capacity_is_dropped() {
    let source = Arc::new(ScriptedSource::new());
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);

    for i in 0..100 {
        assert!(overlay.spawn(&EmoteIdentity::twitch(format!("e{}", i))).is_some());
    }
    let before: Vec<_> = overlay.pool().active_slots().map(|slot| (slot.id(), slot.position())).collect();

    assert!(overlay.spawn(&EmoteIdentity::twitch("e100")).is_none());

    let after: Vec<_> = overlay.pool().active_slots().map(|slot| (slot.id(), slot.position())).collect();
    assert_eq!(before, after);
    assert_eq!(overlay.pool().active_count(), 100);
    assert_eq!(overlay.pool().idle_count(), 0);
    assert_eq!(overlay.pool().stats().dropped, 1);
    // Dropped before reaching the cache.
    assert!(!overlay.cache().contains(&"e100".into()));

    overlay.settle_fetches().await;
    overlay.tick(Duration::from_millis(16));
    assert_eq!(overlay.visuals().len(), 100);
}

#[tokio::test]
async fn test_released_slot_is_reused() {
    let source = Arc::new(ScriptedSource::new());
    let settings = OverlaySettings {
        pool: PoolSettings { capacity: 1, ..PoolSettings::default() },
        ..OverlaySettings::default()
    };
    let mut overlay = overlay_with(&settings, &source);

    let slot = overlay.spawn(&EmoteIdentity::twitch("25")).unwrap();
    assert!(overlay.spawn(&EmoteIdentity::twitch("26")).is_none());

    let mut released = Vec::new();
    let mut saw_shrinking = false;
    for _ in 0..125 {
        let report = overlay.tick(Duration::from_millis(100));
        released.extend(report.released);
        if let Some(SlotPhase::ShrinkingOut { .. }) = overlay.pool().slot(slot).map(|s| s.phase()) {
            saw_shrinking = true;
        }
    }

    assert!(saw_shrinking);
    assert_eq!(released, vec![slot]);
    assert_eq!(overlay.pool().idle_count(), 1);
    assert!(overlay.visuals().is_empty());
    assert_eq!(overlay.spawn(&EmoteIdentity::twitch("26")), Some(slot));
}

#[tokio::test]
async fn test_six_emote_words_spawn_four() {
    let source = Arc::new(ScriptedSource::new());
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);
    overlay.install_channel_table(seven_tv_table(&["A", "B", "C", "D", "E", "F"]));

    let message = ChatMessage::new("forsen", "viewer", "A B C D E F");
    let report = overlay.on_chat(&message);

    assert_eq!(report.requested, 4);
    assert_eq!(report.spawned.len(), 4);
    assert_eq!(report.dropped, 0);
    let bound: Vec<_> = overlay
        .pool()
        .active_slots()
        .filter_map(|slot| slot.asset().map(|id| id.as_str().to_string()))
        .collect();
    assert_eq!(bound, vec!["7tv-A", "7tv-B", "7tv-C", "7tv-D"]);
}

#[tokio::test]
async fn test_drop_does_not_block_other_occurrences() {
    let source = Arc::new(ScriptedSource::new());
    let settings = OverlaySettings {
        pool: PoolSettings { capacity: 2, ..PoolSettings::default() },
        ..OverlaySettings::default()
    };
    let mut overlay = overlay_with(&settings, &source);

    let tags = EmoteTags::parse("25:0-4,6-10,12-16,18-22");
    let report = overlay.on_message("Kappa Kappa Kappa Kappa", &tags);

    assert_eq!(report.requested, 3);
    assert_eq!(report.spawned.len(), 2);
    assert_eq!(report.dropped, 1);
    // Shared asset: one record, one fetch.
    assert_eq!(overlay.cache().len(), 1);
}

#[tokio::test]
async fn test_unfocused_overlay_ignores_chat() {
    let source = Arc::new(ScriptedSource::new());
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);
    overlay.install_channel_table(seven_tv_table(&["A"]));

    overlay.set_focused(false);
    assert_eq!(overlay.on_message("A", &EmoteTags::parse("25:0-4")).requested, 0);
    assert_eq!(overlay.pool().active_count(), 0);

    overlay.set_focused(true);
    assert_eq!(overlay.on_message("A", &EmoteTags::new()).spawned.len(), 1);
}

#[tokio::test]
async fn test_bootstrap_installs_channel_table() {
    let source = Arc::new(ScriptedSource::new());
    source.set_channel(seven_tv_table(&["catJAM"]));
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);

    assert!(overlay.bootstrap_channel("forsen").await);
    assert!(overlay.is_enabled());
    assert_eq!(overlay.resolver().table().len(), 1);
    assert_eq!(overlay.on_message("catJAM", &EmoteTags::new()).spawned.len(), 1);
}

#[tokio::test]
async fn test_bootstrap_failure_disables_overlay() {
    let source = Arc::new(ScriptedSource::new());
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);

    assert!(!overlay.bootstrap_channel("nobody").await);
    assert!(!overlay.is_enabled());

    let report = overlay.on_message("Kappa", &EmoteTags::parse("25:0-4"));
    assert_eq!(report.requested, 0);
    assert!(overlay.cache().is_empty());

    // Ticking a disabled overlay is still safe.
    overlay.tick(Duration::from_millis(16));
}

#[tokio::test]
async fn test_failed_fetch_keeps_fallback_visible() {
    let source = Arc::new(ScriptedSource::new());
    source.fail_provisioning();
    let mut overlay = overlay_with(&OverlaySettings::default(), &source);
    let emote = EmoteIdentity::twitch("404");

    overlay.spawn(&emote).unwrap();
    overlay.settle_fetches().await;
    overlay.tick(Duration::from_millis(16));

    assert_eq!(overlay.cache().state(&emote.id), Some(LoadState::Failed));
    let visuals = overlay.visuals();
    assert_eq!(visuals.len(), 1);
    assert!(visuals[0].texture.same_as(overlay.cache().placeholder()));
}
