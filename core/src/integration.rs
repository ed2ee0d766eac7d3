//! Integration tests for decode-to-playback flows
//!
//! Bytes built by the fixture builders go through the public decoders, the
//! selector and a full playback session.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::{PlaybackConfig, ReplayDirs};
    use crate::formats::{self, DecodeOptions, bsor, legacy};
    use crate::model::{NoteCutInfo, NoteEvent, NoteEventType, NoteInfo, ReplayKind, WallEvent};
    use crate::playback::{NullHost, PlaybackSession, PlaybackState, ReplayHost};
    use crate::selector::{BeatmapKey, ReplaySelector};
    use crate::test_utils::{BsorBuilder, LegacyBuilder, ScoreSaberBuilder, good_cut};

    // ============================================================================
    // Test host
    // ============================================================================

    /// Host that counts callbacks
    #[derive(Default)]
    struct CountingHost {
        cuts: usize,
        misses: usize,
        bombs: usize,
        walls_entered: usize,
        walls_exited: usize,
        heights: Vec<f32>,
    }

    impl ReplayHost for CountingHost {
        fn cut_note(&mut self, _live: Option<u64>, _note: &NoteEvent, _cut: &NoteCutInfo) {
            self.cuts += 1;
        }
        fn miss_note(&mut self, _live: Option<u64>, _note: &NoteEvent) {
            self.misses += 1;
        }
        fn hit_bomb(&mut self, _live: Option<u64>, _note: &NoteEvent) {
            self.bombs += 1;
        }
        fn enter_obstacle(&mut self, _wall: &WallEvent) {
            self.walls_entered += 1;
        }
        fn exit_obstacle(&mut self, _wall: &WallEvent) {
            self.walls_exited += 1;
        }
        fn set_player_height(&mut self, height: f32) {
            self.heights.push(height);
        }
    }

    fn note_key() -> i32 {
        NoteInfo {
            scoring_type: 1,
            line_index: 1,
            line_layer: 0,
            color_type: 0,
            cut_direction: 1,
        }
        .key()
    }

    fn bsor_play() -> Vec<u8> {
        BsorBuilder::new()
            .note(note_key(), 0.2, NoteEventType::Good, Some(good_cut(0)))
            .note(note_key(), 0.4, NoteEventType::Good, Some(good_cut(0)))
            .note(note_key(), 0.6, NoteEventType::Miss, None)
            .note(note_key(), 0.8, NoteEventType::Good, Some(good_cut(0)))
            .height(1.6, 0.1)
            .build()
    }

    fn play_to_end(session: &mut PlaybackSession, host: &mut dyn ReplayHost, step: f32) {
        let mut t = 0.0;
        while session.state() != PlaybackState::Ended && t < 60.0 {
            session.update_time(t, host);
            t += step;
        }
    }

    // ============================================================================
    // Decode and play
    // ============================================================================

    #[test]
    fn test_bsor_decode_and_play() {
        let options = DecodeOptions::default();
        let wrapper = formats::decode(&bsor_play(), formats::Format::Bsor, &options).unwrap();
        assert_eq!(wrapper.kind, ReplayKind::EVENT);

        let mut session = PlaybackSession::from_wrapper(&wrapper, &PlaybackConfig::default());
        let mut host = CountingHost::default();
        play_to_end(&mut session, &mut host, 0.05);

        assert_eq!(session.state(), PlaybackState::Ended);
        assert_eq!(host.cuts, 3);
        assert_eq!(host.misses, 1);
        assert_eq!(host.heights, vec![1.6]);

        // 1x, 1x, miss halves 2x back to 1x, 1x
        let snapshot = session.snapshot();
        assert_eq!(snapshot.score, 115 * 3);
        assert_eq!(snapshot.max_score, 115 * (1 + 1 + 2 + 2));
        assert_eq!(snapshot.combo, 1);
    }

    #[test]
    fn test_bsor_reencode_plays_identically() {
        let original = bsor::decode(&bsor_play()).unwrap();
        let events = original.replay.events().unwrap();
        let reencoded = bsor::decode(&bsor::encode(events)).unwrap();

        let mut a = PlaybackSession::from_wrapper(&original, &PlaybackConfig::default());
        let mut b = PlaybackSession::from_wrapper(&reencoded, &PlaybackConfig::default());
        for step in 0..=20 {
            let t = step as f32 * 0.05;
            assert_eq!(a.update_time(t, &mut NullHost), b.update_time(t, &mut NullHost));
            assert_eq!(a.snapshot(), b.snapshot());
        }
    }

    #[test]
    fn test_scoresaber_keyframes_override_simulation() {
        let bytes = ScoreSaberBuilder::new()
            .note(1, 0.05, 0.05)
            .score(115, 0.05, 115)
            .combo(1, 0.05)
            .energy(0.51, 0.05)
            .build();
        let options = DecodeOptions::default();
        let wrapper = formats::decode(&bytes, formats::Format::ScoreSaber, &options).unwrap();
        assert_eq!(wrapper.kind, ReplayKind::FRAME | ReplayKind::EVENT);

        let mut session = PlaybackSession::from_wrapper(&wrapper, &PlaybackConfig::default());
        session.update_time(0.2, &mut NullHost);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.score, 115);
        assert_eq!(snapshot.combo, 1);
        assert!((snapshot.energy - 0.51).abs() < 1e-6);
        assert_eq!(session.state(), PlaybackState::Ended);
    }

    #[test]
    fn test_legacy_preview_uses_keyframes() {
        let wrapper = legacy::decode(&LegacyBuilder::new(6).records(5).build()).unwrap();
        let session = PlaybackSession::from_wrapper(&wrapper, &PlaybackConfig::default());

        let preview = session.preview_at(1.0);
        assert_eq!(preview.score, 200);
        assert_eq!(preview.combo, 2);
        let percent = LegacyBuilder::frame(6, 2).percent.unwrap();
        assert_eq!(preview.max_score, (200.0_f32 / percent).round() as i32);
    }

    #[test]
    fn test_legacy_reencode_round_trip() {
        let wrapper = legacy::decode(&LegacyBuilder::new(6).records(4).build()).unwrap();
        let frames = wrapper.replay.frames().unwrap();
        let reencoded = legacy::decode(&legacy::encode(frames)).unwrap();
        assert_eq!(reencoded.replay.frames().unwrap().frames, frames.frames);
    }

    #[test]
    fn test_selector_to_session() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("bl");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("7656-Player-ExpertPlus-Standard-ABCDEF.bsor");
        std::fs::write(path, bsor_play()).unwrap();

        let selector = ReplaySelector::new(
            ReplayDirs {
                bsor_dir: Some(dir),
                ..Default::default()
            },
            DecodeOptions::default(),
        );
        let key = BeatmapKey::new("custom_level_ABCDEF", "ExpertPlus", "Standard");
        let found = selector.replays_for_beatmap(&key);
        assert_eq!(found.len(), 1);

        // Sessions share the decoded payload
        let session = PlaybackSession::from_wrapper(&found[0].replay, &PlaybackConfig::default());
        assert_eq!(Arc::strong_count(&found[0].replay.replay), 2);
        assert_eq!(session.preview_at(1.0).max_score, 115 * 6);
    }
}
