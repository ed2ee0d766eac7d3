//! Replay lookup for a beatmap
//!
//! Each producer stores replays in its own directory under its own naming
//! scheme. The selector lists the files that belong to a beatmap, decodes
//! them, and skips (with a warning) anything that fails to decode.
//!
//! ```text
//! BeatmapKey ──▶ candidates ──▶ ReplayScan::poll (one decode per call) ──▶ Vec<FoundReplay>
//! ```

use crate::config::{Config, ReplayDirs};
use crate::formats::{self, DecodeOptions};
use crate::model::ReplayWrapper;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const CUSTOM_LEVEL_PREFIX: &str = "custom_level_";

/// Identifies one playable difficulty of a level
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeatmapKey {
    pub level_id: String,
    pub difficulty: String,
    pub characteristic: String,
}

impl BeatmapKey {
    pub fn new(
        level_id: impl Into<String>,
        difficulty: impl Into<String>,
        characteristic: impl Into<String>,
    ) -> Self {
        Self {
            level_id: level_id.into(),
            difficulty: difficulty.into(),
            characteristic: characteristic.into(),
        }
    }

    /// Level hash: the level id without the custom level prefix
    pub fn hash(&self) -> &str {
        self.level_id
            .strip_prefix(CUSTOM_LEVEL_PREFIX)
            .unwrap_or(&self.level_id)
    }

    fn legacy_name(&self) -> String {
        format!("{}{}{}.reqlay", self.level_id, self.difficulty, self.characteristic)
    }

    fn suffix(&self, extension: &str) -> String {
        format!(
            "-{}-{}-{}.{}",
            self.difficulty,
            self.characteristic,
            self.hash(),
            extension
        )
    }
}

/// A decoded replay found for a beatmap
#[derive(Debug, Clone)]
pub struct FoundReplay {
    pub path: PathBuf,
    pub replay: ReplayWrapper,
}

/// Progress of a [`ReplayScan`]
#[derive(Debug)]
pub enum ScanStatus {
    Pending { done: usize, total: usize },
    /// Every candidate has been tried; later polls return an empty list
    Ready(Vec<FoundReplay>),
}

/// Incremental decode of a list of candidate files
///
/// Decodes one file per [`poll`](Self::poll) so a host can spread a scan
/// across frames.
pub struct ReplayScan {
    pending: VecDeque<PathBuf>,
    total: usize,
    found: Vec<FoundReplay>,
    options: DecodeOptions,
}

impl ReplayScan {
    pub fn new(candidates: Vec<PathBuf>, options: DecodeOptions) -> Self {
        Self {
            total: candidates.len(),
            pending: candidates.into(),
            found: Vec::new(),
            options,
        }
    }

    pub fn poll(&mut self) -> ScanStatus {
        if let Some(path) = self.pending.pop_front() {
            match formats::decode_file(&path, &self.options) {
                Ok(replay) => self.found.push(FoundReplay { path, replay }),
                Err(e) => log::warn!("skipping replay {}: {}", path.display(), e),
            }
        }

        if self.pending.is_empty() {
            ScanStatus::Ready(std::mem::take(&mut self.found))
        } else {
            ScanStatus::Pending {
                done: self.total - self.pending.len(),
                total: self.total,
            }
        }
    }

    /// Poll until done
    pub fn finish(mut self) -> Vec<FoundReplay> {
        loop {
            if let ScanStatus::Ready(found) = self.poll() {
                return found;
            }
        }
    }
}

/// Finds the replays recorded for a beatmap
#[derive(Debug, Clone, Default)]
pub struct ReplaySelector {
    dirs: ReplayDirs,
    options: DecodeOptions,
}

impl ReplaySelector {
    pub fn new(dirs: ReplayDirs, options: DecodeOptions) -> Self {
        Self { dirs, options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.replays.clone(), config.decode_options())
    }

    /// Files that may hold a replay of `key`, in a stable order
    ///
    /// An external replay replaces every local directory.
    pub fn candidates(&self, key: &BeatmapKey) -> Vec<PathBuf> {
        if let Some(external) = &self.dirs.external {
            return vec![external.clone()];
        }

        let mut candidates = Vec::new();
        if let Some(dir) = &self.dirs.legacy_dir {
            let name = key.legacy_name();
            candidates.extend(list_matching(dir, |file| file == name));
        }
        if let Some(dir) = &self.dirs.bsor_dir {
            let suffix = key.suffix("bsor");
            candidates.extend(list_matching(dir, |file| file.ends_with(&suffix)));
        }
        if let Some(dir) = &self.dirs.scoresaber_dir {
            let suffix = key.suffix("dat");
            candidates.extend(list_matching(dir, |file| file.ends_with(&suffix)));
        }
        candidates
    }

    /// Start an incremental scan for `key`
    pub fn scan(&self, key: &BeatmapKey) -> ReplayScan {
        ReplayScan::new(self.candidates(key), self.options)
    }

    /// Decode every replay of `key` now
    pub fn replays_for_beatmap(&self, key: &BeatmapKey) -> Vec<FoundReplay> {
        let found = self.scan(key).finish();
        log::info!(
            "found {} replay(s) for {} {} {}",
            found.len(),
            key.level_id,
            key.difficulty,
            key.characteristic
        );
        found
    }
}

/// Sorted files in `dir` whose name passes `matches`
fn list_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("cannot list replay directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| entry.file_name().to_str().is_some_and(&matches))
        .map(|entry| entry.path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{BsorBuilder, LegacyBuilder, ScoreSaberBuilder};
    use std::fs;

    fn key() -> BeatmapKey {
        BeatmapKey::new("custom_level_ABCDEF", "ExpertPlus", "Standard")
    }

    fn dirs(root: &Path) -> ReplayDirs {
        let dirs = ReplayDirs {
            legacy_dir: Some(root.join("legacy")),
            bsor_dir: Some(root.join("bl")),
            scoresaber_dir: Some(root.join("ss")),
            external: None,
        };
        for dir in [&dirs.legacy_dir, &dirs.bsor_dir, &dirs.scoresaber_dir]
            .into_iter()
            .flatten()
        {
            fs::create_dir_all(dir).unwrap();
        }
        dirs
    }

    #[test]
    fn test_hash_strips_prefix() {
        assert_eq!(key().hash(), "ABCDEF");
        assert_eq!(BeatmapKey::new("OstLevel", "Hard", "Standard").hash(), "OstLevel");
    }

    #[test]
    fn test_naming_conventions() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        let legacy = dirs.legacy_dir.clone().unwrap();
        let bl = dirs.bsor_dir.clone().unwrap();
        let ss = dirs.scoresaber_dir.clone().unwrap();

        let legacy_bytes = LegacyBuilder::new(6).records(3).build();
        for name in [
            "custom_level_ABCDEFExpertPlusStandard.reqlay",
            "custom_level_ABCDEFHardStandard.reqlay",
        ] {
            fs::write(legacy.join(name), &legacy_bytes).unwrap();
        }
        let bsor_bytes = BsorBuilder::new().build();
        for name in [
            "7656-Player-ExpertPlus-Standard-ABCDEF.bsor",
            "7656-Player-ExpertPlus-OneSaber-ABCDEF.bsor",
        ] {
            fs::write(bl.join(name), &bsor_bytes).unwrap();
        }
        let ss_bytes = ScoreSaberBuilder::new().build();
        let ss_name = "7656-Song-ExpertPlus-Standard-ABCDEF.dat";
        fs::write(ss.join(ss_name), &ss_bytes).unwrap();

        let selector = ReplaySelector::new(dirs, DecodeOptions::default());
        let names: Vec<String> = selector
            .candidates(&key())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "custom_level_ABCDEFExpertPlusStandard.reqlay",
                "7656-Player-ExpertPlus-Standard-ABCDEF.bsor",
                "7656-Song-ExpertPlus-Standard-ABCDEF.dat",
            ]
        );

        let found = selector.replays_for_beatmap(&key());
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].replay.info().source, "Reqlay v6");
    }

    #[test]
    fn test_failing_files_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        let bl = dirs.bsor_dir.clone().unwrap();
        fs::write(bl.join("a-ExpertPlus-Standard-ABCDEF.bsor"), b"not a replay").unwrap();
        let replay = BsorBuilder::new().build();
        fs::write(bl.join("b-ExpertPlus-Standard-ABCDEF.bsor"), replay).unwrap();

        let selector = ReplaySelector::new(dirs, DecodeOptions::default());
        let found = selector.replays_for_beatmap(&key());
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("b-ExpertPlus-Standard-ABCDEF.bsor"));
    }

    #[test]
    fn test_external_replay_overrides_directories() {
        let root = tempfile::tempdir().unwrap();
        let mut dirs = dirs(root.path());
        let bl = dirs.bsor_dir.clone().unwrap();
        let replay = BsorBuilder::new().build();
        fs::write(bl.join("a-ExpertPlus-Standard-ABCDEF.bsor"), replay).unwrap();

        // Sniffed by magic despite the misleading extension
        let external = root.path().join("shared.replay");
        fs::write(&external, ScoreSaberBuilder::new().build()).unwrap();
        dirs.external = Some(external.clone());

        let selector = ReplaySelector::new(dirs, DecodeOptions::default());
        let found = selector.replays_for_beatmap(&key());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, external);
    }

    #[test]
    fn test_missing_directories_yield_nothing() {
        let root = tempfile::tempdir().unwrap();
        let dirs = ReplayDirs {
            bsor_dir: Some(root.path().join("nope")),
            ..Default::default()
        };
        let selector = ReplaySelector::new(dirs, DecodeOptions::default());
        assert!(selector.replays_for_beatmap(&key()).is_empty());
    }

    #[test]
    fn test_scan_reports_progress() {
        let root = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = root.path().join(format!("{}.bsor", i));
            fs::write(&path, BsorBuilder::new().build()).unwrap();
            paths.push(path);
        }

        let mut scan = ReplayScan::new(paths, DecodeOptions::default());
        assert!(matches!(scan.poll(), ScanStatus::Pending { done: 1, total: 3 }));
        assert!(matches!(scan.poll(), ScanStatus::Pending { done: 2, total: 3 }));
        match scan.poll() {
            ScanStatus::Ready(found) => assert_eq!(found.len(), 3),
            other => panic!("expected ready, got {:?}", other),
        }
        assert!(matches!(scan.poll(), ScanStatus::Ready(found) if found.is_empty()));
    }
}
