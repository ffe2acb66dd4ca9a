//! Progressive unlock model.
//!
//! Which stages a user may open is derived from the project's
//! `current_stage` on every call. Nothing is cached: advancing
//! `current_stage` upstream unlocks the next stage on the next read.

use serde::Serialize;

use crate::project::{ProgressMap, ProjectMetadata};
use crate::stage::{stage_definition, StageDefinition, StageStatus, STAGES};

/// Stage status, accessibility and progress for one project.
#[derive(Debug, Clone, Copy)]
pub struct UnlockModel<'a> {
    current_stage: i64,
    progress: Option<&'a ProgressMap>,
}

/// Everything the dashboard shows for one stage card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageView {
    #[serde(flatten)]
    pub definition: StageDefinition,
    pub status: StageStatus,
    pub accessible: bool,
    pub progress: u8,
}

impl<'a> UnlockModel<'a> {
    pub fn new(current_stage: i64, progress: Option<&'a ProgressMap>) -> Self {
        Self {
            current_stage,
            progress,
        }
    }

    pub fn for_project(project: &'a ProjectMetadata) -> Self {
        Self::new(project.current_stage, project.progress.as_ref())
    }

    pub fn status(&self, stage: i64) -> StageStatus {
        if stage < self.current_stage {
            StageStatus::Completed
        } else if stage == self.current_stage {
            StageStatus::InProgress
        } else {
            StageStatus::Pending
        }
    }

    pub fn accessible(&self, stage: i64) -> bool {
        stage <= self.current_stage
    }

    /// Percentage recorded under `stage{N}`, or 0 when there is no entry.
    pub fn progress_percent(&self, stage: i64) -> u8 {
        self.progress
            .and_then(|map| map.get(&format!("stage{stage}")))
            .copied()
            .unwrap_or(0)
    }

    /// Select a stage for navigation. Locked and unknown stages are ignored.
    pub fn select(&self, stage: i64) -> Option<&'static StageDefinition> {
        if !self.accessible(stage) {
            return None;
        }
        stage_definition(stage)
    }

    pub fn view(&self, stage: i64) -> Option<StageView> {
        let definition = *stage_definition(stage)?;
        Some(StageView {
            definition,
            status: self.status(stage),
            accessible: self.accessible(stage),
            progress: self.progress_percent(stage),
        })
    }

    /// Views for all six stages, in pipeline order.
    pub fn views(&self) -> Vec<StageView> {
        STAGES
            .iter()
            .filter_map(|s| self.view(i64::from(s.id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_progress() -> ProgressMap {
        [
            ("stage0", 100),
            ("stage1", 100),
            ("stage2", 100),
            ("stage3", 75),
            ("stage4", 30),
            ("stage5", 0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn accessible_iff_at_or_below_current_stage() {
        for k in 0..=5 {
            let model = UnlockModel::new(k, None);
            for i in 0..=5 {
                assert_eq!(model.accessible(i), i <= k, "k={k} i={i}");
            }
        }
    }

    #[test]
    fn statuses_partition_the_pipeline() {
        for k in 0..=5i64 {
            let model = UnlockModel::new(k, None);
            for i in 0..=5i64 {
                let expected = match i.cmp(&k) {
                    std::cmp::Ordering::Less => StageStatus::Completed,
                    std::cmp::Ordering::Equal => StageStatus::InProgress,
                    std::cmp::Ordering::Greater => StageStatus::Pending,
                };
                assert_eq!(model.status(i), expected, "k={k} i={i}");
            }
            let in_progress = (0..=5).filter(|&i| model.status(i) == StageStatus::InProgress);
            assert_eq!(in_progress.count(), 1);
        }
    }

    #[test]
    fn past_the_last_stage_everything_is_completed() {
        let model = UnlockModel::new(6, None);
        assert!((0..=5).all(|i| model.status(i) == StageStatus::Completed));
        assert!((0..=5).all(|i| model.accessible(i)));
    }

    #[test]
    fn missing_progress_entries_default_to_zero() {
        let mut partial = ProgressMap::new();
        partial.insert("stage1".to_string(), 40);
        let model = UnlockModel::new(2, Some(&partial));
        assert_eq!(model.progress_percent(1), 40);
        for i in [-1, 0, 2, 3, 4, 5, 6] {
            assert_eq!(model.progress_percent(i), 0, "stage {i}");
        }
        assert_eq!(UnlockModel::new(2, None).progress_percent(1), 0);
    }

    #[test]
    fn scenario_current_stage_three() {
        let progress = scenario_progress();
        let model = UnlockModel::new(3, Some(&progress));

        let stage2 = model.view(2).unwrap();
        assert_eq!(stage2.status, StageStatus::Completed);
        assert!(stage2.accessible);
        assert_eq!(stage2.progress, 100);

        let stage3 = model.view(3).unwrap();
        assert_eq!(stage3.status, StageStatus::InProgress);
        assert!(stage3.accessible);
        assert_eq!(stage3.progress, 75);

        let stage4 = model.view(4).unwrap();
        assert_eq!(stage4.status, StageStatus::Pending);
        assert!(!stage4.accessible);
        assert_eq!(stage4.progress, 30);
    }

    #[test]
    fn selecting_a_locked_stage_is_ignored() {
        let model = UnlockModel::new(3, None);
        assert_eq!(model.select(3).map(|s| s.path), Some("stage3"));
        assert_eq!(model.select(0).map(|s| s.path), Some("repositories"));
        assert!(model.select(4).is_none());
        assert!(model.select(-1).is_none());
    }

    #[test]
    fn views_cover_all_stages_in_order() {
        let views = UnlockModel::new(1, None).views();
        let ids: Vec<u8> = views.iter().map(|v| v.definition.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        let json = serde_json::to_value(&views[1]).unwrap();
        assert_eq!(json["title"], "Inventory");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["accessible"], true);
    }
}
