use crate::config::AutosaveConfig;

/// Debounce policy for autosave. It decides delays; the editor's scheduler
/// owns the actual pending task.
#[derive(Debug, Clone)]
pub struct AutosaveController {
    config: AutosaveConfig,
    last_save_at: Option<u64>,
    dirty: bool,
    transform_active: bool,
}

impl AutosaveController {
    pub fn new(config: AutosaveConfig) -> Self {
        Self {
            config,
            last_save_at: None,
            dirty: false,
            transform_active: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_transform_active(&self) -> bool {
        self.transform_active
    }

    pub fn last_save_at(&self) -> Option<u64> {
        self.last_save_at
    }

    /// Records a committed mutation. Returns the delay to (re)schedule the
    /// save with, or `None` while a transform suppresses scheduling.
    pub fn on_mutation(&mut self, now_ms: u64) -> Option<u64> {
        self.dirty = true;
        if self.transform_active {
            return None;
        }
        Some(self.delay_from(now_ms, self.config.debounce_ms))
    }

    /// Records an unsaved change without picking a save delay.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn begin_transform(&mut self) {
        self.transform_active = true;
    }

    /// Ends a transform; trailing updates are batched behind the longer
    /// post-transform delay.
    pub fn end_transform(&mut self, now_ms: u64) -> Option<u64> {
        self.transform_active = false;
        if !self.dirty {
            return None;
        }
        Some(self.delay_from(now_ms, self.config.post_transform_ms))
    }

    pub fn mark_saved(&mut self, now_ms: u64) {
        self.last_save_at = Some(now_ms);
        self.dirty = false;
    }

    /// The scene stays dirty; the next mutation schedules the retry.
    pub fn mark_failed(&mut self) {
        self.dirty = true;
    }

    fn delay_from(&self, now_ms: u64, base_ms: u64) -> u64 {
        let interval_floor = self.last_save_at.map_or(0, |last| {
            let since = now_ms.saturating_sub(last);
            self.config.min_interval_ms.saturating_sub(since)
        });
        base_ms.max(interval_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AutosaveController {
        AutosaveController::new(AutosaveConfig {
            debounce_ms: 500,
            min_interval_ms: 2000,
            post_transform_ms: 1500,
        })
    }

    #[test]
    fn first_mutation_uses_debounce_delay() {
        let mut autosave = controller();
        assert_eq!(autosave.on_mutation(0), Some(500));
        assert!(autosave.is_dirty());
    }

    #[test]
    fn minimum_interval_stretches_delay_after_recent_save() {
        let mut autosave = controller();
        autosave.mark_saved(1000);
        assert_eq!(autosave.on_mutation(1200), Some(1800));
        assert_eq!(autosave.on_mutation(3500), Some(500));
    }

    #[test]
    fn transform_suppresses_then_batches_with_longer_delay() {
        let mut autosave = controller();
        autosave.begin_transform();
        assert_eq!(autosave.on_mutation(0), None);
        assert_eq!(autosave.end_transform(100), Some(1500));
        assert!(!autosave.is_transform_active());
    }

    #[test]
    fn dirty_mark_defers_to_transform_end() {
        let mut autosave = controller();
        autosave.begin_transform();
        autosave.mark_dirty();
        assert!(autosave.is_dirty());
        assert_eq!(autosave.end_transform(100), Some(1500));
    }

    #[test]
    fn clean_transform_end_schedules_nothing() {
        let mut autosave = controller();
        autosave.begin_transform();
        assert_eq!(autosave.end_transform(10), None);
    }

    #[test]
    fn failed_save_keeps_scene_dirty() {
        let mut autosave = controller();
        autosave.on_mutation(0);
        autosave.mark_failed();
        assert!(autosave.is_dirty());
        assert_eq!(autosave.last_save_at(), None);
    }
}
