use std::time::{Duration, Instant};

/// Quiet period after the last mutation before a save fires
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Debounced-save scheduler: coalesces a burst of edits into a single write.
///
/// Each mutation bumps a monotonically increasing generation and re-arms the
/// deadline; a superseded save is cancelled outright, never flushed. Only the
/// job matching the latest generation is allowed to execute. Single-threaded
/// cooperative: the owner polls `due` and reports back with `complete`.
#[derive(Debug)]
pub struct SaveDebouncer {
    quiet: Duration,
    generation: u64,
    armed: Option<(u64, Instant)>,
}

impl Default for SaveDebouncer {
    fn default() -> Self {
        SaveDebouncer::new(DEFAULT_QUIET_PERIOD)
    }
}

impl SaveDebouncer {
    pub fn new(quiet: Duration) -> SaveDebouncer {
        SaveDebouncer {
            quiet,
            generation: 0,
            armed: None,
        }
    }

    /// Record a mutation: bump the generation and restart the quiet window
    pub fn note_mutation(&mut self, now: Instant) {
        self.generation += 1;
        self.armed = Some((self.generation, now + self.quiet));
    }

    /// The generation whose quiet window has elapsed, if any
    pub fn due(&self, now: Instant) -> Option<u64> {
        match self.armed {
            Some((generation, deadline)) if now >= deadline => Some(generation),
            _ => None,
        }
    }

    /// Disarm after a completed save, but only if `generation` is still the
    /// latest — a save raced by a newer mutation must not clear it.
    pub fn complete(&mut self, generation: u64) {
        if matches!(self.armed, Some((g, _)) if g == generation) {
            self.armed = None;
        }
    }

    /// Drop any scheduled save without writing
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_pending(&self) -> bool {
        self.armed.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn nothing_due_before_quiet_window() {
        let mut d = SaveDebouncer::new(QUIET);
        let t0 = Instant::now();
        d.note_mutation(t0);
        assert_eq!(d.due(t0), None);
        assert_eq!(d.due(t0 + Duration::from_millis(499)), None);
        assert_eq!(d.due(t0 + QUIET), Some(1));
    }

    #[test]
    fn burst_coalesces_into_latest_generation() {
        let mut d = SaveDebouncer::new(QUIET);
        let t0 = Instant::now();
        d.note_mutation(t0);
        d.note_mutation(t0 + Duration::from_millis(200));
        d.note_mutation(t0 + Duration::from_millis(400));

        // The first two windows never fire
        assert_eq!(d.due(t0 + Duration::from_millis(500)), None);
        assert_eq!(d.due(t0 + Duration::from_millis(899)), None);
        assert_eq!(d.due(t0 + Duration::from_millis(900)), Some(3));

        d.complete(3);
        assert!(!d.is_pending());
        assert_eq!(d.due(t0 + Duration::from_secs(10)), None);
    }

    #[test]
    fn stale_completion_does_not_disarm() {
        let mut d = SaveDebouncer::new(QUIET);
        let t0 = Instant::now();
        d.note_mutation(t0);
        // A mutation arrives while generation 1's save would be in flight
        d.note_mutation(t0 + Duration::from_millis(600));
        d.complete(1);
        assert!(d.is_pending());
        assert_eq!(d.due(t0 + Duration::from_millis(1100)), Some(2));
    }

    #[test]
    fn cancel_drops_pending_save() {
        let mut d = SaveDebouncer::new(QUIET);
        let t0 = Instant::now();
        d.note_mutation(t0);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.due(t0 + QUIET), None);
    }
}
