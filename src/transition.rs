//! Eased per-circle position transitions.
//!
//! The animator only stores target positions; this table remembers, per
//! circle id, where the displayed position is coming from and when the move
//! started, so every render frame can sample a smooth in-between value.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::animator::{Circle, CircleId};

/// Quadratic ease-in-out: slow start, slow finish, exact at 0, 1/2 and 1.
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    from: [f32; 2],
    to: [f32; 2],
    start: Instant,
    duration: Duration,
}

impl Transition {
    /// An entry that is already at rest at `pos`.
    fn settled(pos: [f32; 2], now: Instant) -> Self {
        Self {
            from: pos,
            to: pos,
            start: now,
            duration: Duration::ZERO,
        }
    }

    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    fn sample(&self, now: Instant) -> [f32; 2] {
        let t = ease_in_out(self.progress(now));
        [lerp(self.from[0], self.to[0], t), lerp(self.from[1], self.to[1], t)]
    }

    /// Redirects the transition toward `to`, starting from whatever value
    /// is currently displayed so a retarget mid-flight never jumps.
    fn retarget(&mut self, to: [f32; 2], now: Instant, duration: Duration) {
        self.from = self.sample(now);
        self.to = to;
        self.start = now;
        self.duration = duration;
    }
}

/// Per-identity animation state, sampled every frame by the render layer.
pub struct TransitionTable {
    entries: HashMap<CircleId, Transition>,
    duration: Duration,
}

impl TransitionTable {
    pub fn new(duration: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            duration,
        }
    }

    /// Installs settled entries for the given circles. Used once after the
    /// animator is constructed so the first frame renders without motion.
    pub fn seed(&mut self, circles: &[Circle], now: Instant) {
        for circle in circles {
            self.entries
                .insert(circle.id, Transition::settled(circle.pos, now));
        }
    }

    /// Points every circle's transition at its new target position.
    pub fn retarget_all(&mut self, circles: &[Circle], now: Instant) {
        for circle in circles {
            match self.entries.get_mut(&circle.id) {
                Some(entry) => entry.retarget(circle.pos, now, self.duration),
                None => {
                    self.entries
                        .insert(circle.id, Transition::settled(circle.pos, now));
                }
            }
        }
    }

    /// Currently displayed position for a circle, or `None` for an unknown id.
    pub fn sample(&self, id: CircleId, now: Instant) -> Option<[f32; 2]> {
        self.entries.get(&id).map(|entry| entry.sample(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::Animator;

    const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    #[test]
    fn test_ease_in_out_endpoints_and_midpoint() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(0.5), 0.5);
        assert_eq!(ease_in_out(1.0), 1.0);
    }

    #[test]
    fn test_ease_in_out_is_monotone_and_eased() {
        let mut prev = 0.0;
        for i in 1..=100 {
            let t = i as f32 / 100.0;
            let v = ease_in_out(t);
            assert!(v >= prev, "not monotone at t={t}");
            prev = v;
        }
        // Slow start, slow finish.
        assert!(ease_in_out(0.25) < 0.25);
        assert!(ease_in_out(0.75) > 0.75);
    }

    #[test]
    fn test_transition_samples_endpoints_exactly() {
        let t0 = Instant::now();
        let mut tr = Transition::settled([0.0, 0.0], t0);
        tr.retarget([1.0, 0.5], t0, Duration::from_secs(4));

        assert_eq!(tr.sample(t0), [0.0, 0.0]);
        assert_eq!(tr.sample(t0 + Duration::from_secs(4)), [1.0, 0.5]);
        // Clamped past the end.
        assert_eq!(tr.sample(t0 + Duration::from_secs(60)), [1.0, 0.5]);
    }

    #[test]
    fn test_transition_midpoint_is_eased_midpoint() {
        let t0 = Instant::now();
        let mut tr = Transition::settled([0.0, 1.0], t0);
        tr.retarget([1.0, 0.0], t0, Duration::from_secs(4));

        let mid = tr.sample(t0 + Duration::from_secs(2));
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert!((mid[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_retarget_mid_flight_starts_from_displayed_value() {
        let t0 = Instant::now();
        let mut tr = Transition::settled([0.0, 0.0], t0);
        tr.retarget([1.0, 1.0], t0, Duration::from_secs(4));

        // One second in: displayed value is partway along the first move.
        let t1 = t0 + Duration::from_secs(1);
        let displayed = tr.sample(t1);
        tr.retarget([0.0, 0.0], t1, Duration::from_secs(4));

        // No discontinuity: the new move begins exactly where we were.
        assert_eq!(tr.sample(t1), displayed);
    }

    #[test]
    fn test_settled_entry_is_motionless() {
        let t0 = Instant::now();
        let tr = Transition::settled([0.25, 0.75], t0);
        assert_eq!(tr.sample(t0), [0.25, 0.75]);
        assert_eq!(tr.sample(t0 + Duration::from_secs(10)), [0.25, 0.75]);
    }

    #[test]
    fn test_table_tracks_each_circle_by_id() {
        let mut animator = Animator::new(&[WHITE, WHITE, WHITE]);
        let t0 = Instant::now();
        let mut table = TransitionTable::new(Duration::from_secs(4));
        table.seed(animator.circles(), t0);

        for circle in animator.circles() {
            assert_eq!(table.sample(circle.id, t0), Some(circle.pos));
        }

        animator.tick();
        let t1 = t0 + Duration::from_secs(1);
        table.retarget_all(animator.circles(), t1);

        // At the end of the transition every circle sits on its own target.
        let t_end = t1 + Duration::from_secs(4);
        for circle in animator.circles() {
            assert_eq!(table.sample(circle.id, t_end), Some(circle.pos));
        }
    }
}
