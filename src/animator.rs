//! Animator state: a fixed set of colored circles whose positions are
//! reassigned to fresh random points on every tick.

use rand::random;

/// RGBA color, straight (non-premultiplied) sRGB components in 0..=1.
pub type Color = [f32; 4];

/// Stable identity of a circle, used to key per-circle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CircleId(u64);

#[derive(Clone, Debug)]
pub struct Circle {
    pub id: CircleId,
    pub color: Color,
    /// Normalized position inside the unit square.
    pub pos: [f32; 2],
}

type Observer = Box<dyn FnMut(&[Circle])>;

/// Owns the circle list and notifies subscribers after each mutation.
///
/// The circle count is fixed at construction: one circle per palette color,
/// in palette order. Only positions ever change.
pub struct Animator {
    circles: Vec<Circle>,
    observers: Vec<Observer>,
}

impl Animator {
    pub fn new(colors: &[Color]) -> Self {
        let circles = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| Circle {
                id: CircleId(i as u64),
                color,
                pos: random_position(),
            })
            .collect();

        Self {
            circles,
            observers: Vec::new(),
        }
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// Registers an observer called once per `tick`, after all positions
    /// have been updated.
    pub fn subscribe(&mut self, observer: impl FnMut(&[Circle]) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Assigns every circle a fresh uniform-random position and emits a
    /// single change notification to each subscriber.
    pub fn tick(&mut self) {
        let Self { circles, observers } = self;

        for circle in circles.iter_mut() {
            circle.pos = random_position();
        }
        for observer in observers.iter_mut() {
            observer(circles.as_slice());
        }
    }
}

fn random_position() -> [f32; 2] {
    [random::<f32>(), random::<f32>()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const RED: Color = [1.0, 0.0, 0.0, 1.0];
    const GREEN: Color = [0.0, 1.0, 0.0, 1.0];
    const BLUE: Color = [0.0, 0.0, 1.0, 1.0];

    fn in_unit_square(pos: [f32; 2]) -> bool {
        (0.0..=1.0).contains(&pos[0]) && (0.0..=1.0).contains(&pos[1])
    }

    #[test]
    fn test_new_creates_one_circle_per_color_in_order() {
        let animator = Animator::new(&[RED, GREEN, BLUE]);

        let circles = animator.circles();
        assert_eq!(circles.len(), 3);
        assert_eq!(circles[0].color, RED);
        assert_eq!(circles[1].color, GREEN);
        assert_eq!(circles[2].color, BLUE);
        for circle in circles {
            assert!(in_unit_square(circle.pos));
        }
    }

    #[test]
    fn test_empty_palette_is_valid() {
        let mut animator = Animator::new(&[]);
        assert!(animator.circles().is_empty());

        // Ticking a zero-circle animator is a no-op, not an error.
        animator.tick();
        assert!(animator.circles().is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_stable_across_ticks() {
        let mut animator = Animator::new(&[RED, GREEN, BLUE]);
        let ids: Vec<_> = animator.circles().iter().map(|c| c.id).collect();

        assert!(ids.iter().all(|id| ids.iter().filter(|i| *i == id).count() == 1));

        animator.tick();
        let after: Vec<_> = animator.circles().iter().map(|c| c.id).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn test_tick_moves_circles_but_keeps_count_and_colors() {
        let mut animator = Animator::new(&[RED, GREEN, BLUE]);
        let before: Vec<_> = animator.circles().iter().map(|c| c.pos).collect();

        animator.tick();

        let circles = animator.circles();
        assert_eq!(circles.len(), 3);
        assert_eq!(circles[0].color, RED);
        assert_eq!(circles[1].color, GREEN);
        assert_eq!(circles[2].color, BLUE);

        let after: Vec<_> = circles.iter().map(|c| c.pos).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn test_positions_stay_in_range_after_many_ticks() {
        let mut animator = Animator::new(&[RED, GREEN]);
        for _ in 0..500 {
            animator.tick();
            for circle in animator.circles() {
                assert!(in_unit_square(circle.pos));
            }
        }
    }

    #[test]
    fn test_one_notification_per_tick() {
        let mut animator = Animator::new(&[RED, GREEN, BLUE]);
        let count = Rc::new(Cell::new(0u32));

        let seen = Rc::clone(&count);
        animator.subscribe(move |circles| {
            assert_eq!(circles.len(), 3);
            seen.set(seen.get() + 1);
        });

        for expected in 1..=5 {
            animator.tick();
            assert_eq!(count.get(), expected);
        }
    }

    #[test]
    fn test_all_subscribers_notified() {
        let mut animator = Animator::new(&[RED]);
        let a = Rc::new(Cell::new(0u32));
        let b = Rc::new(Cell::new(0u32));

        let a2 = Rc::clone(&a);
        animator.subscribe(move |_| a2.set(a2.get() + 1));
        let b2 = Rc::clone(&b);
        animator.subscribe(move |_| b2.set(b2.get() + 1));

        animator.tick();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 1);
    }

    #[test]
    fn test_reinitialization_redraws_positions_but_keeps_palette() {
        let first = Animator::new(&[RED, GREEN, BLUE]);
        let second = Animator::new(&[RED, GREEN, BLUE]);

        let colors =
            |a: &Animator| a.circles().iter().map(|c| c.color).collect::<Vec<_>>();
        assert_eq!(colors(&first), colors(&second));

        // Fresh draws; equal positions across runs are vanishingly unlikely.
        let positions =
            |a: &Animator| a.circles().iter().map(|c| c.pos).collect::<Vec<_>>();
        assert_ne!(positions(&first), positions(&second));
    }
}
