use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{
    chord::HeldKeys,
    input::{Button, InputEvent},
};

/// Pointer resolution used to turn pixels into physical distance.
pub const DPI: f64 = 96.;
pub const INCH_TO_METER: f64 = 0.0254;
/// Scale applied to raw wheel deltas.
pub const SCROLL_SCALE: f64 = 0.001;

/// Everything counted during one flush interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityCounts {
    pub key_presses: u64,
    pub left_clicks: u64,
    pub right_clicks: u64,
    pub middle_clicks: u64,
    pub mouse_distance_meters: f64,
    pub scroll_distance: f64,
    pub key_combinations: HashMap<String, u64>,
    /// Focus samples per application. One sample is taken per scheduler tick.
    pub app_focus: HashMap<String, u64>,
}

impl ActivityCounts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Adds another interval's counts into this one.
    pub fn merge(&mut self, other: ActivityCounts) {
        self.key_presses += other.key_presses;
        self.left_clicks += other.left_clicks;
        self.right_clicks += other.right_clicks;
        self.middle_clicks += other.middle_clicks;
        self.mouse_distance_meters += other.mouse_distance_meters;
        self.scroll_distance += other.scroll_distance;
        merge_table(&mut self.key_combinations, other.key_combinations);
        merge_table(&mut self.app_focus, other.app_focus);
    }
}

pub fn merge_table(into: &mut HashMap<String, u64>, from: HashMap<String, u64>) {
    for (label, count) in from {
        *into.entry(label).or_default() += count;
    }
}

/// State guarded by the accumulator lock.
#[derive(Debug, Default)]
struct AccumulatorState {
    counts: ActivityCounts,
    last_pointer_position: Option<(f64, f64)>,
    held_keys: HeldKeys,
}

impl AccumulatorState {
    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPress { key, symbol } => {
                self.counts.key_presses += 1;
                let label = self.held_keys.press(key, symbol);
                *self.counts.key_combinations.entry(label).or_default() += 1;
            }
            InputEvent::KeyRelease { key } => self.held_keys.release(&key),
            InputEvent::ButtonPress(button) => match button {
                Button::Left => self.counts.left_clicks += 1,
                Button::Right => self.counts.right_clicks += 1,
                Button::Middle => self.counts.middle_clicks += 1,
                Button::Other => {}
            },
            InputEvent::ButtonRelease(_) => {}
            InputEvent::PointerMove { x, y } => {
                if let Some((last_x, last_y)) = self.last_pointer_position {
                    let pixels = (x - last_x).hypot(y - last_y);
                    self.counts.mouse_distance_meters += pixels / DPI * INCH_TO_METER;
                }
                self.last_pointer_position = Some((x, y));
            }
            InputEvent::Scroll { dx, dy } => {
                self.counts.scroll_distance += (dx.abs() + dy.abs()) * SCROLL_SCALE;
            }
        }
    }
}

/// Collects input events from listener threads and focus samples from the scheduler.
///
/// Every entry point takes the same lock, so an event is applied to either the interval being
/// flushed or the next one, never split between the two.
#[derive(Debug, Default)]
pub struct Accumulator {
    state: Mutex<AccumulatorState>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AccumulatorState> {
        // A panicking listener can't leave counters half updated, so poisoning is ignored.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, event: InputEvent) {
        self.state().apply(event);
    }

    pub fn sample_focused_app(&self, app_name: &str) {
        let mut state = self.state();
        match state.counts.app_focus.get_mut(app_name) {
            Some(count) => *count += 1,
            None => {
                state.counts.app_focus.insert(app_name.to_string(), 1);
            }
        }
    }

    /// Takes the current interval out and starts a new one. The held-key set is physical state
    /// and carries over.
    pub fn snapshot_and_reset(&self) -> ActivityCounts {
        let mut state = self.state();
        state.last_pointer_position = None;
        std::mem::take(&mut state.counts)
    }

    /// Puts back an interval that could not be persisted, so it is written with the next one.
    pub fn restore(&self, counts: ActivityCounts) {
        self.state().counts.merge(counts);
    }

    /// Copy of the running interval, without resetting it.
    pub fn peek(&self) -> ActivityCounts {
        self.state().counts.clone()
    }

    pub fn last_pointer_position(&self) -> Option<(f64, f64)> {
        self.state().last_pointer_position
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use crate::tracker::chord::{Key, Modifier, Side};

    use super::*;

    fn press(c: char) -> InputEvent {
        InputEvent::KeyPress {
            key: Key::Char(c),
            symbol: Some(c),
        }
    }

    fn release(c: char) -> InputEvent {
        InputEvent::KeyRelease { key: Key::Char(c) }
    }

    #[test]
    fn repeated_key_then_flush() {
        let accumulator = Accumulator::new();
        for _ in 0..3 {
            accumulator.record(press('x'));
            accumulator.record(release('x'));
        }

        let counts = accumulator.snapshot_and_reset();

        assert_eq!(counts.key_presses, 3);
        assert_eq!(
            counts.key_combinations,
            HashMap::from([("x".to_string(), 3)])
        );
        assert!(accumulator.peek().key_combinations.is_empty());
    }

    #[test]
    fn one_inch_of_pointer_travel() {
        let accumulator = Accumulator::new();
        accumulator.record(InputEvent::PointerMove { x: 0., y: 0. });
        accumulator.record(InputEvent::PointerMove { x: 96., y: 0. });

        let counts = accumulator.peek();
        assert!((counts.mouse_distance_meters - 0.0254).abs() < 1e-12);
        assert_eq!(accumulator.last_pointer_position(), Some((96., 0.)));
    }

    #[test]
    fn first_move_only_sets_position() {
        let accumulator = Accumulator::new();
        accumulator.record(InputEvent::PointerMove { x: 300., y: 400. });
        assert_eq!(accumulator.peek().mouse_distance_meters, 0.);
    }

    #[test]
    fn clicks_count_on_press_edge_only() {
        let accumulator = Accumulator::new();
        for button in [Button::Left, Button::Left, Button::Right, Button::Middle, Button::Other] {
            accumulator.record(InputEvent::ButtonPress(button));
            accumulator.record(InputEvent::ButtonRelease(button));
        }

        let counts = accumulator.peek();
        assert_eq!(
            (counts.left_clicks, counts.right_clicks, counts.middle_clicks),
            (2, 1, 1)
        );
    }

    #[test]
    fn scroll_accumulates_absolute_deltas() {
        let accumulator = Accumulator::new();
        accumulator.record(InputEvent::Scroll { dx: 0., dy: -120. });
        accumulator.record(InputEvent::Scroll { dx: 30., dy: 0. });
        assert!((accumulator.peek().scroll_distance - 0.15).abs() < 1e-12);
    }

    #[test]
    fn focus_samples_count_per_app() {
        let accumulator = Accumulator::new();
        accumulator.sample_focused_app("firefox");
        accumulator.sample_focused_app("firefox");
        accumulator.sample_focused_app("nvim");

        assert_eq!(
            accumulator.peek().app_focus,
            HashMap::from([("firefox".to_string(), 2), ("nvim".to_string(), 1)])
        );
    }

    #[test]
    fn reset_clears_every_counter() {
        let accumulator = Accumulator::new();
        accumulator.record(press('a'));
        accumulator.record(InputEvent::ButtonPress(Button::Right));
        accumulator.record(InputEvent::PointerMove { x: 1., y: 1. });
        accumulator.record(InputEvent::PointerMove { x: 2., y: 2. });
        accumulator.record(InputEvent::Scroll { dx: 1., dy: 1. });
        accumulator.sample_focused_app("term");

        let counts = accumulator.snapshot_and_reset();

        assert!(!counts.is_empty());
        assert!(accumulator.peek().is_empty());
        assert_eq!(accumulator.last_pointer_position(), None);
    }

    #[test]
    fn held_modifiers_survive_reset() {
        let accumulator = Accumulator::new();
        accumulator.record(InputEvent::KeyPress {
            key: Key::Modifier(Modifier::Ctrl, Side::Left),
            symbol: None,
        });
        accumulator.snapshot_and_reset();
        accumulator.record(InputEvent::KeyPress {
            key: Key::Char('c'),
            symbol: Some('\u{3}'),
        });

        assert_eq!(
            accumulator.peek().key_combinations,
            HashMap::from([("ctrl + c".to_string(), 1)])
        );
    }

    #[test]
    fn restore_merges_with_newer_events() {
        let accumulator = Accumulator::new();
        accumulator.record(press('a'));
        let failed = accumulator.snapshot_and_reset();
        accumulator.record(press('a'));
        accumulator.record(press('b'));

        accumulator.restore(failed);

        let counts = accumulator.peek();
        assert_eq!(counts.key_presses, 3);
        assert_eq!(counts.key_combinations["a"], 2);
        assert_eq!(counts.key_combinations["b"], 1);
    }

    #[test]
    fn flush_boundaries_never_lose_or_duplicate_events() {
        let trace = (0..200)
            .flat_map(|i| {
                let c = (b'a' + (i % 7) as u8) as char;
                [
                    press(c),
                    release(c),
                    InputEvent::ButtonPress(if i % 3 == 0 { Button::Left } else { Button::Right }),
                    InputEvent::Scroll { dx: 0., dy: 1000. },
                ]
            })
            .collect::<Vec<_>>();

        for flush_every in 1..=trace.len() / 4 {
            let accumulator = Accumulator::new();
            let mut flushed = ActivityCounts::default();
            for (index, event) in trace.iter().cloned().enumerate() {
                accumulator.record(event);
                if (index + 1) % flush_every == 0 {
                    flushed.merge(accumulator.snapshot_and_reset());
                }
            }
            flushed.merge(accumulator.snapshot_and_reset());

            assert_eq!(flushed.key_presses, 200);
            assert_eq!(flushed.left_clicks + flushed.right_clicks, 200);
            assert_eq!(flushed.key_combinations.values().sum::<u64>(), 200);
            assert!((flushed.scroll_distance - 200.).abs() < 1e-9);
        }
    }

    #[test]
    fn concurrent_writers_and_flushes_agree_on_totals() {
        let accumulator = Arc::new(Accumulator::new());
        let writers = (0..4)
            .map(|_| {
                let accumulator = accumulator.clone();
                thread::spawn(move || {
                    for _ in 0..5_000 {
                        accumulator.record(press('k'));
                        accumulator.record(InputEvent::ButtonPress(Button::Left));
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut flushed = ActivityCounts::default();
        while writers.iter().any(|w| !w.is_finished()) {
            flushed.merge(accumulator.snapshot_and_reset());
            thread::yield_now();
        }
        for writer in writers {
            writer.join().unwrap();
        }
        flushed.merge(accumulator.snapshot_and_reset());

        assert_eq!(flushed.key_presses, 20_000);
        assert_eq!(flushed.left_clicks, 20_000);
        assert_eq!(flushed.key_combinations["k"], 20_000);
    }
}
