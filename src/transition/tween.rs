use std::collections::BTreeMap;

use crate::error::LayoutError;
use crate::layout::Point;

use super::backend::{SceneBackend, SceneCommand, VisualHandle};

/// Animated property of a visual. Each visual runs at most one tween per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Position,
    Scale,
    Points,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TweenValue {
    Position { from: Point, to: Point },
    Scale { from: Point, to: Point },
    Points { from: Vec<Point>, to: Vec<Point> },
}

/// Linear interpolation of one property over a fixed duration. Commands in
/// `on_complete` are applied once the final value is reached, or when a newer
/// tween on the same channel replaces this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub handle: VisualHandle,
    pub value: TweenValue,
    pub duration_ms: f32,
    pub elapsed_ms: f32,
    pub on_complete: Vec<SceneCommand>,
}

impl Tween {
    fn new(handle: VisualHandle, value: TweenValue, duration_ms: f32) -> Self {
        Self {
            handle,
            value,
            duration_ms,
            elapsed_ms: 0.0,
            on_complete: Vec::new(),
        }
    }

    pub fn position(handle: VisualHandle, from: Point, to: Point, duration_ms: f32) -> Self {
        Self::new(handle, TweenValue::Position { from, to }, duration_ms)
    }

    pub fn scale(handle: VisualHandle, from: Point, to: Point, duration_ms: f32) -> Self {
        Self::new(handle, TweenValue::Scale { from, to }, duration_ms)
    }

    /// Point-list tween. Both lists must have the same length.
    pub fn points(
        handle: VisualHandle,
        from: Vec<Point>,
        to: Vec<Point>,
        duration_ms: f32,
    ) -> Result<Self, LayoutError> {
        if from.len() != to.len() {
            return Err(LayoutError::PointCountMismatch {
                handle,
                from: from.len(),
                to: to.len(),
            });
        }
        Ok(Self::new(handle, TweenValue::Points { from, to }, duration_ms))
    }

    pub fn then(mut self, command: SceneCommand) -> Self {
        self.on_complete.push(command);
        self
    }

    pub fn channel(&self) -> Channel {
        match self.value {
            TweenValue::Position { .. } => Channel::Position,
            TweenValue::Scale { .. } => Channel::Scale,
            TweenValue::Points { .. } => Channel::Points,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        }
    }

    pub fn is_done(&self) -> bool {
        self.progress() >= 1.0
    }

    fn command_at(&self, t: f32) -> SceneCommand {
        let handle = self.handle;
        match &self.value {
            TweenValue::Position { from, to } => SceneCommand::SetPosition {
                handle,
                position: from.lerp(*to, t),
            },
            TweenValue::Scale { from, to } => SceneCommand::SetScale {
                handle,
                scale: from.lerp(*to, t),
            },
            TweenValue::Points { from, to } => SceneCommand::SetPoints {
                handle,
                points: from.iter().zip(to).map(|(a, b)| a.lerp(*b, t)).collect(),
            },
        }
    }

    /// Visuals this tween's completions despawn.
    fn despawns(&self) -> Vec<VisualHandle> {
        self.on_complete
            .iter()
            .filter_map(|command| match command {
                SceneCommand::Despawn { handle } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    fn finish<B: SceneBackend + ?Sized>(self, backend: &mut B) {
        backend.apply(&self.command_at(1.0));
        for command in &self.on_complete {
            backend.apply(command);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub completed: usize,
    pub running: usize,
}

/// Owns every in-flight tween, keyed by visual and channel.
#[derive(Debug, Default)]
pub struct Animator {
    running: BTreeMap<(VisualHandle, Channel), Tween>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a batch of tweens together. A tween replacing one already
    /// running on the same visual and channel finalizes the old one first.
    /// Returns how many running tweens were superseded.
    pub fn start_batch<B: SceneBackend + ?Sized>(
        &mut self,
        batch: Vec<Tween>,
        backend: &mut B,
    ) -> usize {
        let mut superseded = 0;
        for tween in batch {
            let key = (tween.handle, tween.channel());
            if let Some(previous) = self.running.remove(&key) {
                superseded += 1;
                previous.finish(backend);
            }
            if tween.is_done() {
                tween.finish(backend);
            } else {
                self.running.insert(key, tween);
            }
        }
        superseded
    }

    /// Advances every running tween by `dt_ms` and pushes interpolated values.
    pub fn tick<B: SceneBackend + ?Sized>(&mut self, dt_ms: f32, backend: &mut B) -> TickOutcome {
        let mut finished = Vec::new();
        for (key, tween) in self.running.iter_mut() {
            tween.elapsed_ms += dt_ms;
            if tween.is_done() {
                finished.push(*key);
            } else {
                backend.apply(&tween.command_at(tween.progress()));
            }
        }
        let mut completed = 0;
        for key in finished {
            if let Some(tween) = self.running.remove(&key) {
                let despawned = tween.despawns();
                tween.finish(backend);
                completed += 1;
                for handle in despawned {
                    forget(&mut self.running, handle);
                }
            }
        }
        TickOutcome {
            completed,
            running: self.running.len(),
        }
    }

    /// Jumps every running tween to its end state.
    pub fn finish_all<B: SceneBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let mut running = std::mem::take(&mut self.running);
        let mut count = 0;
        while let Some((_, tween)) = running.pop_first() {
            let despawned = tween.despawns();
            tween.finish(backend);
            count += 1;
            for handle in despawned {
                forget(&mut running, handle);
            }
        }
        count
    }

    /// Drops every tween of a visual that is being despawned, without
    /// applying end values or completions. Completions other tweens still
    /// hold for that visual are dropped as well.
    pub fn discard(&mut self, handle: VisualHandle) -> usize {
        forget(&mut self.running, handle)
    }

    pub fn is_animating(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub fn get(&self, handle: VisualHandle, channel: Channel) -> Option<&Tween> {
        self.running.get(&(handle, channel))
    }
}

/// Removes a dead visual from the running set: its own tweens and any
/// completion another tween still holds for it.
fn forget(running: &mut BTreeMap<(VisualHandle, Channel), Tween>, handle: VisualHandle) -> usize {
    let before = running.len();
    running.retain(|(owner, _), _| *owner != handle);
    for tween in running.values_mut() {
        tween.on_complete.retain(|command| command.handle() != handle);
    }
    before - running.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::backend::RecordingBackend;

    #[test]
    fn mismatched_point_lists_are_rejected() {
        let from = vec![Point::default(); 2];
        let to = vec![Point::default(); 21];
        assert_eq!(
            Tween::points(7, from, to, 600.0).unwrap_err(),
            LayoutError::PointCountMismatch {
                handle: 7,
                from: 2,
                to: 21
            }
        );
    }

    #[test]
    fn tick_interpolates_then_completes() {
        let mut backend = RecordingBackend::new();
        let mut animator = Animator::new();
        let tween = Tween::position(1, Point::new(0.0, 0.0), Point::new(4.0, 2.0), 100.0)
            .then(SceneCommand::Despawn { handle: 1 });
        animator.start_batch(vec![tween], &mut backend);

        let outcome = animator.tick(50.0, &mut backend);
        assert_eq!(outcome, TickOutcome { completed: 0, running: 1 });
        assert_eq!(
            backend.log.last(),
            Some(&SceneCommand::SetPosition {
                handle: 1,
                position: Point::new(2.0, 1.0)
            })
        );

        let outcome = animator.tick(60.0, &mut backend);
        assert_eq!(outcome, TickOutcome { completed: 1, running: 0 });
        assert_eq!(backend.log.last(), Some(&SceneCommand::Despawn { handle: 1 }));
        assert!(!animator.is_animating());
    }

    #[test]
    fn newer_tween_supersedes_and_finalizes_older() {
        let mut backend = RecordingBackend::new();
        let mut animator = Animator::new();
        let first = Tween::position(3, Point::new(0.0, 0.0), Point::new(1.0, 0.0), 600.0)
            .then(SceneCommand::AttachLabel {
                handle: 4,
                text: "Block".to_string(),
                position: Point::new(1.0, 0.0),
            });
        animator.start_batch(vec![first], &mut backend);
        animator.tick(100.0, &mut backend);

        let second = Tween::position(3, Point::new(1.0, 0.0), Point::new(5.0, 0.0), 600.0);
        let superseded = animator.start_batch(vec![second], &mut backend);
        assert_eq!(superseded, 1);
        assert_eq!(animator.running(), 1);
        let tail = &backend.log[backend.log.len() - 2..];
        assert_eq!(
            tail[0],
            SceneCommand::SetPosition {
                handle: 3,
                position: Point::new(1.0, 0.0)
            }
        );
        assert!(matches!(tail[1], SceneCommand::AttachLabel { handle: 4, .. }));
        let running = animator.get(3, Channel::Position).unwrap();
        assert_eq!(running.elapsed_ms, 0.0);
    }

    #[test]
    fn discard_drops_completions_aimed_at_the_handle() {
        let mut backend = RecordingBackend::new();
        let mut animator = Animator::new();
        let scale = Tween::scale(3, Point::new(1.0, 1.0), Point::new(2.0, 2.0), 600.0)
            .then(SceneCommand::AttachLabel {
                handle: 4,
                text: "Block".to_string(),
                position: Point::new(1.0, 0.0),
            });
        animator.start_batch(vec![scale], &mut backend);

        assert_eq!(animator.discard(4), 0);
        assert!(animator.get(3, Channel::Scale).unwrap().on_complete.is_empty());
        animator.finish_all(&mut backend);
        assert!(backend.log.iter().all(|command| command.handle() != 4));
    }

    #[test]
    fn completion_despawn_stops_other_channels() {
        let mut backend = RecordingBackend::new();
        let mut animator = Animator::new();
        let fold = Tween::position(5, Point::new(0.0, 0.0), Point::new(1.0, 0.0), 100.0)
            .then(SceneCommand::Despawn { handle: 5 });
        let grow = Tween::scale(5, Point::new(0.0, 0.0), Point::new(1.0, 1.0), 600.0);
        animator.start_batch(vec![fold, grow], &mut backend);

        let outcome = animator.tick(150.0, &mut backend);
        assert_eq!(outcome, TickOutcome { completed: 1, running: 0 });
        assert_eq!(backend.log.last(), Some(&SceneCommand::Despawn { handle: 5 }));
    }

    #[test]
    fn zero_duration_applies_immediately() {
        let mut backend = RecordingBackend::new();
        let mut animator = Animator::new();
        animator.start_batch(
            vec![Tween::scale(9, Point::new(0.0, 0.0), Point::new(1.0, 1.0), 0.0)],
            &mut backend,
        );
        assert!(!animator.is_animating());
        assert_eq!(
            backend.log,
            vec![SceneCommand::SetScale {
                handle: 9,
                scale: Point::new(1.0, 1.0)
            }]
        );
    }
}
