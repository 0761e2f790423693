use crate::{EntityHandle, MemberKey, RailDirection, RailSpec, Vec2};

/// A moving frame that carries a group of boxes and dispensers.
#[derive(Debug, Clone)]
pub struct Rail {
    handle: EntityHandle,
    direction: RailDirection,
    step: f32,
    origin: Vec2,
    members: Vec<MemberKey>,
    travel: f32,
    paused: f32,
}

impl Rail {
    pub fn new(handle: EntityHandle, spec: &RailSpec) -> Self {
        Self {
            handle,
            direction: spec.direction,
            step: spec.step_distance,
            origin: spec.position,
            members: spec.members.clone(),
            travel: 0.0,
            paused: 0.0,
        }
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn members(&self) -> &[MemberKey] {
        &self.members
    }

    pub fn contains(&self, key: MemberKey) -> bool {
        self.members.contains(&key)
    }

    pub fn span(&self) -> f32 {
        self.step * self.members.len() as f32
    }

    pub fn is_paused(&self) -> bool {
        self.paused > 0.0
    }

    /// Current position of `key`, or `None` when it does not ride this rail.
    pub fn member_position(&self, key: MemberKey) -> Option<Vec2> {
        let slot = self.members.iter().position(|m| *m == key)?;
        let span = self.span();
        let mut back = self.step * (slot + 1) as f32 - self.travel;
        if span > 0.0 {
            back = back.rem_euclid(span);
            if back == 0.0 {
                back = span;
            }
        }
        Some(self.origin - self.direction.unit() * back)
    }

    /// Advances motion; members wrap around the span.
    pub fn tick(&mut self, dt: f32, speed: f32) {
        if self.paused > 0.0 {
            self.paused = (self.paused - dt).max(0.0);
            return;
        }
        if self.direction == RailDirection::None {
            return;
        }
        self.travel += speed * dt;
        let span = self.span();
        if span > 0.0 {
            self.travel = self.travel.rem_euclid(span);
        }
    }

    pub fn stop_for(&mut self, secs: f32) {
        self.paused = secs.max(self.paused);
    }

    pub fn resume(&mut self) {
        self.paused = 0.0;
    }
}
