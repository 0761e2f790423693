use crate::{ColorVariant, ItemType, StageError, Token, MAX_LOCK_LEVEL, MAX_START_NONE_PER_BOX, VISIBLE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle given by its center and full size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub center: Vec2,
    pub size: Vec2,
}

impl Region {
    pub const fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, size }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.size * 0.5
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.size * 0.5
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        let (a0, a1) = (self.min(), self.max());
        let (b0, b1) = (other.min(), other.max());
        a0.x < b1.x && b0.x < a1.x && a0.y < b1.y && b0.y < a1.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let (lo, hi) = (self.min(), self.max());
        point.x >= lo.x && point.x <= hi.x && point.y >= lo.y && point.y <= hi.y
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::new(1.0e6, 1.0e6))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoxKind {
    Box,
    Gimmick,
}

/// Stable identity of a box or dispenser inside a stage document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    pub index: u32,
    pub kind: BoxKind,
}

impl MemberKey {
    pub const fn boxed(index: u32) -> Self {
        Self {
            index,
            kind: BoxKind::Box,
        }
    }

    pub const fn gimmick(index: u32) -> Self {
        Self {
            index,
            kind: BoxKind::Gimmick,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxSpec {
    pub index: u32,
    #[serde(default)]
    pub position: Vec2,
    /// Window slots that start empty for this box alone.
    #[serde(default)]
    pub start_count: u8,
    #[serde(default)]
    pub lock_level: u8,
    #[serde(default)]
    pub gravity: bool,
}

impl BoxSpec {
    pub fn new(index: u32, position: Vec2) -> Self {
        Self {
            index,
            position,
            start_count: 0,
            lock_level: 0,
            gravity: false,
        }
    }

    pub fn key(&self) -> MemberKey {
        MemberKey::boxed(self.index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispenserSpec {
    pub index: u32,
    #[serde(default)]
    pub position: Vec2,
    pub dispense_batch_size: u32,
    pub wave_count: u32,
    #[serde(default)]
    pub is_next_queue: bool,
}

impl DispenserSpec {
    pub fn demand(&self) -> usize {
        self.dispense_batch_size as usize * self.wave_count as usize
    }

    pub fn key(&self) -> MemberKey {
        MemberKey::gimmick(self.index)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RailDirection {
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
}

impl RailDirection {
    pub fn unit(self) -> Vec2 {
        match self {
            RailDirection::None => Vec2::ZERO,
            RailDirection::Left => Vec2::new(-1.0, 0.0),
            RailDirection::Right => Vec2::new(1.0, 0.0),
            RailDirection::Up => Vec2::new(0.0, 1.0),
            RailDirection::Down => Vec2::new(0.0, -1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RailSpec {
    #[serde(default)]
    pub direction: RailDirection,
    pub step_distance: f32,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub members: Vec<MemberKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShelfSpec {
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub size: Vec2,
}

/// Declarative description of one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StageSpec {
    pub thing_count: u32,
    #[serde(default)]
    pub none_count: u32,
    #[serde(default)]
    pub start_none_count: u32,
    #[serde(default)]
    pub hidden_count: u32,
    #[serde(default)]
    pub gold_count: u32,
    /// Zero disables the countdown.
    #[serde(default)]
    pub time_limit_secs: u32,
    #[serde(default)]
    pub sold_out: bool,
    #[serde(default)]
    pub hard_mode: bool,
    #[serde(default)]
    pub boxes: Vec<BoxSpec>,
    #[serde(default)]
    pub dispensers: Vec<DispenserSpec>,
    #[serde(default)]
    pub rails: Vec<RailSpec>,
    #[serde(default)]
    pub gravity_shelves: Vec<ShelfSpec>,
    #[serde(default)]
    pub play_area: Region,
    /// Fixed per-box token sequences that replace generation.
    #[serde(default)]
    pub preset: Option<Vec<Vec<Token>>>,
}

impl StageSpec {
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn gimmick_all(&self) -> usize {
        self.dispensers.iter().map(DispenserSpec::demand).sum()
    }

    pub fn start_count_total(&self) -> usize {
        self.boxes.iter().map(|b| b.start_count as usize).sum()
    }

    /// Empty window slots spread by the stage-wide start-none pass.
    pub fn stage_start_none(&self) -> usize {
        (self.start_none_count as usize).saturating_sub(self.start_count_total())
    }

    /// Boxes that may receive stage-wide start empties.
    pub fn start_none_eligible(&self) -> usize {
        self.boxes
            .iter()
            .filter(|b| b.lock_level == 0 && b.start_count == 0)
            .count()
    }

    /// Tokens the box pool must hold to cover every starting window.
    pub fn opening_demand(&self) -> usize {
        let filled: usize = self
            .boxes
            .iter()
            .map(|b| VISIBLE_COUNT - (b.start_count as usize).min(VISIBLE_COUNT))
            .sum();
        filled.saturating_sub(self.stage_start_none())
    }

    /// Every token the generator places: real, empty, start-empty and gold.
    pub fn total_tokens(&self) -> usize {
        (self.thing_count + self.none_count + self.start_none_count + self.gold_count) as usize
    }

    pub fn has_gravity_shelf(&self) -> bool {
        !self.gravity_shelves.is_empty()
    }

    pub fn validate(&self) -> Result<(), StageError> {
        let fail = |msg: String| Err(StageError::SpecInconsistent(msg));
        if self.boxes.is_empty() {
            return fail("stage has no boxes".to_string());
        }
        let mut seen = HashSet::new();
        for key in self
            .boxes
            .iter()
            .map(BoxSpec::key)
            .chain(self.dispensers.iter().map(DispenserSpec::key))
        {
            if !seen.insert(key) {
                return fail(format!("duplicate index {} for {:?}", key.index, key.kind));
            }
        }
        for spec in &self.boxes {
            if spec.start_count as usize > VISIBLE_COUNT {
                return fail(format!(
                    "box {} start_count {} exceeds {VISIBLE_COUNT}",
                    spec.index, spec.start_count
                ));
            }
            if spec.lock_level > MAX_LOCK_LEVEL {
                return fail(format!(
                    "box {} lock_level {} exceeds {MAX_LOCK_LEVEL}",
                    spec.index, spec.lock_level
                ));
            }
        }
        for dispenser in &self.dispensers {
            if dispenser.dispense_batch_size == 0 || dispenser.wave_count == 0 {
                return fail(format!(
                    "dispenser {} needs a non-zero batch size and wave count",
                    dispenser.index
                ));
            }
        }
        for (idx, rail) in self.rails.iter().enumerate() {
            if let Some(missing) = rail.members.iter().find(|key| !seen.contains(key)) {
                return fail(format!(
                    "rail {idx} references missing {:?} {}",
                    missing.kind, missing.index
                ));
            }
        }
        if let Some(preset) = &self.preset {
            return self.validate_preset(preset);
        }

        if self.thing_count as usize % VISIBLE_COUNT != 0 {
            return fail(format!(
                "thing_count {} is not a multiple of {VISIBLE_COUNT}",
                self.thing_count
            ));
        }
        let gimmick = self.gimmick_all();
        if gimmick > self.thing_count as usize {
            return fail(format!(
                "dispensers demand {gimmick} tokens but thing_count is {}",
                self.thing_count
            ));
        }
        if (self.start_none_count as usize) < self.start_count_total() {
            return fail(format!(
                "start_none_count {} is below the per-box start counts {}",
                self.start_none_count,
                self.start_count_total()
            ));
        }
        let budget = self.stage_start_none();
        let eligible = self.start_none_eligible();
        if budget > MAX_START_NONE_PER_BOX * eligible {
            return fail(format!(
                "{budget} start empties cannot fit {eligible} eligible boxes"
            ));
        }
        let pool = self.thing_count as usize - gimmick
            + self.none_count as usize
            + self.gold_count as usize;
        if pool < self.opening_demand() {
            return fail(format!(
                "box pool of {pool} cannot cover {} opening slots",
                self.opening_demand()
            ));
        }
        let visible = self.thing_count as usize - gimmick + self.gold_count as usize;
        if self.hidden_count as usize > visible {
            return fail(format!(
                "hidden_count {} exceeds {visible} non-empty box tokens",
                self.hidden_count
            ));
        }
        Ok(())
    }

    fn validate_preset(&self, preset: &[Vec<Token>]) -> Result<(), StageError> {
        if preset.len() != self.boxes.len() {
            return Err(StageError::SpecInconsistent(format!(
                "preset has {} entries for {} boxes",
                preset.len(),
                self.boxes.len()
            )));
        }
        if !self.dispensers.is_empty() {
            return Err(StageError::SpecInconsistent(
                "preset stages cannot carry dispensers".to_string(),
            ));
        }
        let tokens = preset.iter().flatten();
        let real = tokens.clone().filter(|t| t.is_matchable()).count();
        let gold = tokens.filter(|t| t.is_gold()).count();
        if real != self.thing_count as usize || gold != self.gold_count as usize {
            return Err(StageError::SpecInconsistent(format!(
                "preset holds {real} real and {gold} gold tokens, expected {} and {}",
                self.thing_count, self.gold_count
            )));
        }
        Ok(())
    }

    /// Three-box layout shown on the very first stage.
    pub fn tutorial() -> Self {
        let mut spec = Self::default();
        spec.apply_tutorial();
        spec
    }

    /// Installs the tutorial preset over the first three boxes.
    pub fn apply_tutorial(&mut self) {
        let milk = Token::new(ItemType::Milk, ColorVariant::Green);
        let juice = Token::new(ItemType::Juice, ColorVariant::Yellow);
        let none = Token::NONE;
        let layout = vec![
            vec![milk, none, juice],
            vec![none, juice, juice],
            vec![milk, milk, none],
        ];
        if self.boxes.len() < layout.len() {
            self.boxes = (0..layout.len() as u32)
                .map(|i| BoxSpec::new(i, Vec2::new(-2.2 + 2.2 * i as f32, 0.0)))
                .collect();
        }
        self.boxes.truncate(layout.len());
        for spec in &mut self.boxes {
            spec.start_count = 0;
            spec.lock_level = 0;
        }
        self.dispensers.clear();
        self.rails.clear();
        self.thing_count = 6;
        self.none_count = 0;
        self.start_none_count = 0;
        self.hidden_count = 0;
        self.gold_count = 0;
        self.preset = Some(layout);
    }
}
