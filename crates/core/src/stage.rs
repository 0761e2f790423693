use crate::{
    generate, BoardRules, BoundsOverlap, BoxEvent, BoxKind, BoxState, ComboTracker, ControllerHandle,
    Countdown, Dispenser, EntityBounds, EntityHandle, EntityKind, EntitySlot, EventBus, FailReason,
    InstanceProvider, Kind, MatchBox, MemberKey, OverlapQuery, PooledProvider, PresentationSink,
    Rail, Region, Registry, RngState, ShelfSpec, StageError, StageEvent, StageOutcome, StageSpec,
    TimerTick, Token, Vec2, MATCH_COUNT,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// One slot of a box or dispenser window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    pub handle: EntityHandle,
    pub slot: usize,
}

impl SlotRef {
    pub const fn new(handle: EntityHandle, slot: usize) -> Self {
        Self { handle, slot }
    }
}

pub struct StageBuilder {
    rules: BoardRules,
    seed: u64,
    provider: Box<dyn InstanceProvider>,
    overlap: Box<dyn OverlapQuery>,
}

impl Default for StageBuilder {
    fn default() -> Self {
        Self {
            rules: BoardRules::default(),
            seed: 0,
            provider: Box::new(PooledProvider::default()),
            overlap: Box::new(BoundsOverlap),
        }
    }
}

impl StageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(mut self, rules: BoardRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn provider(mut self, provider: Box<dyn InstanceProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn overlap(mut self, overlap: Box<dyn OverlapQuery>) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn load(self, spec: StageSpec) -> Result<Stage, StageError> {
        Stage::load_with(spec, self)
    }
}

/// Owns every entity of a loaded stage and folds their events into the outcome.
pub struct Stage {
    spec: StageSpec,
    rules: BoardRules,
    seed: u64,
    registry: Registry,
    boxes: Vec<MatchBox>,
    dispensers: Vec<Dispenser>,
    rails: Vec<Rail>,
    shelves: Vec<(EntityHandle, ShelfSpec)>,
    controllers: Vec<ControllerHandle>,
    provider: Box<dyn InstanceProvider>,
    overlap: Box<dyn OverlapQuery>,
    events: EventBus,
    remaining: i64,
    combo: ComboTracker,
    stars: u32,
    star_multiplier: u32,
    gold_collected: u32,
    timer: Countdown,
    paused: bool,
    outcome: Option<StageOutcome>,
    loaded: bool,
    torn_down: bool,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("boxes", &self.boxes.len())
            .field("dispensers", &self.dispensers.len())
            .field("remaining", &self.remaining)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl Stage {
    pub fn load(spec: StageSpec, rules: BoardRules, seed: u64) -> Result<Self, StageError> {
        StageBuilder::new().rules(rules).seed(seed).load(spec)
    }

    fn load_with(spec: StageSpec, builder: StageBuilder) -> Result<Self, StageError> {
        let StageBuilder {
            rules,
            seed,
            provider,
            overlap,
        } = builder;
        let mut rng = RngState::from_seed(seed);
        let layout = generate(&spec, &rules, &mut rng)?;
        let mut stage = Stage {
            remaining: (spec.thing_count + spec.gold_count) as i64,
            timer: Countdown::new(spec.time_limit_secs),
            spec: StageSpec::default(),
            rules,
            seed,
            registry: Registry::default(),
            boxes: Vec::with_capacity(layout.boxes.len()),
            dispensers: Vec::with_capacity(layout.dispensers.len()),
            rails: Vec::new(),
            shelves: Vec::new(),
            controllers: Vec::new(),
            provider,
            overlap,
            events: EventBus::default(),
            combo: ComboTracker::default(),
            stars: 0,
            star_multiplier: 1,
            gold_collected: 0,
            paused: false,
            outcome: None,
            loaded: false,
            torn_down: false,
        };

        let mut rail_controllers = Vec::with_capacity(spec.rails.len());
        for (idx, rail_spec) in spec.rails.iter().enumerate() {
            let handle = stage.registry.allocate(EntitySlot::Rail(idx), None);
            let controller = stage.acquire(EntityKind::Rail, None);
            rail_controllers.push(controller);
            stage.rails.push(Rail::new(handle, rail_spec));
        }

        for (idx, (box_spec, tokens)) in spec.boxes.iter().zip(layout.boxes).enumerate() {
            let key = box_spec.key();
            let handle = stage.registry.allocate(EntitySlot::Box(idx), Some(key));
            let parent = stage.rail_index(key).map(|r| rail_controllers[r]);
            stage.acquire(EntityKind::Box, parent);
            let mut entity = MatchBox::new(
                handle,
                box_spec,
                tokens,
                spec.sold_out,
                stage.rules.clear_presentation_secs,
            );
            if let Some(position) = stage.rail_position(key) {
                entity.set_position(position);
            }
            let mut out = Vec::new();
            entity.materialize(&mut out)?;
            stage.boxes.push(entity);
            stage.absorb(handle, out);
        }

        for (idx, (dispenser_spec, tokens)) in spec.dispensers.iter().zip(layout.dispensers).enumerate() {
            let key = dispenser_spec.key();
            let handle = stage.registry.allocate(EntitySlot::Dispenser(idx), Some(key));
            let parent = stage.rail_index(key).map(|r| rail_controllers[r]);
            stage.acquire(EntityKind::Gimmick, parent);
            let mut entity =
                Dispenser::new(handle, dispenser_spec, tokens, stage.rules.clear_presentation_secs);
            if let Some(position) = stage.rail_position(key) {
                entity.set_position(position);
            }
            let mut out = Vec::new();
            entity.materialize(&mut out)?;
            stage.dispensers.push(entity);
            stage.absorb(handle, out);
        }

        for (idx, shelf) in spec.gravity_shelves.iter().enumerate() {
            let handle = stage.registry.allocate(EntitySlot::Shelf(idx), None);
            stage.acquire(EntityKind::Shelf, None);
            stage.shelves.push((handle, shelf.clone()));
        }

        stage.events.push(StageEvent::StageLoaded {
            boxes: stage.boxes.len(),
            dispensers: stage.dispensers.len(),
            remaining: stage.remaining,
            hard_mode: spec.hard_mode,
        });
        log::info!(
            "stage loaded: {} boxes, {} dispensers, {} rails, seed {}",
            stage.boxes.len(),
            stage.dispensers.len(),
            stage.rails.len(),
            seed
        );
        stage.spec = spec;
        stage.loaded = true;
        Ok(stage)
    }

    pub fn spec(&self) -> &StageSpec {
        &self.spec
    }

    pub fn rules(&self) -> &BoardRules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn boxes(&self) -> &[MatchBox] {
        &self.boxes
    }

    pub fn dispensers(&self) -> &[Dispenser] {
        &self.dispensers
    }

    pub fn rails(&self) -> &[Rail] {
        &self.rails
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn combo(&self) -> u32 {
        self.combo.count()
    }

    pub fn stars(&self) -> u32 {
        self.stars
    }

    pub fn gold_collected(&self) -> u32 {
        self.gold_collected
    }

    pub fn outcome(&self) -> Option<StageOutcome> {
        self.outcome
    }

    pub fn time_remaining(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn handle_of(&self, key: MemberKey) -> Option<EntityHandle> {
        self.registry.by_key(key)
    }

    pub fn box_by_handle(&self, handle: EntityHandle) -> Option<&MatchBox> {
        match self.registry.resolve(handle)? {
            EntitySlot::Box(idx) => self.boxes.get(idx),
            _ => None,
        }
    }

    pub fn dispenser_by_handle(&self, handle: EntityHandle) -> Option<&Dispenser> {
        match self.registry.resolve(handle)? {
            EntitySlot::Dispenser(idx) => self.dispensers.get(idx),
            _ => None,
        }
    }

    pub fn next_window(&self, handle: EntityHandle) -> Option<Vec<Token>> {
        self.box_by_handle(handle).map(MatchBox::next_window)
    }

    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        self.events.drain().collect()
    }

    pub fn forward_events(&mut self, sink: &mut dyn PresentationSink) {
        crate::forward_events(self.events.drain(), sink);
    }

    /// Moves one token from a box or dispenser slot into an empty box slot.
    pub fn move_token(&mut self, from: SlotRef, to: SlotRef) -> Result<(), StageError> {
        self.ensure_live()?;
        let source = self.registry.resolve(from.handle).ok_or(StageError::UnknownEntity)?;
        let target = match self.registry.resolve(to.handle).ok_or(StageError::UnknownEntity)? {
            EntitySlot::Box(idx) => idx,
            EntitySlot::Dispenser(_) => return Err(StageError::NotDroppable),
            _ => return Err(StageError::UnknownEntity),
        };
        match source {
            EntitySlot::Box(idx) => {
                self.boxes[idx].check_take(from.slot)?;
            }
            EntitySlot::Dispenser(idx) => {
                self.dispensers[idx].check_take(from.slot)?;
            }
            _ => return Err(StageError::UnknownEntity),
        }
        self.boxes[target].check_place(to.slot)?;
        self.timer.start();

        if source == EntitySlot::Box(target) {
            let mut out = Vec::new();
            self.boxes[target].relocate(from.slot, to.slot, &mut out)?;
            self.absorb(to.handle, out);
            return Ok(());
        }

        let mut out = Vec::new();
        let token = match source {
            EntitySlot::Box(idx) => self.boxes[idx].take(from.slot, &mut out)?,
            EntitySlot::Dispenser(idx) => self.dispensers[idx].take(from.slot, &mut out)?,
            _ => return Err(StageError::UnknownEntity),
        };
        self.absorb(from.handle, out);

        let mut out = Vec::new();
        self.boxes[target].place(to.slot, token, &mut out)?;
        self.absorb(to.handle, out);
        Ok(())
    }

    pub fn collect_gold(&mut self, at: SlotRef) -> Result<(), StageError> {
        self.ensure_live()?;
        let idx = match self.registry.resolve(at.handle).ok_or(StageError::UnknownEntity)? {
            EntitySlot::Box(idx) => idx,
            EntitySlot::Dispenser(_) => return Err(StageError::NotGold),
            _ => return Err(StageError::UnknownEntity),
        };
        let mut out = Vec::new();
        self.boxes[idx].collect_gold(at.slot, &mut out)?;
        self.timer.start();
        self.absorb(at.handle, out);
        Ok(())
    }

    /// Hammer item. Returns the number of tokens removed.
    pub fn use_hammer(&mut self, kind: Kind) -> Result<u32, StageError> {
        self.ensure_live()?;
        let start = self.rules.hammer_start;
        let mut running = start;
        for idx in 0..self.boxes.len() {
            let mut out = Vec::new();
            let (_, next) = self.boxes[idx].remove_by_type(kind, running, &mut out);
            running = next;
            let handle = self.boxes[idx].handle();
            self.absorb(handle, out);
        }
        let removed = running - start;
        if removed > 0 {
            self.remaining -= removed as i64;
        }
        self.events.push(StageEvent::HammerUsed {
            kind,
            removed,
            remaining: self.remaining,
        });
        log::debug!("hammer removed {removed} tokens of {kind:?}");
        self.check_clear();
        Ok(removed)
    }

    /// Magic wand item. A placeholder target leaves the board untouched.
    pub fn use_magic_wand(&mut self, from: &HashSet<Kind>, to: Kind) -> Result<(), StageError> {
        self.ensure_live()?;
        if !Token::from_kind(to).is_matchable() {
            return Ok(());
        }
        for idx in 0..self.boxes.len() {
            let mut out = Vec::new();
            self.boxes[idx].change_type(from, to, &mut out);
            let handle = self.boxes[idx].handle();
            self.absorb(handle, out);
        }
        for idx in 0..self.dispensers.len() {
            let mut out = Vec::new();
            self.dispensers[idx].change_type(from, to, &mut out);
            let handle = self.dispensers[idx].handle();
            self.absorb(handle, out);
        }
        self.events.push(StageEvent::WandUsed { to });
        Ok(())
    }

    /// Time-up item.
    pub fn add_time(&mut self, secs: u32) -> Result<(), StageError> {
        self.ensure_live()?;
        self.timer.add(secs);
        self.events.push(StageEvent::TimeAdded {
            secs,
            remaining: self.timer.remaining(),
        });
        Ok(())
    }

    /// Star-double item.
    pub fn double_stars(&mut self) -> Result<(), StageError> {
        self.ensure_live()?;
        self.star_multiplier = 2;
        Ok(())
    }

    pub fn start_timer(&mut self) -> Result<(), StageError> {
        self.ensure_live()?;
        self.timer.start();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.timer.pause();
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.timer.resume();
    }

    pub fn stop_rails(&mut self) -> Result<(), StageError> {
        self.ensure_live()?;
        let secs = self.rules.rail_stop_secs;
        for rail in &mut self.rails {
            rail.stop_for(secs);
        }
        self.events.push(StageEvent::RailsStopped { secs });
        Ok(())
    }

    pub fn resume_rails(&mut self) -> Result<(), StageError> {
        self.ensure_live()?;
        for rail in &mut self.rails {
            rail.resume();
        }
        Ok(())
    }

    pub fn tick(&mut self, dt: f32) -> Result<(), StageError> {
        if self.torn_down {
            return Err(StageError::TornDown);
        }
        for entity in &mut self.boxes {
            entity.tick(dt);
        }
        for entity in &mut self.dispensers {
            entity.tick(dt);
        }
        if self.outcome.is_some() || self.paused {
            return Ok(());
        }
        let speed = self.rules.rail_speed;
        for rail in &mut self.rails {
            rail.tick(dt, speed);
        }
        self.sync_rail_positions();
        self.combo.tick(dt, &self.rules.combo);
        match self.timer.tick(dt) {
            TimerTick::Idle => {}
            TimerTick::Ticked(remaining) => self.events.push(StageEvent::TimerTicked { remaining }),
            TimerTick::Expired => {
                self.events.push(StageEvent::TimerTicked { remaining: 0 });
                self.finish(StageOutcome::Failed(FailReason::TimeOut));
            }
        }
        Ok(())
    }

    /// Cancels pending presentation waits, drops undelivered events and
    /// returns every controller to the provider.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for entity in &mut self.boxes {
            entity.cancel_presentation();
        }
        for entity in &mut self.dispensers {
            entity.cancel_presentation();
        }
        self.timer.stop();
        for controller in self.controllers.drain(..) {
            self.provider.release(controller);
        }
        self.events.clear();
        self.torn_down = true;
        log::debug!("stage torn down");
    }

    /// Distinct real kinds visible in entities overlapping the play area.
    pub fn visible_kinds(&self) -> BTreeSet<Kind> {
        let bounds = self.entity_bounds();
        let mut kinds = BTreeSet::new();
        for handle in self.overlap.query_overlap(&self.spec.play_area, &bounds) {
            let slots = match self.registry.resolve(handle) {
                Some(EntitySlot::Box(idx)) => self.boxes[idx].slots(),
                Some(EntitySlot::Dispenser(idx)) => self.dispensers[idx].slots(),
                _ => continue,
            };
            kinds.extend(slots.iter().filter(|t| t.is_matchable()).map(Token::kind));
        }
        kinds
    }

    /// Tokens still reachable without unlocking anything.
    pub fn solvable_tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self
            .boxes
            .iter()
            .filter(|b| !b.is_locked())
            .flat_map(|b| b.tokens().filter(|t| !t.is_none()).copied())
            .collect();
        for dispenser in self.dispensers.iter().filter(|d| d.is_next_queue()) {
            tokens.extend(dispenser.lookahead_tokens());
        }
        tokens
    }

    pub fn entity_bounds(&self) -> Vec<EntityBounds> {
        let size = self.rules.box_size;
        let mut bounds: Vec<EntityBounds> = self
            .boxes
            .iter()
            .map(|b| EntityBounds {
                handle: b.handle(),
                kind: EntityKind::Box,
                region: Region::new(b.position(), size),
                active: b.state() != BoxState::GravityHidden,
            })
            .collect();
        bounds.extend(self.dispensers.iter().map(|d| EntityBounds {
            handle: d.handle(),
            kind: EntityKind::Gimmick,
            region: Region::new(d.position(), size),
            active: true,
        }));
        bounds.extend(self.shelves.iter().map(|(handle, shelf)| EntityBounds {
            handle: *handle,
            kind: EntityKind::Shelf,
            region: Region::new(shelf.position, shelf.size),
            active: true,
        }));
        bounds
    }

    fn acquire(&mut self, kind: EntityKind, parent: Option<ControllerHandle>) -> ControllerHandle {
        let controller = self.provider.acquire(kind, parent);
        self.controllers.push(controller);
        controller
    }

    fn rail_index(&self, key: MemberKey) -> Option<usize> {
        self.rails.iter().position(|rail| rail.contains(key))
    }

    fn rail_position(&self, key: MemberKey) -> Option<Vec2> {
        self.rails.iter().find_map(|rail| rail.member_position(key))
    }

    fn sync_rail_positions(&mut self) {
        for rail in &self.rails {
            for key in rail.members() {
                let Some(position) = rail.member_position(*key) else {
                    continue;
                };
                match self.registry.by_key(*key).and_then(|h| self.registry.resolve(h)) {
                    Some(EntitySlot::Box(idx)) => self.boxes[idx].set_position(position),
                    Some(EntitySlot::Dispenser(idx)) => self.dispensers[idx].set_position(position),
                    _ => {}
                }
            }
        }
    }

    fn ensure_live(&self) -> Result<(), StageError> {
        if self.torn_down {
            return Err(StageError::TornDown);
        }
        if self.outcome.is_some() {
            return Err(StageError::StageOver);
        }
        Ok(())
    }

    fn absorb(&mut self, handle: EntityHandle, events: Vec<BoxEvent>) {
        let mut window_changed = false;
        for event in events {
            match event {
                BoxEvent::Revealed { slot, token, hidden } => self.events.push(StageEvent::TokenRevealed {
                    handle,
                    slot,
                    token,
                    hidden,
                }),
                BoxEvent::NoneCascade { steps } => {
                    window_changed = true;
                    self.events.push(StageEvent::NoneCascade { handle, steps })
                }
                BoxEvent::Cleared { kind } => {
                    window_changed = true;
                    self.on_cleared(handle, kind)
                }
                BoxEvent::NoClear => window_changed = true,
                BoxEvent::GoldCollected { .. } => self.on_gold(handle),
                BoxEvent::LockChanged { lock } => {
                    self.events.push(StageEvent::LockChanged { handle, lock })
                }
                BoxEvent::Unlocked => self.events.push(StageEvent::BoxUnlocked { handle }),
                BoxEvent::BatchDispensed { wave } => {
                    window_changed = true;
                    self.events.push(StageEvent::BatchDispensed { handle, wave })
                }
                BoxEvent::SoldOut => self.events.push(StageEvent::BoxSoldOut { handle }),
                BoxEvent::GravityHidden => self.events.push(StageEvent::BoxGravityHidden { handle }),
                BoxEvent::Depleted => self.events.push(StageEvent::BoxDepleted { handle }),
            }
        }
        // refills can fill the last empty slot as well as a placement
        if window_changed && self.loaded {
            self.check_fail();
        }
    }

    fn on_cleared(&mut self, handle: EntityHandle, kind: Kind) {
        if self.outcome.is_some() {
            return;
        }
        let next_locked = self
            .boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.handle() != handle && b.is_locked())
            .min_by_key(|(_, b)| b.index())
            .map(|(idx, _)| idx);
        if let Some(idx) = next_locked {
            let mut out = Vec::new();
            self.boxes[idx].decrement_lock(&mut out);
            let locked = self.boxes[idx].handle();
            self.absorb(locked, out);
        }
        self.advance_combo();
        self.remaining -= MATCH_COUNT as i64;
        self.events.push(StageEvent::BoxCleared {
            handle,
            kind,
            remaining: self.remaining,
        });
        self.check_clear();
    }

    fn on_gold(&mut self, handle: EntityHandle) {
        if self.outcome.is_some() {
            return;
        }
        self.gold_collected += 1;
        self.advance_combo();
        self.remaining -= 1;
        self.events.push(StageEvent::GoldCollected {
            handle,
            gold: self.gold_collected,
            remaining: self.remaining,
        });
        self.check_clear();
    }

    fn advance_combo(&mut self) {
        let combo = self.combo.advance(&self.rules.combo);
        self.stars += self.rules.combo.coin_for(combo) * self.star_multiplier;
        self.events.push(StageEvent::ComboAdvanced {
            combo,
            stars: self.stars,
        });
    }

    fn check_clear(&mut self) {
        if self.outcome.is_none() && self.remaining <= 0 {
            self.finish(StageOutcome::Clear);
        }
    }

    /// Boxes the full-board test looks at: overlapping off-rail boxes plus
    /// every box riding a rail. Gravity-hidden boxes never overlap.
    fn fail_candidates(&self) -> BTreeSet<usize> {
        let bounds = self.entity_bounds();
        let mut set = BTreeSet::new();
        for handle in self.overlap.query_overlap(&self.spec.play_area, &bounds) {
            if let Some(EntitySlot::Box(idx)) = self.registry.resolve(handle) {
                if self.rail_index(self.boxes[idx].key()).is_none() {
                    set.insert(idx);
                }
            }
        }
        for rail in &self.rails {
            for key in rail.members().iter().filter(|k| k.kind == BoxKind::Box) {
                if let Some(EntitySlot::Box(idx)) =
                    self.registry.by_key(*key).and_then(|h| self.registry.resolve(h))
                {
                    set.insert(idx);
                }
            }
        }
        set
    }

    fn check_fail(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let candidates = self.fail_candidates();
        if candidates.is_empty() {
            return;
        }
        if candidates.iter().all(|idx| self.boxes[*idx].none_count() == 0) {
            self.finish(StageOutcome::Failed(FailReason::FullBoard));
        }
    }

    fn finish(&mut self, outcome: StageOutcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        self.timer.stop();
        match outcome {
            StageOutcome::Clear => self.events.push(StageEvent::StageClear),
            StageOutcome::Failed(reason) => self.events.push(StageEvent::StageFailed(reason)),
        }
        log::info!(
            "stage finished: {outcome:?} (stars {}, gold {}, remaining {})",
            self.stars,
            self.gold_collected,
            self.remaining
        );
    }
}
