use crate::{move_score, AutoMove, AutoplayError, MoveClass, MoveFacts, MoveWeights};
use boxmatch_core::{
    BoardRules, RngState, SlotRef, Stage, StageEvent, StageOutcome, StageSpec, Token, MATCH_COUNT,
};

#[derive(Debug)]
pub struct Simulator {
    pub stage: Stage,
}

impl Simulator {
    pub fn new(spec: StageSpec, rules: BoardRules, seed: u64) -> Result<Self, AutoplayError> {
        let stage = Stage::load(spec, rules, seed)?;
        Ok(Self { stage })
    }

    pub fn outcome(&self) -> Option<StageOutcome> {
        self.stage.outcome()
    }

    pub fn remaining(&self) -> i64 {
        self.stage.remaining()
    }

    pub fn token_at(&self, at: SlotRef) -> Option<Token> {
        if let Some(entity) = self.stage.box_by_handle(at.handle) {
            return entity.slots().get(at.slot).copied();
        }
        self.stage
            .dispenser_by_handle(at.handle)
            .and_then(|d| d.slots().get(at.slot).copied())
    }

    /// Every move the stage would accept right now.
    pub fn legal_moves(&self) -> Vec<AutoMove> {
        let mut sources = Vec::new();
        let mut targets = Vec::new();
        let mut moves = Vec::new();
        for entity in self.stage.boxes() {
            for slot in 0..entity.slots().len() {
                let at = SlotRef::new(entity.handle(), slot);
                if entity.check_take(slot).is_ok() {
                    sources.push(at);
                }
                if entity.check_place(slot).is_ok() {
                    targets.push(at);
                }
                if entity.is_interactable() && entity.slots()[slot].is_gold() {
                    moves.push(AutoMove::CollectGold { at });
                }
            }
        }
        for dispenser in self.stage.dispensers() {
            for slot in 0..dispenser.slots().len() {
                if dispenser.check_take(slot).is_ok() {
                    sources.push(SlotRef::new(dispenser.handle(), slot));
                }
            }
        }
        for from in &sources {
            for to in &targets {
                moves.push(AutoMove::Move { from: *from, to: *to });
            }
        }
        moves
    }

    pub fn facts(&self, mv: &AutoMove) -> Option<MoveFacts> {
        let (from, to) = match mv {
            AutoMove::CollectGold { .. } => {
                return Some(MoveFacts {
                    class: MoveClass::Gold,
                    empties_source: false,
                    saturates_target: false,
                })
            }
            AutoMove::Move { from, to } => (*from, *to),
        };
        let token = self.token_at(from)?;
        let target = self.stage.box_by_handle(to.handle)?;
        let mut window = target.slots().to_vec();
        if from.handle == to.handle {
            *window.get_mut(from.slot)? = Token::NONE;
        }
        *window.get_mut(to.slot)? = token;
        let same = window.iter().filter(|t| **t == token).count();
        let class = if same >= MATCH_COUNT {
            MoveClass::Triplet
        } else if same == 2 {
            MoveClass::Pair
        } else {
            MoveClass::Plain
        };
        let empties_source = from.handle != to.handle
            && self
                .stage
                .box_by_handle(from.handle)
                .is_some_and(|b| b.slots().iter().filter(|t| !t.is_none()).count() == 1);
        Some(MoveFacts {
            class,
            empties_source,
            saturates_target: window.iter().all(|t| !t.is_none()),
        })
    }

    /// Highest-scoring legal move, ties broken by `rng`. `avoid` filters out
    /// a move by stable key, typically the inverse of the previous one.
    pub fn choose(
        &self,
        weights: MoveWeights,
        rng: &mut RngState,
        avoid: Option<&str>,
    ) -> Option<(AutoMove, MoveFacts)> {
        let mut best: Vec<(AutoMove, MoveFacts)> = Vec::new();
        let mut best_score = f64::NEG_INFINITY;
        for mv in self.legal_moves() {
            if avoid.is_some_and(|key| key == mv.stable_key()) {
                continue;
            }
            let Some(facts) = self.facts(&mv) else {
                continue;
            };
            let score = move_score(facts, weights);
            if score > best_score {
                best_score = score;
                best.clear();
            }
            if score >= best_score {
                best.push((mv, facts));
            }
        }
        if best.is_empty() {
            return None;
        }
        let pick = rng.range(best.len());
        best.get(pick).copied()
    }

    /// Applies `mv` and returns the events it produced.
    pub fn apply(&mut self, mv: &AutoMove) -> Result<Vec<StageEvent>, AutoplayError> {
        match mv {
            AutoMove::Move { from, to } => self.stage.move_token(*from, *to)?,
            AutoMove::CollectGold { at } => self.stage.collect_gold(*at)?,
        }
        Ok(self.stage.drain_events())
    }

    pub fn advance(&mut self, dt: f32) -> Result<Vec<StageEvent>, AutoplayError> {
        self.stage.tick(dt)?;
        Ok(self.stage.drain_events())
    }
}
