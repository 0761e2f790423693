//! Stage content generation: one ordered pool, sliced into box and dispenser queues.

use crate::{
    anti_run_shuffle, BoardRules, ColorVariant, DispenserSpec, ItemType, RngState, StageError,
    StageSpec, Token, MAX_START_NONE_PER_BOX, VISIBLE_COUNT,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionPhase {
    BasePool,
    ChunkShuffle,
    GimmickCarve,
    NoneGold,
    StartCount,
    StartNone,
    Remainder,
    Hidden,
}

/// Ordered token source consumed strictly from the front.
#[derive(Debug, Clone, Default)]
pub struct TokenPool {
    tokens: VecDeque<Token>,
    consumed: usize,
}

impl TokenPool {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            consumed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn take(&mut self, needed: usize, phase: DistributionPhase) -> Result<Vec<Token>, StageError> {
        if needed > self.tokens.len() {
            return Err(StageError::PoolExhausted {
                phase,
                needed,
                remaining: self.tokens.len(),
            });
        }
        Ok(self.take_up_to(needed))
    }

    pub fn take_up_to(&mut self, count: usize) -> Vec<Token> {
        let count = count.min(self.tokens.len());
        self.consumed += count;
        self.tokens.drain(..count).collect()
    }
}

/// Concrete token assignment for every box and dispenser, in spec order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageLayout {
    pub boxes: Vec<Vec<Token>>,
    pub dispensers: Vec<Vec<Token>>,
}

impl StageLayout {
    pub fn token_count(&self) -> usize {
        self.boxes
            .iter()
            .chain(self.dispensers.iter())
            .map(Vec::len)
            .sum()
    }

    pub fn hidden_count(&self) -> usize {
        self.boxes
            .iter()
            .flatten()
            .filter(|token| token.hidden)
            .count()
    }

    pub fn count_where(&self, pred: impl Fn(&Token) -> bool) -> usize {
        self.boxes
            .iter()
            .chain(self.dispensers.iter())
            .flatten()
            .filter(|token| pred(token))
            .count()
    }
}

pub fn base_pool(thing_count: usize, rng: &mut RngState) -> Vec<Token> {
    let fresh_rotation = |rng: &mut RngState| {
        let mut colors = ColorVariant::REAL.to_vec();
        rng.shuffle(&mut colors);
        VecDeque::from(colors)
    };
    let mut rotations: Vec<VecDeque<ColorVariant>> =
        ItemType::REAL.iter().map(|_| fresh_rotation(rng)).collect();
    let mut pool = Vec::with_capacity(thing_count);
    'draw: while pool.len() < thing_count {
        for (item, rotation) in ItemType::REAL.iter().zip(rotations.iter_mut()) {
            if rotation.is_empty() {
                *rotation = fresh_rotation(rng);
            }
            let Some(color) = rotation.pop_front() else {
                continue;
            };
            for _ in 0..VISIBLE_COUNT {
                pool.push(Token::new(*item, color));
            }
            if pool.len() >= thing_count {
                break 'draw;
            }
        }
    }
    pool.truncate(thing_count);
    pool
}

/// Chunk lengths for the run-breaking shuffle of a pool of `len` tokens.
pub fn chunk_plan(len: usize, box_count: usize, gravity: bool, rules: &BoardRules) -> Vec<usize> {
    let (lead, body) = if gravity {
        let full = rules.full_board_box_count * VISIBLE_COUNT;
        (full, full)
    } else {
        (
            box_count * VISIBLE_COUNT,
            box_count * rules.board_cut * VISIBLE_COUNT,
        )
    };
    if body == 0 || lead == 0 {
        return if len == 0 { Vec::new() } else { vec![len] };
    }
    let mut plan = Vec::new();
    let mut offset = 0;
    while offset < len {
        let size = if plan.len() < rules.lead_chunks { lead } else { body };
        let size = size.min(len - offset);
        plan.push(size);
        offset += size;
    }
    plan
}

pub fn chunk_shuffle(tokens: &mut [Token], plan: &[usize], rules: &BoardRules, rng: &mut RngState) {
    let mut offset = 0;
    for size in plan {
        anti_run_shuffle(&mut tokens[offset..offset + size], rng, rules.shuffle_max_attempts);
        offset += size;
    }
}

/// Moves the pool tail into dispenser queues, one token per unsatisfied dispenser per round.
pub fn carve_gimmicks(tokens: &mut Vec<Token>, dispensers: &[DispenserSpec]) -> Vec<Vec<Token>> {
    let demand: usize = dispensers.iter().map(DispenserSpec::demand).sum();
    let mut queues: Vec<Vec<Token>> = dispensers
        .iter()
        .map(|d| Vec::with_capacity(d.demand()))
        .collect();
    if demand == 0 {
        return queues;
    }
    let start = tokens.len().saturating_sub(demand);
    let mut tail = tokens.split_off(start).into_iter();
    loop {
        let mut dealt = false;
        for (queue, spec) in queues.iter_mut().zip(dispensers) {
            if queue.len() >= spec.demand() {
                continue;
            }
            let Some(token) = tail.next() else {
                return queues;
            };
            queue.push(token);
            dealt = true;
        }
        if !dealt {
            return queues;
        }
    }
}

/// Spreads `none_count` placeholders evenly over the part of the pool past the opening windows.
pub fn interleave_none(mut tokens: Vec<Token>, opening: usize, none_count: usize) -> Vec<Token> {
    if none_count == 0 {
        return tokens;
    }
    let mut tail = if tokens.len() < opening {
        std::mem::take(&mut tokens)
    } else {
        tokens.split_off(opening)
    };
    let step = (tail.len() + none_count) as f64 / none_count as f64;
    let mut cursor = 0.0f64;
    for _ in 0..none_count {
        let at = (cursor.round() as usize).min(tail.len());
        tail.insert(at, Token::NONE);
        cursor += step;
    }
    tokens.extend(tail);
    tokens
}

pub fn insert_gold(tokens: &mut Vec<Token>, gold_count: usize, rng: &mut RngState) {
    for _ in 0..gold_count {
        let at = rng.range(tokens.len() + 1);
        tokens.insert(at, Token::gold());
    }
}

/// Picks hidden marks per box round-robin, then conceals random non-empty tokens.
pub fn mark_hidden(boxes: &mut [Vec<Token>], hidden_count: usize, rules: &BoardRules, rng: &mut RngState) {
    if boxes.is_empty() || hidden_count == 0 {
        return;
    }
    let caps: Vec<usize> = boxes
        .iter()
        .map(|tokens| tokens.iter().filter(|t| !t.is_none()).count())
        .collect();
    let capacity: usize = caps.iter().sum();
    let mut budget = hidden_count.min(capacity);
    if budget < hidden_count {
        log::warn!("hidden budget {hidden_count} trimmed to {capacity} non-empty tokens");
    }
    let mut marks = vec![0usize; boxes.len()];
    let mut idx = 0;
    while budget > 0 {
        if marks[idx] < caps[idx] && rng.chance(1, rules.hidden_chance_den) {
            marks[idx] += 1;
            budget -= 1;
        }
        idx = (idx + 1) % boxes.len();
    }
    for (tokens, count) in boxes.iter_mut().zip(marks) {
        let mut candidates: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_none() && !t.hidden)
            .map(|(i, _)| i)
            .collect();
        rng.shuffle(&mut candidates);
        for slot in candidates.into_iter().take(count) {
            tokens[slot].hidden = true;
        }
    }
}

pub fn generate(spec: &StageSpec, rules: &BoardRules, rng: &mut RngState) -> Result<StageLayout, StageError> {
    spec.validate()?;
    if let Some(preset) = &spec.preset {
        log::debug!("stage uses a preset layout of {} boxes", preset.len());
        return Ok(StageLayout {
            boxes: preset.clone(),
            dispensers: Vec::new(),
        });
    }
    let box_count = spec.box_count();

    let mut tokens = base_pool(spec.thing_count as usize, rng);
    log::debug!("base pool holds {} tokens", tokens.len());

    let plan = chunk_plan(tokens.len(), box_count, spec.has_gravity_shelf(), rules);
    chunk_shuffle(&mut tokens, &plan, rules, rng);
    log::debug!("chunk shuffle over {} chunks", plan.len());

    let dispensers = carve_gimmicks(&mut tokens, &spec.dispensers);
    let mut tokens = interleave_none(tokens, box_count * VISIBLE_COUNT, spec.none_count as usize);
    insert_gold(&mut tokens, spec.gold_count as usize, rng);
    log::debug!(
        "{} tokens left for boxes after carving {} for dispensers",
        tokens.len(),
        spec.gimmick_all()
    );

    let mut pool = TokenPool::new(tokens);
    let mut boxes: Vec<Vec<Token>> = vec![vec![Token::NONE; VISIBLE_COUNT]; box_count];

    for (tokens, box_spec) in boxes.iter_mut().zip(&spec.boxes) {
        let start = box_spec.start_count as usize;
        if start == 0 {
            continue;
        }
        let filled = pool.take(VISIBLE_COUNT - start, DistributionPhase::StartCount)?;
        tokens[..filled.len()].copy_from_slice(&filled);
    }

    let empties = spread_start_none(spec, rng);
    for ((tokens, box_spec), empty) in boxes.iter_mut().zip(&spec.boxes).zip(&empties) {
        if box_spec.start_count > 0 {
            continue;
        }
        let filled = pool.take(VISIBLE_COUNT - empty, DistributionPhase::StartNone)?;
        tokens[..filled.len()].copy_from_slice(&filled);
    }

    while !pool.is_empty() {
        for tokens in boxes.iter_mut() {
            tokens.extend(pool.take_up_to(VISIBLE_COUNT));
        }
    }
    log::debug!("pool drained after {} tokens", pool.consumed());

    mark_hidden(&mut boxes, spec.hidden_count as usize, rules, rng);
    Ok(StageLayout { boxes, dispensers })
}

/// Per-box count of stage-wide start empties.
fn spread_start_none(spec: &StageSpec, rng: &mut RngState) -> Vec<usize> {
    let mut empties = vec![0usize; spec.box_count()];
    let mut budget = spec.stage_start_none();
    if spec.start_none_eligible() == 0 {
        return empties;
    }
    while budget > 0 {
        for (count, box_spec) in empties.iter_mut().zip(&spec.boxes) {
            if box_spec.lock_level > 0 || box_spec.start_count > 0 {
                continue;
            }
            if *count >= MAX_START_NONE_PER_BOX {
                continue;
            }
            let draw = rng.range(2.min(budget + 1));
            if draw > 0 {
                *count += draw;
                budget -= draw;
                if budget == 0 {
                    break;
                }
            }
        }
    }
    empties
}
