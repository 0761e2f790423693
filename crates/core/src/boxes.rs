use crate::{
    BoxSpec, EntityHandle, Kind, MemberKey, StageError, Token, TokenWindow, Vec2, HAMMER_LIMIT,
    MATCH_COUNT, VISIBLE_COUNT,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxState {
    Loading,
    Ready,
    Exposed,
    Clearing,
    Depleted,
    SoldOut,
    GravityHidden,
}

impl BoxState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BoxState::SoldOut | BoxState::GravityHidden)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoxEvent {
    Cleared { kind: Kind },
    NoClear,
    NoneCascade { steps: u32 },
    Revealed { slot: usize, token: Token, hidden: bool },
    GoldCollected { slot: usize },
    LockChanged { lock: u8 },
    Unlocked,
    BatchDispensed { wave: u32 },
    SoldOut,
    GravityHidden,
    Depleted,
}

pub(crate) fn announce(entered: Vec<(usize, Token)>, out: &mut Vec<BoxEvent>) {
    out.extend(entered.into_iter().map(|(slot, token)| BoxEvent::Revealed {
        slot,
        token,
        hidden: token.hidden,
    }));
}

pub(crate) fn reject(handle: EntityHandle, state: BoxState, event: &'static str) -> StageError {
    log::warn!("ignoring {event} for {handle:?} in state {state:?}");
    StageError::InvalidTransition {
        handle,
        state,
        event,
    }
}

/// A matching box: a three-slot window over its token queue.
#[derive(Debug, Clone)]
pub struct MatchBox {
    handle: EntityHandle,
    key: MemberKey,
    position: Vec2,
    window: TokenWindow,
    lock: u8,
    gravity: bool,
    sold_out: bool,
    state: BoxState,
    busy: f32,
    clear_delay: f32,
    seen: Vec<Token>,
}

impl MatchBox {
    pub fn new(handle: EntityHandle, spec: &BoxSpec, tokens: Vec<Token>, sold_out: bool, clear_delay: f32) -> Self {
        Self {
            handle,
            key: spec.key(),
            position: spec.position,
            window: TokenWindow::new(VISIBLE_COUNT, tokens),
            lock: spec.lock_level,
            gravity: spec.gravity,
            sold_out,
            state: BoxState::Loading,
            busy: 0.0,
            clear_delay,
            seen: vec![Token::NONE; VISIBLE_COUNT],
        }
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn key(&self) -> MemberKey {
        self.key
    }

    pub fn index(&self) -> u32 {
        self.key.index
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn state(&self) -> BoxState {
        self.state
    }

    pub fn lock(&self) -> u8 {
        self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock > 0
    }

    pub fn is_busy(&self) -> bool {
        self.busy > 0.0
    }

    pub fn gravity(&self) -> bool {
        self.gravity
    }

    pub fn sold_out(&self) -> bool {
        self.sold_out
    }

    pub fn slots(&self) -> &[Token] {
        self.window.slots()
    }

    pub fn queue_len(&self) -> usize {
        self.window.queue_len()
    }

    /// Window then queue, in play order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.window.tokens()
    }

    pub fn none_count(&self) -> usize {
        self.window.none_count()
    }

    /// The three tokens that enter after the current window, padded.
    pub fn next_window(&self) -> Vec<Token> {
        self.window.peek_batch()
    }

    pub fn is_interactable(&self) -> bool {
        !self.state.is_terminal()
            && self.state != BoxState::Loading
            && !self.is_locked()
            && !self.is_busy()
    }

    /// Fills the opening window from the queue.
    pub fn materialize(&mut self, out: &mut Vec<BoxEvent>) -> Result<(), StageError> {
        if self.state != BoxState::Loading {
            return Err(reject(self.handle, self.state, "materialize"));
        }
        let entered = self.window.refill();
        announce(entered, out);
        self.cascade(out);
        self.settle(out);
        Ok(())
    }

    pub fn check_take(&self, slot: usize) -> Result<Token, StageError> {
        self.guard("take")?;
        let token = *self.window.get(slot).ok_or(StageError::InvalidSlot)?;
        if token.is_none() {
            return Err(StageError::SlotEmpty);
        }
        if token.is_gold() {
            return Err(StageError::NotMovable);
        }
        Ok(token)
    }

    pub fn check_place(&self, slot: usize) -> Result<(), StageError> {
        self.guard("place")?;
        let token = self.window.get(slot).ok_or(StageError::InvalidSlot)?;
        if !token.is_none() {
            return Err(StageError::SlotOccupied);
        }
        Ok(())
    }

    /// Removes the token in `slot`, leaving a placeholder. Hidden tokens are
    /// revealed as they leave.
    pub fn take(&mut self, slot: usize, out: &mut Vec<BoxEvent>) -> Result<Token, StageError> {
        let mut token = self.check_take(slot)?;
        self.window.set(slot, Token::NONE);
        if token.hidden {
            token.hidden = false;
            out.push(BoxEvent::Revealed {
                slot,
                token,
                hidden: false,
            });
        }
        self.cascade(out);
        self.settle(out);
        Ok(token)
    }

    pub fn place(&mut self, slot: usize, mut token: Token, out: &mut Vec<BoxEvent>) -> Result<bool, StageError> {
        self.check_place(slot)?;
        if self.state == BoxState::Depleted {
            self.state = BoxState::Ready;
        }
        token.hidden = false;
        self.window.set(slot, token);
        Ok(self.evaluate(slot, out))
    }

    /// Moves a token between two slots of this box.
    pub fn relocate(&mut self, from: usize, to: usize, out: &mut Vec<BoxEvent>) -> Result<bool, StageError> {
        let mut token = self.check_take(from)?;
        self.check_place(to)?;
        self.window.set(from, Token::NONE);
        if token.hidden {
            token.hidden = false;
            out.push(BoxEvent::Revealed {
                slot: to,
                token,
                hidden: false,
            });
        }
        self.window.set(to, token);
        Ok(self.evaluate(to, out))
    }

    pub fn collect_gold(&mut self, slot: usize, out: &mut Vec<BoxEvent>) -> Result<(), StageError> {
        self.guard("collect_gold")?;
        let token = *self.window.get(slot).ok_or(StageError::InvalidSlot)?;
        if token.is_none() {
            return Err(StageError::SlotEmpty);
        }
        if !token.is_gold() {
            return Err(StageError::NotGold);
        }
        self.window.set(slot, Token::NONE);
        out.push(BoxEvent::GoldCollected { slot });
        self.cascade(out);
        self.settle(out);
        Ok(())
    }

    /// Re-delivered change for `slot`. Only a token that differs from the
    /// last evaluated one is run through the clear rule.
    pub fn notify_changed(&mut self, slot: usize, out: &mut Vec<BoxEvent>) -> Result<bool, StageError> {
        if self.state == BoxState::Depleted || self.state.is_terminal() || self.state == BoxState::Loading {
            return Err(reject(self.handle, self.state, "clear"));
        }
        let token = *self.window.get(slot).ok_or(StageError::InvalidSlot)?;
        if self.seen.get(slot) == Some(&token) {
            return Ok(false);
        }
        Ok(self.evaluate(slot, out))
    }

    pub fn decrement_lock(&mut self, out: &mut Vec<BoxEvent>) -> bool {
        if self.lock == 0 {
            return false;
        }
        self.lock -= 1;
        out.push(BoxEvent::LockChanged { lock: self.lock });
        if self.lock == 0 {
            out.push(BoxEvent::Unlocked);
        }
        true
    }

    /// Hammer: converts tokens of `kind` while `running` is within the limit.
    pub fn remove_by_type(&mut self, kind: Kind, running: u32, out: &mut Vec<BoxEvent>) -> (bool, u32) {
        if self.state.is_terminal() || self.state == BoxState::Loading {
            return (false, running);
        }
        let mut running = running;
        let (_, removed) = self.window.remove_kind(kind, &mut running, HAMMER_LIMIT);
        if removed > 0 {
            self.cascade(out);
            self.settle(out);
        }
        (removed > 0, running)
    }

    /// Magic wand: rewrites tokens in `from` to `to`, then evaluates the
    /// rewritten window slots.
    pub fn change_type(&mut self, from: &HashSet<Kind>, to: Kind, out: &mut Vec<BoxEvent>) {
        if !Token::from_kind(to).is_matchable() || self.state.is_terminal() || self.state == BoxState::Loading {
            return;
        }
        let touched = self.window.rewrite(from, to);
        for slot in &touched {
            if let Some(token) = self.window.get(*slot) {
                out.push(BoxEvent::Revealed {
                    slot: *slot,
                    token: *token,
                    hidden: false,
                });
            }
        }
        if !self.is_locked() {
            if let Some(first) = touched.first() {
                self.evaluate(*first, out);
            }
        }
        self.cascade(out);
        self.settle(out);
    }

    pub fn tick(&mut self, dt: f32) {
        if self.busy > 0.0 {
            self.busy = (self.busy - dt).max(0.0);
        }
    }

    pub fn cancel_presentation(&mut self) {
        self.busy = 0.0;
    }

    fn guard(&self, event: &'static str) -> Result<(), StageError> {
        if self.state.is_terminal() || self.state == BoxState::Loading {
            return Err(reject(self.handle, self.state, event));
        }
        if self.is_locked() {
            return Err(StageError::Locked);
        }
        if self.is_busy() {
            return Err(StageError::Busy);
        }
        Ok(())
    }

    fn evaluate(&mut self, slot: usize, out: &mut Vec<BoxEvent>) -> bool {
        let Some(token) = self.window.get(slot).copied() else {
            return false;
        };
        self.state = BoxState::Exposed;
        let count = if token.is_matchable() {
            self.window.count_matching(&token)
        } else {
            0
        };
        if count < MATCH_COUNT {
            self.state = BoxState::Ready;
            self.sync_seen();
            out.push(BoxEvent::NoClear);
            return false;
        }
        self.state = BoxState::Clearing;
        self.window.clear_slots();
        let entered = self.window.refill();
        announce(entered, out);
        self.cascade(out);
        out.push(BoxEvent::Cleared { kind: token.kind() });
        self.busy = self.clear_delay;
        self.settle(out);
        true
    }

    fn cascade(&mut self, out: &mut Vec<BoxEvent>) {
        let (steps, entered) = self.window.cascade();
        if steps > 0 {
            announce(entered, out);
            out.push(BoxEvent::NoneCascade { steps });
        }
    }

    fn settle(&mut self, out: &mut Vec<BoxEvent>) {
        self.sync_seen();
        if self.window.none_count() < VISIBLE_COUNT {
            self.state = BoxState::Ready;
            return;
        }
        if self.sold_out {
            self.state = BoxState::SoldOut;
            self.busy = 0.0;
            out.push(BoxEvent::SoldOut);
        } else if self.gravity {
            self.state = BoxState::GravityHidden;
            self.busy = 0.0;
            out.push(BoxEvent::GravityHidden);
        } else if self.state != BoxState::Depleted {
            self.state = BoxState::Depleted;
            out.push(BoxEvent::Depleted);
        }
    }

    fn sync_seen(&mut self) {
        self.seen.clear();
        self.seen.extend_from_slice(self.window.slots());
    }
}
