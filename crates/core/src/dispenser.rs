use crate::boxes::{announce, reject};
use crate::{
    BoxEvent, BoxState, DispenserSpec, EntityHandle, Kind, MemberKey, StageError, Token,
    TokenWindow, Vec2, MATCH_COUNT,
};
use std::collections::HashSet;

/// Gimmick dispenser: reveals its queue one batch at a time.
#[derive(Debug, Clone)]
pub struct Dispenser {
    handle: EntityHandle,
    key: MemberKey,
    position: Vec2,
    window: TokenWindow,
    is_next_queue: bool,
    wave: u32,
    state: BoxState,
    busy: f32,
    clear_delay: f32,
}

impl Dispenser {
    pub fn new(handle: EntityHandle, spec: &DispenserSpec, tokens: Vec<Token>, clear_delay: f32) -> Self {
        Self {
            handle,
            key: spec.key(),
            position: spec.position,
            window: TokenWindow::new(spec.dispense_batch_size.max(1) as usize, tokens),
            is_next_queue: spec.is_next_queue,
            wave: 0,
            state: BoxState::Loading,
            busy: 0.0,
            clear_delay,
        }
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn key(&self) -> MemberKey {
        self.key
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

    pub fn is_next_queue(&self) -> bool {
        self.is_next_queue
    }

    /// Batches dispensed so far, counting the opening one.
    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn slots(&self) -> &[Token] {
        self.window.slots()
    }

    pub fn queue_len(&self) -> usize {
        self.window.queue_len()
    }

    pub fn is_busy(&self) -> bool {
        self.busy > 0.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.window.tokens()
    }

    /// Visible batch plus, for look-ahead dispensers, the next batch.
    pub fn lookahead_tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.window.slots().to_vec();
        if self.is_next_queue {
            tokens.extend(self.window.peek_batch());
        }
        tokens.retain(|t| !t.is_none());
        tokens
    }

    pub fn materialize(&mut self, out: &mut Vec<BoxEvent>) -> Result<(), StageError> {
        if self.state != BoxState::Loading {
            return Err(reject(self.handle, self.state, "materialize"));
        }
        self.state = BoxState::Ready;
        self.dispense(out);
        Ok(())
    }

    pub fn check_take(&self, slot: usize) -> Result<Token, StageError> {
        match self.state {
            BoxState::Loading => return Err(reject(self.handle, self.state, "take")),
            _ if self.is_busy() => return Err(StageError::Busy),
            _ => {}
        }
        let token = *self.window.get(slot).ok_or(StageError::InvalidSlot)?;
        if token.is_none() {
            return Err(StageError::SlotEmpty);
        }
        if token.is_gold() {
            return Err(StageError::NotMovable);
        }
        Ok(token)
    }

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
        self.dispense(out);
        Ok(token)
    }

    /// Rewrites matching tokens; a triplet inside the visible batch clears it.
    pub fn change_type(&mut self, from: &HashSet<Kind>, to: Kind, out: &mut Vec<BoxEvent>) {
        if !Token::from_kind(to).is_matchable() || self.state == BoxState::Loading {
            return;
        }
        let touched = self.window.rewrite(from, to);
        for slot in &touched {
            out.push(BoxEvent::Revealed {
                slot: *slot,
                token: Token::from_kind(to),
                hidden: false,
            });
        }
        if touched.is_empty() {
            return;
        }
        let probe = Token::from_kind(to);
        if self.window.count_matching(&probe) >= MATCH_COUNT {
            self.state = BoxState::Clearing;
            self.window.clear_slots();
            self.dispense(out);
            out.push(BoxEvent::Cleared { kind: to });
            self.busy = self.clear_delay;
        } else {
            out.push(BoxEvent::NoClear);
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.busy > 0.0 {
            self.busy = (self.busy - dt).max(0.0);
        }
    }

    pub fn cancel_presentation(&mut self) {
        self.busy = 0.0;
    }

    /// Refills whole batches once the visible one is used up.
    fn dispense(&mut self, out: &mut Vec<BoxEvent>) {
        let (steps, entered) = self.window.cascade();
        if steps > 0 {
            self.wave += steps;
            announce(entered, out);
            out.push(BoxEvent::BatchDispensed { wave: self.wave });
        }
        if self.window.is_exhausted() {
            if self.state != BoxState::Depleted {
                self.state = BoxState::Depleted;
                out.push(BoxEvent::Depleted);
            }
        } else {
            self.state = BoxState::Ready;
        }
    }
}
