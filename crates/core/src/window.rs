use crate::{Kind, Token};
use std::collections::{HashSet, VecDeque};

/// A fixed-width visible window over an ordered queue.
#[derive(Debug, Clone)]
pub struct TokenWindow {
    slots: Vec<Token>,
    queue: VecDeque<Token>,
}

impl TokenWindow {
    /// Window starts empty; call [`TokenWindow::refill`] to materialize it.
    pub fn new(width: usize, tokens: Vec<Token>) -> Self {
        Self {
            slots: vec![Token::NONE; width],
            queue: tokens.into(),
        }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Token] {
        &self.slots
    }

    pub fn queue(&self) -> &VecDeque<Token> {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn get(&self, slot: usize) -> Option<&Token> {
        self.slots.get(slot)
    }

    pub fn set(&mut self, slot: usize, token: Token) -> Option<Token> {
        self.slots
            .get_mut(slot)
            .map(|current| std::mem::replace(current, token))
    }

    /// The next `width` queued tokens, padded with placeholders.
    pub fn peek_batch(&self) -> Vec<Token> {
        let mut batch: Vec<Token> = self.queue.iter().take(self.width()).copied().collect();
        batch.resize(self.width(), Token::NONE);
        batch
    }

    /// Replaces the whole window with the next batch. Returns the slots that
    /// received a real queued token.
    pub fn refill(&mut self) -> Vec<(usize, Token)> {
        let width = self.width();
        let mut entered = Vec::new();
        for slot in 0..width {
            let token = self.queue.pop_front().unwrap_or(Token::NONE);
            self.slots[slot] = token;
            if !token.is_none() {
                entered.push((slot, token));
            }
        }
        entered
    }

    /// Discards all-placeholder windows while the queue still has tokens.
    /// Returns the step count and the slots filled by the final refill.
    pub fn cascade(&mut self) -> (u32, Vec<(usize, Token)>) {
        let mut steps = 0;
        let mut entered = Vec::new();
        while self.none_count() == self.width() && !self.queue.is_empty() {
            entered = self.refill();
            steps += 1;
        }
        (steps, entered)
    }

    /// Converts tokens of `kind` to placeholders, window first, while
    /// `running` stays at or below `limit`. Returns the window slots touched
    /// and the number of tokens removed.
    pub fn remove_kind(&mut self, kind: Kind, running: &mut u32, limit: u32) -> (Vec<usize>, u32) {
        let mut touched = Vec::new();
        let mut removed = 0;
        let width = self.width();
        for (idx, token) in self.tokens_mut().enumerate() {
            if *running > limit {
                break;
            }
            if token.is_none() || token.kind() != kind {
                continue;
            }
            *token = Token::NONE;
            *running += 1;
            removed += 1;
            if idx < width {
                touched.push(idx);
            }
        }
        (touched, removed)
    }

    /// Rewrites every token whose kind is in `from` to `to`. Window slots
    /// lose their hidden flag; queued tokens keep it.
    pub fn rewrite(&mut self, from: &HashSet<Kind>, to: Kind) -> Vec<usize> {
        let mut touched = Vec::new();
        for (slot, token) in self.slots.iter_mut().enumerate() {
            if !token.is_none() && from.contains(&token.kind()) {
                *token = Token::from_kind(to);
                touched.push(slot);
            }
        }
        for token in self.queue.iter_mut() {
            if !token.is_none() && from.contains(&token.kind()) {
                let hidden = token.hidden;
                *token = Token::from_kind(to);
                token.hidden = hidden;
            }
        }
        touched
    }

    pub fn clear_slots(&mut self) {
        self.slots.fill(Token::NONE);
    }

    pub fn none_count(&self) -> usize {
        self.slots.iter().filter(|t| t.is_none()).count()
    }

    pub fn count_matching(&self, token: &Token) -> usize {
        self.slots.iter().filter(|t| *t == token).count()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty() && self.none_count() == self.width()
    }

    pub fn tokens_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.slots.iter_mut().chain(self.queue.iter_mut())
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.slots.iter().chain(self.queue.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorVariant, ItemType};

    #[test]
    fn refill_pads_with_placeholders() {
        let apple = Token::new(ItemType::Apple, ColorVariant::Red);
        let mut window = TokenWindow::new(3, vec![apple, Token::NONE]);
        let entered = window.refill();
        assert_eq!(entered, vec![(0, apple)]);
        assert_eq!(window.slots(), &[apple, Token::NONE, Token::NONE]);
        assert_eq!(window.queue_len(), 0);
        assert!(!window.is_exhausted());
    }
}
