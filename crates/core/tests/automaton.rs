use boxmatch_core::{
    BoxEvent, BoxSpec, BoxState, ColorVariant, EntityHandle, ItemType, MatchBox, StageError, Token,
    TokenWindow, Vec2,
};
use std::collections::HashSet;

const N: Token = Token::NONE;

fn apple() -> Token {
    Token::new(ItemType::Apple, ColorVariant::Red)
}

fn pear() -> Token {
    Token::new(ItemType::Banana, ColorVariant::Blue)
}

fn milk() -> Token {
    Token::new(ItemType::Milk, ColorVariant::Green)
}

fn loaded(spec: BoxSpec, tokens: Vec<Token>, sold_out: bool) -> (MatchBox, Vec<BoxEvent>) {
    let mut entity = MatchBox::new(EntityHandle(1), &spec, tokens, sold_out, 0.0);
    let mut out = Vec::new();
    entity.materialize(&mut out).expect("materialize");
    (entity, out)
}

fn plain(tokens: Vec<Token>) -> MatchBox {
    loaded(BoxSpec::new(0, Vec2::ZERO), tokens, false).0
}

fn cleared(out: &[BoxEvent]) -> usize {
    out.iter()
        .filter(|e| matches!(e, BoxEvent::Cleared { .. }))
        .count()
}

#[test]
fn triplet_clears_once_and_refills_from_queue() {
    let mut entity = plain(vec![apple(), apple(), N, milk(), pear(), milk()]);
    let mut out = Vec::new();
    assert!(entity.place(2, apple(), &mut out).expect("place"));
    assert_eq!(cleared(&out), 1);
    assert_eq!(entity.slots(), &[milk(), pear(), milk()]);
    assert_eq!(entity.queue_len(), 0);
    assert_eq!(entity.state(), BoxState::Ready);
}

#[test]
fn triplet_with_empty_queue_pads_and_depletes() {
    let mut entity = plain(vec![apple(), apple(), N]);
    let mut out = Vec::new();
    entity.place(2, apple(), &mut out).expect("place");
    assert_eq!(entity.slots(), &[N, N, N]);
    assert_eq!(entity.state(), BoxState::Depleted);
    let pos_clear = out.iter().position(|e| matches!(e, BoxEvent::Cleared { .. }));
    let pos_depleted = out.iter().position(|e| *e == BoxEvent::Depleted);
    assert!(pos_clear < pos_depleted);
}

#[test]
fn mismatched_place_reports_no_clear() {
    let mut entity = plain(vec![apple(), pear(), N]);
    let mut out = Vec::new();
    assert!(!entity.place(2, apple(), &mut out).expect("place"));
    assert_eq!(out, vec![BoxEvent::NoClear]);
}

#[test]
fn window_always_holds_three_entries() {
    let mut entity = plain(vec![apple(), pear(), milk(), apple()]);
    let mut out = Vec::new();
    for slot in 0..3 {
        entity.take(slot, &mut out).expect("take");
        assert_eq!(entity.slots().len(), 3);
    }
    assert_eq!(entity.slots(), &[apple(), N, N]);
}

#[test]
fn sold_out_wins_over_gravity_and_is_terminal() {
    let mut spec = BoxSpec::new(0, Vec2::ZERO);
    spec.gravity = true;
    let (mut entity, _) = loaded(spec, vec![apple(), apple(), N], true);
    let mut out = Vec::new();
    entity.place(2, apple(), &mut out).expect("place");
    assert_eq!(entity.state(), BoxState::SoldOut);
    assert_eq!(out.last(), Some(&BoxEvent::SoldOut));

    let err = entity.place(0, apple(), &mut Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        StageError::InvalidTransition {
            state: BoxState::SoldOut,
            ..
        }
    ));
}

#[test]
fn gravity_box_hides_once_emptied() {
    let mut spec = BoxSpec::new(0, Vec2::ZERO);
    spec.gravity = true;
    let (mut entity, _) = loaded(spec, vec![apple(), N, N], false);
    let mut out = Vec::new();
    entity.take(0, &mut out).expect("take");
    assert_eq!(entity.state(), BoxState::GravityHidden);
    assert!(entity.take(0, &mut out).is_err());
}

#[test]
fn locked_box_rejects_interaction_and_only_unlocks_downward() {
    let mut spec = BoxSpec::new(3, Vec2::ZERO);
    spec.lock_level = 2;
    let (mut entity, _) = loaded(spec, vec![apple(), pear(), milk()], false);
    assert_eq!(entity.take(0, &mut Vec::new()).unwrap_err(), StageError::Locked);

    let mut out = Vec::new();
    let mut seen = vec![entity.lock()];
    while entity.decrement_lock(&mut out) {
        seen.push(entity.lock());
    }
    assert_eq!(seen, vec![2, 1, 0]);
    assert!(seen.windows(2).all(|w| w[1] < w[0]));
    assert_eq!(out.last(), Some(&BoxEvent::Unlocked));
    assert!(!entity.decrement_lock(&mut out));
    assert!(entity.take(0, &mut Vec::new()).is_ok());
}

#[test]
fn busy_box_rejects_until_presentation_ends() {
    let spec = BoxSpec::new(0, Vec2::ZERO);
    let mut entity = MatchBox::new(
        EntityHandle(2),
        &spec,
        vec![apple(), apple(), N, pear(), N, milk()],
        false,
        0.4,
    );
    entity.materialize(&mut Vec::new()).expect("materialize");
    entity.place(2, apple(), &mut Vec::new()).expect("place");
    assert!(entity.is_busy());
    assert_eq!(entity.take(0, &mut Vec::new()).unwrap_err(), StageError::Busy);
    entity.tick(0.5);
    assert!(entity.take(0, &mut Vec::new()).is_ok());
}

#[test]
fn taking_hidden_token_reveals_it() {
    let mut entity = plain(vec![apple().concealed(), pear(), milk()]);
    assert!(entity.slots()[0].hidden);
    let mut out = Vec::new();
    let token = entity.take(0, &mut out).expect("take");
    assert!(!token.hidden);
    assert_eq!(
        out,
        vec![BoxEvent::Revealed {
            slot: 0,
            token: apple(),
            hidden: false
        }]
    );
}

#[test]
fn entering_tokens_announce_their_hidden_flag() {
    let (_, out) = loaded(
        BoxSpec::new(0, Vec2::ZERO),
        vec![apple(), pear().concealed(), N],
        false,
    );
    assert_eq!(
        out,
        vec![
            BoxEvent::Revealed {
                slot: 0,
                token: apple(),
                hidden: false
            },
            BoxEvent::Revealed {
                slot: 1,
                token: pear(),
                hidden: true
            },
        ]
    );
}

#[test]
fn next_window_previews_queue_with_padding() {
    let entity = plain(vec![apple(), pear(), milk(), milk().concealed()]);
    let preview = entity.next_window();
    assert_eq!(preview, vec![milk(), N, N]);
    assert!(preview[0].hidden);
}

#[test]
fn gold_is_collected_not_moved() {
    let mut entity = plain(vec![Token::gold(), apple(), pear()]);
    assert_eq!(entity.take(0, &mut Vec::new()).unwrap_err(), StageError::NotMovable);
    assert_eq!(
        entity.collect_gold(1, &mut Vec::new()).unwrap_err(),
        StageError::NotGold
    );
    let mut out = Vec::new();
    entity.collect_gold(0, &mut out).expect("collect");
    assert_eq!(out, vec![BoxEvent::GoldCollected { slot: 0 }]);
    assert_eq!(entity.slots()[0], N);
}

#[test]
fn hammer_converts_at_most_the_remaining_allowance() {
    let mut entity = plain(vec![apple(), pear(), apple(), apple(), apple(), apple()]);
    let mut out = Vec::new();
    let (any, running) = entity.remove_by_type(apple().kind(), 1, &mut out);
    assert!(any);
    assert_eq!(running, 4);
    let left = entity.tokens().filter(|t| **t == apple()).count();
    assert_eq!(left, 2);

    let (any, running) = entity.remove_by_type(apple().kind(), 4, &mut out);
    assert!(!any);
    assert_eq!(running, 4);
}

#[test]
fn wand_rewrite_can_complete_a_triplet() {
    let mut entity = plain(vec![apple(), apple(), pear(), milk()]);
    let from: HashSet<_> = [pear().kind()].into_iter().collect();
    let mut out = Vec::new();
    entity.change_type(&from, apple().kind(), &mut out);
    assert_eq!(cleared(&out), 1);
    assert_eq!(entity.slots(), &[milk(), N, N]);
}

#[test]
fn wand_to_placeholder_is_a_no_op() {
    let mut entity = plain(vec![apple(), pear(), milk()]);
    let from: HashSet<_> = [pear().kind()].into_iter().collect();
    let mut out = Vec::new();
    entity.change_type(&from, N.kind(), &mut out);
    assert!(out.is_empty());
    assert_eq!(entity.slots(), &[apple(), pear(), milk()]);
}

#[test]
fn wand_keeps_hidden_flag_on_queued_tokens() {
    let mut entity = plain(vec![apple(), pear(), milk(), pear().concealed()]);
    let from: HashSet<_> = [pear().kind()].into_iter().collect();
    entity.change_type(&from, milk().kind(), &mut Vec::new());
    let preview = entity.next_window();
    assert_eq!(preview[0], milk());
    assert!(preview[0].hidden);
}

macro_rules! cascade_case {
    ($name:ident, $queued_nones:expr) => {
        #[test]
        fn $name() {
            let k: usize = $queued_nones;
            let mut tokens = vec![N; k];
            tokens.push(apple());
            let mut window = TokenWindow::new(3, tokens);
            let (steps, entered) = window.cascade();
            assert_eq!(steps as usize, k / 3 + 1);
            assert!(steps as usize <= (k + 2) / 3 + 1);
            assert_eq!(entered.len(), 1);
            assert_eq!(window.queue_len(), 0);
            assert_eq!(window.none_count(), 2);
        }
    };
}

cascade_case!(cascade_zero_nones, 0);
cascade_case!(cascade_one_none, 1);
cascade_case!(cascade_two_nones, 2);
cascade_case!(cascade_three_nones, 3);
cascade_case!(cascade_five_nones, 5);
cascade_case!(cascade_nine_nones, 9);
cascade_case!(cascade_eleven_nones, 11);

#[test]
fn cascade_inside_box_reports_steps() {
    let mut entity = plain(vec![apple(), N, N, N, N, N, pear()]);
    let mut out = Vec::new();
    entity.take(0, &mut out).expect("take");
    assert!(out.contains(&BoxEvent::NoneCascade { steps: 2 }));
    assert_eq!(entity.slots(), &[pear(), N, N]);
}
