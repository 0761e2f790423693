use boxmatch_autoplay::{
    move_score, probe, run_autoplay, AutoMove, AutoplayConfig, MoveClass, MoveFacts, MoveWeights,
    RunStatus, Simulator,
};
use boxmatch_core::{BoardRules, BoxSpec, ColorVariant, ItemType, StageSpec, Token, Vec2};

macro_rules! score_case {
    ($name:ident, $class:expr, $empties:expr, $saturates:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let facts = MoveFacts {
                class: $class,
                empties_source: $empties,
                saturates_target: $saturates,
            };
            let score = move_score(facts, MoveWeights::default());
            assert!((score - $expected).abs() < 1e-9, "{score}");
        }
    };
}

score_case!(score_triplet, MoveClass::Triplet, false, true, 100.0);
score_case!(score_triplet_reveal, MoveClass::Triplet, true, true, 103.0);
score_case!(score_gold, MoveClass::Gold, false, false, 60.0);
score_case!(score_pair_open, MoveClass::Pair, false, false, 10.0);
score_case!(score_pair_saturating, MoveClass::Pair, false, true, 6.0);
score_case!(score_plain_reveal, MoveClass::Plain, true, false, 4.0);
score_case!(score_plain_saturating, MoveClass::Plain, false, true, -3.0);

#[test]
fn policy_ranks_triplet_over_gold_over_pair() {
    let w = MoveWeights::default();
    let facts = |class| MoveFacts {
        class,
        empties_source: true,
        saturates_target: true,
    };
    assert!(move_score(facts(MoveClass::Triplet), w) > move_score(facts(MoveClass::Gold), w));
    assert!(move_score(facts(MoveClass::Gold), w) > move_score(facts(MoveClass::Pair), w));
    assert!(move_score(facts(MoveClass::Pair), w) > move_score(facts(MoveClass::Plain), w));
}

fn preset(layout: Vec<Vec<Token>>) -> StageSpec {
    let boxes = (0..layout.len() as u32)
        .map(|i| BoxSpec::new(i, Vec2::new(i as f32 * 2.0, 0.0)))
        .collect();
    let thing_count = layout.iter().flatten().filter(|t| t.is_matchable()).count() as u32;
    let gold_count = layout.iter().flatten().filter(|t| t.is_gold()).count() as u32;
    StageSpec {
        thing_count,
        gold_count,
        boxes,
        preset: Some(layout),
        ..StageSpec::default()
    }
}

#[test]
fn greedy_solves_the_tutorial_with_two_triplets() {
    let trace = run_autoplay(&StageSpec::tutorial(), &AutoplayConfig::default()).expect("autoplay");
    assert_eq!(trace.status, RunStatus::Cleared);
    assert_eq!(trace.steps.len(), 2);
    assert!(trace.steps.iter().all(|s| s.class == MoveClass::Triplet));
    assert_eq!(trace.remaining, 0);
    assert!(trace.to_text_report().contains("status: Cleared"));
}

#[test]
fn gold_is_picked_before_plain_moves() {
    let apple = Token::new(ItemType::Apple, ColorVariant::Red);
    let pear = Token::new(ItemType::Banana, ColorVariant::Blue);
    let spec = preset(vec![vec![Token::gold(), apple, pear], vec![Token::NONE; 3]]);
    let sim = Simulator::new(spec, BoardRules::instant(), 1).expect("load");
    let mut rng = boxmatch_core::RngState::from_seed(1);
    let (mv, facts) = sim
        .choose(MoveWeights::default(), &mut rng, None)
        .expect("a move");
    assert!(matches!(mv, AutoMove::CollectGold { .. }));
    assert_eq!(facts.class, MoveClass::Gold);
}

#[test]
fn saturated_board_has_no_legal_move() {
    let apple = Token::new(ItemType::Apple, ColorVariant::Red);
    let pear = Token::new(ItemType::Banana, ColorVariant::Blue);
    let milk = Token::new(ItemType::Milk, ColorVariant::Green);
    let spec = preset(vec![vec![apple, pear, milk], vec![milk, apple, pear]]);
    let trace = run_autoplay(&spec, &AutoplayConfig::default()).expect("autoplay");
    assert_eq!(trace.status, RunStatus::NoLegalMove);
    assert!(trace.steps.is_empty());
}

#[test]
fn runs_are_reproducible_per_seed() {
    let spec = StageSpec {
        thing_count: 36,
        none_count: 3,
        boxes: (0..6)
            .map(|i| BoxSpec::new(i, Vec2::new(i as f32 * 2.0, 0.0)))
            .collect(),
        ..StageSpec::default()
    };
    let config = AutoplayConfig {
        seed: 11,
        max_steps: 200,
        ..AutoplayConfig::default()
    };
    let a = run_autoplay(&spec, &config).expect("first");
    let b = run_autoplay(&spec, &config).expect("second");
    assert_eq!(a.status, b.status);
    assert_eq!(
        serde_json::to_string(&a.steps).expect("encode"),
        serde_json::to_string(&b.steps).expect("encode")
    );
    assert!(a.steps.len() <= 200);
    for step in &a.steps {
        assert!(step.remaining_after <= step.remaining_before);
    }
}

#[test]
fn probe_aggregates_every_run() {
    let report = probe(&StageSpec::tutorial(), &AutoplayConfig::default(), 5).expect("probe");
    assert_eq!(report.runs, 5);
    assert_eq!(report.cleared, 5);
    assert!((report.clear_rate() - 1.0).abs() < 1e-9);
    assert!((report.mean_steps - 2.0).abs() < 1e-9);
}
