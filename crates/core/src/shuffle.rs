use crate::RngState;

/// True when `tokens` contains `run` or more consecutive equal entries.
pub fn has_run<T: PartialEq>(tokens: &[T], run: usize) -> bool {
    if run <= 1 {
        return !tokens.is_empty();
    }
    let mut stack = 1;
    for pair in tokens.windows(2) {
        if pair[0] == pair[1] {
            stack += 1;
            if stack >= run {
                return true;
            }
        } else {
            stack = 1;
        }
    }
    false
}

/// Permutes `tokens` until no triple run remains or `max_attempts`
/// re-permutations have been spent. Returns the number of re-permutations.
pub fn anti_run_shuffle<T: PartialEq>(tokens: &mut [T], rng: &mut RngState, max_attempts: u32) -> u32 {
    rng.shuffle(tokens);
    let mut attempts = 0;
    while attempts < max_attempts && has_run(tokens, crate::MATCH_COUNT) {
        rng.shuffle(tokens);
        attempts += 1;
    }
    if attempts == max_attempts && has_run(tokens, crate::MATCH_COUNT) {
        log::debug!("anti-run shuffle gave up after {attempts} attempts on {} tokens", tokens.len());
    }
    attempts
}
