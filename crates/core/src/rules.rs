/// Slots in a box window.
pub const VISIBLE_COUNT: usize = 3;
/// Equal tokens needed to clear a window.
pub const MATCH_COUNT: usize = 3;
pub const MAX_LOCK_LEVEL: u8 = 4;
pub const MAX_START_NONE_PER_BOX: usize = 2;
/// Hammer conversions continue while the running count is at or below this.
pub const HAMMER_LIMIT: u32 = 3;
