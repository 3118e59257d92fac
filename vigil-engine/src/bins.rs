/// Width of one elapsed-time bin.
pub const BIN_WIDTH_MS: u64 = 30_000;

/// Six bins cover the full 180 s cap.
pub const BIN_COUNT: usize = 6;

/// Maps elapsed test time to its likelihood bin, clamped so everything past
/// 150 s lands in the last bin.
pub fn bin_of(elapsed_ms: u64) -> usize {
    ((elapsed_ms / BIN_WIDTH_MS) as usize).min(BIN_COUNT - 1)
}
