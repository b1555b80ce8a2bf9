pub mod clock;

/// Number of NVIC priority bits implemented by nRF52 SoCs.
pub const NRF_PRIORITY_BITS: u8 = 3;

/// Converts a logical interrupt priority (1 = lowest) to the left-aligned
/// NVIC representation.
pub const fn nvic_priority(logical: u8) -> u8 {
    let highest = 1 << NRF_PRIORITY_BITS;
    assert!(logical > 0 && logical <= highest);
    (highest - logical) << (8 - NRF_PRIORITY_BITS)
}
