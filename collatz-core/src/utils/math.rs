pub trait Math {
    fn pow2(self) -> u64;
}

impl Math for u32 {
    /// `2^self`. Panics if the result does not fit in `u64`.
    #[inline]
    fn pow2(self) -> u64 {
        assert!(self < u64::BITS, "2^{self} does not fit in u64");
        1u64 << self
    }
}
