// Traits used across the library. Could be used more generally than in this lib.

/// A free-running millisecond counter; eg incremented from the SysTick interrupt.
///
/// Only differences between readings are used, so the counter may wrap.
pub trait Tick {
    fn now_ms(&self) -> u32;
}

impl<F: Fn() -> u32> Tick for F {
    fn now_ms(&self) -> u32 {
        self()
    }
}
