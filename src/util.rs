//! This is an internal module that contains utility functionality used by other modules.

use cfg_if::cfg_if;

use crate::traits::Tick;

/// Timeout value meaning "wait forever".
pub const MAX_DELAY: u32 = u32::MAX;

/// Spin while `$cond` holds, for at most `MAX_ITERS` iterations; then return `Err($err)`.
/// The optional block runs on every iteration.
macro_rules! bounded_loop {
    ($cond:expr, $err:expr $(,)?) => {
        $crate::util::bounded_loop!($cond, $err, {})
    };
    ($cond:expr, $err:expr, $body:block $(,)?) => {{
        let mut i = 0;
        while $cond {
            $body
            i += 1;
            if i >= $crate::MAX_ITERS {
                return Err($err);
            }
        }
    }};
}

pub(crate) use bounded_loop;

/// Milliseconds since `start`, tolerant of the counter wrapping.
pub(crate) fn elapsed_ms<T: Tick>(tick: &T, start: u32) -> u32 {
    tick.now_ms().wrapping_sub(start)
}

/// Wait until `done` returns true, or `timeout_ms` elapses. Returns `false` on timeout.
///
/// The condition is checked once more after the deadline passes, so a condition that becomes true
/// while the caller was pre-empted isn't reported as a timeout. A timeout of 0 checks once;
/// [`MAX_DELAY`] never times out.
pub(crate) fn wait_until<T: Tick>(tick: &T, timeout_ms: u32, mut done: impl FnMut() -> bool) -> bool {
    let start = tick.now_ms();

    while !done() {
        if timeout_ms != MAX_DELAY && (timeout_ms == 0 || elapsed_ms(tick, start) > timeout_ms) {
            return done();
        }
    }
    true
}

/// Busy-wait for approximately `cycles` core clock cycles.
pub(crate) fn delay_cycles(cycles: u32) {
    cfg_if! {
        if #[cfg(all(target_arch = "arm", target_os = "none"))] {
            cortex_m::asm::delay(cycles);
        } else {
            for _ in 0..cycles {
                core::hint::spin_loop();
            }
        }
    }
}

/// Cycles needed for `us` microseconds at `sysclk` Hz, rounded up.
pub(crate) fn us_to_cycles(us: u32, sysclk: u32) -> u32 {
    let per_us = sysclk.div_ceil(1_000_000);
    us.saturating_mul(per_us)
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn wait_times_out_after_deadline() {
        let t = Cell::new(0u32);
        let tick = || {
            let now = t.get();
            t.set(now + 1);
            now
        };
        assert!(!wait_until(&tick, 5, || false));
        assert!(t.get() > 5);
    }

    #[test]
    fn wait_survives_counter_wrap() {
        let t = Cell::new(u32::MAX - 2);
        let tick = || {
            let now = t.get();
            t.set(now.wrapping_add(1));
            now
        };
        let polls = Cell::new(0);
        assert!(wait_until(&tick, 10, || {
            polls.set(polls.get() + 1);
            polls.get() == 6
        }));
    }

    #[test]
    fn zero_timeout_checks_once_more() {
        let tick = || 0u32;
        let polls = Cell::new(0);
        assert!(wait_until(&tick, 0, || {
            polls.set(polls.get() + 1);
            polls.get() == 2
        }));
        assert_eq!(polls.get(), 2);
    }

    #[test]
    fn cycles_round_up() {
        assert_eq!(us_to_cycles(15, 250_000_000), 3_750);
        assert_eq!(us_to_cycles(15, 1_500_000), 30);
    }
}
