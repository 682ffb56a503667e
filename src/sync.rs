//! Blocking Primitives
//!
//! Kernel locks in this crate do not burn the CPU while contended: every
//! retry goes through [`Reschedule`], which hands the processor to the
//! scheduler's yield hook. The scheduler itself lives outside this crate
//! and registers its hook once at boot with [`set_yield_hook`].
//!
//! [`Semaphore`] is the counting primitive behind the exit/wait protocol.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::relax::RelaxStrategy;
use spin::Once;

/// Scheduler entry point used while blocked.
static YIELD_HOOK: Once<fn()> = Once::new();

/// Register the scheduler's yield function.
///
/// Returns `false` if a hook was already installed; the first one stays.
pub fn set_yield_hook(hook: fn()) -> bool {
    let mut installed = false;
    YIELD_HOOK.call_once(|| {
        installed = true;
        hook
    });
    installed
}

/// Give up the CPU once.
///
/// Without a registered scheduler this degrades to a spin-loop hint.
#[inline]
pub fn yield_now() {
    match YIELD_HOOK.get() {
        Some(hook) => hook(),
        None => core::hint::spin_loop(),
    }
}

/// Relax strategy that yields to the scheduler between lock attempts.
pub struct Reschedule;

impl RelaxStrategy for Reschedule {
    #[inline]
    fn relax() {
        yield_now();
    }
}

/// A counting semaphore.
///
/// `down` blocks until the count is positive and then decrements it.
/// `up` increments it. A successful `down` synchronizes with the `up` that
/// made it possible, so writes made before `up` are visible after `down`.
pub struct Semaphore<R: RelaxStrategy = Reschedule> {
    count: AtomicUsize,
    _relax: PhantomData<R>,
}

impl<R: RelaxStrategy> Semaphore<R> {
    /// Create a semaphore with the given initial count.
    pub const fn new(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
            _relax: PhantomData,
        }
    }

    /// Decrement without blocking. Returns `false` if the count was zero.
    pub fn try_down(&self) -> bool {
        self.count
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Block until the count is positive, then decrement it.
    pub fn down(&self) {
        while !self.try_down() {
            R::relax();
        }
    }

    /// Increment the count, releasing one blocked `down`.
    pub fn up(&self) {
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Current count.
    pub fn value(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl<R: RelaxStrategy> Default for Semaphore<R> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<R: RelaxStrategy> core::fmt::Debug for Semaphore<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Semaphore")
            .field("count", &self.value())
            .finish()
    }
}
