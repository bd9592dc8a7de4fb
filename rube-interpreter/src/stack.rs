/// Run `func`, growing the host stack first if less than the red zone is left.
///
/// Every call frame and every nested node goes through here, so recursion in the object
/// language is bounded by `Config::max_call_depth` rather than by the host's stack size.
#[inline]
pub fn ensure_sufficient_stack<R>(func: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available.
    const RED_ZONE: usize = 128 * 1024;

    /// Stack space to allocate when growing.
    const STACK_PER_SEGMENT: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_SEGMENT, func)
}
