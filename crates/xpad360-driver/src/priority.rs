use std::io;

/// Moves the calling thread to the highest real-time priority the OS
/// offers. Usually requires `CAP_SYS_NICE` or root.
#[cfg(target_os = "linux")]
pub(crate) fn raise_current_thread() -> io::Result<()> {
    use libc::{sched_get_priority_max, sched_param, sched_setscheduler, SCHED_FIFO};

    // SAFETY: plain syscall wrapper with no pointer arguments.
    let max = unsafe { sched_get_priority_max(SCHED_FIFO) };
    if max < 0 {
        return Err(io::Error::last_os_error());
    }
    let param = sched_param {
        sched_priority: max,
    };
    // SAFETY: `param` outlives the call; pid 0 selects the calling thread.
    if unsafe { sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn raise_current_thread() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "real-time priority is not supported on this platform",
    ))
}
