//! Hosted simulation port
//!
//! Runs the kernel on a desktop OS so its scheduling behaviour can be tested
//! without hardware. Every process is an OS thread, but only the thread whose
//! token matches the board's `running` slot holds the simulated CPU; the others
//! block on a condition variable. A process' token is the top address of its
//! stack region, which is also the value kept as its saved context.
//!
//! The interrupt mask is a flag on the board. A switch pended while the mask
//! is set is delivered when it is cleared, the way PendSV fires once PRIMASK
//! is cleared. There is no free-running tick: call
//! [`system_timer_isr`](crate::time::system_timer_isr) to advance time.
//!
//! Each kernel initialization starts a new board generation. Threads left
//! over from an earlier generation never get the CPU again.

use std::cell::Cell;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::process::OsProcessFn;
use crate::types::{OsStkElement, OsStkPtr};

struct Board {
    generation: u64,
    running: Option<usize>,
    irq_enabled: bool,
    switch_pending: bool,
    idle_polls: u64,
}

impl Board {
    const fn new() -> Self {
        Self {
            generation: 0,
            running: None,
            irq_enabled: true,
            switch_pending: false,
            idle_polls: 0,
        }
    }
}

static BOARD: Mutex<Board> = Mutex::new(Board::new());
static BATON: Condvar = Condvar::new();

thread_local! {
    static TOKEN: Cell<Option<usize>> = const { Cell::new(None) };
    static GENERATION: Cell<u64> = const { Cell::new(0) };
}

fn board() -> MutexGuard<'static, Board> {
    BOARD.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Block until `token` holds the CPU in generation `generation`
fn wait_for_cpu(
    mut board: MutexGuard<'static, Board>,
    token: usize,
    generation: u64,
) -> MutexGuard<'static, Board> {
    while !(board.generation == generation && board.running == Some(token)) {
        board = BATON.wait(board).unwrap_or_else(PoisonError::into_inner);
    }
    board
}

/// Token of the calling thread if it currently holds the CPU
fn current_process(board: &Board) -> Option<usize> {
    let token = TOKEN.get()?;
    (GENERATION.get() == board.generation && board.running == Some(token)).then_some(token)
}

fn hand_over(mut board: MutexGuard<'static, Board>, me: usize, next: usize) -> MutexGuard<'static, Board> {
    let generation = board.generation;
    board.running = Some(next);
    BATON.notify_all();
    wait_for_cpu(board, me, generation)
}

struct HostCriticalSection;
critical_section::set_impl!(HostCriticalSection);

unsafe impl critical_section::Impl for HostCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mut board = board();
        let was_enabled = board.irq_enabled;
        board.irq_enabled = false;
        was_enabled
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled {
            enable_interrupts();
        }
    }
}

/// Reset the board and start a new generation
pub fn os_port_init() {
    let mut board = board();
    let generation = board.generation.wrapping_add(1);
    *board = Board::new();
    board.generation = generation;
    BATON.notify_all();
}

/// Spawn the thread backing a process and return its token
///
/// # Safety
/// `stk_base..stk_base + stk_size` must be a valid region; only its address
/// is used.
pub unsafe fn os_task_stk_init(
    entry: OsProcessFn,
    stk_base: *mut OsStkElement,
    stk_size: usize,
) -> OsStkPtr {
    // SAFETY: one past the end of the caller's region.
    let stk_top = unsafe { stk_base.add(stk_size) };
    let token = stk_top as usize;
    let generation = board().generation;

    thread::Builder::new()
        .spawn(move || {
            TOKEN.set(Some(token));
            GENERATION.set(generation);

            let mut board = wait_for_cpu(board(), token, generation);
            // A new context starts with interrupts enabled
            board.irq_enabled = true;
            drop(board);

            entry()
        })
        .expect("failed to spawn process thread");

    stk_top
}

/// Give the CPU to the first process; the calling thread parks for good
///
/// # Safety
/// `sp` must be the token of a registered process.
pub unsafe fn os_start_high_rdy(sp: OsStkPtr) -> ! {
    {
        let mut board = board();
        board.running = Some(sp as usize);
        board.switch_pending = false;
        BATON.notify_all();
    }

    loop {
        thread::park();
    }
}

/// Pend the switch interrupt
pub fn os_ctx_sw() {
    board().switch_pending = true;
}

/// Clear the interrupt mask, delivering a pended switch
pub fn enable_interrupts() {
    let mut board = board();
    board.irq_enabled = true;

    #[cfg(not(feature = "direct-switch"))]
    while board.switch_pending {
        let Some(me) = current_process(&board) else {
            break;
        };

        board.switch_pending = false;
        board.irq_enabled = false;

        // SAFETY: the simulated interrupts are masked.
        let next = unsafe { crate::sched::context_switch_hook(me as OsStkPtr) } as usize;
        if next != me && next != 0 {
            board = hand_over(board, me, next);
        }

        board.irq_enabled = true;
    }
}

pub fn disable_interrupts() {
    board().irq_enabled = false;
}

/// Transfer the CPU straight to the context `load`
///
/// # Safety
/// `save` must point at the current process' context slot and `load` must be
/// the context of a registered process.
#[cfg(feature = "direct-switch")]
pub unsafe fn os_context_switch(save: *mut OsStkPtr, load: OsStkPtr) {
    let board = board();
    let Some(me) = current_process(&board) else {
        return;
    };

    // SAFETY: guaranteed by the caller.
    unsafe { *save = me as OsStkPtr };
    drop(hand_over(board, me, load as usize));
}

/// The simulated board has no tick source
pub fn os_cpu_systick_init(_cnts: u32) {}

/// Idle process step: count the poll and let host time pass
pub fn os_idle_hook() {
    {
        let mut board = board();
        if board.generation != GENERATION.get() {
            drop(board);
            loop {
                thread::park();
            }
        }
        board.idle_polls += 1;
    }

    thread::sleep(Duration::from_millis(1));
}

/// Number of idle steps taken in the current generation
///
/// Non-zero means every process has blocked since the kernel started.
pub fn idle_polls() -> u64 {
    board().idle_polls
}
