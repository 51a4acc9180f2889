//! Cortex-M4 port implementation
//!
//! Provides context switching via PendSV exception handler. Processes run on
//! PSP; handlers and the kernel start-up code run on a dedicated MSP stack.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;

use crate::process::OsProcessFn;
use crate::types::{OsStkElement, OsStkPtr};

/// Interrupt stack for MSP
#[no_mangle]
static mut INTERRUPT_STACK: [u64; 256] = [0xDEADBEEF_DEADBEEF; 256];

/// Initialize SysTick timer for system tick generation
///
/// # Arguments
/// * `cnts` - Reload value
///
/// # Example
/// For 16MHz clock with 1000Hz tick rate: cnts = 16_000_000 / 1000 = 16_000
pub fn os_cpu_systick_init(cnts: u32) {
    // SAFETY: SYST is owned by the kernel once it starts.
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(cnts - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Reset port state
pub fn os_port_init() {}

/// Start the highest priority ready process
///
/// `_sp` is not used: PendSV loads the first context from the process table.
///
/// # Safety
/// The kernel must have selected a registered process as current.
pub unsafe fn os_start_high_rdy(_sp: OsStkPtr) -> ! {
    unsafe {
        let mut scb = cortex_m::Peripherals::steal().SCB;

        // PendSV and SysTick at the lowest priority
        scb.set_priority(SystemHandler::PendSV, 0xF0);
        scb.set_priority(SystemHandler::SysTick, 0xF0);

        let msp_top = (&raw const INTERRUPT_STACK) as u32
            + core::mem::size_of::<[u64; 256]>() as u32;

        asm!("msr msp, {0}", in(reg) msp_top);
        // A zero PSP tells PendSV there is no context to save
        asm!("msr psp, {0}", in(reg) 0);

        cortex_m::peripheral::SCB::set_pendsv();
        cortex_m::interrupt::enable();
    }

    loop {
        cortex_m::asm::wfi();
    }
}

/// Pend the switch interrupt
#[inline(always)]
pub fn os_ctx_sw() {
    cortex_m::peripheral::SCB::set_pendsv();
}

#[inline(always)]
pub fn enable_interrupts() {
    // SAFETY: only called from kernel code that owns the interrupt state.
    unsafe { cortex_m::interrupt::enable() };
}

#[inline(always)]
pub fn disable_interrupts() {
    cortex_m::interrupt::disable();
}

/// Idle process body: sleep until the next interrupt
#[inline(always)]
pub fn os_idle_hook() {
    cortex_m::asm::wfi();
}

/// Context structure stored on stack
#[repr(C, align(4))]
struct ProcessFrame {
    r4: u32,
    r5: u32,
    r6: u32,
    r7: u32,
    r8: u32,
    r9: u32,
    r10: u32,
    r11: u32,
    exc_return: u32,
    r0: u32,
    r1: u32,
    r2: u32,
    r3: u32,
    r12: u32,
    lr: u32,
    pc: u32,
    xpsr: u32,
}
const FRAME_WORDS: usize = 17;

/// Build the first context of a process
///
/// # Safety
/// `stk_base..stk_base + stk_size` must be a valid, unused stack region.
pub unsafe fn os_task_stk_init(
    entry: OsProcessFn,
    stk_base: *mut OsStkElement,
    stk_size: usize,
) -> OsStkPtr {
    unsafe {
        let stk_top = stk_base.add(stk_size);
        let stk_aligned = ((stk_top as usize) & !7) as *mut u32;

        let frame_ptr = stk_aligned.sub(FRAME_WORDS) as *mut ProcessFrame;

        frame_ptr.write(ProcessFrame {
            r4: 0x04040404,
            r5: 0x05050505,
            r6: 0x06060606,
            r7: 0x07070707,
            r8: 0x08080808,
            r9: 0x09090909,
            r10: 0x10101010,
            r11: 0x11111111,
            exc_return: 0xFFFF_FFFD,
            r0: 0,
            r1: 0,
            r2: 0,
            r3: 0,
            r12: 0,
            lr: os_process_return as *const () as u32,
            pc: (entry as usize as u32) | 1,
            xpsr: 0x0100_0000,
        });

        // One word below the frame, matching PendSV's "add r0, r0, #4"
        (frame_ptr as *mut u32).sub(1)
    }
}

/// Called from PendSV with the outgoing PSP; returns the incoming one
#[inline(never)]
#[no_mangle]
unsafe extern "C" fn pendsv_switch_context(cur_sp: *mut u32) -> *mut u32 {
    // SAFETY: PendSV runs with interrupts disabled.
    unsafe { crate::sched::context_switch_hook(cur_sp) }
}

/// PendSV exception handler - performs full context switch
///
/// 1. Save R4-R11, LR to the outgoing process stack (skipped when PSP is 0)
/// 2. Swap contexts through the scheduler hook
/// 3. Restore R4-R11, LR from the incoming process stack
/// 4. Exception return
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "dsb",
        "isb",

        "mrs r0, psp",
        "cbz r0, 1f",

        "stmdb r0!, {{r4-r11, lr}}",
        "sub r0, r0, #4",

        "1:",
        "bl pendsv_switch_context",

        "add r0, r0, #4",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",

        "cpsie i",
        "dsb",
        "isb",

        "bx lr",
    );
}

/// Processes never return; trap one that does
#[no_mangle]
fn os_process_return() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
