//! Language items and default exception handlers
//!
//! Only meaningful on bare-metal ARM; hosted builds use std's panic runtime.

// When defmt feature is enabled on ARM targets, use defmt_rtt and panic_probe
#[cfg(all(feature = "defmt", target_arch = "arm", target_os = "none"))]
use defmt_rtt as _;

#[cfg(all(feature = "defmt", target_arch = "arm", target_os = "none"))]
use panic_probe as _;

// Defmt panic handler
#[cfg(all(feature = "defmt", target_arch = "arm", target_os = "none"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    cortex_m::asm::udf()
}

// Panic handler when defmt is disabled
#[cfg(all(not(feature = "defmt"), target_arch = "arm", target_os = "none"))]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop { cortex_m::asm::udf(); }
}

// Default HardFault handler
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    loop { cortex_m::asm::udf(); }
}

// Defmt timestamp is the kernel tick
#[cfg(all(feature = "defmt", target_os = "none"))]
defmt::timestamp!("{=u32}", crate::os::kernel::KERNEL.tick_get());
