// kernel/src/arch/x86_64/mod.rs: x86_64-specific boot/runtime support.
pub mod gdt;
pub mod interrupts;
pub mod pic;
pub mod pit;

use x86_64::instructions::port::PortWriteOnly;

/// Short delay for legacy controllers that need time between command bytes.
pub fn io_wait() {
    let mut post: PortWriteOnly<u8> = PortWriteOnly::new(0x80);
    // SAFETY: port 0x80 is the POST diagnostic port; writes to it have no side effects.
    unsafe {
        post.write(0);
    }
}
