// kernel/src/arch/x86_64/interrupts.rs: exception-only IDT; hardware interrupts stay off.
use crate::arch::x86_64::{gdt, pic};
use crate::serial;
use spin::Once;
use x86_64::instructions::{hlt, interrupts};
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame};

static IDT: Once<InterruptDescriptorTable> = Once::new();

#[derive(Clone, Copy)]
pub struct InterruptInitReport {
    pub code_selector: u16,
    pub tss_selector: u16,
    pub double_fault_stack_top: u64,
    pub pic_master_offset: u8,
    pub pic_slave_offset: u8,
    pub pic_master_mask: u8,
    pub pic_slave_mask: u8,
    pub interrupts_enabled: bool,
}

pub fn init() -> InterruptInitReport {
    interrupts::disable();
    let gdt_report = gdt::init();

    let idt = IDT.call_once(|| {
        let mut idt = InterruptDescriptorTable::new();
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        idt.general_protection_fault
            .set_handler_fn(general_protection_handler);
        // SAFETY: the IST index refers to the double-fault stack installed by `gdt::init`.
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt
    });
    idt.load();

    let pic_report = pic::init();

    InterruptInitReport {
        code_selector: gdt_report.code_selector,
        tss_selector: gdt_report.tss_selector,
        double_fault_stack_top: gdt_report.double_fault_stack_top,
        pic_master_offset: pic_report.master_offset,
        pic_slave_offset: pic_report.slave_offset,
        pic_master_mask: pic_report.master_mask,
        pic_slave_mask: pic_report.slave_mask,
        interrupts_enabled: interrupts::are_enabled(),
    }
}

extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    serial::write_line("EXCEPTION: BREAKPOINT");
    serial::write_fmt(format_args!("{stack_frame:#?}\n"));
}

extern "x86-interrupt" fn general_protection_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!("EXCEPTION: GENERAL PROTECTION error={error_code:#x}\n{stack_frame:#?}");
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    serial::write_line("EXCEPTION: DOUBLE FAULT");
    serial::write_fmt(format_args!("{stack_frame:#?}\n"));
    loop {
        hlt();
    }
}
