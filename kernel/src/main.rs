#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]

// kernel/src/main.rs: kernel entry point and early-boot flow.
mod arch;
mod console;
mod keyboard;
mod logger;
mod serial;
mod shell;
mod snake;
mod time;
mod version;

use bootloader_api::{BootInfo, BootloaderConfig, entry_point};
use core::panic::PanicInfo;
use laskar_core::abi::WELCOME_BANNER;

pub static BOOTLOADER_CONFIG: BootloaderConfig = {
    let mut config = BootloaderConfig::new_default();
    config.kernel_stack_size = 128 * 1024;
    config
};

entry_point!(kernel_main, config = &BOOTLOADER_CONFIG);

fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    serial::init();
    let log_report = logger::init();
    serial::write_line("kernel entry reached");
    print_boot_logo();
    serial::write_fmt(format_args!(
        "Version: {}.{}.{}\n",
        version::MAJOR,
        version::MINOR,
        version::BUILD
    ));
    serial::write_fmt(format_args!(
        "Log: backend=serial installed={} level={}\n",
        log_report.installed, log_report.level
    ));

    let irq = arch::x86_64::interrupts::init();
    serial::write_fmt(format_args!(
        "Interrupts: GDT/TSS loaded code_sel={:#x} tss_sel={:#x} df_stack_top={:#018x}\n",
        irq.code_selector, irq.tss_selector, irq.double_fault_stack_top
    ));
    serial::write_fmt(format_args!(
        "Interrupts: PIC master={} slave={} mask={:#010b}/{:#010b} enabled={}\n",
        irq.pic_master_offset,
        irq.pic_slave_offset,
        irq.pic_master_mask,
        irq.pic_slave_mask,
        irq.interrupts_enabled
    ));

    let console_report = console::init(boot_info);
    serial::write_fmt(format_args!(
        "Console: backend={} ready={} {}x{} stride={} bpp={} fmt={} scale={}\n",
        console_report.backend,
        console_report.ready,
        console_report.width,
        console_report.height,
        console_report.stride,
        console_report.bytes_per_pixel,
        console_report.pixel_format,
        console_report.scale
    ));

    let clock_report = time::init();
    serial::write_fmt(format_args!(
        "Clock: source={} mode={:#04x} period={} tick_us={} first_sample={}\n",
        clock_report.source,
        clock_report.mode,
        clock_report.period,
        clock_report.tick_micros,
        clock_report.first_sample
    ));

    let keyboard_report = keyboard::init();
    serial::write_fmt(format_args!(
        "Keyboard: set1 polled flushed={} queue={} dropped={}\n",
        keyboard_report.flushed_bytes,
        keyboard_report.queue_capacity,
        keyboard::dropped_events()
    ));

    console::write_line(WELCOME_BANNER);
    shell::init();
    run_loop()
}

fn print_boot_logo() {
    const LOGO: &[&str] = &[
        " _           _              ",
        "| | __ _ ___| | ____ _ _ __ ",
        "| |/ _` / __| |/ / _` | '__|",
        "| | (_| \\__ \\   < (_| | |   ",
        "|_|\\__,_|___/_|\\_\\__,_|_|   ",
    ];

    serial::write_line("");
    for line in LOGO {
        serial::write_line(line);
    }
    serial::write_line("");
}

#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    // SAFETY: nothing resumes after a panic, so a writer interrupted mid-line is abandoned.
    unsafe {
        serial::force_unlock();
    }
    serial::write_line("KERNEL PANIC");
    serial::write_fmt(format_args!("{info}\n"));
    halt_loop()
}

fn run_loop() -> ! {
    loop {
        // Polling keeps the clock within one counter period of the hardware.
        time::ticks();
        shell::poll();
        core::hint::spin_loop();
    }
}

fn halt_loop() -> ! {
    x86_64::instructions::interrupts::disable();
    loop {
        x86_64::instructions::hlt();
    }
}
