// kernel/src/arch/x86_64/pic.rs: legacy 8259 PIC remap with every line masked.
use crate::arch::x86_64::io_wait;
use x86_64::instructions::port::PortWriteOnly;

pub const MASTER_OFFSET: u8 = 32;
pub const SLAVE_OFFSET: u8 = MASTER_OFFSET + 8;

const PIC_1_COMMAND: u16 = 0x20;
const PIC_1_DATA: u16 = 0x21;
const PIC_2_COMMAND: u16 = 0xA0;
const PIC_2_DATA: u16 = 0xA1;

const ICW1_INIT_WITH_ICW4: u8 = 0x11;
const ICW3_MASTER_CASCADE: u8 = 0x04; // slave on IRQ2
const ICW3_SLAVE_IDENTITY: u8 = 0x02;
const ICW4_8086: u8 = 0x01;

// Timer and keyboard are polled, so nothing is delivered through the PIC.
const MASK_ALL: u8 = 0xff;

#[derive(Clone, Copy)]
pub struct PicInitReport {
    pub master_offset: u8,
    pub slave_offset: u8,
    pub master_mask: u8,
    pub slave_mask: u8,
}

pub fn init() -> PicInitReport {
    // Vectors are moved off the exception range so a stray IRQ cannot look like a fault.
    let sequence: [(u16, u8); 10] = [
        (PIC_1_COMMAND, ICW1_INIT_WITH_ICW4),
        (PIC_2_COMMAND, ICW1_INIT_WITH_ICW4),
        (PIC_1_DATA, MASTER_OFFSET),
        (PIC_2_DATA, SLAVE_OFFSET),
        (PIC_1_DATA, ICW3_MASTER_CASCADE),
        (PIC_2_DATA, ICW3_SLAVE_IDENTITY),
        (PIC_1_DATA, ICW4_8086),
        (PIC_2_DATA, ICW4_8086),
        (PIC_1_DATA, MASK_ALL),
        (PIC_2_DATA, MASK_ALL),
    ];

    for (port, value) in sequence {
        let mut port: PortWriteOnly<u8> = PortWriteOnly::new(port);
        // SAFETY: PIC programming uses well-defined command/data ports on x86.
        unsafe {
            port.write(value);
        }
        io_wait();
    }

    PicInitReport {
        master_offset: MASTER_OFFSET,
        slave_offset: SLAVE_OFFSET,
        master_mask: MASK_ALL,
        slave_mask: MASK_ALL,
    }
}
