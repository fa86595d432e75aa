// kernel/src/console/mod.rs: 80x25 text grid painted onto the UEFI framebuffer in VGA colours.
mod font;

use crate::serial;
use bootloader_api::{
    BootInfo,
    info::{FrameBufferInfo, PixelFormat},
};
use core::cell::UnsafeCell;
use core::cmp::{max, min};
use core::fmt::{self, Write};
use laskar_core::config::{SCREEN_COLS, SCREEN_ROWS};
use laskar_core::game_loop::Style;
use laskar_core::snake::Cell;

const COLS: usize = SCREEN_COLS as usize;
const ROWS: usize = SCREEN_ROWS as usize;
const CELL_W: usize = font::GLYPH_WIDTH + 1;
const CELL_H: usize = font::GLYPH_HEIGHT + 1;

#[derive(Clone, Copy)]
struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    const fn hex(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }
}

const VGA_PALETTE: [Color; 16] = [
    Color::hex(0x000000),
    Color::hex(0x0000aa),
    Color::hex(0x00aa00),
    Color::hex(0x00aaaa),
    Color::hex(0xaa0000),
    Color::hex(0xaa00aa),
    Color::hex(0xaa5500),
    Color::hex(0xaaaaaa),
    Color::hex(0x555555),
    Color::hex(0x5555ff),
    Color::hex(0x55ff55),
    Color::hex(0x55ffff),
    Color::hex(0xff5555),
    Color::hex(0xff55ff),
    Color::hex(0xffff55),
    Color::hex(0xffffff),
];

#[derive(Clone, Copy, PartialEq, Eq)]
struct TextCell {
    glyph: u8,
    style: Style,
}

const BLANK: TextCell = TextCell {
    glyph: b' ',
    style: Style::TEXT,
};

#[derive(Clone, Copy)]
pub struct ConsoleInitReport {
    pub backend: &'static str,
    pub ready: bool,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub bytes_per_pixel: usize,
    pub pixel_format: &'static str,
    pub scale: usize,
}

impl ConsoleInitReport {
    const fn headless() -> Self {
        Self {
            backend: "none",
            ready: false,
            width: 0,
            height: 0,
            stride: 0,
            bytes_per_pixel: 0,
            pixel_format: "none",
            scale: 0,
        }
    }
}

struct Framebuffer {
    buffer_ptr: *mut u8,
    buffer_len: usize,
    info: FrameBufferInfo,
    scale: usize,
    origin_x: usize,
    origin_y: usize,
}

impl Framebuffer {
    fn new(buffer_ptr: *mut u8, buffer_len: usize, info: FrameBufferInfo) -> Self {
        // Largest integer scale at which the whole grid fits, centred.
        let scale = max(
            1,
            min(info.width / (COLS * CELL_W), info.height / (ROWS * CELL_H)),
        );
        Self {
            buffer_ptr,
            buffer_len,
            info,
            scale,
            origin_x: info.width.saturating_sub(COLS * CELL_W * scale) / 2,
            origin_y: info.height.saturating_sub(ROWS * CELL_H * scale) / 2,
        }
    }

    fn fill(&mut self, color: Color) {
        for y in 0..self.info.height {
            for x in 0..self.info.width {
                self.write_pixel(x, y, color);
            }
        }
    }

    fn draw_cell(&mut self, col: usize, row: usize, cell: TextCell) {
        let fg = VGA_PALETTE[usize::from(cell.style.foreground())];
        let bg = VGA_PALETTE[usize::from(cell.style.background() & 0x0f)];
        let rows = font::glyph_rows(cell.glyph);
        let x0 = self.origin_x + col * CELL_W * self.scale;
        let y0 = self.origin_y + row * CELL_H * self.scale;

        for py in 0..CELL_H {
            let bits = rows.get(py).copied().unwrap_or(0);
            for px in 0..CELL_W {
                let on = px < font::GLYPH_WIDTH && bits & (1 << (font::GLYPH_WIDTH - 1 - px)) != 0;
                let color = if on { fg } else { bg };
                self.fill_block(x0 + px * self.scale, y0 + py * self.scale, color);
            }
        }
    }

    fn fill_block(&mut self, x: usize, y: usize, color: Color) {
        for dy in 0..self.scale {
            for dx in 0..self.scale {
                self.write_pixel(x + dx, y + dy, color);
            }
        }
    }

    fn write_pixel(&mut self, x: usize, y: usize, color: Color) {
        let bytes_per_pixel = self.info.bytes_per_pixel;
        if x >= self.info.width || y >= self.info.height || bytes_per_pixel == 0 {
            return;
        }
        let byte_offset = (y * self.info.stride + x) * bytes_per_pixel;
        if byte_offset + bytes_per_pixel > self.buffer_len {
            return;
        }
        // SAFETY: framebuffer pointer/length come from the bootloader and stay valid for the
        // kernel's lifetime; the pixel range is bounds-checked above.
        let pixel = unsafe {
            core::slice::from_raw_parts_mut(self.buffer_ptr.add(byte_offset), bytes_per_pixel)
        };
        encode_pixel(self.info.pixel_format, pixel, color);
    }
}

fn encode_pixel(pixel_format: PixelFormat, pixel: &mut [u8], color: Color) {
    let channels = match pixel_format {
        PixelFormat::Bgr => [color.b, color.g, color.r],
        PixelFormat::U8 => {
            let gray = ((u16::from(color.r) + u16::from(color.g) + u16::from(color.b)) / 3) as u8;
            [gray; 3]
        }
        _ => [color.r, color.g, color.b],
    };
    for (slot, value) in pixel.iter_mut().zip(channels) {
        *slot = value;
    }
}

struct Screen {
    framebuffer: Option<Framebuffer>,
    cells: [[TextCell; COLS]; ROWS],
    cursor_col: usize,
    cursor_row: usize,
}

impl Screen {
    const fn new() -> Self {
        Self {
            framebuffer: None,
            cells: [[BLANK; COLS]; ROWS],
            cursor_col: 0,
            cursor_row: 0,
        }
    }

    fn set(&mut self, col: usize, row: usize, cell: TextCell) {
        if col >= COLS || row >= ROWS || self.cells[row][col] == cell {
            return;
        }
        self.cells[row][col] = cell;
        if let Some(framebuffer) = self.framebuffer.as_mut() {
            framebuffer.draw_cell(col, row, cell);
        }
    }

    fn clear_region(&mut self, from: Cell, to: Cell) {
        let last_col = min(usize::from(to.x), COLS - 1);
        let last_row = min(usize::from(to.y), ROWS - 1);
        for row in usize::from(from.y)..=last_row {
            for col in usize::from(from.x)..=last_col {
                self.set(col, row, BLANK);
            }
        }
    }

    fn clear(&mut self) {
        self.cells = [[BLANK; COLS]; ROWS];
        self.cursor_col = 0;
        self.cursor_row = 0;
        self.repaint();
    }

    fn repaint(&mut self) {
        let Some(framebuffer) = self.framebuffer.as_mut() else {
            return;
        };
        framebuffer.fill(VGA_PALETTE[0]);
        for (row, line) in self.cells.iter().enumerate() {
            for (col, cell) in line.iter().enumerate() {
                framebuffer.draw_cell(col, row, *cell);
            }
        }
    }

    fn put_text_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            b'\r' => self.cursor_col = 0,
            0x08 => {
                if self.cursor_col > 0 {
                    self.cursor_col -= 1;
                    self.set(self.cursor_col, self.cursor_row, BLANK);
                }
            }
            _ => {
                let cell = TextCell {
                    glyph: byte,
                    style: Style::TEXT,
                };
                self.set(self.cursor_col, self.cursor_row, cell);
                self.cursor_col += 1;
                if self.cursor_col >= COLS {
                    self.new_line();
                }
            }
        }
    }

    fn new_line(&mut self) {
        self.cursor_col = 0;
        if self.cursor_row + 1 < ROWS {
            self.cursor_row += 1;
        } else {
            self.scroll_up();
        }
    }

    fn scroll_up(&mut self) {
        self.cells.copy_within(1.., 0);
        self.cells[ROWS - 1] = [BLANK; COLS];
        self.repaint();
    }
}

struct ScreenCell(UnsafeCell<Screen>);

// SAFETY: the screen is only touched from the main loop; interrupts never draw.
unsafe impl Sync for ScreenCell {}

static SCREEN: ScreenCell = ScreenCell(UnsafeCell::new(Screen::new()));

pub fn init(boot_info: &mut BootInfo) -> ConsoleInitReport {
    let Some(framebuffer) = boot_info.framebuffer.as_mut() else {
        return ConsoleInitReport::headless();
    };

    let info = framebuffer.info();
    let buffer = framebuffer.buffer_mut();
    if buffer.is_empty() || info.width == 0 || info.height == 0 {
        return ConsoleInitReport::headless();
    }

    let framebuffer = Framebuffer::new(buffer.as_mut_ptr(), buffer.len(), info);
    let scale = framebuffer.scale;
    with_screen(|screen| {
        screen.framebuffer = Some(framebuffer);
        screen.clear();
    });

    ConsoleInitReport {
        backend: "uefi-gop",
        ready: true,
        width: info.width,
        height: info.height,
        stride: info.stride,
        bytes_per_pixel: info.bytes_per_pixel,
        pixel_format: pixel_format_name(info.pixel_format),
        scale,
    }
}

pub fn put_glyph(at: Cell, glyph: u8, style: Style) {
    with_screen(|screen| {
        screen.set(usize::from(at.x), usize::from(at.y), TextCell { glyph, style });
    });
}

/// Blanks the inclusive rectangle `from..=to`, clipped to the grid.
pub fn clear_region(from: Cell, to: Cell) {
    with_screen(|screen| screen.clear_region(from, to));
}

pub fn clear() {
    with_screen(Screen::clear);
}

/// Text output for the shell: drawn at the cursor and mirrored to serial.
pub fn write_str(text: &str) {
    let _ = Mirror.write_str(text);
}

pub fn write_line(text: &str) {
    let _ = writeln!(Mirror, "{text}");
}

pub fn write_byte(byte: u8) {
    with_screen(|screen| screen.put_text_byte(byte));
    serial::write_byte(byte);
}

pub fn write_fmt(args: fmt::Arguments<'_>) {
    let _ = Mirror.write_fmt(args);
}

struct Mirror;

impl Write for Mirror {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        with_screen(|screen| {
            for byte in s.bytes() {
                screen.put_text_byte(byte);
            }
        });
        serial::write_str(s);
        Ok(())
    }
}

fn with_screen<T>(f: impl FnOnce(&mut Screen) -> T) -> T {
    // SAFETY: the kernel main loop is single-threaded and never re-enters the console.
    let screen = unsafe { &mut *SCREEN.0.get() };
    f(screen)
}

fn pixel_format_name(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Rgb => "rgb",
        PixelFormat::Bgr => "bgr",
        PixelFormat::U8 => "u8",
        _ => "unknown",
    }
}
