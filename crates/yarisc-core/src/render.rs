//! Textual views of registers and memory with current-vs-previous diffing.
//!
//! Diffing follows a render-then-scan scheme: both snapshots are rendered to
//! plain strings and compared byte-by-byte, switching the active color on
//! transitions between unchanged and changed runs. This keeps color
//! transitions correct across padding and separators.

use std::fmt::Write as _;

use crate::disasm::disassemble;
use crate::level::FeatureLevel;
use crate::machine::RegistersView;
use crate::memory::MemoryView;
use crate::registers::{MachineRegisters, StatusRegister, REGISTER_NAMES};
use crate::word::{Address, Word, NUM_REGISTERS, WORD_BYTES};

/// Colored text output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OutputFormat {
    /// No color sequences.
    #[default]
    Plain,
    /// ANSI color sequences enabled.
    Colored,
}

/// ANSI escape sequence resetting all attributes.
pub const RESET_SEQ: &str = "\x1b[0m";

const WHITE_SEQ: &str = "\x1b[37m";
const BRIGHT_WHITE_SEQ: &str = "\x1b[97m";
/// ANSI escape sequence for bright red foreground (changed/new content).
pub const BRIGHT_RED_SEQ: &str = "\x1b[91m";

/// Background colors identifying the register pointing at a memory cell,
/// indexed by register number.
pub const REGISTER_BACKGROUND_SEQS: [&str; NUM_REGISTERS] = [
    "\x1b[44m",  // r0: blue
    "\x1b[45m",  // r1: magenta
    "\x1b[46m",  // r2: cyan
    "\x1b[104m", // r3: bright blue
    "\x1b[105m", // r4: bright magenta
    "\x1b[106m", // r5: bright cyan
    "\x1b[43m",  // sp: yellow
    "\x1b[42m",  // ip: green
];

/// Lookup priority when several registers point at the same cell.
const REGISTER_COLOR_PRIORITY: [usize; NUM_REGISTERS] = [7, 0, 1, 2, 3, 4, 5, 6];

/// Escape-sequence source that renders to nothing when colors are disabled.
#[derive(Debug, Clone, Copy)]
pub struct ColorContext {
    enabled: bool,
}

impl ColorContext {
    /// Creates a context for the given output format.
    #[must_use]
    pub const fn new(fmt: OutputFormat) -> Self {
        Self {
            enabled: matches!(fmt, OutputFormat::Colored),
        }
    }

    /// Returns whether color sequences are emitted.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    fn seq(&self, seq: &'static str) -> &'static str {
        if self.enabled {
            seq
        } else {
            ""
        }
    }
}

fn printable(byte: u8) -> char {
    if (32..=126).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

/// Renders `current`, coloring runs that differ from `previous` bright red.
///
/// The tail beyond the end of `previous` renders uniformly as new.
fn diff_strings(current: &str, previous: &str, ctx: &ColorContext) -> String {
    if !ctx.enabled() {
        return current.to_string();
    }

    let current = current.as_bytes();
    let previous = previous.as_bytes();

    let mut out = String::with_capacity(current.len() * 2);
    let mut was_diff = None;

    for (i, byte) in current.iter().enumerate() {
        let is_diff = previous.get(i) != Some(byte);

        if was_diff != Some(is_diff) {
            out.push_str(if is_diff { BRIGHT_RED_SEQ } else { WHITE_SEQ });
            was_diff = Some(is_diff);
        }

        out.push(*byte as char);
    }

    out.push_str(RESET_SEQ);
    out
}

fn status_bits(status: Word, ctx: &ColorContext) -> String {
    let carry = if status & StatusRegister::CARRY_FLAG != 0 {
        'C'
    } else {
        '0'
    };
    let zero = if status & StatusRegister::ZERO_FLAG != 0 {
        'Z'
    } else {
        '0'
    };

    if status & !StatusRegister::MASK != 0 {
        let mut bits: Vec<char> = format!("{status:016b}").chars().collect();
        bits[15 - StatusRegister::CARRY_POS as usize] = carry;
        bits[15 - StatusRegister::ZERO_POS as usize] = zero;
        let bits: String = bits.into_iter().collect();

        format!("status: {}0b{bits}{}", ctx.seq(BRIGHT_WHITE_SEQ), ctx.seq(RESET_SEQ))
    } else {
        format!(
            "                status: {}{zero}{carry}{}",
            ctx.seq(BRIGHT_WHITE_SEQ),
            ctx.seq(RESET_SEQ)
        )
    }
}

fn hex_word(value: Word, ctx: &ColorContext) -> String {
    format!(
        "{}0x{value:04x}{}",
        ctx.seq(BRIGHT_WHITE_SEQ),
        ctx.seq(RESET_SEQ)
    )
}

/// Width of the disassembly preview column, preamble included.
const INSTRUCTION_FIELD: usize = 30;
const INSTRUCTION_PREAMBLE: &str = "Next:     ";

fn instruction_field(view: &RegistersView, level: FeatureLevel) -> String {
    let mut field = String::new();

    if let Some([instr, arg]) = view.instruction {
        let result = disassemble(instr, arg, level);

        if result.words > 0 {
            field = format!("{INSTRUCTION_PREAMBLE}{}", result.text);
        }
    }

    if field.len() > INSTRUCTION_FIELD {
        field.truncate(INSTRUCTION_FIELD);
    } else {
        let pad = INSTRUCTION_FIELD - field.len();
        field.extend(std::iter::repeat(' ').take(pad));
    }

    field
}

fn render_registers_with(view: &RegistersView, level: FeatureLevel, ctx: &ColorContext) -> String {
    let named = &view.reg.named;
    let mut out = String::new();

    out.push_str("Register: ");
    for (i, name) in REGISTER_NAMES.iter().enumerate().take(6) {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{name}: {}", hex_word(named.r[i], ctx));
    }
    out.push('\n');

    out.push_str(&instruction_field(view, level));
    out.push_str(&status_bits(view.reg.status.s, ctx));
    let _ = write!(
        out,
        ", sp: {}, ip: {}",
        hex_word(named.sp(), ctx),
        hex_word(named.ip(), ctx)
    );
    out.push('\n');

    out
}

/// Renders the register view.
#[must_use]
pub fn render_registers(view: &RegistersView, level: FeatureLevel, fmt: OutputFormat) -> String {
    render_registers_with(view, level, &ColorContext::new(fmt))
}

/// Renders the register view, highlighting cells that differ from
/// `previous`.
///
/// The instruction pointer's value cell is excluded from highlighting since
/// it changes on almost every step.
#[must_use]
pub fn render_registers_diff(
    current: &RegistersView,
    previous: &RegistersView,
    level: FeatureLevel,
    fmt: OutputFormat,
) -> String {
    let ctx = ColorContext::new(fmt);

    let mut previous = *previous;
    previous.reg.named.set_ip(current.reg.named.ip());
    previous.instruction = current.instruction;

    if !ctx.enabled() || *current == previous {
        return render_registers_with(current, level, &ctx);
    }

    let plain = ColorContext::new(OutputFormat::Plain);
    diff_strings(
        &render_registers_with(current, level, &plain),
        &render_registers_with(&previous, level, &plain),
        &ctx,
    )
}

fn address_background(
    address: Address,
    registers: Option<&MachineRegisters>,
    ctx: &ColorContext,
) -> &'static str {
    let Some(reg) = registers else { return "" };

    if !ctx.enabled() {
        return "";
    }

    for index in REGISTER_COLOR_PRIORITY {
        if reg.named.r[index] == address {
            return REGISTER_BACKGROUND_SEQS[index];
        }
    }

    ""
}

/// Number of words shown per memory dump line.
const LINE_WORDS: usize = 8;
const LINE_BYTES: usize = LINE_WORDS * WORD_BYTES;

fn previous_byte(previous: Option<&MemoryView<'_>>, address: usize) -> Option<u8> {
    let view = previous?;
    let base = view.base() as usize;

    if (base..base + view.size()).contains(&address) {
        Some(view.data()[address - base])
    } else {
        None
    }
}

fn overlaps_and_differs(current: &MemoryView<'_>, previous: &MemoryView<'_>) -> bool {
    let current_first = current.base() as usize;
    let current_last = current_first + current.size();
    let previous_first = previous.base() as usize;
    let previous_last = previous_first + previous.size();

    let first = current_first.max(previous_first);
    let last = current_last.min(previous_last);

    if first >= last {
        return false;
    }

    current.data()[first - current_first..last - current_first]
        != previous.data()[first - previous_first..last - previous_first]
}

fn render_memory_with(
    current: &MemoryView<'_>,
    previous: Option<&MemoryView<'_>>,
    ctx: &ColorContext,
) -> String {
    let mut out = String::new();
    let data = current.data();

    for line_off in (0..current.size()).step_by(LINE_BYTES) {
        let base = current.base() as usize + line_off;
        let line = &data[line_off..current.size().min(line_off + LINE_BYTES)];

        let _ = write!(out, "0x{base:04x}: ");

        for (word_off, word) in line.chunks(WORD_BYTES).enumerate() {
            let address = (base + word_off * WORD_BYTES) as Address;
            out.push_str(address_background(address, current.registers(), ctx));

            for (i, byte) in word.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }

                let changed = ctx.enabled()
                    && previous.is_some()
                    && previous_byte(previous, address as usize + i) != Some(*byte);

                let color = if changed {
                    BRIGHT_RED_SEQ
                } else if i == 0 {
                    BRIGHT_WHITE_SEQ
                } else {
                    WHITE_SEQ
                };

                let _ = write!(out, "{}{byte:02x}", ctx.seq(color));
            }

            let _ = write!(out, "{}  ", ctx.seq(RESET_SEQ));
        }

        let chars: String = line.iter().copied().map(printable).collect();
        match previous {
            Some(view) if ctx.enabled() => {
                let previous_chars: String = (0..line.len())
                    .map(|i| previous_byte(Some(view), base + i).map_or('\0', printable))
                    .collect();

                out.push_str(&diff_strings(&chars, &previous_chars, ctx));
            }
            _ => out.push_str(&chars),
        }

        out.push('\n');
    }

    out
}

/// Renders a hex dump of the memory view, 8 words per line, with a
/// printable-ASCII gutter.
///
/// Cells whose address equals a current register value are background-colored
/// by register identity (`ip` takes precedence, then `r0..r5`, then `sp`).
#[must_use]
pub fn render_memory(view: &MemoryView<'_>, fmt: OutputFormat) -> String {
    render_memory_with(view, None, &ColorContext::new(fmt))
}

/// Renders a hex dump of `current`, highlighting bytes that differ from the
/// overlapping part of `previous`.
///
/// Without any overlap, or when the overlapping bytes are identical, the
/// view renders as [`render_memory`]. Bytes not covered by `previous` render
/// as new.
#[must_use]
pub fn render_memory_diff(
    current: &MemoryView<'_>,
    previous: &MemoryView<'_>,
    fmt: OutputFormat,
) -> String {
    let ctx = ColorContext::new(fmt);

    if ctx.enabled() && overlaps_and_differs(current, previous) {
        render_memory_with(current, Some(previous), &ctx)
    } else {
        render_memory_with(current, None, &ctx)
    }
}

/// Width of the message line below the debugger view.
const MESSAGE_LINE: usize = 80;

fn message_line(msg: &str) -> String {
    let mut line: String = msg.chars().take(MESSAGE_LINE).collect();
    let pad = MESSAGE_LINE - line.len();
    line.extend(std::iter::repeat(' ').take(pad));
    line.push('\n');

    line
}

/// Everything the interactive front-end shows between steps.
#[derive(Debug)]
pub struct DebuggerView<'a> {
    /// Current register snapshot.
    pub current_registers: RegistersView,
    /// Current window into main memory.
    pub current_memory: MemoryView<'a>,
    /// Register snapshot of the previous step.
    pub previous_registers: RegistersView,
    /// Memory window of the previous step, if one was captured.
    pub previous_memory: Option<MemoryView<'a>>,
    /// Informational message shown below the views.
    pub info: &'a str,
    /// Error message shown below the views; takes precedence over `info`.
    pub error: &'a str,
}

/// Renders the debugger view: register diff, memory diff, and one message
/// line (the error in bright red, if any).
#[must_use]
pub fn render_debugger_view(view: &DebuggerView<'_>, level: FeatureLevel, fmt: OutputFormat) -> String {
    let ctx = ColorContext::new(fmt);
    let mut out = String::new();

    out.push_str(&render_registers_diff(
        &view.current_registers,
        &view.previous_registers,
        level,
        fmt,
    ));
    out.push('\n');

    match &view.previous_memory {
        Some(previous) => {
            out.push_str(&render_memory_diff(&view.current_memory, previous, fmt));
        }
        None => out.push_str(&render_memory(&view.current_memory, fmt)),
    }
    out.push('\n');

    if view.error.is_empty() {
        out.push_str(&message_line(view.info));
    } else {
        let _ = write!(
            out,
            "{}{}{}",
            ctx.seq(BRIGHT_RED_SEQ),
            message_line(view.error),
            ctx.seq(RESET_SEQ)
        );
    }

    out
}
