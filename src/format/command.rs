// librsync delta command table (`prototab`).
//
//   0x00            END
//   0x01..=0x40     LITERAL, length is the opcode itself
//   0x41..=0x44     LITERAL, length follows in 1/2/4/8 bytes
//   0x45..=0x54     COPY, offset then length, each 1/2/4/8 bytes
//                   (offset width is the major index)
//   0x55..=0xff     reserved
//
// Parameter widths are always one of 1, 2, 4, 8.

use std::sync::LazyLock;

use super::netint;

pub const OP_END: u8 = 0x00;
pub const OP_LITERAL_1: u8 = 0x01;
pub const OP_LITERAL_64: u8 = 0x40;
pub const OP_LITERAL_N1: u8 = 0x41;
pub const OP_COPY_N1_N1: u8 = 0x45;
pub const OP_COPY_N8_N8: u8 = 0x54;

/// Longest encoded command header: opcode plus two 8-byte parameters.
pub const MAX_COMMAND_LEN: usize = 17;

const WIDTHS: [u8; 4] = [1, 2, 4, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    End,
    Literal,
    Copy,
}

/// One row of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub kind: CommandKind,
    /// Literal length carried by the opcode itself (0 if a parameter follows).
    pub immediate: u8,
    /// Width of the first parameter in bytes (0 if none).
    pub len_1: u8,
    /// Width of the second parameter in bytes (0 if none).
    pub len_2: u8,
}

impl CommandEntry {
    /// Total encoded length of the command header, opcode included.
    pub fn encoded_len(&self) -> usize {
        1 + self.len_1 as usize + self.len_2 as usize
    }
}

pub type CommandTable = [Option<CommandEntry>; 256];

fn build_command_table() -> CommandTable {
    let mut tbl: CommandTable = [None; 256];

    tbl[OP_END as usize] = Some(CommandEntry {
        kind: CommandKind::End,
        immediate: 0,
        len_1: 0,
        len_2: 0,
    });

    for op in OP_LITERAL_1..=OP_LITERAL_64 {
        tbl[op as usize] = Some(CommandEntry {
            kind: CommandKind::Literal,
            immediate: op,
            len_1: 0,
            len_2: 0,
        });
    }

    for (i, &w) in WIDTHS.iter().enumerate() {
        tbl[OP_LITERAL_N1 as usize + i] = Some(CommandEntry {
            kind: CommandKind::Literal,
            immediate: 0,
            len_1: w,
            len_2: 0,
        });
    }

    let mut op = OP_COPY_N1_N1 as usize;
    for &w1 in &WIDTHS {
        for &w2 in &WIDTHS {
            tbl[op] = Some(CommandEntry {
                kind: CommandKind::Copy,
                immediate: 0,
                len_1: w1,
                len_2: w2,
            });
            op += 1;
        }
    }
    debug_assert_eq!(op, OP_COPY_N8_N8 as usize + 1);

    tbl
}

/// The command table, built on first use.
pub fn command_table() -> &'static CommandTable {
    static TABLE: LazyLock<CommandTable> = LazyLock::new(build_command_table);
    &TABLE
}

/// Look up an opcode; `None` for reserved opcodes.
#[inline]
pub fn lookup(op: u8) -> Option<CommandEntry> {
    command_table()[op as usize]
}

fn width_index(width: usize) -> u8 {
    match width {
        1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    }
}

/// Opcode and parameter width for a literal of `len` bytes.
///
/// Always uses the explicit-length forms, as librsync's encoder does.
pub fn literal_op(len: u64) -> (u8, usize) {
    let width = netint::int_len(len);
    (OP_LITERAL_N1 + width_index(width), width)
}

/// Opcode and parameter widths for a copy.
pub fn copy_op(offset: u64, len: u64) -> (u8, usize, usize) {
    let w1 = netint::int_len(offset);
    let w2 = netint::int_len(len);
    let op = OP_COPY_N1_N1 + width_index(w1) * 4 + width_index(w2);
    (op, w1, w2)
}
