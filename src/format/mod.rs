// librsync wire formats.
//
// - `netint`: big-endian integer helpers
// - `header`: magic numbers and the signature header
// - `command`: the delta opcode table
// - `codec`: instruction encoding, incremental decoding and the trailer

pub mod codec;
pub mod command;
pub mod header;
pub mod netint;

pub use codec::{Command, Instruction, InstructionIter};
pub use header::SignatureHeader;
