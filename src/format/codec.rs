// Delta instruction codec.
//
// Encoding writes command headers (opcode + parameters); literal payload
// bytes follow their header verbatim. Decoding is incremental: a command
// header is parsed only once all of its bytes are available, so the patch
// job can call `parse_command` on whatever it has buffered.
//
// Trailer (optional, after END): one length byte (always 32) followed by
// the BLAKE2b-256 digest of the whole reconstructed output. Deltas without
// a trailer are exactly what `rdiff delta` writes.

use crate::error::{Error, Result};
use crate::hash::strong::{self, SignatureKind, StrongSum};

use super::command::{self, CommandKind, OP_END};
use super::header::{DELTA_HEADER_LEN, DELTA_MAGIC};
use super::netint;

/// Length of the whole-output digest carried in the trailer.
pub const TRAILER_DIGEST_LEN: usize = strong::BLAKE2_LEN;

/// Hash used for the trailer digest.
pub const TRAILER_KIND: SignatureKind = SignatureKind::Blake2;

/// A decoded command header. Literal payload bytes are not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    End,
    Literal { len: u64 },
    Copy { offset: u64, len: u64 },
}

/// A decoded instruction with its literal payload borrowed from the delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    Copy { offset: u64, len: u64 },
    Literal(&'a [u8]),
    End,
}

impl Instruction<'_> {
    /// Number of output bytes this instruction produces.
    pub fn output_len(&self) -> u64 {
        match self {
            Self::Copy { len, .. } => *len,
            Self::Literal(data) => data.len() as u64,
            Self::End => 0,
        }
    }
}

/// Append the delta magic.
pub fn encode_magic(out: &mut Vec<u8>) {
    netint::put_u32(out, DELTA_MAGIC);
}

/// Append a literal command header for `len` payload bytes.
pub fn encode_literal(out: &mut Vec<u8>, len: u64) {
    let (op, width) = command::literal_op(len);
    out.push(op);
    netint::put_uint(out, len, width);
}

/// Append a copy command.
pub fn encode_copy(out: &mut Vec<u8>, offset: u64, len: u64) {
    let (op, w1, w2) = command::copy_op(offset, len);
    out.push(op);
    netint::put_uint(out, offset, w1);
    netint::put_uint(out, len, w2);
}

pub fn encode_end(out: &mut Vec<u8>) {
    out.push(OP_END);
}

/// Append the trailer carrying the whole-output digest.
pub fn encode_trailer(out: &mut Vec<u8>, digest: &StrongSum) {
    debug_assert_eq!(digest.len(), TRAILER_DIGEST_LEN);
    out.push(TRAILER_DIGEST_LEN as u8);
    out.extend_from_slice(digest.as_slice());
}

/// Check the 4-byte delta magic.
pub fn check_magic(data: &[u8]) -> Result<()> {
    match netint::get_u32(data) {
        Some(DELTA_MAGIC) => Ok(()),
        Some(magic) => Err(Error::malformed_delta(format!(
            "bad magic {magic:#010x}"
        ))),
        None => Err(Error::malformed_delta("truncated header")),
    }
}

/// Parse the command header at the front of `data`.
///
/// Returns `Ok(None)` when more bytes are needed, otherwise the command and
/// the number of header bytes it occupies. Unknown opcodes are rejected.
pub fn parse_command(data: &[u8]) -> Result<Option<(Command, usize)>> {
    let Some(&op) = data.first() else {
        return Ok(None);
    };
    let entry = command::lookup(op)
        .ok_or_else(|| Error::malformed_delta(format!("unknown command {op:#04x}")))?;
    let need = entry.encoded_len();
    if data.len() < need {
        return Ok(None);
    }

    let p1 = &data[1..];
    let cmd = match entry.kind {
        CommandKind::End => Command::End,
        CommandKind::Literal if entry.immediate > 0 => Command::Literal {
            len: u64::from(entry.immediate),
        },
        CommandKind::Literal => Command::Literal {
            len: read_param(p1, entry.len_1)?,
        },
        CommandKind::Copy => Command::Copy {
            offset: read_param(p1, entry.len_1)?,
            len: read_param(&p1[entry.len_1 as usize..], entry.len_2)?,
        },
    };
    Ok(Some((cmd, need)))
}

fn read_param(data: &[u8], width: u8) -> Result<u64> {
    netint::get_uint(data, width as usize)
        .ok_or_else(|| Error::malformed_delta("truncated command parameter"))
}

/// Iterator over the instructions of a complete in-memory delta.
///
/// Yields instructions up to and including `End`; the trailer (if any) is
/// available from [`trailer`](Self::trailer) once `End` has been seen.
pub struct InstructionIter<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
    failed: bool,
}

impl<'a> InstructionIter<'a> {
    /// Validate the magic and start iterating.
    pub fn new(delta: &'a [u8]) -> Result<Self> {
        check_magic(delta)?;
        Ok(Self {
            data: delta,
            pos: DELTA_HEADER_LEN,
            done: false,
            failed: false,
        })
    }

    /// The trailer digest, once `End` has been reached.
    ///
    /// `Ok(None)` means the delta ends right after `End`.
    pub fn trailer(&self) -> Result<Option<StrongSum>> {
        if !self.done {
            return Err(Error::malformed_delta("trailer requested before END"));
        }
        let rest = &self.data[self.pos..];
        match rest {
            [] => Ok(None),
            [len, digest @ ..] if *len as usize == TRAILER_DIGEST_LEN => {
                if digest.len() == TRAILER_DIGEST_LEN {
                    Ok(Some(StrongSum::from_slice(digest)))
                } else if digest.len() < TRAILER_DIGEST_LEN {
                    Err(Error::malformed_delta("truncated trailer"))
                } else {
                    Err(Error::malformed_delta("trailing bytes after trailer"))
                }
            }
            [len, ..] => Err(Error::malformed_delta(format!(
                "bad trailer length {len}"
            ))),
        }
    }

    fn next_instruction(&mut self) -> Result<Instruction<'a>> {
        let rest = &self.data[self.pos..];
        let Some((cmd, used)) = parse_command(rest)? else {
            return Err(Error::malformed_delta("truncated command"));
        };
        self.pos += used;
        match cmd {
            Command::End => {
                self.done = true;
                Ok(Instruction::End)
            }
            Command::Copy { offset, len } => Ok(Instruction::Copy { offset, len }),
            Command::Literal { len } => {
                let available = (self.data.len() - self.pos) as u64;
                if len > available {
                    return Err(Error::malformed_delta("truncated literal"));
                }
                let start = self.pos;
                self.pos += len as usize;
                Ok(Instruction::Literal(&self.data[start..self.pos]))
            }
        }
    }
}

impl<'a> Iterator for InstructionIter<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.failed {
            return None;
        }
        let item = self.next_instruction();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `rdiff delta` of "this is another string to be tested" against the
    // signature of "this is a string to be tested" (-b 10 -S 5).
    const RDIFF_DELTA: [u8; 26] = [
        0x72, 0x73, 0x02, 0x36, 0x41, 0x10, 0x74, 0x68, 0x69, 0x73, 0x20, 0x69, 0x73, 0x20, 0x61,
        0x6e, 0x6f, 0x74, 0x68, 0x65, 0x72, 0x20, 0x45, 0x0a, 0x13, 0x00,
    ];

    #[test]
    fn decodes_rdiff_delta() {
        let mut it = InstructionIter::new(&RDIFF_DELTA).unwrap();
        assert_eq!(
            it.next().unwrap().unwrap(),
            Instruction::Literal(b"this is another ")
        );
        assert_eq!(
            it.next().unwrap().unwrap(),
            Instruction::Copy { offset: 10, len: 19 }
        );
        assert_eq!(it.next().unwrap().unwrap(), Instruction::End);
        assert!(it.next().is_none());
        assert_eq!(it.trailer().unwrap(), None);
    }

    #[test]
    fn encodes_rdiff_delta() {
        let mut out = Vec::new();
        encode_magic(&mut out);
        encode_literal(&mut out, 16);
        out.extend_from_slice(b"this is another ");
        encode_copy(&mut out, 10, 19);
        encode_end(&mut out);
        assert_eq!(out, RDIFF_DELTA);
    }

    #[test]
    fn immediate_literals_decode() {
        let (cmd, used) = parse_command(&[0x03, b'a', b'b', b'c']).unwrap().unwrap();
        assert_eq!(cmd, Command::Literal { len: 3 });
        assert_eq!(used, 1);
    }

    #[test]
    fn partial_header_needs_more() {
        let mut out = Vec::new();
        encode_copy(&mut out, 1 << 40, 70_000);
        for cut in 0..out.len() {
            assert!(parse_command(&out[..cut]).unwrap().is_none(), "cut {cut}");
        }
        let (cmd, used) = parse_command(&out).unwrap().unwrap();
        assert_eq!(cmd, Command::Copy { offset: 1 << 40, len: 70_000 });
        assert_eq!(used, out.len());
    }

    #[test]
    fn rejects_reserved_opcode() {
        for op in [0x55u8, 0x80, 0xff] {
            let err = parse_command(&[op]).unwrap_err();
            assert!(matches!(err, Error::MalformedDelta(_)));
        }
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(matches!(
            InstructionIter::new(&[0x72, 0x73, 0x01, 0x36]),
            Err(Error::MalformedDelta(_))
        ));
        assert!(matches!(
            InstructionIter::new(&[0x72, 0x73]),
            Err(Error::MalformedDelta(_))
        ));
    }

    #[test]
    fn truncated_literal_is_an_error() {
        let mut out = Vec::new();
        encode_magic(&mut out);
        encode_literal(&mut out, 10);
        out.extend_from_slice(b"short");
        let results: Vec<_> = InstructionIter::new(&out).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::MalformedDelta(_))));
    }

    #[test]
    fn trailer_is_exposed() {
        let digest = strong::strong_sum(TRAILER_KIND, b"output", TRAILER_DIGEST_LEN);
        let mut out = Vec::new();
        encode_magic(&mut out);
        encode_end(&mut out);
        encode_trailer(&mut out, &digest);
        let mut it = InstructionIter::new(&out).unwrap();
        assert!(it.trailer().is_err());
        assert_eq!(it.next().unwrap().unwrap(), Instruction::End);
        assert_eq!(it.trailer().unwrap(), Some(digest));

        out.push(0);
        let mut it = InstructionIter::new(&out).unwrap();
        it.next();
        assert!(it.trailer().is_err());
    }
}
