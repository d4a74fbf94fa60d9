//! Line-oriented operator console: assemble a line, validate it as a duty
//! percentage, keep asking until one is accepted. Nothing here is reachable
//! from the tick path.

use core::fmt::{self, Write};

const BUFFER_SIZE: usize = 8;
const CR: u8 = '\r' as u8;
const LF: u8 = '\n' as u8;

/// Accumulates one console line, completed by CR or LF.
///
/// Empty lines complete nothing, so a CRLF pair fires once. Bytes past the
/// buffer end are dropped; a truncated number then fails the range check.
pub struct LineBuf {
    buffer: [u8; BUFFER_SIZE],
    pos: usize,
}

impl LineBuf {
    #[inline]
    pub const fn new() -> LineBuf {
        LineBuf {
            buffer: [0; BUFFER_SIZE],
            pos: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, b: u8) -> Option<&[u8]> {
        if b == CR || b == LF {
            if self.pos == 0 {
                None
            } else {
                let result = &self.buffer[0..self.pos];
                self.pos = 0;
                Some(result)
            }
        } else {
            if self.pos < BUFFER_SIZE {
                self.buffer[self.pos] = b;
                self.pos += 1;
            }
            None
        }
    }
}

/// Why a line was not a duty percentage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParseError {
    NotANumber,
    OutOfRange,
}

/// Validate one line as an integer percentage in `0..=100`.
///
/// Surrounding blanks are tolerated, everything else must be a digit.
pub fn parse_percent(line: &[u8]) -> Result<u8, ParseError> {
    let mut s = line;
    while let Some((&b, rest)) = s.split_first() {
        if b == b' ' || b == b'\t' {
            s = rest;
        } else {
            break;
        }
    }
    while let Some((&b, rest)) = s.split_last() {
        if b == b' ' || b == b'\t' {
            s = rest;
        } else {
            break;
        }
    }
    if s.is_empty() {
        return Err(ParseError::NotANumber);
    }
    let mut value: u32 = 0;
    for &b in s {
        if !b.is_ascii_digit() {
            return Err(ParseError::NotANumber);
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as u32);
    }
    if value > 100 {
        Err(ParseError::OutOfRange)
    } else {
        Ok(value as u8)
    }
}

/// Blocking prompt session over a serial pair.
///
/// TX failures are swallowed -- losing a console character must never take
/// the firmware down. RX line errors drop the byte and keep reading.
pub struct Console<TX, RX> {
    tx: TX,
    rx: RX,
    line: LineBuf,
}

impl<TX, RX> Console<TX, RX>
where
    TX: ehal::serial::Write<u8>,
    RX: ehal::serial::Read<u8>,
{
    pub fn new(tx: TX, rx: RX) -> Self {
        Console {
            tx,
            rx,
            line: LineBuf::new(),
        }
    }

    fn putb(&mut self, b: u8) {
        let _ = nb::block!(self.tx.write(b));
    }

    fn read_byte(&mut self) -> u8 {
        loop {
            match nb::block!(self.rx.read()) {
                Ok(b) => return b,
                Err(_) => {}
            }
        }
    }

    /// Print `prompt` and keep reading lines until one parses as a
    /// percentage; echoes printable input and answers bad lines with the
    /// matching complaint.
    pub fn prompt_percent(&mut self, prompt: &str) -> u8 {
        loop {
            let _ = write!(self, "{}\r\n", prompt);
            let parsed = loop {
                let b = self.read_byte();
                if b.is_ascii_graphic() || b == b' ' {
                    self.putb(b);
                }
                if let Some(word) = self.line.push(b) {
                    break parse_percent(word);
                }
            };
            let _ = self.write_str("\r\n");
            match parsed {
                Ok(percent) => return percent,
                Err(ParseError::OutOfRange) => {
                    let _ = self.write_str("This is not a number within the acceptable range.\r\n");
                }
                Err(ParseError::NotANumber) => {
                    let _ = self.write_str("This is a character. Please enter a number.\r\n");
                }
            }
        }
    }
}

impl<TX, RX> fmt::Write for Console<TX, RX>
where
    TX: ehal::serial::Write<u8>,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            let _ = nb::block!(self.tx.write(b));
        }
        match self.tx.flush() {
            Ok(_) => {}
            Err(_) => {}
        };
        Ok(())
    }
}
