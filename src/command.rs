//! Register Write Command Stream
//!
//! Reads whitespace-separated `<wait_cycles> <address> <value>` records.
//! Integers take C-style prefixes: `0x` for hexadecimal, a leading `0` for
//! octal, decimal otherwise, with an optional sign.
//!
//! End of input ends the stream. A record that does not parse also ends
//! it, with a warning, since the input is a machine-generated log.

use crate::Result;
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while};
use nom::character::complete::{char, digit1, hex_digit1, one_of};
use nom::combinator::{all_consuming, map_res, opt};
use nom::sequence::preceded;
use nom::IResult;
use std::collections::VecDeque;
use std::io::BufRead;
use tracing::{trace, warn};

/// Highest register address on the bus (5-bit address field)
pub const MAX_ADDRESS: u8 = 0x1F;

/// One timed register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Cycles to run before the write is latched
    pub wait_cycles: u32,
    /// Register address
    pub address: u8,
    /// Data byte
    pub value: u8,
}

impl RegisterWrite {
    pub fn new(wait_cycles: u32, address: u8, value: u8) -> Self {
        RegisterWrite {
            wait_cycles,
            address,
            value,
        }
    }
}

fn hexadecimal(input: &str) -> IResult<&str, i64> {
    map_res(preceded(tag_no_case("0x"), hex_digit1), |digits: &str| {
        i64::from_str_radix(digits, 16)
    })(input)
}

fn octal(input: &str) -> IResult<&str, i64> {
    map_res(
        preceded(char('0'), take_while(|c: char| ('0'..='7').contains(&c))),
        |digits: &str| {
            if digits.is_empty() {
                Ok(0)
            } else {
                i64::from_str_radix(digits, 8)
            }
        },
    )(input)
}

fn decimal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, str::parse::<i64>)(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, magnitude) = alt((hexadecimal, octal, decimal))(input)?;
    let value = if sign == Some('-') {
        -magnitude
    } else {
        magnitude
    };
    Ok((input, value))
}

/// Parse a single integer token with C-style base prefixes
pub fn parse_integer(token: &str) -> Option<i64> {
    all_consuming(integer)(token).ok().map(|(_, value)| value)
}

/// Build a write from three parsed fields, rejecting out-of-range values
fn record_from_fields(wait_cycles: i64, address: i64, value: i64) -> Option<RegisterWrite> {
    let wait_cycles = u32::try_from(wait_cycles).ok()?;
    let address = u8::try_from(address).ok().filter(|a| *a <= MAX_ADDRESS)?;
    let value = u8::try_from(value).ok()?;
    Some(RegisterWrite::new(wait_cycles, address, value))
}

/// Pull parser over a buffered reader
pub struct CommandStream<R: BufRead> {
    reader: R,
    tokens: VecDeque<String>,
    line: Vec<u8>,
    line_number: usize,
    records: u64,
    finished: bool,
    truncated: bool,
}

impl<R: BufRead> CommandStream<R> {
    pub fn new(reader: R) -> Self {
        CommandStream {
            reader,
            tokens: VecDeque::new(),
            line: Vec::new(),
            line_number: 0,
            records: 0,
            finished: false,
            truncated: false,
        }
    }

    /// Next record, or `None` at end of stream
    ///
    /// I/O failures are errors; malformed input ends the stream.
    pub fn next_record(&mut self) -> Result<Option<RegisterWrite>> {
        if self.finished {
            return Ok(None);
        }

        let mut fields = [0i64; 3];
        for (i, field) in fields.iter_mut().enumerate() {
            let Some(token) = self.next_token()? else {
                if i > 0 && !self.truncated {
                    warn!(
                        line = self.line_number,
                        "incomplete record at end of input, stopping"
                    );
                    self.truncated = true;
                }
                self.finished = true;
                return Ok(None);
            };
            match parse_integer(&token) {
                Some(value) => *field = value,
                None => {
                    self.stop_malformed(&token);
                    return Ok(None);
                }
            }
        }

        let [wait_cycles, address, value] = fields;
        let Some(record) = record_from_fields(wait_cycles, address, value) else {
            self.stop_malformed(&format!("{wait_cycles} {address} {value}"));
            return Ok(None);
        };

        self.records += 1;
        trace!(
            wait_cycles = record.wait_cycles,
            address = record.address,
            value = record.value,
            "record"
        );
        Ok(Some(record))
    }

    /// Records returned so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Whether the stream ended on malformed or incomplete input
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn stop_malformed(&mut self, text: &str) {
        warn!(
            line = self.line_number,
            input = text,
            "malformed record, stopping"
        );
        self.finished = true;
        self.truncated = true;
    }

    /// Next whitespace-separated token; a line that is not UTF-8 ends the stream
    fn next_token(&mut self) -> Result<Option<String>> {
        while self.tokens.is_empty() {
            if self.finished {
                return Ok(None);
            }
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            match std::str::from_utf8(&self.line) {
                Ok(text) => self
                    .tokens
                    .extend(text.split_whitespace().map(str::to_owned)),
                Err(_) => {
                    let text = String::from_utf8_lossy(&self.line).trim_end().to_owned();
                    self.stop_malformed(&text);
                    return Ok(None);
                }
            }
        }
        Ok(self.tokens.pop_front())
    }
}

impl<R: BufRead> Iterator for CommandStream<R> {
    type Item = Result<RegisterWrite>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
