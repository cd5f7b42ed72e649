//! Waveform Trace Capture
//!
//! [`VcdTrace`] records every clock edge driven into the chip as a Value
//! Change Dump: the clock, bus and chip-select lines plus the chip's audio
//! output. Timestamps are in picoseconds, spread evenly over each chip cycle.

use crate::bus::{BusState, EdgeProbe, EDGES_PER_CYCLE};
use std::io::{self, Write};
use tracing::debug;

const CLK_ID: char = '!';
const BUS_ID: char = '"';
const CS_ID: char = '#';
const AUDIO_ID: char = '$';

/// Line values last written to the dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Levels {
    clk: bool,
    bus: u16,
    cs: u8,
    audio: u32,
}

impl Levels {
    fn new(state: &BusState, audio: i32) -> Self {
        Levels {
            clk: state.clk,
            bus: state.bus,
            cs: state.cs & 0x0F,
            audio: audio as u32 & 0x00FF_FFFF,
        }
    }
}

/// Value Change Dump writer
///
/// Write errors are held until [`finish`](EdgeProbe::finish); edges after
/// the first failure are dropped.
pub struct VcdTrace<W: Write> {
    writer: W,
    cycle_ps: f64,
    edges: u64,
    last: Option<Levels>,
    error: Option<io::Error>,
}

impl<W: Write> VcdTrace<W> {
    /// Start a dump for a chip clocked at `phi2_hz`
    pub fn new(mut writer: W, phi2_hz: u32) -> io::Result<Self> {
        write_header(&mut writer)?;
        Ok(VcdTrace {
            writer,
            cycle_ps: 1e12 / f64::from(phi2_hz),
            edges: 0,
            last: None,
            error: None,
        })
    }

    /// Edges recorded so far
    pub fn edges(&self) -> u64 {
        self.edges
    }

    /// Recover the destination
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn timestamp(&self) -> u64 {
        (self.edges as f64 * self.cycle_ps / EDGES_PER_CYCLE as f64).round() as u64
    }

    fn write_changes(&mut self, levels: Levels) -> io::Result<()> {
        let time = self.timestamp();
        let w = &mut self.writer;
        match self.last {
            None => {
                writeln!(w, "#{time}")?;
                writeln!(w, "$dumpvars")?;
                write_scalar(w, CLK_ID, levels.clk)?;
                write_vector(w, BUS_ID, u32::from(levels.bus), 16)?;
                write_vector(w, CS_ID, u32::from(levels.cs), 4)?;
                write_vector(w, AUDIO_ID, levels.audio, 24)?;
                writeln!(w, "$end")?;
            }
            Some(last) if last != levels => {
                writeln!(w, "#{time}")?;
                if last.clk != levels.clk {
                    write_scalar(w, CLK_ID, levels.clk)?;
                }
                if last.bus != levels.bus {
                    write_vector(w, BUS_ID, u32::from(levels.bus), 16)?;
                }
                if last.cs != levels.cs {
                    write_vector(w, CS_ID, u32::from(levels.cs), 4)?;
                }
                if last.audio != levels.audio {
                    write_vector(w, AUDIO_ID, levels.audio, 24)?;
                }
            }
            Some(_) => {}
        }
        self.last = Some(levels);
        Ok(())
    }
}

fn write_header<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(w, "$version {} {} $end", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
    writeln!(w, "$timescale 1ps $end")?;
    writeln!(w, "$scope module sid $end")?;
    writeln!(w, "$var wire 1 {CLK_ID} clk $end")?;
    writeln!(w, "$var wire 16 {BUS_ID} bus_i [15:0] $end")?;
    writeln!(w, "$var wire 4 {CS_ID} cs [3:0] $end")?;
    writeln!(w, "$var wire 24 {AUDIO_ID} audio_o [23:0] $end")?;
    writeln!(w, "$upscope $end")?;
    writeln!(w, "$enddefinitions $end")
}

fn write_scalar<W: Write>(w: &mut W, id: char, level: bool) -> io::Result<()> {
    writeln!(w, "{}{id}", u8::from(level))
}

fn write_vector<W: Write>(w: &mut W, id: char, value: u32, width: usize) -> io::Result<()> {
    writeln!(w, "b{value:0width$b} {id}")
}

impl<W: Write> EdgeProbe for VcdTrace<W> {
    fn edge(&mut self, state: &BusState, audio: i32) {
        if self.error.is_none() {
            if let Err(e) = self.write_changes(Levels::new(state, audio)) {
                self.error = Some(e);
            }
        }
        self.edges += 1;
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        writeln!(self.writer, "#{}", self.timestamp())?;
        self.writer.flush()?;
        debug!(edges = self.edges, "trace finished");
        Ok(())
    }
}
