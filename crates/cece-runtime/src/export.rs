//! Snapshot sinks for per-tick data export.
//!
//! The colony hands a [`ColonySnapshot`] to a sink after every tick of
//! [`Colony::run_with_sink`](crate::colony::Colony::run_with_sink). Sinks
//! run outside the tick, so they never observe a half-applied drain.

use crate::colony::ColonySnapshot;
use cece_core::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Consumer of per-tick snapshots.
pub trait SnapshotSink {
    fn record(&mut self, snapshot: &ColonySnapshot) -> Result<()>;

    /// Flush whatever is buffered. Called once after the last tick.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Column header written by [`CsvSink`].
pub const CSV_HEADER: &str = "tick,id,parent,x,y,z,volume,gfp,rfp,yfp,has_bud";

/// One CSV row per cell per tick, buds included with their parent id.
pub struct CsvSink<W: Write> {
    writer: BufWriter<W>,
    header_written: bool,
    rows: usize,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            header_written: false,
            rows: 0,
        }
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

impl<W: Write> SnapshotSink for CsvSink<W> {
    fn record(&mut self, snapshot: &ColonySnapshot) -> Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }
        for cell in snapshot.all_cells() {
            let parent = cell.parent.map(|p| p.0.to_string()).unwrap_or_default();
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{},{}",
                snapshot.tick,
                cell.id.0,
                parent,
                cell.position.x,
                cell.position.y,
                cell.position.z,
                cell.volume,
                cell.fluorescence.gfp,
                cell.fluorescence.rfp,
                cell.fluorescence.yfp,
                u8::from(cell.has_bud()),
            )?;
            self.rows += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON-serialized snapshot per line.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
}

impl JsonLinesSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn record(&mut self, snapshot: &ColonySnapshot) -> Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub snapshots: Vec<ColonySnapshot>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotSink for MemorySink {
    fn record(&mut self, snapshot: &ColonySnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::Colony;
    use cece_core::prelude::*;

    fn budding_colony() -> Colony {
        let mut colony = Colony::new();
        colony.create(
            CellConfig::at(1.0, 2.0, 0.0).volume(100.0).gfp(4.0),
            |cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
                if !cell.is_bud() {
                    cell.bud_create();
                }
            },
        );
        colony
    }

    #[test]
    fn csv_rows_include_buds() {
        let mut colony = budding_colony();
        let mut sink = CsvSink::new(Vec::new());
        colony.run_with_sink(2, &mut sink).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.rows(), 4);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,0,,1,2,0,100,4,0,0,1"));
        assert!(lines[2].starts_with("1,1,0,"));
        assert!(lines[2].ends_with(",0"));
    }

    #[test]
    fn json_lines_parse_back() {
        let mut colony = budding_colony();
        let mut sink = JsonLinesSink::new(Vec::new());
        colony.run_with_sink(3, &mut sink).unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let snapshots: Vec<ColonySnapshot> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[2].tick, 3);
        assert_eq!(snapshots[2].all_cells().count(), 2);
    }

    #[test]
    fn memory_sink_keeps_every_tick() {
        let mut colony = budding_colony();
        let mut sink = MemorySink::new();
        colony.run_with_sink(4, &mut sink).unwrap();
        let ticks: Vec<Tick> = sink.snapshots.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![1, 2, 3, 4]);
    }
}
