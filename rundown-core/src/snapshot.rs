//! Binary snapshot of a published effective-item table
//!
//! Presentation consumers running out of process read the table from this
//! little-endian format. Lines are written in sorted id order so equal tables
//! produce identical bytes.

use crate::{EffectiveItem, EffectiveTable, EffectiveWindow, Error, InfiniteMode, LineEffects, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Magic bytes for the snapshot format: "RDNS"
const MAGIC: [u8; 4] = [b'R', b'D', b'N', b'S'];

/// Current snapshot format version
const VERSION: u16 = 1;

/// Snapshot file header
#[derive(Debug, Clone)]
pub struct SnapshotHeader {
    /// Format version
    pub version: u16,
    /// Version of the effective table that was captured
    pub table_version: u64,
    /// Number of lines
    pub num_lines: u32,
}

impl SnapshotHeader {
    /// Creates a new snapshot header
    pub fn new(table_version: u64, num_lines: u32) -> Self {
        Self {
            version: VERSION,
            table_version,
            num_lines,
        }
    }

    /// Reads a header from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let table_version = reader.read_u64::<LittleEndian>()?;
        let num_lines = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            version,
            table_version,
            num_lines,
        })
    }

    /// Writes the header to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u64::<LittleEndian>(self.table_version)?;
        writer.write_u32::<LittleEndian>(self.num_lines)?;
        Ok(())
    }
}

/// Complete snapshot: header plus table
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub header: SnapshotHeader,
    pub table: EffectiveTable,
}

impl Snapshot {
    /// Captures a table
    pub fn new(table: EffectiveTable) -> Result<Self> {
        let header = SnapshotHeader::new(table.version(), len_u32(table.len(), "line")?);
        Ok(Self { header, table })
    }

    /// Reads a snapshot from a reader
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let header = SnapshotHeader::read(&mut reader)?;

        let mut table = EffectiveTable::new();
        table.version = header.table_version;
        for _ in 0..header.num_lines {
            let line_id = read_str(&mut reader)?;
            let num_layers = reader.read_u32::<LittleEndian>()?;

            let mut effects = LineEffects::new();
            for _ in 0..num_layers {
                let layer = read_str(&mut reader)?;
                let effect = match reader.read_u8()? {
                    0 => None,
                    1 => Some(read_effect(&mut reader)?),
                    tag => {
                        return Err(Error::InvalidSnapshotEntry(format!(
                            "line {line_id} layer {layer}: bad presence tag {tag}"
                        )))
                    }
                };
                effects.insert(layer.into(), effect);
            }
            table.set_line(line_id.into(), effects);
        }

        Ok(Self { header, table })
    }

    /// Writes the snapshot to a writer
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        self.header.write(&mut writer)?;

        for line_id in self.table.line_ids() {
            let Some(effects) = self.table.line(line_id) else {
                continue;
            };
            write_str(&mut writer, line_id.as_str())?;
            writer.write_u32::<LittleEndian>(len_u32(effects.len(), "layer")?)?;
            for (layer, effect) in effects.iter() {
                write_str(&mut writer, layer.as_str())?;
                match effect {
                    None => writer.write_u8(0)?,
                    Some(effect) => {
                        writer.write_u8(1)?;
                        write_effect(&mut writer, effect)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Number of lines with at least one item in effect
    pub fn active_lines(&self) -> usize {
        self.table
            .line_ids()
            .into_iter()
            .filter_map(|id| self.table.line(id))
            .filter(|effects| effects.active_count() > 0)
            .count()
    }
}

fn read_effect<R: Read>(reader: &mut R) -> Result<EffectiveItem> {
    let origin = read_str(reader)?;
    let origin_line = read_str(reader)?;
    let code = reader.read_u8()?;
    let mode = InfiniteMode::from_code(code)
        .ok_or_else(|| Error::InvalidSnapshotEntry(format!("item {origin}: unknown infinite mode {code}")))?;
    let is_continuation = reader.read_u8()? != 0;
    let elapsed_ms = reader.read_u64::<LittleEndian>()?;
    let duration_ms = match reader.read_u8()? {
        0 => None,
        _ => Some(reader.read_i64::<LittleEndian>()?),
    };

    Ok(EffectiveItem {
        origin: origin.into(),
        origin_line: origin_line.into(),
        mode,
        is_continuation,
        window: EffectiveWindow {
            elapsed_ms,
            duration_ms,
        },
    })
}

fn write_effect<W: Write>(writer: &mut W, effect: &EffectiveItem) -> Result<()> {
    write_str(writer, effect.origin.as_str())?;
    write_str(writer, effect.origin_line.as_str())?;
    writer.write_u8(effect.mode.code())?;
    writer.write_u8(effect.is_continuation as u8)?;
    writer.write_u64::<LittleEndian>(effect.window.elapsed_ms)?;
    match effect.window.duration_ms {
        None => writer.write_u8(0)?,
        Some(duration) => {
            writer.write_u8(1)?;
            writer.write_i64::<LittleEndian>(duration)?;
        }
    }
    Ok(())
}

fn read_str<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    // Allocate only what the reader yields, not what the prefix claims
    let mut buf = Vec::new();
    reader.by_ref().take(u64::from(len)).read_to_end(&mut buf)?;
    if buf.len() != len as usize {
        return Err(Error::InvalidSnapshotEntry(format!(
            "identifier truncated: expected {len} bytes, found {}",
            buf.len()
        )));
    }
    String::from_utf8(buf).map_err(|e| Error::InvalidSnapshotEntry(format!("non-UTF-8 identifier: {e}")))
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(len_u32(s.len(), "identifier byte")?)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::InvalidSnapshotEntry(format!("{what} count {len} exceeds the format limit")))
}
