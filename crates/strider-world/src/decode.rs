use bytes::{Buf, BytesMut};
use strider_protocol_core::{read_varint, CodecError};

/// Number of vertical sections parsed from a chunk column (world_height / 16).
pub const DEFAULT_SECTION_COUNT: usize = 24;
/// Lowest section's world-y origin (`min_y / 16`).
pub const DEFAULT_MIN_SECTION_Y: i32 = -4;

/// A single 16x16x16 chunk section as received on the wire.
///
/// The bit-packed block/biome entries themselves are not materialized — only the
/// palette and shape are kept, since no consumer in this bot needs to look a specific
/// block state up by local coordinate.
#[derive(Debug, Clone, Default)]
pub struct ChunkSection {
    pub block_count: i16,
    pub bits_per_entry: u8,
    pub palette: Vec<i32>,
    pub data_array_len: usize,
}

/// Skip over one paletted container (blocks or biomes) and return its shape.
///
/// `indirect_threshold` is the highest `bits_per_entry` that still uses an explicit
/// palette: 8 for block states, 3 for biomes.
fn parse_paletted_container(
    buf: &mut BytesMut,
    bits_per_entry: u8,
    indirect_threshold: u8,
) -> Result<(Vec<i32>, usize), CodecError> {
    if bits_per_entry == 0 {
        let single = read_varint(buf)?;
        let data_len = read_varint(buf)? as usize;
        skip_longs(buf, data_len)?;
        Ok((vec![single], data_len))
    } else if bits_per_entry <= indirect_threshold {
        let palette_len = read_varint(buf)? as usize;
        let mut palette = Vec::with_capacity(palette_len);
        for _ in 0..palette_len {
            palette.push(read_varint(buf)?);
        }
        let data_len = read_varint(buf)? as usize;
        skip_longs(buf, data_len)?;
        Ok((palette, data_len))
    } else {
        let data_len = read_varint(buf)? as usize;
        skip_longs(buf, data_len)?;
        Ok((Vec::new(), data_len))
    }
}

fn skip_longs(buf: &mut BytesMut, count: usize) -> Result<(), CodecError> {
    let bytes_needed = count.saturating_mul(8);
    if buf.remaining() < bytes_needed {
        return Err(CodecError::NotEnoughData);
    }
    buf.advance(bytes_needed);
    Ok(())
}

/// Parse as many sections as fit in `data`, stopping early (without erroring) on the
/// first malformed or truncated section.
///
/// This mirrors the reference bot's per-section try/except: a server that sends a
/// slightly malformed tail section should not cost the whole chunk.
pub fn parse_chunk_sections(data: &[u8], section_count: usize) -> Vec<ChunkSection> {
    let mut buf = BytesMut::from(data);
    let mut sections = Vec::with_capacity(section_count);

    for _ in 0..section_count {
        match parse_one_section(&mut buf) {
            Ok(section) => sections.push(section),
            Err(_) => break,
        }
    }

    sections
}

fn parse_one_section(buf: &mut BytesMut) -> Result<ChunkSection, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::NotEnoughData);
    }
    let block_count = buf.get_i16();
    let bits_per_entry = buf.get_u8();
    let (palette, data_array_len) = parse_paletted_container(buf, bits_per_entry, 8)?;

    if buf.remaining() < 1 {
        return Err(CodecError::NotEnoughData);
    }
    let _biome_bits = buf.get_u8();
    parse_paletted_container(buf, _biome_bits, 3)?;

    Ok(ChunkSection {
        block_count,
        bits_per_entry,
        palette,
        data_array_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use strider_protocol_core::write_varint;

    fn single_value_section(block_state: i32, biome: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i16(0);
        buf.put_u8(0);
        write_varint(&mut buf, block_state);
        write_varint(&mut buf, 0);
        buf.put_u8(0);
        write_varint(&mut buf, biome);
        write_varint(&mut buf, 0);
        buf.to_vec()
    }

    #[test]
    fn parses_single_value_section() {
        let data = single_value_section(0, 0);
        let sections = parse_chunk_sections(&data, 1);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].palette, vec![0]);
        assert_eq!(sections[0].bits_per_entry, 0);
    }

    #[test]
    fn stops_leniently_on_truncated_trailing_section() {
        let mut data = single_value_section(1, 0);
        data.extend_from_slice(&single_value_section(2, 0));
        data.truncate(data.len() - 2); // corrupt the second section's tail
        let sections = parse_chunk_sections(&data, 2);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].palette, vec![1]);
    }

    #[test]
    fn parses_indirect_palette_section() {
        let mut buf = BytesMut::new();
        buf.put_i16(10);
        buf.put_u8(4); // indirect, <=8
        write_varint(&mut buf, 2); // palette length
        write_varint(&mut buf, 0);
        write_varint(&mut buf, 5);
        write_varint(&mut buf, 1); // data array length (longs)
        buf.put_i64(0);
        buf.put_u8(0);
        write_varint(&mut buf, 0);
        write_varint(&mut buf, 0);

        let sections = parse_chunk_sections(&buf, 1);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].palette, vec![0, 5]);
        assert_eq!(sections[0].data_array_len, 1);
    }

    #[test]
    fn empty_data_yields_zero_sections() {
        let sections = parse_chunk_sections(&[], 24);
        assert!(sections.is_empty());
    }
}
