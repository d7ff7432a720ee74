//! SHP sprite container layout.
//!
//! ```text
//! header      14 bytes   frame count, 0, 0, width, height (u16 each), 0 (u32)
//! table       8 bytes per frame, then an end-of-data entry and an all-zero entry
//! payload     compressed frames back to back, in table order
//! ```
//!
//! Each table entry holds a 24-bit absolute file offset with the frame format
//! in the top byte, followed by two reserved 16-bit fields.

use std::io::{self, Read, Write};

use crate::lcw::lcw_decode;
use crate::{Result, ShpError};

/// Offsets share a 32-bit word with the format tag.
const MAX_OFFSET: usize = 0x00FF_FFFF;

/// Frame encodings found in SHP frame tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameFormat {
    /// End-of-table marker.
    Null = 0x00,
    /// XOR delta against the previous frame.
    XorPrevious = 0x20,
    /// XOR delta against a referenced LCW frame.
    XorReference = 0x40,
    /// LCW-compressed frame.
    Lcw = 0x80,
}

impl FrameFormat {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(FrameFormat::Null),
            0x20 => Some(FrameFormat::XorPrevious),
            0x40 => Some(FrameFormat::XorReference),
            0x80 => Some(FrameFormat::Lcw),
            _ => None,
        }
    }
}

/// SHP file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShpHeader {
    pub frame_count: u16,
    pub width: u16,
    pub height: u16,
}

impl ShpHeader {
    /// Size of header in bytes.
    /// FrameCount(2) + Reserved(2) + Reserved(2) + Width(2) + Height(2) + Reserved(4) = 14
    pub const SIZE: usize = 14;

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.frame_count.to_le_bytes())?;
        w.write_all(&[0u8; 4])?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&[0u8; 4])?;
        Ok(())
    }

    /// Read header from input. Reserved fields are skipped.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; Self::SIZE];
        r.read_exact(&mut buf)?;

        Ok(Self {
            frame_count: u16::from_le_bytes([buf[0], buf[1]]),
            width: u16::from_le_bytes([buf[6], buf[7]]),
            height: u16::from_le_bytes([buf[8], buf[9]]),
        })
    }

    /// Size of the frame table, including the two trailing entries.
    pub fn table_size(&self) -> usize {
        (self.frame_count as usize + 2) * FrameDescriptor::SIZE
    }

    /// Absolute offset of the first frame's data.
    pub fn data_offset(&self) -> usize {
        Self::SIZE + self.table_size()
    }

    /// Pixels in one decoded frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One entry of the frame table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDescriptor {
    /// Absolute file offset of the frame data (24 bits).
    pub offset: u32,
    /// Raw format tag, see [`FrameFormat`].
    pub format: u8,
    /// Reference frame offset for XOR formats.
    pub ref_offset: u16,
    /// Reference frame format for XOR formats.
    pub ref_format: u16,
}

impl FrameDescriptor {
    /// Size of one table entry in bytes.
    pub const SIZE: usize = 8;

    /// Entry for an LCW frame starting at `offset`.
    pub fn lcw(offset: u32) -> Self {
        Self {
            offset,
            format: FrameFormat::Lcw as u8,
            ..Default::default()
        }
    }

    /// Entry marking the end of frame data at `offset`.
    pub fn end(offset: u32) -> Self {
        Self {
            offset,
            format: FrameFormat::Null as u8,
            ..Default::default()
        }
    }

    /// Decoded format tag, if it is one this crate knows.
    pub fn frame_format(&self) -> Option<FrameFormat> {
        FrameFormat::from_u8(self.format)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let word = (self.offset & MAX_OFFSET as u32) | ((self.format as u32) << 24);
        w.write_all(&word.to_le_bytes())?;
        w.write_all(&self.ref_offset.to_le_bytes())?;
        w.write_all(&self.ref_format.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; Self::SIZE];
        r.read_exact(&mut buf)?;

        let word = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        Ok(Self {
            offset: word & MAX_OFFSET as u32,
            format: (word >> 24) as u8,
            ref_offset: u16::from_le_bytes([buf[4], buf[5]]),
            ref_format: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }
}

/// Writes already compressed LCW frames as an SHP container.
///
/// The container does no compression of its own. Frame offsets are assigned in
/// order starting right after the frame table. Fails with
/// [`ShpError::ContainerTooLarge`] if there are more than 65535 frames or the
/// data would end beyond the 24-bit offset range.
pub fn write_shp<W, F>(w: &mut W, frames: &[F], width: u16, height: u16) -> Result<()>
where
    W: Write,
    F: AsRef<[u8]>,
{
    let frame_count = u16::try_from(frames.len()).map_err(|_| ShpError::ContainerTooLarge)?;
    let header = ShpHeader {
        frame_count,
        width,
        height,
    };

    let mut offsets = Vec::with_capacity(frames.len() + 1);
    let mut offset = header.data_offset();
    for frame in frames {
        offsets.push(offset);
        offset += frame.as_ref().len();
    }
    offsets.push(offset);
    if offset > MAX_OFFSET {
        return Err(ShpError::ContainerTooLarge);
    }

    header.write_to(w)?;
    for &start in &offsets[..frames.len()] {
        FrameDescriptor::lcw(start as u32).write_to(w)?;
    }
    FrameDescriptor::end(offset as u32).write_to(w)?;
    FrameDescriptor::default().write_to(w)?;

    for frame in frames {
        w.write_all(frame.as_ref())?;
    }

    log::debug!("shp: {} frames of {}x{}, {} bytes", frames.len(), width, height, offset);
    Ok(())
}

/// Convenience wrapper around [`write_shp`] producing an in-memory buffer.
pub fn write_shp_to_vec<F: AsRef<[u8]>>(frames: &[F], width: u16, height: u16) -> Result<Vec<u8>> {
    let table = (frames.len() + 2) * FrameDescriptor::SIZE;
    let payload: usize = frames.iter().map(|f| f.as_ref().len()).sum();
    let mut out = Vec::with_capacity(ShpHeader::SIZE + table + payload);
    write_shp(&mut out, frames, width, height)?;
    Ok(out)
}

/// A parsed SHP container borrowing the file bytes.
#[derive(Debug, Clone)]
pub struct ShpFile<'a> {
    data: &'a [u8],
    header: ShpHeader,
    table: Vec<FrameDescriptor>,
}

impl<'a> ShpFile<'a> {
    /// Parses the header and frame table and validates the frame offsets.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut reader = data;
        let header = ShpHeader::read_from(&mut reader).map_err(|_| {
            ShpError::InvalidContainer(format!("{} bytes is too short for a header", data.len()))
        })?;

        let entries = header.frame_count as usize + 2;
        let mut table = Vec::with_capacity(entries);
        for i in 0..entries {
            let descriptor = FrameDescriptor::read_from(&mut reader).map_err(|_| {
                ShpError::InvalidContainer(format!("frame table truncated at entry {i}"))
            })?;
            table.push(descriptor);
        }

        // the trailing all-zero entry carries no offset
        let mut previous = header.data_offset();
        for (i, descriptor) in table[..entries - 1].iter().enumerate() {
            let offset = descriptor.offset as usize;
            if offset < previous || offset > data.len() {
                return Err(ShpError::InvalidContainer(format!(
                    "entry {} points at offset {} outside {}..={}",
                    i,
                    offset,
                    previous,
                    data.len()
                )));
            }
            previous = offset;
        }

        Ok(Self {
            data,
            header,
            table,
        })
    }

    #[inline]
    pub fn header(&self) -> &ShpHeader {
        &self.header
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.header.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.header.height
    }

    /// Table entry of frame `index`.
    pub fn descriptor(&self, index: usize) -> Result<&FrameDescriptor> {
        if index >= self.frame_count() {
            return Err(ShpError::InvalidContainer(format!(
                "frame {} out of range (0..{})",
                index,
                self.frame_count()
            )));
        }
        Ok(&self.table[index])
    }

    /// Compressed bytes of frame `index`, up to the start of the next entry.
    pub fn frame_data(&self, index: usize) -> Result<&'a [u8]> {
        let start = self.descriptor(index)?.offset as usize;
        let end = self.table[index + 1].offset as usize;
        Ok(&self.data[start..end])
    }

    /// Decompresses frame `index` into `width * height` palette indices.
    pub fn decode_frame(&self, index: usize) -> Result<Vec<u8>> {
        let descriptor = self.descriptor(index)?;
        if descriptor.frame_format() != Some(FrameFormat::Lcw) {
            return Err(ShpError::UnsupportedFormat(descriptor.format));
        }

        let expected = self.header.frame_len();
        let mut pixels = vec![0u8; expected];
        let written = lcw_decode(self.frame_data(index)?, &mut pixels)?;
        if written != expected {
            return Err(ShpError::CorruptStream(format!(
                "frame {index} decodes to {written} bytes, expected {expected}"
            )));
        }
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout() {
        let header = ShpHeader {
            frame_count: 3,
            width: 0x0102,
            height: 0x0304,
        };
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        assert_eq!(out, vec![3, 0, 0, 0, 0, 0, 0x02, 0x01, 0x04, 0x03, 0, 0, 0, 0]);
        assert_eq!(ShpHeader::read_from(&mut out.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_descriptor_layout() {
        let mut out = Vec::new();
        FrameDescriptor::lcw(0x012345).write_to(&mut out).unwrap();
        assert_eq!(out, vec![0x45, 0x23, 0x01, 0x80, 0, 0, 0, 0]);

        let parsed = FrameDescriptor::read_from(&mut out.as_slice()).unwrap();
        assert_eq!(parsed.offset, 0x012345);
        assert_eq!(parsed.frame_format(), Some(FrameFormat::Lcw));
    }

    #[test]
    fn test_empty_container() {
        let out = write_shp_to_vec::<Vec<u8>>(&[], 4, 4).unwrap();
        assert_eq!(out.len(), 14 + 16);
        // end-of-data entry points right after the table
        assert_eq!(&out[14..18], &[30, 0, 0, 0]);
        assert_eq!(&out[22..30], &[0u8; 8]);

        let shp = ShpFile::parse(&out).unwrap();
        assert_eq!(shp.frame_count(), 0);
    }

    #[test]
    fn test_offset_limit() {
        let big = vec![0u8; MAX_OFFSET];
        assert!(matches!(
            write_shp_to_vec(&[big], 1, 1),
            Err(ShpError::ContainerTooLarge)
        ));
    }

    #[test]
    fn test_parse_rejects_truncated_table() {
        let out = write_shp_to_vec(&[vec![0x80u8]], 1, 1).unwrap();
        assert!(matches!(
            ShpFile::parse(&out[..20]),
            Err(ShpError::InvalidContainer(_))
        ));
        assert!(matches!(
            ShpFile::parse(&out[..10]),
            Err(ShpError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_parse_rejects_offsets_past_end() {
        let out = write_shp_to_vec(&[vec![0x81u8, 7, 0x80]], 1, 1).unwrap();
        assert!(matches!(
            ShpFile::parse(&out[..out.len() - 1]),
            Err(ShpError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_parse_rejects_offsets_inside_table() {
        let mut out = write_shp_to_vec(&[vec![0x80u8]], 1, 1).unwrap();
        assert_eq!(ShpHeader::SIZE + 3 * FrameDescriptor::SIZE, 38);
        // frame 0 pointing into the trailing all-zero entry
        out[14] = 30;
        assert!(matches!(ShpFile::parse(&out), Err(ShpError::InvalidContainer(_))));
        out[14] = 37;
        assert!(matches!(ShpFile::parse(&out), Err(ShpError::InvalidContainer(_))));
        out[14] = 38;
        let shp = ShpFile::parse(&out).unwrap();
        assert_eq!(shp.frame_data(0).unwrap(), &[0x80]);
    }

    #[test]
    fn test_parse_requires_trailing_entry() {
        let out = write_shp_to_vec(&[vec![0x80u8]], 1, 1).unwrap();
        // header plus frame and end-of-data entries, zero entry missing
        assert!(matches!(ShpFile::parse(&out[..30]), Err(ShpError::InvalidContainer(_))));
    }

    #[test]
    fn test_decode_frame() {
        let out = write_shp_to_vec(&[vec![0x82u8, 7, 8, 0x80]], 2, 1).unwrap();
        let shp = ShpFile::parse(&out).unwrap();
        assert_eq!(shp.frame_data(0).unwrap(), &[0x82, 7, 8, 0x80]);
        assert_eq!(shp.decode_frame(0).unwrap(), vec![7, 8]);
        assert!(shp.decode_frame(1).is_err());
    }

    #[test]
    fn test_decode_short_frame_is_corrupt() {
        let out = write_shp_to_vec(&[vec![0x81u8, 7, 0x80]], 2, 1).unwrap();
        let shp = ShpFile::parse(&out).unwrap();
        assert!(matches!(shp.decode_frame(0), Err(ShpError::CorruptStream(_))));
    }

    #[test]
    fn test_xor_frames_unsupported() {
        let mut out = write_shp_to_vec(&[vec![0x80u8]], 1, 1).unwrap();
        out[17] = FrameFormat::XorPrevious as u8;
        let shp = ShpFile::parse(&out).unwrap();
        assert!(matches!(
            shp.decode_frame(0),
            Err(ShpError::UnsupportedFormat(0x20))
        ));
    }
}
