//! LCW ("Format80") compression.
//!
//! An LCW stream is a sequence of commands selected by the top bits of the
//! first byte. All multi-byte values are little-endian.
//!
//! ```text
//! 0ccc pppp pppppppp             copy c+3 bytes from `p` bytes back
//! 10cc cccc <c bytes>            literal run of c bytes, c == 0 ends the stream
//! 1111 1110 cccc:16 vv           fill c bytes with v
//! 1111 1111 cccc:16 ssss:16      copy c bytes from absolute offset s
//! 11cc cccc ssss:16              copy c+3 bytes from absolute offset s
//! ```
//!
//! Copies run forward one byte at a time, so a source that overlaps the
//! destination repeats the pattern already written.

use crate::{Result, ShpError};

const TERMINATOR: u8 = 0x80;
const FILL: u8 = 0xFE;
const MAX_LITERAL: usize = 0x3F;
const MAX_FILL: usize = 0xFFFF;
const MIN_FILL: usize = 4;

/// Decodes an LCW stream into `dest` and returns the number of bytes written.
///
/// `dest` must be sized to the known decompressed length. Fails with
/// [`ShpError::CorruptStream`] when the stream references bytes that have not
/// been written yet, would write past the end of `dest`, or ends before its
/// terminator.
pub fn lcw_decode(src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let mut input = ByteReader::new(src);
    let mut output = Output::new(dest);

    loop {
        let cmd = input.read_u8()?;

        if cmd & 0x80 == 0 {
            let low = input.read_u8()?;
            let count = ((cmd & 0x70) >> 4) as usize + 3;
            let distance = (((cmd & 0x0F) as usize) << 8) | low as usize;
            if distance == 0 || distance > output.pos {
                return Err(corrupt(format!(
                    "relative copy reaches {} bytes back from offset {}",
                    distance, output.pos
                )));
            }
            output.copy_from(output.pos - distance, count)?;
        } else if cmd & 0x40 == 0 {
            let count = (cmd & 0x3F) as usize;
            if count == 0 {
                return Ok(output.pos);
            }
            output.write(input.take(count)?)?;
        } else {
            match cmd & 0x3F {
                0x3E => {
                    let count = input.read_u16()? as usize;
                    let value = input.read_u8()?;
                    output.fill(value, count)?;
                }
                0x3F => {
                    let count = input.read_u16()? as usize;
                    let start = input.read_u16()? as usize;
                    output.copy_absolute(start, count)?;
                }
                short => {
                    let count = short as usize + 3;
                    let start = input.read_u16()? as usize;
                    output.copy_absolute(start, count)?;
                }
            }
        }
    }
}

/// Decodes an LCW stream that expands to at most `max_len` bytes.
pub fn lcw_decode_to_vec(src: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let mut dest = vec![0u8; max_len];
    let written = lcw_decode(src, &mut dest)?;
    dest.truncate(written);
    Ok(dest)
}

/// Encodes `src` as an LCW stream.
///
/// Runs of four or more identical bytes become fill commands and everything
/// else is stored as literal runs; no copy commands are produced. The output
/// always ends with the terminator, so an empty input encodes to `[0x80]`.
pub fn lcw_encode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() + src.len() / MAX_LITERAL + 1);
    let mut offset = 0usize;
    let mut pending = 0usize;
    let mut fills = 0usize;

    while offset < src.len() {
        let run = count_same(src, offset, MAX_FILL);
        if run >= MIN_FILL {
            write_literals(&src[pending..offset], &mut out);

            out.push(FILL);
            out.extend_from_slice(&(run as u16).to_le_bytes());
            out.push(src[offset]);
            fills += 1;

            offset += run;
            pending = offset;
        } else {
            offset += 1;
        }
    }

    write_literals(&src[pending..offset], &mut out);
    out.push(TERMINATOR);

    log::trace!("lcw: {} bytes -> {} bytes, {} fills", src.len(), out.len(), fills);
    out
}

/// Length of the run of bytes equal to `src[offset]`, capped at `max`.
fn count_same(src: &[u8], offset: usize, max: usize) -> usize {
    let window = &src[offset..src.len().min(offset + max)];
    match window.split_first() {
        Some((first, rest)) => 1 + rest.iter().take_while(|&&b| b == *first).count(),
        None => 0,
    }
}

fn write_literals(mut bytes: &[u8], out: &mut Vec<u8>) {
    while !bytes.is_empty() {
        let n = bytes.len().min(MAX_LITERAL);
        out.push(TERMINATOR | n as u8);
        out.extend_from_slice(&bytes[..n]);
        bytes = &bytes[n..];
    }
}

#[inline]
fn corrupt(msg: String) -> ShpError {
    ShpError::CorruptStream(msg)
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| corrupt("stream ends before terminator".to_string()))?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_u16(&mut self) -> Result<u16> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.pos + count;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| {
            corrupt(format!(
                "literal run of {} bytes at offset {} is truncated",
                count, self.pos
            ))
        })?;
        self.pos = end;
        Ok(bytes)
    }
}

struct Output<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Output<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn reserve(&self, count: usize) -> Result<usize> {
        let end = self.pos + count;
        if end > self.buf.len() {
            return Err(corrupt(format!(
                "output of {} bytes overflows {}-byte buffer",
                end,
                self.buf.len()
            )));
        }
        Ok(end)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.reserve(bytes.len())?;
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn fill(&mut self, value: u8, count: usize) -> Result<()> {
        let end = self.reserve(count)?;
        self.buf[self.pos..end].fill(value);
        self.pos = end;
        Ok(())
    }

    fn copy_absolute(&mut self, start: usize, count: usize) -> Result<()> {
        if start >= self.pos {
            return Err(corrupt(format!(
                "absolute copy from offset {} at output offset {}",
                start, self.pos
            )));
        }
        self.copy_from(start, count)
    }

    /// Forward copy from already written output; `start` must be below `pos`.
    fn copy_from(&mut self, start: usize, count: usize) -> Result<()> {
        let end = self.reserve(count)?;
        if start + count <= self.pos {
            self.buf.copy_within(start..start + count, self.pos);
        } else if self.pos - start == 1 {
            let value = self.buf[start];
            self.buf[self.pos..end].fill(value);
        } else {
            for i in 0..count {
                self.buf[self.pos + i] = self.buf[start + i];
            }
        }
        self.pos = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(src: &[u8], max_len: usize) -> Vec<u8> {
        lcw_decode_to_vec(src, max_len).unwrap()
    }

    #[test]
    fn test_decode_terminator_only() {
        assert_eq!(decode(&[0x80], 16), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_literal_run() {
        assert_eq!(decode(&[0x83, 1, 2, 3, 0x80], 16), vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_fill() {
        assert_eq!(decode(&[0xFE, 5, 0, 9, 0x80], 16), vec![9; 5]);
    }

    #[test]
    fn test_decode_relative_copy() {
        // "abcdef", then copy 3 bytes from 6 back
        let src = [0x86, b'a', b'b', b'c', b'd', b'e', b'f', 0x00, 6, 0x80];
        assert_eq!(decode(&src, 16), b"abcdefabc".to_vec());
    }

    #[test]
    fn test_decode_relative_copy_rle() {
        // distance 1 repeats the previous byte, count = 2 + 3
        let src = [0x81, b'x', 0x20, 1, 0x80];
        assert_eq!(decode(&src, 16), b"xxxxxx".to_vec());
    }

    #[test]
    fn test_decode_relative_copy_overlap() {
        // distance 2 with 7 bytes repeats the two-byte pattern
        let src = [0x82, b'a', b'b', 0x40, 2, 0x80];
        assert_eq!(decode(&src, 16), b"ababababa".to_vec());
    }

    #[test]
    fn test_decode_long_absolute_copy_overlap() {
        let src = [0x82, b'a', b'b', 0xFF, 6, 0, 0, 0, 0x80];
        assert_eq!(decode(&src, 16), b"abababab".to_vec());
    }

    #[test]
    fn test_decode_short_absolute_copy() {
        // count = 1 + 3 from offset 1, overlapping the bytes being written
        let src = [0x84, b'a', b'b', b'c', b'd', 0xC1, 1, 0, 0x80];
        assert_eq!(decode(&src, 16), b"abcdbcdb".to_vec());
    }

    #[test]
    fn test_decode_returns_written_len() {
        let mut dest = [0u8; 8];
        let written = lcw_decode(&[0x82, 7, 7, 0x80], &mut dest).unwrap();
        assert_eq!(written, 2);
        assert_eq!(&dest[..2], &[7, 7]);
    }

    #[test]
    fn test_relative_copy_before_start_is_corrupt() {
        let mut dest = [0u8; 16];
        let result = lcw_decode(&[0x00, 5, 0x80], &mut dest);
        assert!(matches!(result, Err(ShpError::CorruptStream(_))));
    }

    #[test]
    fn test_relative_copy_distance_zero_is_corrupt() {
        let mut dest = [0u8; 16];
        let result = lcw_decode(&[0x81, 1, 0x00, 0, 0x80], &mut dest);
        assert!(matches!(result, Err(ShpError::CorruptStream(_))));
    }

    #[test]
    fn test_absolute_copy_from_unwritten_is_corrupt() {
        let mut dest = [0u8; 16];
        let short = lcw_decode(&[0x81, 1, 0xC0, 1, 0, 0x80], &mut dest);
        assert!(matches!(short, Err(ShpError::CorruptStream(_))));
        let long = lcw_decode(&[0xFF, 2, 0, 0, 0, 0x80], &mut dest);
        assert!(matches!(long, Err(ShpError::CorruptStream(_))));
    }

    #[test]
    fn test_missing_terminator_is_corrupt() {
        let mut dest = [0u8; 16];
        assert!(matches!(
            lcw_decode(&[0x82, 1, 2], &mut dest),
            Err(ShpError::CorruptStream(_))
        ));
        assert!(matches!(
            lcw_decode(&[], &mut dest),
            Err(ShpError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_truncated_operands_are_corrupt() {
        let mut dest = [0u8; 16];
        for src in [&[0x85, 1, 2][..], &[0xFE, 4][..], &[0xFF, 1, 0, 0][..], &[0x10][..]] {
            assert!(
                matches!(lcw_decode(src, &mut dest), Err(ShpError::CorruptStream(_))),
                "{src:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_output_overflow_is_corrupt() {
        let mut dest = [0u8; 4];
        let result = lcw_decode(&[0xFE, 5, 0, 1, 0x80], &mut dest);
        assert!(matches!(result, Err(ShpError::CorruptStream(_))));
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(lcw_encode(&[]), vec![0x80]);
    }

    #[test]
    fn test_encode_fill_1000() {
        let data = vec![0x42u8; 1000];
        let encoded = lcw_encode(&data);
        assert_eq!(encoded, vec![0xFE, 0xE8, 0x03, 0x42, 0x80]);
        assert_eq!(decode(&encoded, 1000), data);
    }

    #[test]
    fn test_encode_literal_chunks() {
        let data: Vec<u8> = (0..100u8).collect();
        let encoded = lcw_encode(&data);

        let mut expected = vec![0x80 | 63];
        expected.extend(0..63u8);
        expected.push(0x80 | 37);
        expected.extend(63..100u8);
        expected.push(0x80);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_encode_short_runs_stay_literal() {
        assert_eq!(lcw_encode(&[5, 5, 5, 6]), vec![0x84, 5, 5, 5, 6, 0x80]);
        assert_eq!(lcw_encode(&[1, 5, 5, 5, 5, 2]), vec![0x81, 1, 0xFE, 4, 0, 5, 0x81, 2, 0x80]);
    }

    #[test]
    fn test_encode_splits_long_runs() {
        let data = vec![3u8; 70_000];
        let encoded = lcw_encode(&data);
        assert_eq!(encoded, vec![0xFE, 0xFF, 0xFF, 3, 0xFE, 0x71, 0x11, 3, 0x80]);
        assert_eq!(decode(&encoded, 70_000), data);
    }

    #[test]
    fn test_count_same() {
        assert_eq!(count_same(&[1, 1, 1, 2], 0, 10), 3);
        assert_eq!(count_same(&[1, 1, 1, 2], 3, 10), 1);
        assert_eq!(count_same(&[1, 1, 1, 1], 0, 2), 2);
        assert_eq!(count_same(&[1], 1, 10), 0);
    }
}
