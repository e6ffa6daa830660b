//! 24-bit uncompressed BMP encoding for decoded images.

use byteorder::{ByteOrder, LittleEndian};

use super::DecodedImage;

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_SIZE: usize = 40;
pub const HEADER_SIZE: usize = FILE_HEADER_SIZE + INFO_HEADER_SIZE;

fn row_stride(width: u32) -> usize {
    (width as usize * 3).div_ceil(4) * 4
}

/// Total size of a 24-bit BMP file with the given dimensions.
pub fn file_size(width: u32, height: u32) -> usize {
    HEADER_SIZE + row_stride(width) * height as usize
}

/// Encode `image` as a bottom-up 24-bit BMP file.
pub fn encode(image: &DecodedImage) -> Vec<u8> {
    let row_bytes = image.width as usize * 3;
    let stride = row_stride(image.width);
    let size = file_size(image.width, image.height);

    let mut out = vec![0u8; size];
    out[0..2].copy_from_slice(b"BM");
    LittleEndian::write_u32(&mut out[2..6], size as u32);
    LittleEndian::write_u32(&mut out[10..14], HEADER_SIZE as u32);
    LittleEndian::write_u32(&mut out[14..18], INFO_HEADER_SIZE as u32);
    LittleEndian::write_i32(&mut out[18..22], image.width as i32);
    LittleEndian::write_i32(&mut out[22..26], image.height as i32);
    LittleEndian::write_u16(&mut out[26..28], 1);
    LittleEndian::write_u16(&mut out[28..30], 24);
    LittleEndian::write_u32(&mut out[34..38], (stride * image.height as usize) as u32);

    if row_bytes == 0 {
        return out;
    }
    let rows = image.pixels.chunks_exact(row_bytes).take(image.height as usize);
    for (y, row) in rows.enumerate() {
        let dst = HEADER_SIZE + (image.height as usize - 1 - y) * stride;
        out[dst..dst + row_bytes].copy_from_slice(row);
    }
    out
}
