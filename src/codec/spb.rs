//! SPB delta/run-coded images.
//!
//! ## Layout
//! ```text
//! [0x00] width   (u16 BE)
//! [0x02] height  (u16 BE)
//! [0x04] three colour planes, MSB-first bits, no alignment between planes
//! ```
//!
//! ## Plane coding
//! The first value of a plane is a literal byte. After that, each group
//! starts with a 3-bit code:
//! * `0` - repeat the current value 4 times
//! * `1..=6` - 4 deltas of `code + 2` bits each (`8` bits means literal)
//! * `7` - 4 deltas of `1 + bit` bits each
//!
//! A delta `t` adds `(t >> 1) + 1` when odd and subtracts `t >> 1` when
//! even, wrapping at 8 bits.
//!
//! Planes are laid onto the image row by row; with [`ScanOrder::Zigzag`]
//! every odd row runs right to left.

use byteorder::{BigEndian, ByteOrder};
use log::warn;

use super::bits::BitReader;
use super::{CodecError, DecodedImage, SpbDecode};

pub const MAX_WIDTH: u32 = 8192;
pub const MAX_HEIGHT: u32 = 8192;
pub const MAX_PIXELS: u64 = 4096 * 4096;

const HEADER_SIZE: usize = 4;
const GROUP: usize = 4;

/// Order in which decoded plane values visit the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Even rows left to right, odd rows right to left.
    #[default]
    Zigzag,
    /// Every row left to right.
    Linear,
}

/// Which pixel channel each decoded plane fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaneOrder {
    /// Planes fill red, green, then blue.
    #[default]
    Bgr,
    /// Planes fill blue, green, then red.
    Rgb,
}

impl PlaneOrder {
    /// Byte offsets within a `B, G, R` pixel, in plane order.
    fn channels(&self) -> [usize; 3] {
        match self {
            PlaneOrder::Bgr => [2, 1, 0],
            PlaneOrder::Rgb => [0, 1, 2],
        }
    }
}

/// Pixel layout options for the built-in SPB decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpbOptions {
    pub scan: ScanOrder,
    pub planes: PlaneOrder,
}

/// Built-in SPB decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spb {
    options: SpbOptions,
}

impl Spb {
    pub fn new(options: SpbOptions) -> Self {
        Self { options }
    }
}

/// Read and check the image dimensions.
pub fn dimensions(input: &[u8]) -> Result<(u32, u32), CodecError> {
    if input.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            needed: HEADER_SIZE,
            available: input.len(),
        });
    }
    let width = BigEndian::read_u16(&input[0..2]) as u32;
    let height = BigEndian::read_u16(&input[2..4]) as u32;

    let in_range = (1..=MAX_WIDTH).contains(&width) && (1..=MAX_HEIGHT).contains(&height);
    if !in_range || width as u64 * height as u64 > MAX_PIXELS {
        return Err(CodecError::Implausible { width, height });
    }
    Ok((width, height))
}

impl SpbDecode for Spb {
    fn decode(&self, input: &[u8]) -> Result<DecodedImage, CodecError> {
        let (width, height) = dimensions(input)?;
        let (w, h) = (width as usize, height as usize);

        let mut plane = vec![0u8; w * h];
        let mut pixels = vec![0u8; w * h * 3];
        let mut bits = BitReader::new(&input[HEADER_SIZE..]);

        for channel in self.options.planes.channels() {
            let decoded = decode_plane(&mut bits, &mut plane);
            if decoded < plane.len() {
                warn!(
                    "spb data ended after {} of {} values in a plane",
                    decoded,
                    plane.len()
                );
            }

            for (i, &value) in plane.iter().enumerate() {
                let (y, k) = (i / w, i % w);
                let x = match self.options.scan {
                    ScanOrder::Zigzag if y % 2 == 1 => w - 1 - k,
                    _ => k,
                };
                pixels[(y * w + x) * 3 + channel] = value;
            }
        }

        Ok(DecodedImage {
            width,
            height,
            pixels,
        })
    }
}

/// Fill `plane` from the bit stream.
///
/// Returns how many values were decoded before the input ran out; the
/// rest of the plane repeats the last value.
fn decode_plane(bits: &mut BitReader<'_>, plane: &mut [u8]) -> usize {
    let total = plane.len();
    let mut value = bits.read_u8().unwrap_or(0);
    plane[0] = value;
    let mut n = 1;

    'plane: while n < total {
        let Some(code) = bits.read_bits(3) else {
            break;
        };

        if code == 0 {
            let run = GROUP.min(total - n);
            plane[n..n + run].fill(value);
            n += run;
            continue;
        }

        let delta_bits = if code == 7 {
            match bits.read_bits(1) {
                Some(b) => b + 1,
                None => break,
            }
        } else {
            code + 2
        };

        for _ in 0..GROUP {
            let next = if delta_bits == 8 {
                bits.read_u8()
            } else {
                bits.read_bits(delta_bits).map(|t| apply_delta(value, t))
            };
            let Some(next) = next else {
                break 'plane;
            };
            value = next;
            if n >= total {
                break;
            }
            plane[n] = value;
            n += 1;
        }
    }

    let decoded = n;
    plane[n..].fill(value);
    decoded
}

fn apply_delta(value: u8, t: u32) -> u8 {
    let step = (t >> 1) as u8;
    if t & 1 == 1 {
        value.wrapping_add(step).wrapping_add(1)
    } else {
        value.wrapping_sub(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(width: u16, height: u16) -> Vec<u8> {
        let mut v = width.to_be_bytes().to_vec();
        v.extend_from_slice(&height.to_be_bytes());
        v
    }

    #[test]
    fn rejects_short_and_implausible_headers() {
        assert!(matches!(
            Spb::default().decode(&[0, 1]),
            Err(CodecError::Truncated { needed: 4, available: 2 })
        ));
        assert!(matches!(
            Spb::default().decode(&header(0, 10)),
            Err(CodecError::Implausible { width: 0, height: 10 })
        ));
        assert!(matches!(
            Spb::default().decode(&header(8192, 8192)),
            Err(CodecError::Implausible { .. })
        ));
        assert!(dimensions(&header(4096, 4096)).is_ok());
    }

    #[test]
    fn delta_coding_wraps() {
        assert_eq!(apply_delta(10, 0b101), 13);
        assert_eq!(apply_delta(10, 0b100), 8);
        assert_eq!(apply_delta(255, 1), 0);
        assert_eq!(apply_delta(0, 2), 255);
    }

    #[test]
    fn runs_fill_a_solid_image() {
        // 2x2 image; each plane is a literal then one run code (000).
        // Plane bits: 8 + 3 = 11 bits, three planes = 33 bits.
        let mut data = header(2, 2);
        // R=0xFF, G=0x80, B=0x01
        // 11111111 000 | 10000000 000 | 00000001 000
        data.extend_from_slice(&[0b1111_1111, 0b0001_0000, 0b0000_0000, 0b0000_0100, 0b0000_0000]);
        let image = Spb::default().decode(&data).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        for px in image.pixels.chunks(3) {
            assert_eq!(px, &[0x01, 0x80, 0xFF]);
        }
    }

    #[test]
    fn zigzag_reverses_odd_rows() {
        // 2x2 image, one plane of literals 1,2,3,4 via code 6 (8-bit values).
        // Remaining planes run out of data and repeat their first value.
        let mut data = header(2, 2);
        let mut w = BitString::default();
        w.put(1, 8);
        w.put(6, 3);
        for v in [2, 3, 4, 9] {
            w.put(v, 8);
        }
        data.extend(w.bytes());

        let zigzag = Spb::default().decode(&data).unwrap();
        let red: Vec<u8> = zigzag.pixels.chunks(3).map(|p| p[2]).collect();
        assert_eq!(red, vec![1, 2, 4, 3]);

        let linear = Spb::new(SpbOptions {
            scan: ScanOrder::Linear,
            planes: PlaneOrder::Rgb,
        })
        .decode(&data)
        .unwrap();
        let blue: Vec<u8> = linear.pixels.chunks(3).map(|p| p[0]).collect();
        assert_eq!(blue, vec![1, 2, 3, 4]);
    }

    #[test]
    fn truncated_plane_repeats_last_value() {
        let mut data = header(3, 1);
        data.push(7);
        let image = Spb::default().decode(&data).unwrap();
        let red: Vec<u8> = image.pixels.chunks(3).map(|p| p[2]).collect();
        assert_eq!(red, vec![7, 7, 7]);
        let green: Vec<u8> = image.pixels.chunks(3).map(|p| p[1]).collect();
        assert_eq!(green, vec![0, 0, 0]);
    }

    #[derive(Default)]
    struct BitString(Vec<bool>);

    impl BitString {
        fn put(&mut self, value: u32, n: u32) {
            for i in (0..n).rev() {
                self.0.push((value >> i) & 1 == 1);
            }
        }

        fn bytes(&self) -> Vec<u8> {
            self.0
                .chunks(8)
                .map(|c| {
                    c.iter()
                        .enumerate()
                        .fold(0u8, |acc, (i, &b)| acc | ((b as u8) << (7 - i)))
                })
                .collect()
        }
    }
}
