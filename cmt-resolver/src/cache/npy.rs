//! Minimal NPY codec for 1-D little-endian `float32` arrays
//!
//! Entries are written as NPY v1.0 so they stay loadable with `numpy.load`.
//! Only C-order `<f4` vectors are accepted on read.

use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const DESCR: &str = "<f4";
const ALIGNMENT: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum NpyError {
    #[error("not an NPY file")]
    BadMagic,

    #[error("unsupported NPY format version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid NPY header: {0}")]
    Header(String),

    #[error("truncated array data: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Encode a vector as an NPY v1.0 blob
pub fn encode_f32(values: &[f32]) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({},), }}",
        DESCR,
        values.len()
    );

    // magic + version + u16 length, then the padded dict ending in '\n'
    let preamble = MAGIC.len() + 2 + 2;
    let unpadded = preamble + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    let header_len = dict.len() + padding + 1;

    let mut out = Vec::with_capacity(preamble + header_len + values.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decode an NPY blob holding a 1-D `<f4` array
pub fn decode_f32(bytes: &[u8]) -> Result<Vec<f32>, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let major = bytes[MAGIC.len()];
    let (header_start, header_len) = match major {
        1 => {
            let len = read_le(bytes, 8, 2)?;
            (10, len)
        }
        2 | 3 => {
            let len = read_le(bytes, 8, 4)?;
            (12, len)
        }
        other => return Err(NpyError::UnsupportedVersion(other)),
    };

    let data_start = header_start + header_len;
    let header = bytes
        .get(header_start..data_start)
        .ok_or_else(|| NpyError::Header("header extends past end of file".to_string()))?;
    let header = std::str::from_utf8(header)
        .map_err(|_| NpyError::Header("header is not text".to_string()))?;

    let len = parse_header(header)?;

    let data = &bytes[data_start..];
    let expected = len
        .checked_mul(4)
        .ok_or_else(|| NpyError::Header(format!("shape ({},) is too large", len)))?;
    if data.len() != expected {
        return Err(NpyError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    Ok(data
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn read_le(bytes: &[u8], offset: usize, width: usize) -> Result<usize, NpyError> {
    let raw = bytes
        .get(offset..offset + width)
        .ok_or_else(|| NpyError::Header("missing header length".to_string()))?;
    Ok(raw
        .iter()
        .rev()
        .fold(0usize, |acc, byte| (acc << 8) | *byte as usize))
}

/// Validate dtype and order, return the vector length
fn parse_header(header: &str) -> Result<usize, NpyError> {
    let compact: String = header.chars().filter(|c| !c.is_whitespace()).collect();

    if !compact.contains(&format!("'descr':'{}'", DESCR)) {
        return Err(NpyError::Header(format!("dtype is not {}", DESCR)));
    }
    if !compact.contains("'fortran_order':False") {
        return Err(NpyError::Header("fortran order is not supported".to_string()));
    }

    let shape_start = compact
        .find("'shape':(")
        .map(|i| i + "'shape':(".len())
        .ok_or_else(|| NpyError::Header("missing shape".to_string()))?;
    let shape_end = compact[shape_start..]
        .find(')')
        .map(|i| shape_start + i)
        .ok_or_else(|| NpyError::Header("unterminated shape".to_string()))?;

    let dims: Vec<&str> = compact[shape_start..shape_end]
        .split(',')
        .filter(|d| !d.is_empty())
        .collect();
    match dims.as_slice() {
        [len] => len
            .parse::<usize>()
            .map_err(|_| NpyError::Header(format!("bad dimension '{}'", len))),
        _ => Err(NpyError::Header(format!("expected 1-D array, shape ({})", dims.join(",")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        for n in [0usize, 1, 494, 100_000] {
            let blob = encode_f32(&vec![0.5; n]);
            let header_len = u16::from_le_bytes([blob[8], blob[9]]) as usize;
            assert_eq!((10 + header_len) % ALIGNMENT, 0);
            assert_eq!(blob[10 + header_len - 1], b'\n');
            assert_eq!(blob.len(), 10 + header_len + n * 4);
        }
    }

    #[test]
    fn test_decode_preserves_nan_and_zero() {
        let values = [1.5f32, 0.0, f32::NAN, -2.25];
        let decoded = decode_f32(&encode_f32(&values)).unwrap();

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], 1.5);
        assert_eq!(decoded[1], 0.0);
        assert!(decoded[2].is_nan());
        assert_eq!(decoded[3], -2.25);
    }

    #[test]
    fn test_decode_numpy_written_header() {
        // Header exactly as numpy 1.x writes it for np.save(f, np.zeros(2, 'f4'))
        let dict = "{'descr': '<f4', 'fortran_order': False, 'shape': (2,), }";
        let mut header = dict.to_string();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut blob = b"\x93NUMPY\x01\x00".to_vec();
        blob.extend_from_slice(&(header.len() as u16).to_le_bytes());
        blob.extend_from_slice(header.as_bytes());
        blob.extend_from_slice(&3.0f32.to_le_bytes());
        blob.extend_from_slice(&4.0f32.to_le_bytes());

        assert_eq!(decode_f32(&blob).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_rejects_other_dtype() {
        let mut blob = encode_f32(&[1.0]);
        let pos = blob.windows(3).position(|w| w == b"<f4").unwrap();
        blob[pos + 2] = b'8';
        let err = decode_f32(&blob).unwrap_err();
        assert!(matches!(err, NpyError::Header(_)));
    }

    #[test]
    fn test_rejects_truncated_data() {
        let mut blob = encode_f32(&[1.0, 2.0, 3.0]);
        blob.truncate(blob.len() - 2);
        assert_eq!(
            decode_f32(&blob).unwrap_err(),
            NpyError::Truncated { expected: 12, actual: 10 }
        );
    }

    #[test]
    fn test_rejects_oversized_shape() {
        let dict = "{'descr': '<f4', 'fortran_order': False, 'shape': (4611686018427387904,), }\n";
        let mut blob = b"\x93NUMPY\x01\x00".to_vec();
        blob.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        blob.extend_from_slice(dict.as_bytes());

        assert!(matches!(decode_f32(&blob), Err(NpyError::Header(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(decode_f32(b"hello world").unwrap_err(), NpyError::BadMagic);
        assert_eq!(decode_f32(b"").unwrap_err(), NpyError::BadMagic);
    }
}
