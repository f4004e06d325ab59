use crate::error::MetadataError;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

struct Segment<'a> {
    marker: u8,
    bytes: &'a [u8],
}

impl Segment<'_> {
    fn is_exif(&self) -> bool {
        self.marker == APP1 && self.bytes.get(4..4 + EXIF_HEADER.len()) == Some(EXIF_HEADER)
    }
}

pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&SOI)
}

/// Returns `jpeg` with every `APP1 Exif` segment removed and a single new one
/// holding `tiff` inserted after SOI (or after a leading JFIF `APP0`).
pub fn replace_exif_segment(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, MetadataError> {
    if !is_jpeg(jpeg) {
        return Err(MetadataError::NotJpeg);
    }

    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    if segment_len > u16::MAX as usize {
        return Err(MetadataError::ExifTooLarge(tiff.len()));
    }

    let (segments, rest) = split_header_segments(jpeg)?;

    let mut app1 = Vec::with_capacity(segment_len + 2);
    app1.extend_from_slice(&[0xFF, APP1]);
    app1.extend_from_slice(&(segment_len as u16).to_be_bytes());
    app1.extend_from_slice(EXIF_HEADER);
    app1.extend_from_slice(tiff);

    let mut output = Vec::with_capacity(jpeg.len() + app1.len());
    output.extend_from_slice(&SOI);

    let mut kept = segments.iter().filter(|segment| !segment.is_exif()).peekable();
    if let Some(jfif) = kept.next_if(|segment| segment.marker == APP0) {
        output.extend_from_slice(jfif.bytes);
    }
    output.extend_from_slice(&app1);
    for segment in kept {
        output.extend_from_slice(segment.bytes);
    }
    output.extend_from_slice(rest);

    Ok(output)
}

/// Splits the marker segments preceding the scan data from the remainder
/// (SOS onward), which is copied untouched.
fn split_header_segments(jpeg: &[u8]) -> Result<(Vec<Segment<'_>>, &[u8]), MetadataError> {
    let mut segments = Vec::new();
    let mut pos = SOI.len();

    loop {
        if pos >= jpeg.len() {
            return Ok((segments, &[]));
        }
        if jpeg[pos] != 0xFF {
            return Err(MetadataError::MalformedSegment(pos));
        }

        let start = pos;
        while pos < jpeg.len() && jpeg[pos] == 0xFF {
            pos += 1;
        }
        let marker = *jpeg.get(pos).ok_or(MetadataError::MalformedSegment(start))?;
        pos += 1;

        if marker == SOS || marker == EOI {
            return Ok((segments, &jpeg[start..]));
        }

        // Standalone markers carry no length field.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            segments.push(Segment {
                marker,
                bytes: &jpeg[start..pos],
            });
            continue;
        }

        let length = jpeg
            .get(pos..pos + 2)
            .map(|len| u16::from_be_bytes([len[0], len[1]]) as usize)
            .ok_or(MetadataError::MalformedSegment(start))?;
        if length < 2 || pos + length > jpeg.len() {
            return Err(MetadataError::MalformedSegment(start));
        }
        pos += length;

        segments.push(Segment {
            marker,
            bytes: &jpeg[start..pos],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, marker];
        bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn fake_jpeg(header_segments: &[Vec<u8>]) -> Vec<u8> {
        let mut jpeg = SOI.to_vec();
        for s in header_segments {
            jpeg.extend_from_slice(s);
        }
        jpeg.extend_from_slice(&[0xFF, SOS, 0x00, 0x02, 0x12, 0x34, 0xFF, EOI]);
        jpeg
    }

    #[test]
    fn test_rejects_non_jpeg() {
        let result = replace_exif_segment(b"\x89PNG\r\n", b"II*\0");
        assert!(matches!(result, Err(MetadataError::NotJpeg)));
    }

    #[test]
    fn test_inserts_after_jfif() {
        let jfif = segment(APP0, b"JFIF\0\x01\x01");
        let jpeg = fake_jpeg(&[jfif.clone()]);

        let output = replace_exif_segment(&jpeg, b"TIFF").unwrap();

        assert_eq!(&output[..2], &SOI);
        assert_eq!(&output[2..2 + jfif.len()], jfif.as_slice());
        let app1_start = 2 + jfif.len();
        assert_eq!(&output[app1_start..app1_start + 2], &[0xFF, APP1]);
        assert_eq!(
            &output[app1_start + 4..app1_start + 10],
            EXIF_HEADER,
        );
        assert!(output.ends_with(&[0xFF, SOS, 0x00, 0x02, 0x12, 0x34, 0xFF, EOI]));
    }

    #[test]
    fn test_replaces_existing_exif() {
        let mut old_payload = EXIF_HEADER.to_vec();
        old_payload.extend_from_slice(b"OLD-TIFF");
        let old_exif = segment(APP1, &old_payload);
        let quant = segment(0xDB, &[0u8; 8]);
        let jpeg = fake_jpeg(&[old_exif, quant.clone()]);

        let output = replace_exif_segment(&jpeg, b"NEW").unwrap();

        let exif_count = output
            .windows(EXIF_HEADER.len())
            .filter(|w| *w == EXIF_HEADER)
            .count();
        assert_eq!(exif_count, 1);
        assert!(!output.windows(8).any(|w| w == b"OLD-TIFF"));
        assert!(output.windows(quant.len()).any(|w| w == quant.as_slice()));
    }

    #[test]
    fn test_keeps_non_exif_app1() {
        let xmp = segment(APP1, b"http://ns.adobe.com/xap/1.0/\0<x/>");
        let jpeg = fake_jpeg(&[xmp.clone()]);

        let output = replace_exif_segment(&jpeg, b"NEW").unwrap();

        assert!(output.windows(xmp.len()).any(|w| w == xmp.as_slice()));
    }

    #[test]
    fn test_truncated_segment_is_an_error() {
        let mut jpeg = SOI.to_vec();
        jpeg.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x40, 0x01]);

        let result = replace_exif_segment(&jpeg, b"NEW");
        assert!(matches!(result, Err(MetadataError::MalformedSegment(2))));
    }
}
