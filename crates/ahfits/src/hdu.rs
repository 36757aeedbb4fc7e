//! HDU walking: split a FITS byte stream into owned header/data units and
//! write them back.

use crate::block::{append_padded, padded_byte_len, BLOCK_SIZE, DATA_PAD_BYTE};
use crate::header::{card_i64, card_logical, card_string, parse_header, serialize_header, Card};
use crate::status::Status;
use crate::value::Value;

/// Kind of a header data unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduKind {
    Primary,
    Image,
    AsciiTable,
    BinaryTable,
}

/// One header data unit held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    pub kind: HduKind,
    /// Header cards, END excluded.
    pub cards: Vec<Card>,
    /// Data segment without block padding, heap included.
    pub data: Vec<u8>,
}

impl Hdu {
    /// An empty primary HDU.
    pub fn empty_primary() -> Hdu {
        let cards = [
            ("SIMPLE", Value::Logical(true), "file does conform to FITS standard"),
            ("BITPIX", Value::Integer(8), "number of bits per data pixel"),
            ("NAXIS", Value::Integer(0), "number of data axes"),
            ("EXTEND", Value::Logical(true), "FITS dataset may contain extensions"),
        ]
        .into_iter()
        .map(|(k, v, c)| Card {
            keyword: keyword8(k),
            value: Some(v),
            comment: Some(c.to_string()),
        })
        .collect();
        Hdu {
            kind: HduKind::Primary,
            cards,
            data: Vec::new(),
        }
    }

    pub fn extname(&self) -> Option<String> {
        card_string(&self.cards, "EXTNAME")
    }

    /// Integer keyword, or `0` when absent.
    pub fn int_key(&self, keyword: &str) -> usize {
        card_i64(&self.cards, keyword).map_or(0, |n| n.max(0) as usize)
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, HduKind::AsciiTable | HduKind::BinaryTable)
    }
}

fn keyword8(name: &str) -> [u8; 8] {
    let mut kw = [b' '; 8];
    kw[..name.len()].copy_from_slice(name.as_bytes());
    kw
}

fn required_i64(cards: &[Card], keyword: &str) -> Result<i64, Status> {
    card_i64(cards, keyword).ok_or(Status::KEY_NO_EXIST)
}

fn classify(cards: &[Card], is_first: bool) -> Result<HduKind, Status> {
    if is_first {
        return match cards.first().map(Card::keyword_str) {
            Some("SIMPLE") => Ok(HduKind::Primary),
            _ => Err(Status::NO_SIMPLE),
        };
    }
    match card_string(cards, "XTENSION").as_deref() {
        Some("IMAGE") => Ok(HduKind::Image),
        Some("TABLE") => Ok(HduKind::AsciiTable),
        Some("BINTABLE") => Ok(HduKind::BinaryTable),
        _ => Err(Status::UNKNOWN_EXT),
    }
}

/// Data length in bytes implied by the header (without padding).
pub fn data_byte_len(cards: &[Card], kind: HduKind) -> Result<usize, Status> {
    let bitpix = required_i64(cards, "BITPIX")?;
    let naxis = required_i64(cards, "NAXIS")?;
    if naxis <= 0 {
        return Ok(0);
    }

    let mut dims = Vec::with_capacity(naxis as usize);
    for i in 1..=naxis {
        let dim = required_i64(cards, &format!("NAXIS{i}"))?;
        if dim < 0 {
            return Err(Status::NOT_POS_INT);
        }
        dims.push(dim as usize);
    }

    let bytes_per_value = (bitpix.unsigned_abs() as usize) / 8;
    if kind == HduKind::Primary && dims[0] == 0 && card_logical(cards, "GROUPS") == Some(true) {
        let pcount = required_i64(cards, "PCOUNT")?.max(0) as usize;
        let gcount = required_i64(cards, "GCOUNT")?.max(0) as usize;
        let group: usize = dims[1..].iter().product();
        return Ok(bytes_per_value * gcount * (pcount + group));
    }

    let pixels = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(Status::NOT_POS_INT)?;
    let (pcount, gcount) = match kind {
        HduKind::Primary => (0, 1),
        _ => (
            card_i64(cards, "PCOUNT").unwrap_or(0).max(0) as usize,
            card_i64(cards, "GCOUNT").unwrap_or(1).max(1) as usize,
        ),
    };
    Ok(gcount * (pixels * bytes_per_value + pcount))
}

/// Parse a complete FITS byte stream.
pub fn parse_fits(data: &[u8]) -> Result<Vec<Hdu>, Status> {
    if data.len() < BLOCK_SIZE {
        return Err(Status::END_OF_FILE);
    }

    let mut hdus = Vec::new();
    let mut offset = 0usize;
    while data.len() - offset >= BLOCK_SIZE {
        let remaining = &data[offset..];
        // Trailing junk after the last valid HDU is ignored.
        let (cards, header_len) = match parse_header(remaining) {
            Ok(parsed) => parsed,
            Err(_) if !hdus.is_empty() => break,
            Err(e) => return Err(e),
        };
        let kind = classify(&cards, hdus.is_empty())?;
        let data_len = data_byte_len(&cards, kind)?;
        let data_start = offset + header_len;
        if data_start + data_len > data.len() {
            return Err(Status::END_OF_FILE);
        }

        hdus.push(Hdu {
            kind,
            cards,
            data: data[data_start..data_start + data_len].to_vec(),
        });
        offset = data_start + padded_byte_len(data_len);
    }
    Ok(hdus)
}

/// Serialize HDUs into a FITS byte stream.
pub fn serialize_fits(hdus: &[Hdu]) -> Vec<u8> {
    let mut out = Vec::new();
    for hdu in hdus {
        out.extend_from_slice(&serialize_header(&hdu.cards));
        append_padded(&mut out, &hdu.data, DATA_PAD_BYTE);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::update_card;

    fn bintable(rows: i64, naxis1: i64, pcount: i64) -> Hdu {
        let mut cards = Vec::new();
        for (k, v) in [
            ("XTENSION", Value::from("BINTABLE")),
            ("BITPIX", Value::Integer(8)),
            ("NAXIS", Value::Integer(2)),
            ("NAXIS1", Value::Integer(naxis1)),
            ("NAXIS2", Value::Integer(rows)),
            ("PCOUNT", Value::Integer(pcount)),
            ("GCOUNT", Value::Integer(1)),
            ("TFIELDS", Value::Integer(1)),
            ("TFORM1", Value::from("1J")),
            ("EXTNAME", Value::from("EVENTS")),
        ] {
            update_card(&mut cards, k, v, None).unwrap();
        }
        Hdu {
            kind: HduKind::BinaryTable,
            cards,
            data: vec![7u8; (naxis1 * rows + pcount) as usize],
        }
    }

    #[test]
    fn parse_serialized_file() {
        let hdus = vec![Hdu::empty_primary(), bintable(3, 4, 5)];
        let bytes = serialize_fits(&hdus);
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);
        let parsed = parse_fits(&bytes).unwrap();
        assert_eq!(parsed, hdus);
        assert_eq!(parsed[1].extname().as_deref(), Some("EVENTS"));
        assert_eq!(parsed[1].int_key("NAXIS2"), 3);
        assert!(parsed[1].is_table());
    }

    #[test]
    fn data_length_includes_heap() {
        let hdu = bintable(10, 8, 100);
        assert_eq!(data_byte_len(&hdu.cards, hdu.kind).unwrap(), 180);
    }

    #[test]
    fn first_hdu_must_be_simple() {
        let bytes = serialize_fits(&[bintable(1, 4, 0)]);
        assert_eq!(parse_fits(&bytes).unwrap_err(), Status::NO_SIMPLE);
    }

    #[test]
    fn truncated_data_is_end_of_file() {
        let mut bytes = serialize_fits(&[Hdu::empty_primary(), bintable(2000, 4, 0)]);
        bytes.truncate(2 * BLOCK_SIZE + 100);
        assert_eq!(parse_fits(&bytes).unwrap_err(), Status::END_OF_FILE);
    }

    #[test]
    fn short_input_is_end_of_file() {
        assert_eq!(parse_fits(&[0u8; 10]).unwrap_err(), Status::END_OF_FILE);
    }
}
