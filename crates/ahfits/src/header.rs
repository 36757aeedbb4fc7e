//! Header cards: parsing, formatting, and keyword lookup/update on a card list.

use std::str;

use crate::block::{append_padded, BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::status::Status;
use crate::value::{format_value, parse_value, Value};

/// One 80-byte header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Keyword name, left-justified and blank-padded.
    pub keyword: [u8; 8],
    /// Value, present only when the card has a value indicator.
    pub value: Option<Value>,
    /// Comment, or the free text of a commentary card.
    pub comment: Option<String>,
}

impl Card {
    /// Build a valued card.
    pub fn new(keyword: &str, value: Value, comment: Option<&str>) -> Result<Card, Status> {
        Ok(Card {
            keyword: make_keyword(keyword)?,
            value: Some(value),
            comment: comment.map(String::from),
        })
    }

    /// Build a HISTORY/COMMENT style card.
    pub fn commentary(keyword: &str, text: &str) -> Result<Card, Status> {
        Ok(Card {
            keyword: make_keyword(keyword)?,
            value: None,
            comment: Some(text.to_string()),
        })
    }

    /// Keyword with trailing blanks removed.
    pub fn keyword_str(&self) -> &str {
        str::from_utf8(&self.keyword).unwrap_or("").trim_end()
    }

    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }

    /// COMMENT, HISTORY, or blank keyword.
    pub fn is_commentary(&self) -> bool {
        matches!(self.keyword_str(), "COMMENT" | "HISTORY" | "")
    }
}

/// Validate and pad a keyword name. Names are upper-cased.
pub fn make_keyword(name: &str) -> Result<[u8; 8], Status> {
    let name = name.trim();
    if name.len() > 8 {
        return Err(Status::BAD_KEYCHAR);
    }
    let mut kw = [b' '; 8];
    for (slot, b) in kw.iter_mut().zip(name.bytes()) {
        let b = b.to_ascii_uppercase();
        if !matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_') {
            return Err(Status::BAD_KEYCHAR);
        }
        *slot = b;
    }
    Ok(kw)
}

/// Parse one card image.
pub fn parse_card(bytes: &[u8; CARD_SIZE]) -> Result<Card, Status> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&bytes[..8]);
    if !keyword
        .iter()
        .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(Status::BAD_KEYCHAR);
    }

    let rest = str::from_utf8(&bytes[8..]).map_err(|_| Status::BAD_KEYCHAR)?;
    let mut card = Card {
        keyword,
        value: None,
        comment: None,
    };
    if card.is_end() {
        return Ok(card);
    }

    if !card.is_commentary() && rest.starts_with("= ") {
        let field = &rest[2..];
        match parse_value(field) {
            Some((value, comment)) => {
                card.value = Some(value);
                card.comment = comment;
            }
            None => {
                card.comment = field
                    .find('/')
                    .map(|i| field[i + 1..].trim().to_string())
                    .filter(|s| !s.is_empty());
            }
        }
    } else {
        let text = rest.trim_end();
        card.comment = (!text.is_empty()).then(|| text.to_string());
    }
    Ok(card)
}

/// Format a card into its 80-byte image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(&card.keyword);

    match (&card.value, &card.comment) {
        (Some(value), comment) => {
            buf[8] = b'=';
            let field = format_value(value);
            buf[10..].copy_from_slice(&field);
            if let Some(comment) = comment {
                // Comment starts after the value text, never before column 32.
                let value_end = 10 + field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
                let start = value_end.max(30) + 1;
                if start + 3 < CARD_SIZE {
                    buf[start] = b'/';
                    let text = comment.as_bytes();
                    let len = text.len().min(CARD_SIZE - start - 2);
                    buf[start + 2..start + 2 + len].copy_from_slice(&text[..len]);
                }
            }
        }
        (None, Some(text)) => {
            let text = text.as_bytes();
            let len = text.len().min(CARD_SIZE - 8);
            buf[8..8 + len].copy_from_slice(&text[..len]);
        }
        (None, None) => {}
    }
    buf
}

/// Parse header blocks at the start of `data`.
///
/// Returns the cards (END excluded) and the header length in bytes, which
/// is always a whole number of blocks.
pub fn parse_header(data: &[u8]) -> Result<(Vec<Card>, usize), Status> {
    let mut cards = Vec::new();
    for (idx, chunk) in data.chunks_exact(CARD_SIZE).enumerate() {
        let bytes: &[u8; CARD_SIZE] = chunk.try_into().map_err(|_| Status::NO_END)?;
        let card = parse_card(bytes)?;
        if card.is_end() {
            let used = (idx + 1) * CARD_SIZE;
            return Ok((cards, used.div_ceil(BLOCK_SIZE) * BLOCK_SIZE));
        }
        cards.push(card);
    }
    Err(Status::NO_END)
}

/// Serialize cards followed by END, padded to whole blocks.
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let mut raw = Vec::with_capacity((cards.len() + 1).div_ceil(CARDS_PER_BLOCK) * BLOCK_SIZE);
    for card in cards {
        raw.extend_from_slice(&format_card(card));
    }
    let mut end = [b' '; CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    raw.extend_from_slice(&end);

    let mut out = Vec::with_capacity(raw.len());
    append_padded(&mut out, &raw, HEADER_PAD_BYTE);
    out
}

/// First card carrying `keyword`.
pub fn find_card<'a>(cards: &'a [Card], keyword: &str) -> Option<&'a Card> {
    let kw = make_keyword(keyword).ok()?;
    cards.iter().find(|c| c.keyword == kw)
}

pub fn card_i64(cards: &[Card], keyword: &str) -> Option<i64> {
    match find_card(cards, keyword)?.value.as_ref()? {
        Value::Integer(n) => Some(*n),
        _ => None,
    }
}

pub fn card_string(cards: &[Card], keyword: &str) -> Option<String> {
    match find_card(cards, keyword)?.value.as_ref()? {
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

pub fn card_logical(cards: &[Card], keyword: &str) -> Option<bool> {
    match find_card(cards, keyword)?.value.as_ref()? {
        Value::Logical(b) => Some(*b),
        _ => None,
    }
}

/// Set `keyword` to `value`, keeping the existing comment unless `comment`
/// is given. Absent keywords are appended.
pub fn update_card(
    cards: &mut Vec<Card>,
    keyword: &str,
    value: Value,
    comment: Option<&str>,
) -> Result<(), Status> {
    let kw = make_keyword(keyword)?;
    match cards.iter_mut().find(|c| c.keyword == kw) {
        Some(card) => {
            card.value = Some(value);
            if let Some(comment) = comment {
                card.comment = Some(comment.to_string());
            }
        }
        None => cards.push(Card {
            keyword: kw,
            value: Some(value),
            comment: comment.map(String::from),
        }),
    }
    Ok(())
}

/// Replace the comment of an existing keyword.
pub fn modify_comment(cards: &mut [Card], keyword: &str, comment: &str) -> Result<(), Status> {
    let kw = make_keyword(keyword)?;
    let card = cards
        .iter_mut()
        .find(|c| c.keyword == kw)
        .ok_or(Status::KEY_NO_EXIST)?;
    card.comment = Some(comment.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_bytes(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        buf[..s.len()].copy_from_slice(s.as_bytes());
        buf
    }

    #[test]
    fn parse_string_card_with_comment() {
        let c = parse_card(&card_bytes("TTYPE1  = 'TIME    '           / event time")).unwrap();
        assert_eq!(c.keyword_str(), "TTYPE1");
        assert_eq!(c.value, Some(Value::String("TIME".into())));
        assert_eq!(c.comment.as_deref(), Some("event time"));
    }

    #[test]
    fn parse_history_card() {
        let c = parse_card(&card_bytes("HISTORY = not a value")).unwrap();
        assert!(c.is_commentary());
        assert!(c.value.is_none());
        assert_eq!(c.comment.as_deref(), Some("= not a value"));
    }

    #[test]
    fn parse_rejects_lowercase_keyword() {
        assert_eq!(
            parse_card(&card_bytes("tunit1  = 'm'")),
            Err(Status::BAD_KEYCHAR)
        );
    }

    #[test]
    fn undefined_value_keeps_comment() {
        let c = parse_card(&card_bytes("TNULL1  =                      / undefined")).unwrap();
        assert!(c.value.is_none());
        assert_eq!(c.comment.as_deref(), Some("undefined"));
    }

    #[test]
    fn format_then_parse_keeps_value_and_comment() {
        let card = Card::new("TLMIN3", Value::Integer(-5), Some("Min legal value")).unwrap();
        let parsed = parse_card(&format_card(&card)).unwrap();
        assert_eq!(parsed, card);
    }

    #[test]
    fn make_keyword_uppercases_and_limits_length() {
        assert_eq!(&make_keyword("tunit4").unwrap(), b"TUNIT4  ");
        assert_eq!(make_keyword("TSCALE100"), Err(Status::BAD_KEYCHAR));
        assert_eq!(make_keyword("BAD KEY"), Err(Status::BAD_KEYCHAR));
    }

    #[test]
    fn serialize_and_parse_header() {
        let cards = vec![
            Card::new("SIMPLE", Value::Logical(true), None).unwrap(),
            Card::new("BITPIX", Value::Integer(8), None).unwrap(),
            Card::new("NAXIS", Value::Integer(0), None).unwrap(),
        ];
        let bytes = serialize_header(&cards);
        assert_eq!(bytes.len(), BLOCK_SIZE);
        let (parsed, len) = parse_header(&bytes).unwrap();
        assert_eq!(len, BLOCK_SIZE);
        assert_eq!(parsed, cards);
    }

    #[test]
    fn header_spanning_two_blocks() {
        let cards: Vec<Card> = (0..CARDS_PER_BLOCK)
            .map(|i| Card::new(&format!("KEY{i}"), Value::Integer(i as i64), None).unwrap())
            .collect();
        let bytes = serialize_header(&cards);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        let (parsed, len) = parse_header(&bytes).unwrap();
        assert_eq!(parsed.len(), CARDS_PER_BLOCK);
        assert_eq!(len, 2 * BLOCK_SIZE);
    }

    #[test]
    fn missing_end_is_an_error() {
        let bytes = vec![b' '; BLOCK_SIZE];
        assert_eq!(parse_header(&bytes).unwrap_err(), Status::NO_END);
    }

    #[test]
    fn update_keeps_comment_and_appends() {
        let mut cards = vec![Card::new("TUNIT1", Value::from("s"), Some("units")).unwrap()];
        update_card(&mut cards, "TUNIT1", Value::from("ms"), None).unwrap();
        assert_eq!(cards[0].value, Some(Value::from("ms")));
        assert_eq!(cards[0].comment.as_deref(), Some("units"));

        update_card(&mut cards, "TNULL1", Value::Integer(-1), Some("null")).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(card_i64(&cards, "TNULL1"), Some(-1));
    }

    #[test]
    fn modify_comment_requires_keyword() {
        let mut cards = vec![Card::new("TTYPE1", Value::from("TIME"), None).unwrap()];
        modify_comment(&mut cards, "TTYPE1", "Arrival time").unwrap();
        assert_eq!(cards[0].comment.as_deref(), Some("Arrival time"));
        assert_eq!(
            modify_comment(&mut cards, "TTYPE2", "x"),
            Err(Status::KEY_NO_EXIST)
        );
    }
}
