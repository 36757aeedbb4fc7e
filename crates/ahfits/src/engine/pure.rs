use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::{ColumnMatch, ColumnSpec, FileOpenMode, FitsEngine};
use crate::hdu::{parse_fits, serialize_fits, Hdu, HduKind};
use crate::header::{card_string, find_card, make_keyword, modify_comment, update_card, Card};
use crate::status::Status;
use crate::template::{compare, Match};
use crate::tform::{parse_tform, Descriptor, Tform};
use crate::value::Value;

/// Per-column keyword prefixes renumbered when a column is inserted.
const COLUMN_KEYWORDS: &[&str] = &[
    "TTYPE", "TFORM", "TUNIT", "TNULL", "TSCAL", "TSCALE", "TZERO", "TDISP", "TDIM", "TLMIN",
    "TLMAX", "TDMIN", "TDMAX", "TCTYP", "TCUNI", "TCRVL", "TCDLT", "TCRPX", "TCROT",
];

/// Commentary cards hold 72 characters of text.
const COMMENTARY_WIDTH: usize = 72;

#[derive(Debug, Clone)]
struct MatchCursor {
    hdu: usize,
    template: String,
    case_sensitive: bool,
    /// 0-based index of the first column not yet reported.
    next: usize,
}

/// An engine that holds the whole file in memory and rewrites it on flush.
#[derive(Debug)]
pub struct PureEngine {
    path: PathBuf,
    mode: FileOpenMode,
    hdus: Vec<Hdu>,
    current: usize,
    dirty: bool,
    cursor: Option<MatchCursor>,
}

impl PureEngine {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when edits are waiting for a flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn hdu(&self) -> &Hdu {
        &self.hdus[self.current]
    }

    fn hdu_mut(&mut self) -> &mut Hdu {
        self.dirty = true;
        &mut self.hdus[self.current]
    }

    fn check_writable(&self) -> Result<(), Status> {
        match self.mode {
            FileOpenMode::ReadWrite => Ok(()),
            FileOpenMode::ReadOnly => Err(Status::READONLY_FILE),
        }
    }

    fn table(&self) -> Result<&Hdu, Status> {
        let hdu = self.hdu();
        if hdu.is_table() {
            Ok(hdu)
        } else {
            Err(Status::NOT_TABLE)
        }
    }

    fn bintable(&self) -> Result<&Hdu, Status> {
        let hdu = self.hdu();
        if hdu.kind == HduKind::BinaryTable {
            Ok(hdu)
        } else {
            Err(Status::NOT_BTABLE)
        }
    }

    fn column_names(&self) -> Result<Vec<String>, Status> {
        let hdu = self.table()?;
        Ok((1..=hdu.int_key("TFIELDS"))
            .map(|i| card_string(&hdu.cards, &format!("TTYPE{i}")).unwrap_or_default())
            .collect())
    }

    /// TFORMs of every column of the current binary table.
    fn layout(&self) -> Result<Vec<Tform>, Status> {
        let hdu = self.bintable()?;
        (1..=hdu.int_key("TFIELDS"))
            .map(|i| {
                card_string(&hdu.cards, &format!("TFORM{i}"))
                    .ok_or(Status::BAD_TFORM)
                    .and_then(|s| parse_tform(&s))
            })
            .collect()
    }

    /// First-call lookup shared by `column_number` and `match_column`.
    fn first_match(
        names: &[String],
        case_sensitive: bool,
        template: &str,
    ) -> Result<ColumnMatch, Status> {
        let matches: Vec<(usize, Match)> = names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| compare(template, name, case_sensitive).map(|m| (i, m)))
            .collect();

        let unique = |i: usize| ColumnMatch::Unique {
            name: names[i].clone(),
            number: i + 1,
        };
        let mut exact = matches.iter().filter(|(_, m)| *m == Match::Exact);
        if let Some(&(i, _)) = exact.next() {
            if exact.next().is_none() {
                return Ok(unique(i));
            }
            return Ok(ColumnMatch::NotUnique {
                name: names[i].clone(),
                number: i + 1,
            });
        }
        match matches.as_slice() {
            [] => Err(Status::COL_NOT_FOUND),
            [(i, _)] => Ok(unique(*i)),
            [(i, _), ..] => Ok(ColumnMatch::NotUnique {
                name: names[*i].clone(),
                number: i + 1,
            }),
        }
    }

    fn write_back(&self) -> Result<(), Status> {
        fs::write(&self.path, serialize_fits(&self.hdus)).map_err(|_| Status::WRITE_ERROR)
    }
}

/// Split a per-column keyword into its prefix and column number.
fn split_column_keyword(keyword: &str) -> Option<(&str, usize)> {
    let digits = keyword.find(|c: char| c.is_ascii_digit())?;
    let (prefix, number) = keyword.split_at(digits);
    if !COLUMN_KEYWORDS.contains(&prefix) {
        return None;
    }
    number.parse().ok().map(|n| (prefix, n))
}

impl FitsEngine for PureEngine {
    fn open(path: &Path, mode: FileOpenMode) -> Result<Self, Status> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode == FileOpenMode::ReadWrite)
            .open(path)
            .map_err(|_| Status::FILE_NOT_OPENED)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|_| Status::READ_ERROR)?;
        let hdus = parse_fits(&bytes)?;
        log::debug!("read {} HDUs from {}", hdus.len(), path.display());
        Ok(PureEngine {
            path: path.to_path_buf(),
            mode,
            hdus,
            current: 0,
            dirty: false,
            cursor: None,
        })
    }

    fn create(path: &Path) -> Result<Self, Status> {
        let hdus = vec![Hdu::empty_primary()];
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|_| Status::FILE_NOT_CREATED)?;
        file.write_all(&serialize_fits(&hdus))
            .map_err(|_| Status::WRITE_ERROR)?;
        Ok(PureEngine {
            path: path.to_path_buf(),
            mode: FileOpenMode::ReadWrite,
            hdus,
            current: 0,
            dirty: false,
            cursor: None,
        })
    }

    fn mode(&self) -> FileOpenMode {
        self.mode
    }

    fn num_hdus(&self) -> usize {
        self.hdus.len()
    }

    fn current_hdu(&self) -> usize {
        self.current
    }

    fn move_to_hdu(&mut self, index: usize) -> Result<HduKind, Status> {
        if index >= self.hdus.len() {
            return Err(Status::BAD_HDU_NUM);
        }
        self.current = index;
        self.cursor = None;
        Ok(self.hdu().kind)
    }

    fn move_to_extname(&mut self, extname: &str) -> Result<HduKind, Status> {
        let index = self
            .hdus
            .iter()
            .position(|hdu| {
                hdu.extname()
                    .is_some_and(|name| name.eq_ignore_ascii_case(extname.trim()))
            })
            .ok_or(Status::BAD_HDU_NUM)?;
        self.move_to_hdu(index)
    }

    fn hdu_kind(&self) -> HduKind {
        self.hdu().kind
    }

    fn read_card(&self, keyword: &str) -> Result<Card, Status> {
        find_card(&self.hdu().cards, keyword)
            .cloned()
            .ok_or(Status::KEY_NO_EXIST)
    }

    fn update_key(
        &mut self,
        keyword: &str,
        value: Value,
        comment: Option<&str>,
    ) -> Result<(), Status> {
        self.check_writable()?;
        update_card(&mut self.hdu_mut().cards, keyword, value, comment)
    }

    fn modify_comment(&mut self, keyword: &str, comment: &str) -> Result<(), Status> {
        self.check_writable()?;
        modify_comment(&mut self.hdu_mut().cards, keyword, comment)
    }

    fn write_commentary(&mut self, keyword: &str, text: &str) -> Result<(), Status> {
        self.check_writable()?;
        let chars: Vec<char> = text.chars().collect();
        let mut cards = Vec::new();
        for chunk in chars.chunks(COMMENTARY_WIDTH) {
            cards.push(Card::commentary(keyword, &chunk.iter().collect::<String>())?);
        }
        if cards.is_empty() {
            cards.push(Card::commentary(keyword, "")?);
        }
        self.hdu_mut().cards.extend(cards);
        Ok(())
    }

    fn column_number(&self, case_sensitive: bool, template: &str) -> Result<ColumnMatch, Status> {
        let names = self.column_names()?;
        Self::first_match(&names, case_sensitive, template)
    }

    fn match_column(
        &mut self,
        case_sensitive: bool,
        template: &str,
        resume: bool,
    ) -> Result<ColumnMatch, Status> {
        let names = self.column_names()?;
        let resumed = match &self.cursor {
            Some(c) if resume => {
                c.hdu == self.current && c.template == template && c.case_sensitive == case_sensitive
            }
            _ => false,
        };

        if !resumed {
            self.cursor = None;
            let found = Self::first_match(&names, case_sensitive, template)?;
            if let ColumnMatch::NotUnique { number, .. } = &found {
                self.cursor = Some(MatchCursor {
                    hdu: self.current,
                    template: template.to_string(),
                    case_sensitive,
                    next: *number,
                });
            }
            return Ok(found);
        }

        let start = self.cursor.as_ref().map_or(0, |c| c.next);
        let next = names
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, name)| compare(template, name, case_sensitive).is_some());
        match next {
            Some((i, name)) => {
                if let Some(c) = self.cursor.as_mut() {
                    c.next = i + 1;
                }
                Ok(ColumnMatch::NotUnique {
                    name: name.clone(),
                    number: i + 1,
                })
            }
            None => {
                self.cursor = None;
                Err(Status::COL_NOT_FOUND)
            }
        }
    }

    fn column_type(&self, colnum: usize) -> Result<Tform, Status> {
        let hdu = self.bintable()?;
        if colnum == 0 || colnum > hdu.int_key("TFIELDS") {
            return Err(Status::BAD_COL_NUM);
        }
        let tform = card_string(&hdu.cards, &format!("TFORM{colnum}")).ok_or(Status::BAD_TFORM)?;
        parse_tform(&tform)
    }

    fn num_columns(&self) -> Result<usize, Status> {
        Ok(self.table()?.int_key("TFIELDS"))
    }

    fn num_rows(&self) -> Result<usize, Status> {
        Ok(self.table()?.int_key("NAXIS2"))
    }

    fn read_descriptor(&self, colnum: usize, row: usize) -> Result<(u64, u64), Status> {
        let layout = self.layout()?;
        let tform = layout.get(colnum.wrapping_sub(1)).ok_or(Status::BAD_COL_NUM)?;
        let descriptor = tform.descriptor.ok_or(Status::NOT_VARI_LEN)?;
        let hdu = self.hdu();
        if row == 0 || row > hdu.int_key("NAXIS2") {
            return Err(Status::BAD_ROW_NUM);
        }

        let offset = (row - 1) * hdu.int_key("NAXIS1")
            + layout[..colnum - 1].iter().map(Tform::field_bytes).sum::<usize>();
        let cell = hdu
            .data
            .get(offset..offset + descriptor.byte_size())
            .ok_or(Status::END_OF_FILE)?;
        let (len, heap) = match descriptor {
            Descriptor::P => {
                let (a, b) = cell.split_at(4);
                (
                    u32::from_be_bytes([a[0], a[1], a[2], a[3]]) as u64,
                    u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64,
                )
            }
            Descriptor::Q => {
                let (a, b) = cell.split_at(8);
                let mut hi = [0u8; 8];
                let mut lo = [0u8; 8];
                hi.copy_from_slice(a);
                lo.copy_from_slice(b);
                (u64::from_be_bytes(hi), u64::from_be_bytes(lo))
            }
        };
        Ok((len, heap))
    }

    fn insert_column(&mut self, colnum: usize, name: &str, tform: &str) -> Result<(), Status> {
        self.check_writable()?;
        let layout = self.layout()?;
        let tfields = layout.len();
        if colnum == 0 || colnum > tfields + 1 {
            return Err(Status::BAD_COL_NUM);
        }
        let new_form = parse_tform(tform)?;

        let hdu = self.hdu();
        let naxis1 = hdu.int_key("NAXIS1");
        let rows = hdu.int_key("NAXIS2");
        let width = new_form.field_bytes();
        let split = layout[..colnum - 1].iter().map(Tform::field_bytes).sum::<usize>();

        // Renumber the keywords of every column at or after the insertion point.
        let mut cards = hdu.cards.clone();
        for card in cards.iter_mut() {
            let renamed = match split_column_keyword(card.keyword_str()) {
                Some((prefix, n)) if n >= colnum && n <= tfields => Some(format!("{prefix}{}", n + 1)),
                _ => None,
            };
            if let Some(renamed) = renamed {
                card.keyword = make_keyword(&renamed)?;
            }
        }

        let anchor = if colnum == 1 {
            cards.iter().position(|c| c.keyword_str() == "TFIELDS")
        } else {
            cards.iter().rposition(|c| {
                split_column_keyword(c.keyword_str()).is_some_and(|(_, n)| n == colnum - 1)
            })
        };
        let at = anchor.map_or(cards.len(), |i| i + 1);
        cards.insert(
            at,
            Card::new(&format!("TTYPE{colnum}"), Value::from(name), Some("label for field"))?,
        );
        cards.insert(
            at + 1,
            Card::new(
                &format!("TFORM{colnum}"),
                Value::from(tform.trim().to_ascii_uppercase()),
                Some("data format of field"),
            )?,
        );
        update_card(&mut cards, "TFIELDS", Value::Integer(tfields as i64 + 1), None)?;
        update_card(&mut cards, "NAXIS1", Value::Integer((naxis1 + width) as i64), None)?;
        if let Some(theap) = find_card(&cards, "THEAP").and_then(|c| c.value.as_ref()?.as_i64()) {
            update_card(&mut cards, "THEAP", Value::Integer(theap + (width * rows) as i64), None)?;
        }

        let table_len = naxis1 * rows;
        if hdu.data.len() < table_len {
            return Err(Status::END_OF_FILE);
        }
        let mut data = Vec::with_capacity(hdu.data.len() + width * rows);
        for row in hdu.data[..table_len].chunks(naxis1.max(1)).take(rows) {
            data.extend_from_slice(&row[..split]);
            data.resize(data.len() + width, 0);
            data.extend_from_slice(&row[split..]);
        }
        if naxis1 == 0 {
            data.resize(width * rows, 0);
        }
        data.extend_from_slice(&hdu.data[table_len..]);

        let hdu = self.hdu_mut();
        hdu.cards = cards;
        hdu.data = data;
        self.cursor = None;
        Ok(())
    }

    fn create_binary_table(
        &mut self,
        extname: &str,
        columns: &[ColumnSpec],
        rows: usize,
    ) -> Result<(), Status> {
        self.check_writable()?;
        let forms = columns
            .iter()
            .map(|c| parse_tform(&c.tform))
            .collect::<Result<Vec<_>, _>>()?;
        let naxis1: usize = forms.iter().map(Tform::field_bytes).sum();

        let mut cards = vec![
            Card::new("XTENSION", Value::from("BINTABLE"), Some("binary table extension"))?,
            Card::new("BITPIX", Value::Integer(8), Some("8-bit bytes"))?,
            Card::new("NAXIS", Value::Integer(2), Some("2-dimensional binary table"))?,
            Card::new("NAXIS1", Value::Integer(naxis1 as i64), Some("width of table in bytes"))?,
            Card::new("NAXIS2", Value::Integer(rows as i64), Some("number of rows in table"))?,
            Card::new("PCOUNT", Value::Integer(0), Some("size of special data area"))?,
            Card::new("GCOUNT", Value::Integer(1), Some("one data group (required keyword)"))?,
            Card::new("TFIELDS", Value::Integer(columns.len() as i64), Some("number of fields in each row"))?,
        ];
        for (i, col) in columns.iter().enumerate() {
            let n = i + 1;
            cards.push(Card::new(&format!("TTYPE{n}"), Value::from(col.name.as_str()), Some("label for field"))?);
            cards.push(Card::new(
                &format!("TFORM{n}"),
                Value::from(col.tform.trim().to_ascii_uppercase()),
                Some("data format of field"),
            )?);
            if let Some(unit) = &col.unit {
                cards.push(Card::new(&format!("TUNIT{n}"), Value::from(unit.as_str()), Some("physical unit of field"))?);
            }
        }
        cards.push(Card::new("EXTNAME", Value::from(extname), Some("name of this binary table extension"))?);

        self.hdus.push(Hdu {
            kind: HduKind::BinaryTable,
            cards,
            data: vec![0u8; naxis1 * rows],
        });
        self.current = self.hdus.len() - 1;
        self.cursor = None;
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Status> {
        if self.mode == FileOpenMode::ReadWrite && self.dirty {
            self.write_back()?;
            self.dirty = false;
            log::debug!("flushed {}", self.path.display());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), Status> {
        self.flush()
    }
}

impl Drop for PureEngine {
    fn drop(&mut self) {
        if self.mode == FileOpenMode::ReadWrite && self.dirty {
            let _ = self.write_back();
        }
    }
}
