//! Readers and writers for the word2vec model file formats.
//!
//! The binary format is a header line `"<vocabSize> <layerSize>\n"` followed
//! by one record per token: the UTF-8 token, a single space, `layerSize`
//! IEEE-754 f32 values, and a newline. Values are widened to f64 on read and
//! narrowed (round-to-nearest-even) on write. Files are written
//! little-endian; the byte order is selectable when reading.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, Word2VecError};
use crate::model::Model;

/// Byte order of the f32 records in a binary model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Model {
    pub fn to_bin_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_bin(&mut writer)
    }

    pub fn write_bin<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{} {}", self.vocab().len(), self.layer_size())?;
        for (i, token) in self.vocab().iter().enumerate() {
            write!(writer, "{token} ")?;
            for &value in self.vector(i) {
                writer.write_f32::<LittleEndian>(value as f32)?;
            }
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn from_bin_file(path: &Path) -> Result<Model> {
        Model::from_bin_file_with_order(path, Endian::Little)
    }

    pub fn from_bin_file_with_order(path: &Path, order: Endian) -> Result<Model> {
        let mut reader = BufReader::new(File::open(path)?);
        Model::read_bin(&mut reader, order)
    }

    pub fn read_bin<R: BufRead>(reader: &mut R, order: Endian) -> Result<Model> {
        let (vocab_size, layer_size) = read_header(reader)?;

        let mut vocab = Vec::with_capacity(vocab_size);
        let mut vectors = vec![0.0f64; vocab_size * layer_size];
        for i in 0..vocab_size {
            vocab.push(read_token(reader, i)?);
            for value in vectors[i * layer_size..][..layer_size].iter_mut() {
                let raw = match order {
                    Endian::Little => reader.read_f32::<LittleEndian>(),
                    Endian::Big => reader.read_f32::<BigEndian>(),
                };
                *value = raw.map_err(|e| truncated(e, i))? as f64;
            }
        }
        Model::from_parts(vocab, layer_size, vectors)
    }

    pub fn to_text_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_text(&mut writer)
    }

    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{} {}", self.vocab().len(), self.layer_size())?;
        for (i, token) in self.vocab().iter().enumerate() {
            write!(writer, "{token}")?;
            for value in self.vector(i) {
                write!(writer, " {value}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn from_text_file(path: &Path) -> Result<Model> {
        let mut reader = BufReader::new(File::open(path)?);
        Model::read_text(&mut reader)
    }

    pub fn read_text<R: BufRead>(reader: &mut R) -> Result<Model> {
        let (vocab_size, layer_size) = read_header(reader)?;

        let mut vocab = Vec::with_capacity(vocab_size);
        let mut vectors = Vec::with_capacity(vocab_size * layer_size);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if vocab.len() == vocab_size {
                return Err(Word2VecError::MalformedModel(format!(
                    "more than the declared {vocab_size} records"
                )));
            }
            let mut fields = line.split_whitespace();
            let token = fields.next().ok_or_else(|| {
                Word2VecError::MalformedModel(format!("record {i} has no token"))
            })?;
            vocab.push(token.to_string());
            let mut read = 0usize;
            for field in fields {
                let value: f64 = field.parse().map_err(|_| {
                    Word2VecError::MalformedModel(format!(
                        "record {i}: unparseable value '{field}'"
                    ))
                })?;
                vectors.push(value);
                read += 1;
            }
            if read != layer_size {
                return Err(Word2VecError::MalformedModel(format!(
                    "record {i} has {read} values, expected {layer_size}"
                )));
            }
        }
        if vocab.len() != vocab_size {
            return Err(Word2VecError::MalformedModel(format!(
                "header declared {vocab_size} records but the file has {}",
                vocab.len()
            )));
        }
        Model::from_parts(vocab, layer_size, vectors)
    }
}

fn read_header<R: BufRead>(reader: &mut R) -> Result<(usize, usize)> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut fields = line.split_whitespace();
    let vocab_size = parse_header_field(fields.next(), "vocabulary size")?;
    let layer_size = parse_header_field(fields.next(), "layer size")?;
    Ok((vocab_size, layer_size))
}

fn parse_header_field(field: Option<&str>, what: &str) -> Result<usize> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| Word2VecError::MalformedModel(format!("header is missing the {what}")))
}

/// Read a space-terminated token, tolerating the newline that terminates the
/// previous record.
fn read_token<R: BufRead>(reader: &mut R, record: usize) -> Result<String> {
    let mut buf = Vec::new();
    reader.read_until(b' ', &mut buf)?;
    if buf.pop() != Some(b' ') {
        return Err(Word2VecError::MalformedModel(format!(
            "unexpected end of file reading the token of record {record}"
        )));
    }
    while buf.first() == Some(&b'\n') || buf.first() == Some(&b'\r') {
        buf.remove(0);
    }
    String::from_utf8(buf).map_err(|_| {
        Word2VecError::MalformedModel(format!("record {record} token is not valid UTF-8"))
    })
}

fn truncated(e: std::io::Error, record: usize) -> Word2VecError {
    if e.kind() == ErrorKind::UnexpectedEof {
        Word2VecError::MalformedModel(format!("unexpected end of file in record {record}"))
    } else {
        Word2VecError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn model() -> Model {
        Model::from_parts(
            vec!["alpha".into(), "beta".into(), "gamma".into()],
            3,
            vec![
                0.25, -1.5, 3.0, //
                0.125, 0.0625, -42.0, //
                1e-3, 2.5e4, -0.875,
            ],
        )
        .unwrap()
    }

    #[test]
    fn bin_roundtrip_within_f32_tolerance() {
        let m = model();
        let mut buf = Vec::new();
        m.write_bin(&mut buf).unwrap();
        let back = Model::read_bin(&mut Cursor::new(&buf), Endian::Little).unwrap();
        assert_eq!(back.vocab(), m.vocab());
        assert_eq!(back.layer_size(), m.layer_size());
        for (a, b) in m.vectors().iter().zip(back.vectors()) {
            assert!((a - b).abs() < 1e-4 * a.abs().max(1.0), "{a} vs {b}");
        }
    }

    #[test]
    fn bin_reader_honors_big_endian() {
        let m = model();
        let mut buf = Vec::new();
        writeln!(buf, "{} {}", m.vocab().len(), m.layer_size()).unwrap();
        for (i, token) in m.vocab().iter().enumerate() {
            write!(buf, "{token} ").unwrap();
            for &v in m.vector(i) {
                buf.write_f32::<BigEndian>(v as f32).unwrap();
            }
            buf.push(b'\n');
        }
        let back = Model::read_bin(&mut Cursor::new(&buf), Endian::Big).unwrap();
        assert_eq!(back.vocab(), m.vocab());
        assert!((back.vector(1)[2] - (-42.0)).abs() < 1e-4);
    }

    #[test]
    fn bin_records_do_not_require_the_trailing_newline() {
        let m = Model::from_parts(vec!["x".into(), "y".into()], 1, vec![1.0, 2.0]).unwrap();
        let mut buf = Vec::new();
        buf.extend_from_slice(b"2 1\n");
        buf.extend_from_slice(b"x ");
        buf.write_f32::<LittleEndian>(1.0).unwrap();
        // No newline between records.
        buf.extend_from_slice(b"y ");
        buf.write_f32::<LittleEndian>(2.0).unwrap();
        let back = Model::read_bin(&mut Cursor::new(&buf), Endian::Little).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn truncated_bin_file_is_malformed() {
        let m = model();
        let mut buf = Vec::new();
        m.write_bin(&mut buf).unwrap();
        buf.truncate(buf.len() - 6);
        let err = Model::read_bin(&mut Cursor::new(&buf), Endian::Little).unwrap_err();
        assert!(matches!(err, Word2VecError::MalformedModel(_)));
    }

    #[test]
    fn garbage_header_is_malformed() {
        let err = Model::read_bin(&mut Cursor::new(b"not a header\n"), Endian::Little)
            .unwrap_err();
        assert!(matches!(err, Word2VecError::MalformedModel(_)));
    }

    #[test]
    fn text_roundtrip_is_exact() {
        let m = model();
        let mut buf = Vec::new();
        m.write_text(&mut buf).unwrap();
        let back = Model::read_text(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn text_reader_rejects_wrong_record_width() {
        let text = "2 3\na 1 2 3\nb 1 2\n";
        let err = Model::read_text(&mut Cursor::new(text.as_bytes())).unwrap_err();
        assert!(matches!(err, Word2VecError::MalformedModel(_)));
    }

    #[test]
    fn text_reader_rejects_missing_records() {
        let text = "3 2\na 1 2\nb 3 4\n";
        let err = Model::read_text(&mut Cursor::new(text.as_bytes())).unwrap_err();
        assert!(matches!(err, Word2VecError::MalformedModel(_)));
    }

    #[test]
    fn text_reader_tolerates_trailing_blank_lines() {
        let text = "2 2\na 1 2\nb 3 4\n\n";
        let m = Model::read_text(&mut Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(m.vocab(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let m = model();

        let bin = dir.path().join("model.bin");
        m.to_bin_file(&bin).unwrap();
        let from_bin = Model::from_bin_file(&bin).unwrap();
        assert_eq!(from_bin.vocab(), m.vocab());

        let txt = dir.path().join("model.txt");
        m.to_text_file(&txt).unwrap();
        assert_eq!(Model::from_text_file(&txt).unwrap(), m);
    }
}
