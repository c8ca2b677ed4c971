use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::container::header::ShardHeader;
use crate::container::record::Record;
use crate::error::{Result, ShardError};
use crate::util::varint::get_uvarint;

/// Sequential reader over the records of one shard file.
pub struct ShardReader<R: Read> {
    inner: R,
    done: bool,
}

impl ShardReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path)?;
        Self::new(BufReader::new(f))
    }
}

impl<R: Read> ShardReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        ShardHeader::read_from(&mut inner)?;
        Ok(Self { inner, done: false })
    }

    /// Next raw payload, or `None` at end of file.
    pub fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = get_uvarint(&mut self.inner)? else {
            return Ok(None);
        };
        // the prefix is untrusted; only allocate what the stream actually holds
        let mut buf = Vec::new();
        (&mut self.inner).take(len).read_to_end(&mut buf)?;
        if buf.len() as u64 != len {
            return Err(ShardError::Format(format!(
                "truncated record: {len} bytes expected, {} present",
                buf.len()
            )));
        }
        Ok(Some(buf))
    }
}

impl<R: Read> Iterator for ShardReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.next_payload() {
            Ok(Some(p)) => Some(Record::decode(&p)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        };
        // stop after the first error; the stream position is unreliable
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::varint::put_uvarint;

    fn shard_bytes(records: &[Record]) -> Vec<u8> {
        let mut buf = Vec::new();
        ShardHeader::default().write_to(&mut buf).unwrap();
        for r in records {
            let p = r.encode().unwrap();
            put_uvarint(&mut buf, p.len() as u64);
            buf.extend_from_slice(&p);
        }
        buf
    }

    #[test]
    fn reads_records_in_order() {
        let recs = vec![
            Record {
                image: vec![1, 2, 3],
                label: 0,
                filename: "a.png".into(),
            },
            Record {
                image: vec![],
                label: 7,
                filename: "b.jpg".into(),
            },
        ];
        let got: Vec<_> = ShardReader::new(&shard_bytes(&recs)[..])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(got, recs);
    }

    #[test]
    fn truncated_record_is_reported_once() {
        let rec = Record {
            image: vec![9; 40],
            label: 1,
            filename: "c.png".into(),
        };
        let mut bytes = shard_bytes(&[rec]);
        bytes.truncate(bytes.len() - 5);
        let mut rd = ShardReader::new(&bytes[..]).unwrap();
        assert!(matches!(rd.next(), Some(Err(ShardError::Format(_)))));
        assert!(rd.next().is_none());
    }

    #[test]
    fn oversized_length_prefix_is_a_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("bogus.imgshard");
        let mut bytes = Vec::new();
        ShardHeader::default().write_to(&mut bytes).unwrap();
        put_uvarint(&mut bytes, 1 << 40);
        bytes.extend_from_slice(b"short");
        std::fs::write(&p, bytes).unwrap();

        let err = crate::list::list(&p).unwrap_err();
        assert!(matches!(err, ShardError::Format(ref m) if m.contains("5 present")));
    }
}
