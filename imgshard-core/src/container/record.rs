//! One training example: the image file as stored on disk, its label, and
//! its file name. Image bytes are embedded verbatim; decoding is left to
//! whoever consumes the shard.

use std::fmt;
use std::path::Path;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ShardError};
use crate::index::classes::Sample;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(serialize_with = "ser_bytes", deserialize_with = "de_bytes")]
    pub image: Vec<u8>,
    pub label: i64,
    pub filename: String,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("image", &format_args!("<{} bytes>", self.image.len()))
            .field("label", &self.label)
            .field("filename", &self.filename)
            .finish()
    }
}

// CBOR byte string instead of an array of small ints
fn ser_bytes<S: Serializer>(v: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_bytes(v)
}

fn de_bytes<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<u8>, D::Error> {
    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte string")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<u8>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(b) = seq.next_element::<u8>()? {
                out.push(b);
            }
            Ok(out)
        }
    }

    d.deserialize_byte_buf(BytesVisitor)
}

impl Record {
    /// Read `path` and wrap it with its label. Read failures are `SampleRead`.
    pub fn from_file(path: &Path, label: u32) -> Result<Self> {
        let image = std::fs::read(path).map_err(|source| ShardError::SampleRead {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            image,
            label: i64::from(label),
            filename,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.image.len() + self.filename.len() + 32);
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ShardError::Format(format!("record encode: {e}")))?;
        Ok(buf)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(payload)
            .map_err(|e| ShardError::Format(format!("record decode: {e}")))
    }
}

/// Serialized payload for one sample.
pub fn encode_sample(sample: &Sample) -> Result<Vec<u8>> {
    Record::from_file(&sample.path, sample.label)?.encode()
}
