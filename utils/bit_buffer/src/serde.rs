use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize};

use alloc::vec::Vec;

use crate::BitBuffer;

impl Serialize for BitBuffer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.len)?;
        seq.serialize_element(&self.words)?;
        seq.end()
    }
}

struct BitBufferDeserializer;

impl<'de> Visitor<'de> for BitBufferDeserializer {
    type Value = BitBuffer;

    fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.write_str("a bit length followed by the backing words")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let len: usize = seq
            .next_element()?
            .ok_or_else(|| serde::de::Error::custom("BitBuffer is missing its bit length"))?;
        let words: Vec<u64> = seq
            .next_element()?
            .ok_or_else(|| serde::de::Error::custom("BitBuffer is missing its backing words"))?;

        if words.len() != len.div_ceil(64) {
            return Err(serde::de::Error::custom(
                "BitBuffer bit length does not match its backing words",
            ));
        }

        Ok(BitBuffer { words, len })
    }
}

impl<'de> Deserialize<'de> for BitBuffer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(BitBufferDeserializer)
    }
}
