//! Helpers for reading Plutus style CBOR and for writing the canonical form of datums.
//!
//! Datums produced on chain are `PlutusData`: records are wrapped in a constructor tag
//! (`121..=127`), containers are frequently indefinite and long byte strings are chunked.
//! Datums re-encoded by this crate use definite containers and no record tags; enum values
//! are the constructor tag followed by an empty array.

use pallas_codec::minicbor::{
    self,
    data::{Tag, Type},
    decode, encode,
    encode::Write,
    Decoder, Encoder,
};

use crate::error::CardanoClientError;

/// Tag number of constructor 0 of a `PlutusData` value
pub const CONSTR_TAG_BASE: u64 = 121;

/// Largest constructor index encoded with the compact tag range `121..=127`
const COMPACT_CONSTR_MAX: u64 = 6;

/// Tag base of the extended constructor range `1280..=1400` (constructors 7 to 127)
const EXTENDED_CONSTR_TAG_BASE: u64 = 1280;

/// Set tag used by Conway for certificate lists and friends
pub const SET_TAG: u64 = 258;

/// Tag of encoded CBOR (`#6.24(bytes .cbor any)`)
pub const ENCODED_CBOR_TAG: u64 = 24;

/// Maps a constructor tag number to its index
const fn constr_index(tag: u64) -> Option<u64> {
    match tag {
        CONSTR_TAG_BASE..=127 => Some(tag - CONSTR_TAG_BASE),
        EXTENDED_CONSTR_TAG_BASE..=1400 => Some(tag - EXTENDED_CONSTR_TAG_BASE + COMPACT_CONSTR_MAX + 1),
        _ => None,
    }
}

/// Maps a constructor index to its tag
#[must_use]
pub fn constr_tag(index: u64) -> Tag {
    if index <= COMPACT_CONSTR_MAX {
        Tag::new(CONSTR_TAG_BASE + index)
    } else {
        Tag::new(EXTENDED_CONSTR_TAG_BASE + index - COMPACT_CONSTR_MAX - 1)
    }
}

/// A definite or indefinite container being read item by item
#[derive(Debug)]
pub struct Seq {
    len: Option<u64>,
    read: u64,
}

impl Seq {
    /// Advances to the next item, returns `false` when the container is exhausted
    ///
    /// # Errors
    /// Fails if the input ends unexpectedly.
    pub fn next(&mut self, d: &Decoder<'_>) -> Result<bool, decode::Error> {
        let more = match self.len {
            Some(len) => self.read < len,
            None => d.datatype()? != Type::Break,
        };
        if more {
            self.read += 1;
        }
        Ok(more)
    }

    /// Requires the next item to exist
    ///
    /// # Errors
    /// Fails if the container has no more items.
    pub fn expect(&mut self, d: &Decoder<'_>, what: &str) -> Result<(), decode::Error> {
        if self.next(d)? {
            Ok(())
        } else {
            Err(decode::Error::message(format!("missing field {what}")))
        }
    }

    /// Consumes the end of the container, rejecting trailing items
    ///
    /// # Errors
    /// Fails if items are left.
    pub fn finish(self, d: &mut Decoder<'_>) -> Result<(), decode::Error> {
        match self.len {
            Some(len) if self.read == len => Ok(()),
            Some(len) => Err(decode::Error::message(format!(
                "expected {} items, container has {len}",
                self.read
            ))),
            None => {
                if d.datatype()? != Type::Break {
                    return Err(decode::Error::message("trailing items in container"));
                }
                d.set_position(d.position() + 1);
                Ok(())
            }
        }
    }

    /// Number of items in a definite container
    #[must_use]
    pub const fn len(&self) -> Option<u64> {
        self.len
    }

    /// Number of items read so far
    #[must_use]
    pub const fn read(&self) -> u64 {
        self.read
    }
}

/// Skips a constructor tag if one is next, returning its index
///
/// # Errors
/// Fails if the input ends unexpectedly.
pub fn skip_constr(d: &mut Decoder<'_>) -> Result<Option<u64>, decode::Error> {
    if d.datatype()? != Type::Tag {
        return Ok(None);
    }
    let tag = d.probe().tag()?;
    match constr_index(tag.as_u64()) {
        Some(index) => {
            d.tag()?;
            Ok(Some(index))
        }
        None => Ok(None),
    }
}

/// Opens a record: an optional constructor tag followed by an array
///
/// # Errors
/// Fails if no array follows.
pub fn open_record(d: &mut Decoder<'_>) -> Result<Seq, decode::Error> {
    skip_constr(d)?;
    open_array(d)
}

/// Opens an array, definite or not
///
/// # Errors
/// Fails if no array follows.
pub fn open_array(d: &mut Decoder<'_>) -> Result<Seq, decode::Error> {
    Ok(Seq {
        len: d.array()?,
        read: 0,
    })
}

/// Opens a map, definite or not
///
/// # Errors
/// Fails if no map follows.
pub fn open_map(d: &mut Decoder<'_>) -> Result<Seq, decode::Error> {
    Ok(Seq {
        len: d.map()?,
        read: 0,
    })
}

/// Reads a list of items with `item`
///
/// # Errors
/// Fails if no array follows or an item fails to decode.
pub fn list<'b, T>(
    d: &mut Decoder<'b>,
    mut item: impl FnMut(&mut Decoder<'b>) -> Result<T, decode::Error>,
) -> Result<Vec<T>, decode::Error> {
    let mut seq = open_array(d)?;
    let mut out = Vec::new();
    while seq.next(d)? {
        out.push(item(d)?);
    }
    seq.finish(d)?;
    Ok(out)
}

/// Reads a map into key/value pairs, preserving the encoded order
///
/// # Errors
/// Fails if no map follows or an entry fails to decode.
pub fn map<'b, K, V>(
    d: &mut Decoder<'b>,
    mut key: impl FnMut(&mut Decoder<'b>) -> Result<K, decode::Error>,
    mut value: impl FnMut(&mut Decoder<'b>) -> Result<V, decode::Error>,
) -> Result<Vec<(K, V)>, decode::Error> {
    let mut seq = open_map(d)?;
    let mut out = Vec::new();
    while seq.next(d)? {
        let k = key(d)?;
        out.push((k, value(d)?));
    }
    seq.finish(d)?;
    Ok(out)
}

/// Reads a byte string, joining the chunks of an indefinite one
///
/// # Errors
/// Fails if no byte string follows.
pub fn bytes(d: &mut Decoder<'_>) -> Result<Vec<u8>, decode::Error> {
    if d.datatype()? == Type::BytesIndef {
        let mut out = Vec::new();
        for chunk in d.bytes_iter()? {
            out.extend_from_slice(chunk?);
        }
        return Ok(out);
    }
    Ok(d.bytes()?.to_vec())
}

/// Reads a text string, joining the chunks of an indefinite one
///
/// # Errors
/// Fails if no text string follows.
pub fn text(d: &mut Decoder<'_>) -> Result<String, decode::Error> {
    if d.datatype()? == Type::StringIndef {
        let mut out = String::new();
        for chunk in d.str_iter()? {
            out.push_str(chunk?);
        }
        return Ok(out);
    }
    Ok(d.str()?.to_owned())
}

/// Reads a constructor-tagged enum value with no fields and returns the tag number
///
/// # Errors
/// Fails if no constructor tag follows or the value carries fields.
pub fn enum_tag(d: &mut Decoder<'_>) -> Result<u64, decode::Error> {
    let tag = d.tag()?.as_u64();
    if constr_index(tag).is_none() {
        return Err(decode::Error::message(format!("tag {tag} is not a constructor tag")));
    }
    let mut fields = open_array(d)?;
    while fields.next(d)? {
        d.skip()?;
    }
    fields.finish(d)?;
    Ok(tag)
}

/// Writes a constructor-tagged enum value with no fields
///
/// # Errors
/// Propagates writer errors.
pub fn write_enum_tag<W: Write>(e: &mut Encoder<W>, tag: u64) -> Result<(), encode::Error<W::Error>> {
    e.tag(Tag::new(tag))?.array(0)?;
    Ok(())
}

/// Encodes a value into a fresh buffer
///
/// # Errors
/// Returns [`CardanoClientError::InvalidDatum`] if encoding fails.
pub fn to_vec<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, CardanoClientError> {
    minicbor::to_vec(value).map_err(|e| CardanoClientError::InvalidDatum(e.to_string()))
}

/// Decodes a value, rejecting trailing bytes
///
/// # Errors
/// Returns [`CardanoClientError::Cbor`] if decoding fails.
pub fn from_slice<'b, T: minicbor::Decode<'b, ()>>(bytes: &'b [u8]) -> Result<T, CardanoClientError> {
    let mut d = Decoder::new(bytes);
    let value = d.decode()?;
    if d.position() != bytes.len() {
        return Err(decode::Error::message("trailing bytes after value").into());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plutus_record_with_chunked_bytes() {
        // 121([_ h'0102' h'03', 7])  with an indefinite array and chunked bytes
        let input = hex::decode("d8799f5f420102410 3ff07ff".replace(' ', "")).unwrap();
        let mut d = Decoder::new(&input);
        let mut record = open_record(&mut d).unwrap();
        assert_eq!(record.len(), None);
        record.expect(&d, "bytes").unwrap();
        assert_eq!(bytes(&mut d).unwrap(), vec![1, 2, 3]);
        record.expect(&d, "number").unwrap();
        assert_eq!(d.u64().unwrap(), 7);
        assert!(!record.next(&d).unwrap());
        record.finish(&mut d).unwrap();
        assert_eq!(d.position(), input.len());
    }

    #[test]
    fn definite_record_without_tag() {
        let input = hex::decode("824101 07".replace(' ', "")).unwrap();
        let mut d = Decoder::new(&input);
        let mut record = open_record(&mut d).unwrap();
        assert_eq!(record.len(), Some(2));
        record.expect(&d, "bytes").unwrap();
        assert_eq!(bytes(&mut d).unwrap(), vec![1]);
        record.expect(&d, "number").unwrap();
        d.u64().unwrap();
        assert!(record.expect(&d, "extra").is_err());
    }

    #[test]
    fn finish_rejects_unread_items() {
        let input = hex::decode("820102").unwrap();
        let mut d = Decoder::new(&input);
        let mut seq = open_array(&mut d).unwrap();
        seq.next(&d).unwrap();
        d.u64().unwrap();
        assert!(seq.finish(&mut d).is_err());
    }

    #[test]
    fn enum_tags_accept_both_empty_array_forms() {
        for input in ["d87b80", "d87b9fff"] {
            let bytes = hex::decode(input).unwrap();
            let mut d = Decoder::new(&bytes);
            assert_eq!(enum_tag(&mut d).unwrap(), 123);
            assert_eq!(d.position(), bytes.len());
        }

        let mut e = Encoder::new(Vec::new());
        write_enum_tag(&mut e, 124).unwrap();
        assert_eq!(hex::encode(e.into_writer()), "d87c80");
    }

    #[test]
    fn constructor_tags_cover_extended_range() {
        assert_eq!(constr_tag(0).as_u64(), 121);
        assert_eq!(constr_tag(6).as_u64(), 127);
        assert_eq!(constr_tag(7).as_u64(), 1280);
        assert_eq!(constr_index(1281), Some(8));
        assert_eq!(constr_index(258), None);
    }
}
