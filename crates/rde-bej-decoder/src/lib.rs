//! BEJ → JSON decoding.
//!
//! Recursive descent over a BEJ byte stream, resolving property names and
//! enum members against a pair of binary dictionaries, the mirror image of
//! `rde-bej-encoder`.

mod bindings;
mod real;

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use rde_bej_encoder::{DEFAULT_BEJ_VERSION, PdrMap};
use rde_diagnostics::RdeError;
use rde_dictionary::{Dictionary, DictionaryEntry, ReaderError};
use rde_nnint::{self as nnint, NnintError};
use rde_sflv::{
    BejFormat, Selector, Seq, ValueError, read_sflv, unpack_boolean, unpack_enum, unpack_integer,
    unpack_resource_link, unpack_string,
};

/// A dictionary entry paired with its resolved name, keyed by sequence
/// number within the enclosing sub-tree.
#[derive(Debug, Clone)]
struct NamedEntry {
    entry: DictionaryEntry,
    name: String,
}

type SeqMap = IndexMap<u16, NamedEntry>;

fn reader_err(err: ReaderError) -> RdeError {
    RdeError::BejDecode {
        message: err.to_string(),
    }
}

fn value_err(err: ValueError) -> RdeError {
    RdeError::BejDecode {
        message: err.to_string(),
    }
}

fn nnint_err(err: NnintError) -> RdeError {
    RdeError::BejDecode {
        message: err.to_string(),
    }
}

fn missing_seq(seq: u16) -> RdeError {
    RdeError::BejDecode {
        message: format!("no dictionary entry for sequence number {seq} in this context"),
    }
}

/// Decodes a complete BEJ stream (7-byte header plus body) into JSON.
///
/// `schema` backs the major-schema class; `error` backs the error-schema
/// class. `pdr_map` resolves `ResourceLink` values back to their original
/// `@odata.id` strings. `deferred_bindings` resolves deferred-binding
/// tokens (`%L3`, `%M`, ...) embedded in string values.
///
/// # Errors
///
/// Returns [`RdeError::BejDecode`] if the header is malformed, a property
/// sequence number has no matching dictionary entry, a container's declared
/// length does not match the bytes its children actually consume, or any
/// primitive value is malformed.
pub fn decode(
    input: &[u8],
    schema: &Dictionary,
    annotation: &Dictionary,
    error: &Dictionary,
    pdr_map: &PdrMap,
    deferred_bindings: &HashMap<String, String>,
) -> Result<Value, RdeError> {
    if input.len() < 7 {
        return Err(RdeError::BejDecode {
            message: format!("BEJ stream is shorter than the 7-byte header ({} bytes)", input.len()),
        });
    }
    let version = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
    if version != DEFAULT_BEJ_VERSION {
        return Err(RdeError::BejDecode {
            message: format!("unsupported BEJ version tag {version:#010x}"),
        });
    }
    let flags = u16::from_le_bytes([input[4], input[5]]);
    if flags != 0 {
        return Err(RdeError::BejDecode {
            message: format!("unsupported BEJ header flags {flags:#06x}"),
        });
    }
    let body = &input[7..];

    let dict = match input[6] {
        0x00 => schema,
        0x04 => error,
        other => {
            return Err(RdeError::BejDecode {
                message: format!("unrecognized SchemaClass byte {other:#04x}"),
            });
        }
    };

    let root = root_seq_map(dict)?;
    let (members, _consumed) = decode_members(
        body,
        dict,
        annotation,
        &root,
        Selector::Major,
        1,
        false,
        false,
        pdr_map,
        deferred_bindings,
    )?;
    let (_, value) = members.into_iter().next().ok_or_else(|| RdeError::BejDecode {
        message: "BEJ stream had no top-level value".to_string(),
    })?;
    tracing::debug!(bytes = input.len(), "decoded BEJ stream");
    Ok(value)
}

fn root_seq_map(dict: &Dictionary) -> Result<SeqMap, RdeError> {
    let entry = dict
        .root()
        .next()
        .ok_or_else(|| RdeError::BejDecode {
            message: "dictionary has no root entry".to_string(),
        })?
        .map_err(reader_err)?;
    let mut map = SeqMap::new();
    map.insert(entry.sequence_number, NamedEntry {
        entry,
        name: String::new(),
    });
    Ok(map)
}

fn child_seq_map(dict: &Dictionary, entry: DictionaryEntry) -> Result<SeqMap, RdeError> {
    // Array rows always carry the UNBOUNDED_CHILD_COUNT sentinel on the
    // wire (see rde_dictionary::writer); the single element-type row that
    // follows is the only real child regardless of that sentinel value.
    let child_count = if entry.format == BejFormat::Array { 1 } else { entry.child_count };
    let mut map = SeqMap::new();
    for child in dict.at(entry.child_pointer_offset, child_count) {
        let child = child.map_err(reader_err)?;
        let name = dict.name_of(child).map_err(reader_err)?.to_string();
        map.insert(child.sequence_number, NamedEntry { entry: child, name });
    }
    Ok(map)
}

/// The annotation dictionary's top-level named properties (`@odata.id`,
/// `@Message.ExtendedInfo`, ...), keyed by sequence number.
fn annotation_root_entries(annotation: &Dictionary) -> Result<SeqMap, RdeError> {
    let root = root_seq_map(annotation)?;
    let root_entry = root
        .values()
        .next()
        .ok_or_else(|| RdeError::BejDecode {
            message: "annotation dictionary has no root entry".to_string(),
        })?
        .entry;
    child_seq_map(annotation, root_entry)
}

fn annotation_name_by_seq(annotation: &Dictionary, seq: u16) -> Result<String, RdeError> {
    annotation_root_entries(annotation)?
        .get(&seq)
        .map(|named| named.name.clone())
        .ok_or_else(|| missing_seq(seq))
}

fn enum_member_name(dict: &Dictionary, entry: DictionaryEntry, value: u64) -> Result<String, RdeError> {
    for member in dict.at(entry.child_pointer_offset, entry.child_count) {
        let member = member.map_err(reader_err)?;
        if u64::from(member.sequence_number) == value {
            return dict.name_of(member).map(str::to_string).map_err(reader_err);
        }
    }
    Err(RdeError::BejDecode {
        message: format!("enum value {value} has no matching member"),
    })
}

fn decode_name(
    annotation: &Dictionary,
    seq: u16,
    selector: Selector,
    entries_by_seq: &SeqMap,
    entries_by_seq_selector: Selector,
) -> Result<Option<String>, RdeError> {
    let name = if selector == entries_by_seq_selector {
        entries_by_seq.get(&seq).ok_or_else(|| missing_seq(seq))?.name.clone()
    } else if selector == Selector::Annotation {
        annotation_name_by_seq(annotation, seq)?
    } else {
        entries_by_seq.get(&seq).ok_or_else(|| missing_seq(seq))?.name.clone()
    };
    Ok(if name.is_empty() { None } else { Some(name) })
}

#[allow(clippy::too_many_arguments)]
fn decode_members(
    input: &[u8],
    schema_dict: &Dictionary,
    annotation: &Dictionary,
    entries_by_seq: &SeqMap,
    entries_by_seq_selector: Selector,
    prop_count: usize,
    is_seq_array_index: bool,
    add_name: bool,
    pdr_map: &PdrMap,
    deferred_bindings: &HashMap<String, String>,
) -> Result<(Vec<(Option<String>, Value)>, usize), RdeError> {
    let mut offset = 0;
    let mut out = Vec::with_capacity(prop_count);

    for _ in 0..prop_count {
        let (header, value_bytes, consumed) = read_sflv(&input[offset..]).map_err(|err| RdeError::BejDecode {
            message: err.to_string(),
        })?;
        offset += consumed;
        let selector = header.seq.selector;
        let raw_seq = header.seq.sequence_number;
        #[allow(clippy::cast_possible_truncation)]
        let seq = raw_seq as u16;

        match header.format {
            BejFormat::Set => {
                let seq = if is_seq_array_index { 0 } else { seq };
                let dict = if selector == Selector::Major { schema_dict } else { annotation };
                let entry = entries_by_seq.get(&seq).ok_or_else(|| missing_seq(seq))?.entry;
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let (count, count_len) = nnint::unpack(value_bytes).map_err(nnint_err)?;
                let body = &value_bytes[count_len..];
                let child_map = child_seq_map(dict, entry)?;
                #[allow(clippy::cast_possible_truncation)]
                let (members, consumed_inner) = decode_members(
                    body,
                    schema_dict,
                    annotation,
                    &child_map,
                    selector,
                    count as usize,
                    false,
                    true,
                    pdr_map,
                    deferred_bindings,
                )?;
                if consumed_inner != body.len() {
                    return Err(RdeError::BejDecode {
                        message: "set length does not match the bytes its properties consumed".to_string(),
                    });
                }
                let mut object = Map::new();
                for (key, val) in members {
                    let key = key.ok_or_else(|| RdeError::BejDecode {
                        message: "set member is missing a property name".to_string(),
                    })?;
                    object.insert(key, val);
                }
                out.push((name, Value::Object(object)));
            }
            BejFormat::Array => {
                let seq = if is_seq_array_index { 0 } else { seq };
                let dict = if selector == Selector::Major { schema_dict } else { annotation };
                let local_map = if entries_by_seq_selector != selector {
                    root_seq_map(dict)?
                } else {
                    entries_by_seq.clone()
                };
                let entry = local_map.get(&seq).ok_or_else(|| missing_seq(seq))?.entry;
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let (count, count_len) = nnint::unpack(value_bytes).map_err(nnint_err)?;
                let body = &value_bytes[count_len..];
                let element_map = child_seq_map(dict, entry)?;
                #[allow(clippy::cast_possible_truncation)]
                let (members, consumed_inner) = decode_members(
                    body,
                    schema_dict,
                    annotation,
                    &element_map,
                    selector,
                    count as usize,
                    true,
                    false,
                    pdr_map,
                    deferred_bindings,
                )?;
                if consumed_inner != body.len() {
                    return Err(RdeError::BejDecode {
                        message: "array length does not match the bytes its elements consumed".to_string(),
                    });
                }
                let array = members.into_iter().map(|(_, value)| value).collect();
                out.push((name, Value::Array(array)));
            }
            BejFormat::PropertyAnnotation => {
                let prop_seq = seq;
                let (inner_raw_seq, _) = nnint::unpack(value_bytes).map_err(nnint_err)?;
                let inner_seq = Seq::from_raw(inner_raw_seq);
                #[allow(clippy::cast_possible_truncation)]
                let annot_seq = inner_seq.sequence_number as u16;
                let prop_name = entries_by_seq
                    .get(&prop_seq)
                    .ok_or_else(|| missing_seq(prop_seq))?
                    .name
                    .clone();
                let annot_name = annotation_name_by_seq(annotation, annot_seq)?;
                let annotation_root = annotation_root_entries(annotation)?;
                let (members, _) = decode_members(
                    value_bytes,
                    schema_dict,
                    annotation,
                    &annotation_root,
                    Selector::Annotation,
                    1,
                    false,
                    false,
                    pdr_map,
                    deferred_bindings,
                )?;
                let (_, value) = members.into_iter().next().ok_or_else(|| RdeError::BejDecode {
                    message: "property annotation had no inner value".to_string(),
                })?;
                out.push((Some(format!("{prop_name}{annot_name}")), value));
            }
            BejFormat::String => {
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let text = unpack_string(value_bytes).map_err(value_err)?;
                let text = if header.flags.deferred_binding {
                    bindings::resolve(&text, deferred_bindings)
                } else {
                    text
                };
                out.push((name, Value::String(text)));
            }
            BejFormat::Integer => {
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let value = unpack_integer(value_bytes).map_err(value_err)?;
                out.push((name, Value::from(value)));
            }
            BejFormat::Real => {
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let real = rde_sflv::unpack_real(value_bytes).map_err(value_err)?;
                let parsed = real::real_to_f64(real)?;
                let number = serde_json::Number::from_f64(parsed).ok_or_else(|| RdeError::BejDecode {
                    message: format!("real value {parsed} is not representable as JSON"),
                })?;
                out.push((name, Value::Number(number)));
            }
            BejFormat::Boolean => {
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let &byte = value_bytes.first().ok_or_else(|| RdeError::BejDecode {
                    message: "boolean value is empty".to_string(),
                })?;
                let value = unpack_boolean(byte).map_err(value_err)?;
                out.push((name, Value::Bool(value)));
            }
            BejFormat::ResourceLink => {
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let pdr = unpack_resource_link(value_bytes).map_err(value_err)?;
                let uri = pdr_map.uri_for(pdr).unwrap_or_default().to_string();
                out.push((name, Value::String(uri)));
            }
            BejFormat::Enum => {
                let seq = if is_seq_array_index { 0 } else { seq };
                let dict = if selector == Selector::Major { schema_dict } else { annotation };
                let value = unpack_enum(value_bytes).map_err(value_err)?;
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                let entry = entries_by_seq.get(&seq).ok_or_else(|| missing_seq(seq))?.entry;
                let member_name = enum_member_name(dict, entry, value)?;
                out.push((name, Value::String(member_name)));
            }
            BejFormat::Null => {
                let name = if add_name {
                    decode_name(annotation, seq, selector, entries_by_seq, entries_by_seq_selector)?
                } else {
                    None
                };
                out.push((name, Value::Null));
            }
            other => {
                return Err(RdeError::BejDecode {
                    message: format!("format {other:?} cannot appear as a top-level SFLV element"),
                });
            }
        }
    }

    Ok((out, offset))
}
