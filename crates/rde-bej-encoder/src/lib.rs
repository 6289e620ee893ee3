//! JSON → BEJ encoding.
//!
//! Drives a recursive descent over a [`serde_json::Value`], guided by a
//! major-schema dictionary and an annotation dictionary, producing a BEJ
//! byte stream plus the [`PdrMap`] assigned to any `@odata.id`/resource-link
//! values encountered along the way.

mod frame;
mod pdr;
mod real;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use rde_diagnostics::RdeError;
use rde_dictionary::{Dictionary, DictionaryEntry, ReaderError, encode_schema_version};
use rde_sflv::{
    BejFormat, Seq, Selector, ValueFlags, pack_boolean, pack_enum, pack_integer,
    pack_resource_link, pack_sflv, pack_string,
};

pub use frame::FrameBuilder;
pub use pdr::PdrMap;
pub use real::json_number_to_real;

/// Default BEJ version tag, matching the major-schema's v1.0.0 encoding.
pub const DEFAULT_BEJ_VERSION: u32 = encode_schema_version(1, 0, 0);

/// Which dictionary a BEJ stream's `SchemaClass` byte selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaClass {
    Major,
    Error,
}

impl SchemaClass {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Major => 0x00,
            Self::Error => 0x04,
        }
    }
}

#[derive(Clone, Copy)]
struct DictContext<'d, 'a> {
    dict: &'d Dictionary<'a>,
    selector: Selector,
}

fn reader_err(err: ReaderError) -> RdeError {
    RdeError::BejEncode {
        message: err.to_string(),
    }
}

fn type_mismatch(expected: &str, property: &str) -> RdeError {
    RdeError::BejEncode {
        message: format!("property {property} is not a valid JSON {expected}"),
    }
}

/// Encodes `value` (a JSON object) into a complete BEJ byte stream.
///
/// `pdr_map`, when `Some`, puts the encoder in *strict* mode: no new PDR ids
/// may be invented, and every `@odata.id`/resource-link value must already
/// be present in the map.
///
/// # Errors
///
/// Returns [`RdeError::BejEncode`] if `value` is not a JSON object, a
/// property has no matching dictionary entry, a value's JSON type does not
/// match its declared BEJ format, or (strict mode) a PDR lookup misses.
pub fn encode(
    value: &Value,
    major: &Dictionary,
    annotation: &Dictionary,
    schema_class: SchemaClass,
    pdr_map: Option<PdrMap>,
) -> Result<(Vec<u8>, PdrMap), RdeError> {
    let object = value.as_object().ok_or_else(|| RdeError::BejEncode {
        message: "top-level BEJ value must be a JSON object".to_string(),
    })?;

    let strict = pdr_map.is_some();
    let mut pdr_map = pdr_map.unwrap_or_default();

    let root_entry = first_entry(&major.root())?;
    let major_ctx = DictContext {
        dict: major,
        selector: Selector::Major,
    };
    let root_entries = entries_by_name(major, root_entry.child_pointer_offset, root_entry.child_count)?;

    let annotation_root = first_entry(&annotation.root())?;
    let annotation_entries = entries_by_name(
        annotation,
        annotation_root.child_pointer_offset,
        annotation_root.child_count,
    )?;

    let mut frame = FrameBuilder::new();
    frame.open_container(object.len() as u64);
    encode_object(
        &major_ctx,
        &root_entries,
        object,
        annotation,
        &annotation_entries,
        &mut pdr_map,
        strict,
        false,
        &mut frame,
    )?;
    frame.close_container(Seq::major(0), BejFormat::Set, ValueFlags::default());
    let body = frame.finish();

    let mut out = Vec::with_capacity(7 + body.len());
    out.extend_from_slice(&DEFAULT_BEJ_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.push(schema_class.code());
    out.extend_from_slice(&body);
    tracing::debug!(bytes = out.len(), strict, "encoded BEJ stream");
    Ok((out, pdr_map))
}

fn first_entry(cursor: &rde_dictionary::EntryCursor) -> Result<DictionaryEntry, RdeError> {
    cursor
        .clone()
        .next()
        .ok_or_else(|| RdeError::BejEncode {
            message: "dictionary has no root entry".to_string(),
        })?
        .map_err(reader_err)
}

fn entries_by_name(
    dict: &Dictionary,
    offset: u16,
    child_count: u16,
) -> Result<IndexMap<String, DictionaryEntry>, RdeError> {
    let mut out = IndexMap::new();
    for entry in dict.at(offset, child_count) {
        let entry = entry.map_err(reader_err)?;
        let name = dict.name_of(entry).map_err(reader_err)?;
        out.insert(name.to_string(), entry);
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn encode_object(
    ctx: &DictContext,
    entries: &IndexMap<String, DictionaryEntry>,
    object: &Map<String, Value>,
    annotation: &Dictionary,
    annotation_entries: &IndexMap<String, DictionaryEntry>,
    pdr_map: &mut PdrMap,
    strict: bool,
    nested_in_annotation: bool,
    frame: &mut FrameBuilder,
) -> Result<(), RdeError> {
    for (key, value) in object {
        if let Some(at) = key.find('@') {
            let schema_prop = &key[..at];
            let annotation_key = &key[at..];
            let annot_entry = *annotation_entries.get(annotation_key).ok_or_else(|| {
                RdeError::BejEncode {
                    message: format!("unknown annotation {annotation_key}"),
                }
            })?;
            let annotation_ctx = DictContext {
                dict: annotation,
                selector: Selector::Annotation,
            };

            if schema_prop.is_empty() && annotation_key == "@odata.id" && annot_entry.format == BejFormat::String {
                let seq = Seq::annotation(u64::from(annot_entry.sequence_number));
                encode_odata_id(value, seq, pdr_map, strict, frame, key)?;
                continue;
            }

            if schema_prop.is_empty() {
                let seq = Seq::annotation(u64::from(annot_entry.sequence_number));
                let flags = nested_annotation_flags(ctx.selector, nested_in_annotation);
                encode_value(
                    &annotation_ctx,
                    annot_entry,
                    seq,
                    value,
                    annotation,
                    annotation_entries,
                    pdr_map,
                    strict,
                    flags.annotation_nesting,
                    frame,
                )?;
            } else {
                let prop_entry = *entries.get(schema_prop).ok_or_else(|| RdeError::BejEncode {
                    message: format!("unknown property {schema_prop}"),
                })?;
                let outer_seq = Seq::major(u64::from(prop_entry.sequence_number));
                let inner_seq = Seq::annotation(u64::from(annot_entry.sequence_number));
                frame.open_raw();
                encode_value(
                    &annotation_ctx,
                    annot_entry,
                    inner_seq,
                    value,
                    annotation,
                    annotation_entries,
                    pdr_map,
                    strict,
                    false,
                    frame,
                )?;
                frame.close_container(outer_seq, BejFormat::PropertyAnnotation, ValueFlags::default());
            }
            continue;
        }

        let entry = *entries
            .get(key.as_str())
            .ok_or_else(|| RdeError::BejEncode {
                message: format!("property {key} has no matching dictionary entry"),
            })?;
        let seq = Seq {
            sequence_number: u64::from(entry.sequence_number),
            selector: ctx.selector,
        };
        encode_value(
            ctx,
            entry,
            seq,
            value,
            annotation,
            annotation_entries,
            pdr_map,
            strict,
            nested_in_annotation,
            frame,
        )?;
    }
    Ok(())
}

fn nested_annotation_flags(selector: Selector, nested_in_annotation: bool) -> ValueFlags {
    ValueFlags {
        deferred_binding: false,
        annotation_nesting: nested_in_annotation || selector == Selector::Annotation,
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_value(
    ctx: &DictContext,
    entry: DictionaryEntry,
    seq: Seq,
    value: &Value,
    annotation: &Dictionary,
    annotation_entries: &IndexMap<String, DictionaryEntry>,
    pdr_map: &mut PdrMap,
    strict: bool,
    nested_in_annotation: bool,
    frame: &mut FrameBuilder,
) -> Result<(), RdeError> {
    let flags = ValueFlags {
        deferred_binding: false,
        annotation_nesting: nested_in_annotation,
    };

    if entry.flags.nullable && value.is_null() {
        pack_sflv(frame.current(), seq, BejFormat::Null, flags, &[]);
        return Ok(());
    }

    match entry.format {
        BejFormat::String => {
            let s = value.as_str().ok_or_else(|| type_mismatch("string", ""))?;
            let escaped = s.replace('"', "\\\"");
            pack_sflv(frame.current(), seq, BejFormat::String, flags, &pack_string(&escaped));
        }
        BejFormat::Integer => {
            let n = value.as_i64().ok_or_else(|| type_mismatch("integer", ""))?;
            pack_sflv(frame.current(), seq, BejFormat::Integer, flags, &pack_integer(n));
        }
        BejFormat::Boolean => {
            let b = value.as_bool().ok_or_else(|| type_mismatch("boolean", ""))?;
            pack_sflv(frame.current(), seq, BejFormat::Boolean, flags, &pack_boolean(b));
        }
        BejFormat::Real => {
            let real = real::json_number_to_real(value)?;
            pack_sflv(frame.current(), seq, BejFormat::Real, flags, &rde_sflv::pack_real(real));
        }
        BejFormat::Enum => {
            let name = value.as_str().ok_or_else(|| type_mismatch("enum string", ""))?;
            let member = find_enum_member(ctx.dict, entry, name)?;
            pack_sflv(frame.current(), seq, BejFormat::Enum, flags, &pack_enum(member));
        }
        BejFormat::ResourceLink => {
            let uri = value.as_str().ok_or_else(|| type_mismatch("resource link string", ""))?;
            let pdr = resolve_pdr(pdr_map, uri, strict)?;
            pack_sflv(
                frame.current(),
                seq,
                BejFormat::ResourceLink,
                flags,
                &pack_resource_link(pdr),
            );
        }
        BejFormat::Set => {
            let object = value.as_object().ok_or_else(|| type_mismatch("object", ""))?;
            let nested_entries = entries_by_name(ctx.dict, entry.child_pointer_offset, entry.child_count)?;
            frame.open_container(object.len() as u64);
            encode_object(
                ctx,
                &nested_entries,
                object,
                annotation,
                annotation_entries,
                pdr_map,
                strict,
                nested_in_annotation,
                frame,
            )?;
            frame.close_container(seq, BejFormat::Set, flags);
        }
        BejFormat::Array => {
            let array = value.as_array().ok_or_else(|| type_mismatch("array", ""))?;
            let element_entry = first_entry(&ctx.dict.at(entry.child_pointer_offset, entry.child_count.max(1)))?;
            frame.open_container(array.len() as u64);
            for (index, item) in array.iter().enumerate() {
                let child_seq = Seq {
                    sequence_number: index as u64,
                    selector: seq.selector,
                };
                encode_value(
                    ctx,
                    element_entry,
                    child_seq,
                    item,
                    annotation,
                    annotation_entries,
                    pdr_map,
                    strict,
                    false,
                    frame,
                )?;
            }
            frame.close_container(seq, BejFormat::Array, flags);
        }
        other => {
            return Err(RdeError::BejEncode {
                message: format!("dictionary format {other:?} cannot appear as a direct property value"),
            });
        }
    }
    Ok(())
}

fn find_enum_member(dict: &Dictionary, entry: DictionaryEntry, name: &str) -> Result<u64, RdeError> {
    for member in dict.at(entry.child_pointer_offset, entry.child_count) {
        let member = member.map_err(reader_err)?;
        if dict.name_of(member).map_err(reader_err)? == name {
            return Ok(u64::from(member.sequence_number));
        }
    }
    Err(RdeError::BejEncode {
        message: format!("{name} is not a member of this enum"),
    })
}

fn resolve_pdr(pdr_map: &mut PdrMap, uri: &str, strict: bool) -> Result<u64, RdeError> {
    if strict {
        pdr_map.get(uri).ok_or_else(|| RdeError::BejEncode {
            message: format!("strict PDR map has no entry for {uri}"),
        })
    } else {
        Ok(pdr_map.assign(uri))
    }
}

fn encode_odata_id(
    value: &Value,
    seq: Seq,
    pdr_map: &mut PdrMap,
    strict: bool,
    frame: &mut FrameBuilder,
    property: &str,
) -> Result<(), RdeError> {
    let uri = value.as_str().ok_or_else(|| type_mismatch("string", property))?;
    if strict {
        let pdr = pdr_map.get(uri).ok_or_else(|| RdeError::BejEncode {
            message: format!("strict PDR map has no entry for {uri}"),
        })?;
        pack_sflv(
            frame.current(),
            seq,
            BejFormat::ResourceLink,
            ValueFlags::default(),
            &pack_resource_link(pdr),
        );
    } else {
        let (prefix, frag) = match uri.split_once('#') {
            Some((p, f)) => (p, Some(f)),
            None => (uri, None),
        };
        let pdr = pdr_map.assign(prefix);
        let mut deferred = format!("%L{pdr}");
        if let Some(frag) = frag {
            deferred.push('#');
            deferred.push_str(frag);
        }
        pack_sflv(
            frame.current(),
            seq,
            BejFormat::String,
            ValueFlags::deferred_binding(),
            &pack_string(&deferred),
        );
    }
    Ok(())
}
