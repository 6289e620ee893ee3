//! Human-readable `.map` companion to a binary dictionary: one row per
//! entry plus a summary footer, the text form operators diff against when a
//! generated dictionary changes shape.

use std::fmt::Write as _;

use rde_dictionary::{Dictionary, DictionaryEntry};
use rde_sflv::BejFormat;

/// Renders `dict`'s full entry table (depth-first from the root) followed
/// by an entry-count/byte-size summary.
#[must_use]
pub fn render(dict: &Dictionary, bytes: &[u8]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<5} {:<9} {:<10} {:<6} {:<32} {:<12} {:<6}", "Row", "Seq#", "Format", "Flags", "Name", "ChildCount", "Offset");
    let mut row = 0usize;
    let root = dict.root().next().and_then(Result::ok);
    if let Some(entry) = root {
        render_entry(dict, entry, &mut row, &mut out);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Entries: {}", dict.header.entry_count);
    let _ = writeln!(out, "Size: {} bytes", bytes.len());
    let _ = writeln!(out, "SchemaVersion: {:#010x}", dict.header.schema_version);
    out
}

fn render_entry(dict: &Dictionary, entry: DictionaryEntry, row: &mut usize, out: &mut String) {
    let name = dict.name_of(entry).unwrap_or("<invalid>");
    let _ = writeln!(
        out,
        "{:<5} {:<9} {:<10} {:<6} {:<32} {:<12} {:<6}",
        row,
        entry.sequence_number,
        format!("{:?}", entry.format),
        flags_string(entry),
        name,
        child_count_string(entry),
        entry.child_pointer_offset,
    );
    *row += 1;

    if !has_children(entry) {
        return;
    }
    let child_count = if entry.is_unbounded_array() { 1 } else { entry.child_count };
    for child in dict.at(entry.child_pointer_offset, child_count) {
        let Ok(child) = child else { break };
        render_entry(dict, child, row, out);
    }
}

fn has_children(entry: DictionaryEntry) -> bool {
    matches!(entry.format, BejFormat::Set | BejFormat::Array | BejFormat::Enum | BejFormat::Choice)
}

fn child_count_string(entry: DictionaryEntry) -> String {
    if entry.is_unbounded_array() {
        "unbounded".to_string()
    } else {
        entry.child_count.to_string()
    }
}

fn flags_string(entry: DictionaryEntry) -> String {
    let mut s = String::new();
    if entry.flags.read_only {
        s.push('R');
    }
    if entry.flags.nullable {
        s.push('N');
    }
    s
}
