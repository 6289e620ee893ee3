//! End-to-end coverage of the `rde-cli bej encode`/`bej decode` round trip
//! against the compiled binary, exercising the CLI argument surface and
//! file I/O rather than just the library calls `rde` already covers.

use std::process::Command;

use rde_dictionary::EntryFlags;
use rde_entity_repo::{EntityRepository, RawProperty};
use rde_sflv::BejFormat;

const ROOT_ENTITY: &str = "Drive.Drive";

fn build_major_dictionary_bytes() -> Vec<u8> {
    let mut repo = EntityRepository::new();
    repo.add_property(
        ROOT_ENTITY,
        RawProperty::scalar("Id", BejFormat::String, EntryFlags::default()),
    );
    repo.add_property(
        ROOT_ENTITY,
        RawProperty::scalar("CapacityBytes", BejFormat::Integer, EntryFlags::default()),
    );
    let repo = repo.finalize();
    rde_dictionary_builder::build_dictionary(&repo, ROOT_ENTITY, rde_dictionary::UNVERSIONED, false, None).unwrap()
}

fn build_annotation_dictionary_bytes() -> Vec<u8> {
    let mut repo = EntityRepository::new();
    repo.ensure_set("Annotations");
    let repo = repo.finalize();
    rde_dictionary_builder::build_dictionary(&repo, "Annotations", rde_dictionary::UNVERSIONED, false, None).unwrap()
}

#[test]
fn encode_then_decode_round_trips_a_payload() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("schema.bin");
    let annot_path = dir.path().join("annotation.bin");
    let input_path = dir.path().join("in.json");
    let bej_path = dir.path().join("out.bej");
    let pdr_path = dir.path().join("out.pdr.json");

    std::fs::write(&schema_path, build_major_dictionary_bytes()).unwrap();
    std::fs::write(&annot_path, build_annotation_dictionary_bytes()).unwrap();
    std::fs::write(&input_path, r#"{"Id": "1", "CapacityBytes": 1000000}"#).unwrap();

    let encode_status = Command::new(env!("CARGO_BIN_EXE_rde-cli"))
        .args([
            "bej",
            "encode",
            "-s",
            schema_path.to_str().unwrap(),
            "-a",
            annot_path.to_str().unwrap(),
            "-j",
            input_path.to_str().unwrap(),
            "-o",
            bej_path.to_str().unwrap(),
            "--op",
            pdr_path.to_str().unwrap(),
        ])
        .status()
        .expect("failed to run rde-cli bej encode");
    assert!(encode_status.success());
    assert!(bej_path.is_file());

    let decode_output = Command::new(env!("CARGO_BIN_EXE_rde-cli"))
        .args([
            "bej",
            "decode",
            "-s",
            schema_path.to_str().unwrap(),
            "-a",
            annot_path.to_str().unwrap(),
            "-b",
            bej_path.to_str().unwrap(),
            "-p",
            pdr_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run rde-cli bej decode");
    assert!(decode_output.status.success());

    let decoded: serde_json::Value = serde_json::from_slice(&decode_output.stdout).unwrap();
    assert_eq!(decoded["Id"], "1");
    assert_eq!(decoded["CapacityBytes"], 1_000_000);
}

#[test]
fn decode_rejects_truncated_bej_stream() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("schema.bin");
    let annot_path = dir.path().join("annotation.bin");
    let bej_path = dir.path().join("truncated.bej");

    std::fs::write(&schema_path, build_major_dictionary_bytes()).unwrap();
    std::fs::write(&annot_path, build_annotation_dictionary_bytes()).unwrap();
    std::fs::write(&bej_path, [0u8, 1, 2]).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_rde-cli"))
        .args([
            "bej",
            "decode",
            "-s",
            schema_path.to_str().unwrap(),
            "-a",
            annot_path.to_str().unwrap(),
            "-b",
            bej_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run rde-cli bej decode");

    assert_eq!(output.status.code(), Some(1));
}
