//! `rde-cli bej encode|decode`: JSON <-> BEJ conversion against a pair of
//! binary dictionaries.

use std::collections::HashMap;
use std::io::Read as _;
use std::path::PathBuf;

use bpaf::Bpaf;
use rde::SchemaClass;
use rde_diagnostics::RdeError;

#[derive(Debug, Clone, Bpaf)]
pub enum BejCommand {
    #[bpaf(command("encode"))]
    /// Encode a JSON payload to BEJ
    Encode(#[bpaf(external(encode_args))] EncodeArgs),

    #[bpaf(command("decode"))]
    /// Decode a BEJ payload to JSON
    Decode(#[bpaf(external(decode_args))] DecodeArgs),
}

#[derive(Debug, Clone, Bpaf)]
pub struct EncodeArgs {
    /// Major-schema dictionary
    #[bpaf(short('s'), long("schema-dictionary"), argument("FILE"))]
    pub schema: PathBuf,

    /// Annotation dictionary
    #[bpaf(short('a'), long("annotation-dictionary"), argument("FILE"))]
    pub annotation: PathBuf,

    /// Input JSON file (reads stdin if omitted)
    #[bpaf(short('j'), long("input-json"), argument("FILE"))]
    pub input_json: Option<PathBuf>,

    /// Output BEJ file (writes stdout if omitted)
    #[bpaf(short('o'), long("output-bej"), argument("FILE"))]
    pub output_bej: Option<PathBuf>,

    /// Output PDR map JSON file
    #[bpaf(long("op"), argument("FILE"))]
    pub output_pdr: Option<PathBuf>,
}

#[derive(Debug, Clone, Bpaf)]
pub struct DecodeArgs {
    /// Major-schema dictionary
    #[bpaf(short('s'), long("schema-dictionary"), argument("FILE"))]
    pub schema: PathBuf,

    /// Annotation dictionary
    #[bpaf(short('a'), long("annotation-dictionary"), argument("FILE"))]
    pub annotation: PathBuf,

    /// Input BEJ file
    #[bpaf(short('b'), long("input-bej"), argument("FILE"))]
    pub input_bej: PathBuf,

    /// PDR map JSON file
    #[bpaf(short('p'), long("pdr"), argument("FILE"))]
    pub pdr: Option<PathBuf>,
}

/// # Errors
///
/// Returns [`RdeError`] if a dictionary file can't be read/parsed, the
/// input JSON can't be read, or encoding fails (missing dictionary entry,
/// JSON/BEJ type mismatch).
pub fn run_encode(args: &EncodeArgs) -> Result<(), RdeError> {
    let schema_bytes = std::fs::read(&args.schema).map_err(|e| RdeError::io(&args.schema, e))?;
    let annotation_bytes = std::fs::read(&args.annotation).map_err(|e| RdeError::io(&args.annotation, e))?;
    let schema = rde::parse_dictionary(&schema_bytes)?;
    let annotation = rde::parse_dictionary(&annotation_bytes)?;

    let input = read_input(args.input_json.as_deref())?;
    let value: serde_json::Value = serde_json::from_str(&input)?;

    let (bej, pdr_map) = rde::encode_bej(&value, &schema, &annotation, SchemaClass::Major, None)?;

    write_output(args.output_bej.as_deref(), &bej)?;
    if let Some(pdr_path) = &args.output_pdr {
        let json = rde::pdr_map_to_json(&pdr_map);
        let text = serde_json::to_vec_pretty(&json)?;
        std::fs::write(pdr_path, text).map_err(|e| RdeError::io(pdr_path, e))?;
    }
    Ok(())
}

/// # Errors
///
/// Returns [`RdeError`] if a dictionary/PDR/BEJ file can't be read/parsed,
/// or decoding fails (malformed header, unknown sequence number, truncated
/// container).
pub fn run_decode(args: &DecodeArgs) -> Result<(), RdeError> {
    let schema_bytes = std::fs::read(&args.schema).map_err(|e| RdeError::io(&args.schema, e))?;
    let annotation_bytes = std::fs::read(&args.annotation).map_err(|e| RdeError::io(&args.annotation, e))?;
    let bej_bytes = std::fs::read(&args.input_bej).map_err(|e| RdeError::io(&args.input_bej, e))?;
    let schema = rde::parse_dictionary(&schema_bytes)?;
    let annotation = rde::parse_dictionary(&annotation_bytes)?;

    let pdr_map = match &args.pdr {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|e| RdeError::io(path, e))?;
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            rde::pdr_map_from_json(&value)?
        }
        None => rde::PdrMap::default(),
    };

    // This CLI has no separate error-schema dictionary flag; the major
    // schema doubles as the error dictionary, matching how the decoder's
    // own tests exercise a payload with no distinct error class.
    let value = rde::decode_bej(&bej_bytes, &schema, &annotation, &schema, &pdr_map, &HashMap::new())?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn read_input(path: Option<&std::path::Path>) -> Result<String, RdeError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| RdeError::io(path, e)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| RdeError::io("<stdin>", e))?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, bytes: &[u8]) -> Result<(), RdeError> {
    match path {
        Some(path) => {
            let tmp_path = path.with_extension("tmp");
            std::fs::write(&tmp_path, bytes).map_err(|e| RdeError::io(&tmp_path, e))?;
            std::fs::rename(&tmp_path, path).map_err(|e| RdeError::io(path, e))
        }
        None => {
            use std::io::Write as _;
            std::io::stdout().write_all(bytes).map_err(|e| RdeError::io("<stdout>", e))
        }
    }
}
