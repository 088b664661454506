//! XML loader for the [ippcode22](../ippcode22/index.html) runtime.
//!
//! The entry points are [`load`] and [`load_from_str`], which accept the XML source document
//! and return an ordered, validated instruction vector plus the label table the runtime
//! expects. Parsing is implemented on top of [quick_xml]'s pull parser: a single forward pass
//! collects every `<instruction>` element into an [`ippcode22::Instruction`] (validating its
//! `order`, `opcode`, and argument shape as it goes), after which the collected instructions
//! are sorted by `order` and labels are registered from their position in that sorted vector.
//!
//! This crate distinguishes two failure modes, matching the two XML-related exit codes of the
//! runtime's host CLI: a document that is not well-formed XML at all ([`Error::Malformed`]),
//! and a well-formed document that violates the IPPcode22 structural rules
//! ([`Error::Structure`]) — wrong root tag, missing `language` attribute, non-contiguous
//! `argK` children, an unrecognized opcode, and so on.

use std::fmt;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use ippcode22::{Arg, ArgKind, Instruction, LabelTable, OpCode, RawArg};
use util::EnumFromStr;

/// A loader failure: either the document was not well-formed XML, or it failed one of the
/// structural rules for an IPPcode22 program.
#[derive(Debug)]
pub enum Error {
    Malformed(quick_xml::Error),
    Structure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Malformed(e) => write!(f, "malformed XML: {}", e),
            Error::Structure(msg) => write!(f, "invalid program structure: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// The process exit code this failure maps to: 31 for a document that was never
    /// well-formed XML, 32 for one that violates IPPcode22's structural rules.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Malformed(_) => 31,
            Error::Structure(_) => 32,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Error {
        Error::Malformed(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn structure(msg: impl Into<String>) -> Error {
    Error::Structure(msg.into())
}

/// A child `<instruction>` element, still holding its raw `order`/`opcode` text and its raw
/// argument elements, before arity/kind validation against the opcode's profile.
struct RawInstruction {
    order: u32,
    opcode: OpCode,
    raw_args: Vec<RawArg>,
}

/// Loads a program from any buffered byte source.
pub fn load<R: BufRead>(reader: R) -> Result<(Vec<Instruction>, LabelTable)> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let raw_instructions = parse_document(&mut xml)?;
    build_program(raw_instructions)
}

/// Loads a program from an in-memory string (used heavily by tests).
pub fn load_from_str(source: &str) -> Result<(Vec<Instruction>, LabelTable)> {
    load(source.as_bytes())
}

fn parse_document<R: BufRead>(xml: &mut Reader<R>) -> Result<Vec<RawInstruction>> {
    let mut buf = Vec::new();
    let mut raw_instructions = Vec::new();
    let mut seen_orders = std::collections::HashSet::new();
    let mut saw_root = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(tag) if tag.name().as_ref() == b"program" => {
                saw_root = true;
                let language = attr_value(&tag, b"language")?;
                if language.as_deref() != Some("IPPcode22") {
                    return Err(structure("root element must declare language \"IPPcode22\""));
                }
            }
            Event::Empty(tag) if tag.name().as_ref() == b"instruction" => {
                let order = parse_order(&attr_value(&tag, b"order")?)?;
                if !seen_orders.insert(order) {
                    return Err(structure(format!("duplicate instruction order {}", order)));
                }
                let opcode_text = attr_value(&tag, b"opcode")?
                    .ok_or_else(|| structure("instruction element missing \"opcode\" attribute"))?;
                let opcode = OpCode::from_str(&opcode_text)
                    .map_err(|e| structure(format!("unrecognized opcode: {}", e.value)))?;
                raw_instructions.push(RawInstruction { order, opcode, raw_args: Vec::new() });
            }
            Event::Start(tag) if tag.name().as_ref() == b"instruction" => {
                let order = parse_order(&attr_value(&tag, b"order")?)?;
                if !seen_orders.insert(order) {
                    return Err(structure(format!("duplicate instruction order {}", order)));
                }
                let opcode_text = attr_value(&tag, b"opcode")?
                    .ok_or_else(|| structure("instruction element missing \"opcode\" attribute"))?;
                let opcode = OpCode::from_str(&opcode_text)
                    .map_err(|e| structure(format!("unrecognized opcode: {}", e.value)))?;
                let raw_args = parse_instruction_args(xml, &mut buf)?;
                raw_instructions.push(RawInstruction { order, opcode, raw_args });
            }
            Event::Start(tag) if saw_root => {
                return Err(structure(format!(
                    "unexpected element <{}> inside <program>",
                    String::from_utf8_lossy(tag.name().as_ref())
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(structure("missing root <program> element"));
    }
    Ok(raw_instructions)
}

/// Reads `<argK type="T">content</argK>` children until `</instruction>`, checking that the
/// `argK` tags are contiguous starting at 1.
fn parse_instruction_args<R: BufRead>(
    xml: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<Vec<RawArg>> {
    let mut args = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(buf)? {
            Event::End(tag) if tag.name().as_ref() == b"instruction" => break,
            Event::Eof => return Err(structure("unexpected end of document inside <instruction>")),
            Event::Empty(tag) => {
                let name = tag.name().as_ref().to_vec();
                let expected = format!("arg{}", args.len() + 1);
                if name != expected.as_bytes() {
                    return Err(structure(format!(
                        "expected <{}>, found <{}>",
                        expected,
                        String::from_utf8_lossy(&name)
                    )));
                }
                let type_tag = attr_value(&tag, b"type")?
                    .ok_or_else(|| structure(format!("<{}> missing \"type\" attribute", expected)))?;
                args.push(RawArg { type_tag, text: None });
            }
            Event::Start(tag) => {
                let name = tag.name().as_ref().to_vec();
                let expected = format!("arg{}", args.len() + 1);
                if name != expected.as_bytes() {
                    return Err(structure(format!(
                        "expected <{}>, found <{}>",
                        expected,
                        String::from_utf8_lossy(&name)
                    )));
                }
                let type_tag = attr_value(&tag, b"type")?
                    .ok_or_else(|| structure(format!("<{}> missing \"type\" attribute", expected)))?;
                let text = read_text_content(xml, buf, &name)?;
                args.push(RawArg { type_tag, text });
            }
            _ => {}
        }
    }
    Ok(args)
}

/// Reads the text content of an element up to its matching end tag, decoding XML entities.
fn read_text_content<R: BufRead>(
    xml: &mut Reader<R>,
    buf: &mut Vec<u8>,
    expected_end: &[u8],
) -> Result<Option<String>> {
    buf.clear();
    match xml.read_event_into(buf)? {
        Event::End(tag) if tag.name().as_ref() == expected_end => Ok(None),
        Event::Text(text) => {
            let decoded = text.unescape()?.into_owned();
            buf.clear();
            match xml.read_event_into(buf)? {
                Event::End(tag) if tag.name().as_ref() == expected_end => Ok(Some(decoded)),
                _ => Err(structure("malformed argument element")),
            }
        }
        Event::End(_) => Err(structure("malformed argument element")),
        _ => Err(structure("malformed argument element")),
    }
}

fn attr_value(
    tag: &quick_xml::events::BytesStart,
    name: &[u8],
) -> Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_order(raw: &Option<String>) -> Result<u32> {
    let text = raw
        .as_deref()
        .ok_or_else(|| structure("instruction element missing \"order\" attribute"))?;
    text.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| structure(format!("invalid instruction order: {}", text)))
}

/// Sorts by `order`, converts each instruction's present arguments against its opcode's
/// profile, and registers labels from their position in the sorted vector.
///
/// An instruction with too few `argK` children for its opcode is not rejected here: a
/// wrong-arity instruction that is never dispatched (dead code, or simply never reached before
/// `EXIT`) loads and runs exactly as it would with the right arity. The shortfall only
/// surfaces as an error the first time the instruction is actually executed — see
/// `Instruction::execute`. An instruction with *more* `argK` children than its opcode expects
/// loads fine too; the extras are simply never consulted, matching how an opcode's handler
/// only ever looks at the argument positions it needs.
fn build_program(mut raw: Vec<RawInstruction>) -> Result<(Vec<Instruction>, LabelTable)> {
    raw.sort_by_key(|instr| instr.order);

    let mut instructions = Vec::with_capacity(raw.len());
    let mut labels = LabelTable::new();

    for raw_instr in raw {
        let kinds = raw_instr.opcode.arg_kinds();
        let mut args = Vec::with_capacity(kinds.len());
        for (kind, raw_arg) in kinds.iter().zip(raw_instr.raw_args.iter()) {
            let arg = Arg::from_raw(*kind, raw_arg).map_err(structure)?;
            args.push(arg);
        }

        let index = instructions.len();
        if raw_instr.opcode == OpCode::Label {
            // Unlike any other opcode, LABEL's name has to be known right now: the label
            // table is built during loading, before anything is dispatched.
            let name = match args.get(0) {
                Some(Arg::Label(name)) => name.clone(),
                _ => {
                    return Err(structure(format!(
                        "instruction order {} (LABEL) is missing its name argument",
                        raw_instr.order
                    )))
                }
            };
            labels
                .define(&name, index)
                .map_err(|e| structure(e.to_string()))?;
        }

        log::debug!(
            "loaded instruction order={} opcode={:?}",
            raw_instr.order,
            raw_instr.opcode
        );
        instructions.push(Instruction {
            order: raw_instr.order,
            opcode: raw_instr.opcode,
            args,
        });
    }

    Ok((instructions, labels))
}
