//! Parse DSL source into the protocol model using PEST.
//!
//! The entry point splits the source into section blocks, then dispatches each
//! block through the section parser registry. The built-in section parsers here
//! run dedicated pest start rules over their block body; the `Data` section
//! parser recursively invokes the embedded-data parser registry for payload
//! bodies. All positions are shifted into whole-file coordinates so
//! diagnostics point at the original text.

use crate::ast::*;
use crate::error::ParseError;
use crate::registry::{EmbeddedDataParserRegistry, GrammarRegistries};
use crate::section::{self, SectionBlock};
use crate::span::{Offset, SourceRange};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct ModelParser;

/// Parse full source text into a protocol model: split into sections, then
/// parse each section with its registered parser, preserving element order.
pub fn parse(source: &str, registries: &GrammarRegistries) -> Result<ProtocolModel, ParseError> {
    let mut elements = Vec::new();
    for block in section::split(source)? {
        elements.extend(registries.sections.parse(&block, &registries.data_parsers)?);
    }
    Ok(ProtocolModel::new(elements))
}

fn pest_error(e: pest::error::Error<Rule>, offset: Offset) -> ParseError {
    let (line, col) = match e.line_col {
        pest::error::LineColLocation::Pos((l, c)) => (l, c),
        pest::error::LineColLocation::Span((l, c), _) => (l, c),
    };
    let at = offset.nested(line, col);
    ParseError::new(
        e.variant.message().to_string(),
        SourceRange::new(at.line, at.column, at.line, at.column),
    )
}

fn range_of(pair: &Pair<Rule>, offset: Offset) -> SourceRange {
    SourceRange::from_span(&pair.as_span(), offset)
}

fn path_of(pair: &Pair<Rule>, offset: Offset) -> Result<PackageablePath, ParseError> {
    PackageablePath::parse(pair.as_str()).ok_or_else(|| {
        ParseError::new(
            format!("Invalid element path '{}'", pair.as_str()),
            range_of(pair, offset),
        )
    })
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\'') => out.push('\''),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    // Unknown escape: keep it lexically.
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn string_value(pair: &Pair<Rule>) -> String {
    // string = ${ "'" ~ string_content ~ "'" }
    let inner = pair
        .clone()
        .into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    unescape(&inner)
}

// ==================== Pure section ====================

/// Built-in parser for `###Pure`: Class and Enum declarations.
pub fn parse_pure_section(
    block: &SectionBlock,
    _data_parsers: &EmbeddedDataParserRegistry,
) -> Result<Vec<PackageableElement>, ParseError> {
    let offset = Offset::at(block.body_start_line, 1);
    let pairs = ModelParser::parse(Rule::pure_section, &block.body)
        .map_err(|e| pest_error(e, offset))?;
    let section = pairs.into_iter().next().ok_or_else(|| {
        ParseError::new("Empty parse", block.range)
    })?;

    let mut elements = Vec::new();
    for def in section.into_inner() {
        match def.as_rule() {
            Rule::class_def => elements.push(PackageableElement::Class(build_class(def, offset)?)),
            Rule::enum_def => {
                elements.push(PackageableElement::Enumeration(build_enum(def, offset)?))
            }
            Rule::EOI => {}
            _ => {}
        }
    }
    Ok(elements)
}

fn build_class(pair: Pair<Rule>, offset: Offset) -> Result<ClassDecl, ParseError> {
    let range = range_of(&pair, offset);
    let mut stereotypes = Vec::new();
    let mut tagged_values = Vec::new();
    let mut path = None;
    let mut properties = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::stereotypes => stereotypes = build_stereotypes(inner, offset)?,
            Rule::tagged_values => tagged_values = build_tagged_values(inner, offset)?,
            Rule::path => path = Some(path_of(&inner, offset)?),
            Rule::property => properties.push(build_property(inner, offset)?),
            _ => {}
        }
    }
    Ok(ClassDecl {
        path: path.ok_or_else(|| ParseError::new("Class is missing a path", range))?,
        stereotypes,
        tagged_values,
        properties,
        range,
    })
}

fn build_property(pair: Pair<Rule>, offset: Offset) -> Result<PropertyDecl, ParseError> {
    let range = range_of(&pair, offset);
    let mut name = String::new();
    let mut type_path = None;
    let mut multiplicity = Multiplicity::ONE;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::path => type_path = Some(path_of(&inner, offset)?),
            Rule::multiplicity => multiplicity = build_multiplicity(inner, offset)?,
            _ => {}
        }
    }
    Ok(PropertyDecl {
        name,
        type_path: type_path
            .ok_or_else(|| ParseError::new("Property is missing a type", range))?,
        multiplicity,
        range,
    })
}

fn build_multiplicity(pair: Pair<Rule>, offset: Offset) -> Result<Multiplicity, ParseError> {
    let range = range_of(&pair, offset);
    let bounds: Vec<String> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::mult_bound)
        .map(|p| p.as_str().to_string())
        .collect();
    let parse_bound = |s: &str| -> Result<Option<u64>, ParseError> {
        if s == "*" {
            Ok(None)
        } else {
            s.parse()
                .map(Some)
                .map_err(|_| ParseError::new(format!("Invalid multiplicity bound '{}'", s), range))
        }
    };
    match bounds.as_slice() {
        [single] => match parse_bound(single)? {
            Some(n) => Ok(Multiplicity { lower: n, upper: Some(n) }),
            None => Ok(Multiplicity::MANY),
        },
        [lo, hi] => {
            let lower = parse_bound(lo)?.ok_or_else(|| {
                ParseError::new("Lower multiplicity bound cannot be '*'", range)
            })?;
            Ok(Multiplicity { lower, upper: parse_bound(hi)? })
        }
        _ => Err(ParseError::new("Invalid multiplicity", range)),
    }
}

fn build_enum(pair: Pair<Rule>, offset: Offset) -> Result<EnumDecl, ParseError> {
    let range = range_of(&pair, offset);
    let mut stereotypes = Vec::new();
    let mut tagged_values = Vec::new();
    let mut path = None;
    let mut values = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::stereotypes => stereotypes = build_stereotypes(inner, offset)?,
            Rule::tagged_values => tagged_values = build_tagged_values(inner, offset)?,
            Rule::path => path = Some(path_of(&inner, offset)?),
            Rule::ident => values.push(inner.as_str().to_string()),
            _ => {}
        }
    }
    Ok(EnumDecl {
        path: path.ok_or_else(|| ParseError::new("Enum is missing a path", range))?,
        stereotypes,
        tagged_values,
        values,
        range,
    })
}

fn build_stereotypes(pair: Pair<Rule>, offset: Offset) -> Result<Vec<Stereotype>, ParseError> {
    let mut out = Vec::new();
    for st in pair.into_inner() {
        if st.as_rule() != Rule::stereotype {
            continue;
        }
        let range = range_of(&st, offset);
        let mut it = st.into_inner();
        let profile = it
            .next()
            .ok_or_else(|| ParseError::new("Stereotype is missing a profile", range))?;
        let value = it
            .next()
            .ok_or_else(|| ParseError::new("Stereotype is missing a value", range))?;
        out.push(Stereotype {
            profile: path_of(&profile, offset)?,
            value: value.as_str().to_string(),
        });
    }
    Ok(out)
}

fn build_tagged_values(pair: Pair<Rule>, offset: Offset) -> Result<Vec<TaggedValue>, ParseError> {
    let mut out = Vec::new();
    for tv in pair.into_inner() {
        if tv.as_rule() != Rule::tagged_value {
            continue;
        }
        let range = range_of(&tv, offset);
        let mut it = tv.into_inner();
        let profile = it
            .next()
            .ok_or_else(|| ParseError::new("Tagged value is missing a profile", range))?;
        let tag = it
            .next()
            .ok_or_else(|| ParseError::new("Tagged value is missing a tag", range))?;
        let value = it
            .next()
            .ok_or_else(|| ParseError::new("Tagged value is missing a value", range))?;
        out.push(TaggedValue {
            profile: path_of(&profile, offset)?,
            tag: tag.as_str().to_string(),
            value: string_value(&value),
        });
    }
    Ok(out)
}

// ==================== Data section ====================

/// Built-in parser for `###Data`: Data declarations wrapping one embedded-data
/// payload each. Payload bodies are raw-captured and dispatched through the
/// embedded-data parser registry by their kind tag.
pub fn parse_data_section(
    block: &SectionBlock,
    data_parsers: &EmbeddedDataParserRegistry,
) -> Result<Vec<PackageableElement>, ParseError> {
    let offset = Offset::at(block.body_start_line, 1);
    let pairs = ModelParser::parse(Rule::data_section, &block.body)
        .map_err(|e| pest_error(e, offset))?;
    let section = pairs.into_iter().next().ok_or_else(|| {
        ParseError::new("Empty parse", block.range)
    })?;

    let mut elements = Vec::new();
    for def in section.into_inner() {
        if def.as_rule() == Rule::data_def {
            elements.push(PackageableElement::Data(build_data(def, offset, data_parsers)?));
        }
    }
    Ok(elements)
}

fn build_data(
    pair: Pair<Rule>,
    offset: Offset,
    data_parsers: &EmbeddedDataParserRegistry,
) -> Result<DataElement, ParseError> {
    let range = range_of(&pair, offset);
    let mut stereotypes = Vec::new();
    let mut tagged_values = Vec::new();
    let mut path = None;
    let mut payload = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::stereotypes => stereotypes = build_stereotypes(inner, offset)?,
            Rule::tagged_values => tagged_values = build_tagged_values(inner, offset)?,
            Rule::path => path = Some(path_of(&inner, offset)?),
            Rule::embedded_data => {
                let data_range = range_of(&inner, offset);
                let mut kind = String::new();
                let mut parsed = None;
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::ident => kind = part.as_str().to_string(),
                        Rule::embedded_body => {
                            let (line, col) = part.as_span().start_pos().line_col();
                            let body_offset = offset.nested(line, col);
                            parsed = Some(data_parsers.parse(
                                &kind,
                                part.as_str(),
                                body_offset,
                                data_range,
                            )?);
                        }
                        _ => {}
                    }
                }
                let data = parsed.ok_or_else(|| {
                    ParseError::new("Embedded data block is missing a body", data_range)
                })?;
                payload = Some((data, data_range));
            }
            _ => {}
        }
    }
    let (data, data_range) =
        payload.ok_or_else(|| ParseError::new("Data element is missing a payload", range))?;
    Ok(DataElement {
        path: path.ok_or_else(|| ParseError::new("Data element is missing a path", range))?,
        stereotypes,
        tagged_values,
        data,
        data_range,
        range,
    })
}

// ==================== Embedded-data payloads ====================

fn payload_fields(
    body: &str,
    offset: Offset,
) -> Result<Vec<(String, String, SourceRange)>, ParseError> {
    let pairs =
        ModelParser::parse(Rule::text_payload, body).map_err(|e| pest_error(e, offset))?;
    let mut fields = Vec::new();
    for top in pairs {
        for field in top.into_inner() {
            if field.as_rule() != Rule::payload_field {
                continue;
            }
            let range = range_of(&field, offset);
            let mut it = field.into_inner();
            let name = it
                .next()
                .ok_or_else(|| ParseError::new("Payload field is missing a name", range))?;
            let value = it
                .next()
                .ok_or_else(|| ParseError::new("Payload field is missing a value", range))?;
            fields.push((name.as_str().to_string(), string_value(&value), range));
        }
    }
    Ok(fields)
}

fn take_field(
    fields: &mut Vec<(String, String, SourceRange)>,
    name: &str,
    block_range: SourceRange,
) -> Result<String, ParseError> {
    match fields.iter().position(|(n, _, _)| n == name) {
        Some(i) => Ok(fields.remove(i).1),
        None => Err(ParseError::new(
            format!("Missing required field '{}'", name),
            block_range,
        )),
    }
}

fn reject_extra_fields(fields: &[(String, String, SourceRange)]) -> Result<(), ParseError> {
    if let Some((name, _, range)) = fields.first() {
        return Err(ParseError::new(format!("Unknown field '{}'", name), *range));
    }
    Ok(())
}

/// `Text #{ contentType: '...'; data: '...'; }#`
pub fn parse_text_payload(
    body: &str,
    offset: Offset,
    block_range: SourceRange,
) -> Result<EmbeddedData, ParseError> {
    let mut fields = payload_fields(body, offset)?;
    let content_type = take_field(&mut fields, "contentType", block_range)?;
    let text = take_field(&mut fields, "data", block_range)?;
    reject_extra_fields(&fields)?;
    Ok(EmbeddedData::Text { content_type, text })
}

/// `Binary #{ contentType: '...'; data: '1B4A ...'; }#` — hex kept raw here,
/// validated and normalized at compile time.
pub fn parse_binary_payload(
    body: &str,
    offset: Offset,
    block_range: SourceRange,
) -> Result<EmbeddedData, ParseError> {
    let mut fields = payload_fields(body, offset)?;
    let content_type = take_field(&mut fields, "contentType", block_range)?;
    let hex = take_field(&mut fields, "data", block_range)?;
    reject_extra_fields(&fields)?;
    Ok(EmbeddedData::Binary { content_type, hex })
}

// The `data` token with a following `:` anywhere in the body. Word-bounded so
// `metadata:` does not count.
fn has_data_field(body: &str) -> bool {
    let bytes = body.as_bytes();
    let mut i = 0;
    while let Some(pos) = body[i..].find("data") {
        let start = i + pos;
        let end = start + 4;
        let bounded = start == 0
            || !(bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_');
        if bounded && body[end..].trim_start().starts_with(':') {
            return true;
        }
        i = end;
    }
    false
}

/// `PureCollection #{ data: [ ... ]; }#`
pub fn parse_collection_payload(
    body: &str,
    offset: Offset,
    block_range: SourceRange,
) -> Result<EmbeddedData, ParseError> {
    let pairs = match ModelParser::parse(Rule::collection_payload, body) {
        Ok(pairs) => pairs,
        // A body with no `data` field at all names the field, like the
        // field-based payloads do.
        Err(_) if !has_data_field(body) => {
            return Err(ParseError::new("Missing required field 'data'", block_range))
        }
        Err(e) => return Err(pest_error(e, offset)),
    };
    let mut items = Vec::new();
    for top in pairs {
        for part in top.into_inner() {
            if part.as_rule() == Rule::collection {
                for value in part.into_inner() {
                    items.push(build_value(value, offset)?);
                }
            }
        }
    }
    Ok(EmbeddedData::Collection { items })
}

/// `Reference #{ some::element::path }#`
pub fn parse_reference_payload(
    body: &str,
    offset: Offset,
    block_range: SourceRange,
) -> Result<EmbeddedData, ParseError> {
    let pairs =
        ModelParser::parse(Rule::reference_payload, body).map_err(|e| pest_error(e, offset))?;
    for top in pairs {
        for part in top.into_inner() {
            if part.as_rule() == Rule::path {
                return Ok(EmbeddedData::Reference { path: path_of(&part, offset)? });
            }
        }
    }
    Err(ParseError::new(
        "Reference payload is missing a path",
        block_range,
    ))
}

fn build_value(pair: Pair<Rule>, offset: Offset) -> Result<ValueExpression, ParseError> {
    let range = range_of(&pair, offset);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::new("Empty value", range))?;
    match inner.as_rule() {
        Rule::string => Ok(ValueExpression::String(string_value(&inner))),
        Rule::integer => inner
            .as_str()
            .parse()
            .map(ValueExpression::Integer)
            .map_err(|_| {
                ParseError::new(
                    format!("Integer literal out of range: {}", inner.as_str()),
                    range_of(&inner, offset),
                )
            }),
        Rule::float => inner
            .as_str()
            .parse()
            .map(ValueExpression::Float)
            .map_err(|_| {
                ParseError::new(
                    format!("Invalid float literal: {}", inner.as_str()),
                    range_of(&inner, offset),
                )
            }),
        Rule::decimal => Ok(ValueExpression::Decimal(
            inner.as_str().trim_end_matches('D').to_string(),
        )),
        Rule::boolean => Ok(ValueExpression::Boolean(inner.as_str() == "true")),
        Rule::date_literal => Ok(ValueExpression::StrictDate(inner.as_str()[1..].to_string())),
        Rule::time_literal => Ok(ValueExpression::StrictTime(inner.as_str()[1..].to_string())),
        Rule::datetime_literal => Ok(ValueExpression::DateTime(inner.as_str()[1..].to_string())),
        Rule::collection => {
            let mut items = Vec::new();
            for value in inner.into_inner() {
                items.push(build_value(value, offset)?);
            }
            Ok(ValueExpression::Collection(items))
        }
        Rule::enum_value => {
            let range = range_of(&inner, offset);
            let mut it = inner.into_inner();
            let enumeration = it
                .next()
                .ok_or_else(|| ParseError::new("Enum value is missing a path", range))?;
            let value = it
                .next()
                .ok_or_else(|| ParseError::new("Enum value is missing a name", range))?;
            Ok(ValueExpression::EnumValue {
                enumeration: path_of(&enumeration, offset)?,
                value: value.as_str().to_string(),
                range,
            })
        }
        Rule::new_instance => {
            let range = range_of(&inner, offset);
            let mut class = None;
            let mut assignments = Vec::new();
            for part in inner.into_inner() {
                match part.as_rule() {
                    Rule::path => class = Some(path_of(&part, offset)?),
                    Rule::named_assignment => {
                        let a_range = range_of(&part, offset);
                        let mut it = part.into_inner();
                        let name = it.next().ok_or_else(|| {
                            ParseError::new("Assignment is missing a property name", a_range)
                        })?;
                        let value = it.next().ok_or_else(|| {
                            ParseError::new("Assignment is missing a value", a_range)
                        })?;
                        assignments
                            .push((name.as_str().to_string(), build_value(value, offset)?));
                    }
                    _ => {}
                }
            }
            Ok(ValueExpression::New {
                class: class
                    .ok_or_else(|| ParseError::new("Constructor is missing a type", range))?,
                assignments,
                range,
            })
        }
        Rule::element_ref => {
            let range = range_of(&inner, offset);
            let mut it = inner.into_inner();
            let path = it
                .next()
                .ok_or_else(|| ParseError::new("Reference is missing a path", range))?;
            Ok(ValueExpression::ElementRef { path: path_of(&path, offset)?, range })
        }
        other => Err(ParseError::new(
            format!("Unhandled value rule: {:?}", other),
            range,
        )),
    }
}
