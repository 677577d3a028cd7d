//! Plain-text listing of generated fragments.
//!
//! Not target syntax: a readable dump of what the code builder would
//! receive, one block per fragment under a shared module header.

use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite;

use typegen_ir::model::Restriction;

use crate::decoder::reference_expression;
use crate::emit::{Decoder, FieldDecoder, Fragment, KeyDecoder, Presence, Support};

/// Renders `fragments` as one listing.
#[must_use]
pub fn render(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    let module = fragments
        .first()
        .map(|f| f.linkage.module.join("."))
        .unwrap_or_default();
    let exposes: Vec<&str> = fragments
        .iter()
        .flat_map(|f| f.linkage.exposes.iter().map(String::as_str))
        .collect();
    let imports: BTreeSet<Support> = fragments
        .iter()
        .flat_map(|f| f.linkage.imports.iter().copied())
        .collect();

    let _ = writeln!(out, "module {module} exposing ({})", exposes.join(", "));
    if !imports.is_empty() {
        out.push('\n');
        for support in &imports {
            let _ = writeln!(out, "import {}", support.module());
        }
    }

    for fragment in fragments {
        let function = &fragment.function;
        out.push('\n');
        if let Some(doc) = &function.doc {
            for line in doc.lines() {
                let _ = writeln!(out, "-- {line}");
            }
        }
        if let Some(signature) = &function.signature {
            let _ = writeln!(out, "{} : {signature}", function.name);
        }
        let mut head = function.name.clone();
        for param in &function.params {
            head.push(' ');
            head.push_str(param);
        }
        let _ = writeln!(out, "{head} =");
        write_decoder(&mut out, &function.body, 1);
    }
    out
}

fn write_decoder(out: &mut String, decoder: &Decoder, depth: usize) {
    let pad = "    ".repeat(depth);
    match decoder {
        Decoder::Object { fields } if fields.is_empty() => {
            let _ = writeln!(out, "{pad}object {{}}");
        }
        Decoder::Object { fields } => {
            let _ = writeln!(out, "{pad}object");
            write_fields(out, fields, depth + 1);
        }
        Decoder::Tagged {
            discriminant,
            cases,
        } => {
            let _ = writeln!(out, "{pad}tagged {discriminant:?}");
            for case in cases {
                let _ = writeln!(out, "{pad}    {:?} -> {} {}", case.tag, case.combinator(), case.constructor);
                write_fields(out, &case.fields, depth + 2);
            }
        }
        other => {
            let _ = writeln!(out, "{pad}{}", expression(other));
        }
    }
}

fn write_fields(out: &mut String, fields: &[FieldDecoder], depth: usize) {
    let pad = "    ".repeat(depth);
    for field in fields {
        let combinator = match field.presence {
            Presence::Required => "required",
            Presence::Optional => "optional",
        };
        let _ = writeln!(
            out,
            "{pad}{combinator} {:?} {}",
            field.key,
            expression(&field.decoder)
        );
    }
}

/// Single-line rendering of a decoder expression.
#[must_use]
pub fn expression(decoder: &Decoder) -> String {
    match decoder {
        Decoder::Unit => "succeed ()".to_string(),
        Decoder::Primitive { basic } => basic.as_str().to_string(),
        Decoder::Call { target, style } => reference_expression(target, *style),
        Decoder::List { element } => format!("list ({})", expression(element)),
        Decoder::Set { element } => format!("set ({})", expression(element)),
        Decoder::Nullable { element } => format!("nullable ({})", expression(element)),
        Decoder::Dict { key, value } => match key {
            KeyDecoder::Text => format!("dict ({})", expression(value)),
            KeyDecoder::Enumeration { target } | KeyDecoder::Refined { target, .. } => {
                format!("keyedDict {target} ({})", expression(value))
            }
        },
        Decoder::Object { fields } => {
            let fields: Vec<String> = fields
                .iter()
                .map(|f| format!("{} = {}", f.key, expression(&f.decoder)))
                .collect();
            format!("object {{{}}}", fields.join(", "))
        }
        Decoder::Tagged { discriminant, cases } => {
            let tags: Vec<&str> = cases.iter().map(|c| c.tag.as_str()).collect();
            format!("tagged {discriminant:?} [{}]", tags.join(", "))
        }
        Decoder::Enumeration { name, labels } => {
            format!("enum {name} [{}]", labels.join(", "))
        }
        Decoder::Refined { name, restriction } => {
            format!("refined {name} ({})", predicate(restriction))
        }
    }
}

fn predicate(restriction: &Restriction) -> String {
    let mut parts = Vec::new();
    match restriction {
        Restriction::Int(r) => {
            parts.push("int".to_string());
            if let Some(min) = r.min {
                parts.push(format!("min {min}"));
            }
            if let Some(max) = r.max {
                parts.push(format!("max {max}"));
            }
            if let Some(width) = r.width {
                parts.push(format!("width {width}"));
            }
        }
        Restriction::String(r) => {
            parts.push("string".to_string());
            if let Some(min) = r.min_length {
                parts.push(format!("minLength {min}"));
            }
            if let Some(max) = r.max_length {
                parts.push(format!("maxLength {max}"));
            }
            if let Some(regex) = &r.regex {
                parts.push(format!("regex /{regex}/"));
            }
        }
    }
    parts.join(", ")
}
