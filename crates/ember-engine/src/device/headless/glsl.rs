//! Just enough GLSL scanning to discover a program's uniforms and varyings.
//!
//! Recognises `uniform <type> <name>[, <name>...];` declarations (and the same
//! shape for `varying`) and expands
//! uniforms of a user-declared `struct` type into `name.field` entries, which
//! is how GL reports them. Array uniforms are reported by their base name.

use std::collections::BTreeMap;

const QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

pub(super) fn declared_uniforms(source: &str) -> Vec<String> {
    declared(source, "uniform")
}

pub(super) fn declared_varyings(source: &str) -> Vec<String> {
    declared(source, "varying")
}

fn declared(source: &str, storage: &str) -> Vec<String> {
    let tokens = tokenize(source);
    let mut structs: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut uniforms = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "struct" if i + 2 < tokens.len() && tokens[i + 2] == "{" => {
                let name = tokens[i + 1];
                let mut fields = Vec::new();
                let mut j = i + 3;
                while j < tokens.len() && tokens[j] != "}" {
                    let end = statement_end(&tokens, j);
                    fields.extend(declared_names(&tokens[j..end]));
                    j = end + 1;
                }
                structs.insert(name, fields);
                i = j + 1;
            }
            t if t == storage => {
                let end = statement_end(&tokens, i + 1);
                let decl = &tokens[i + 1..end];
                let ty = decl.iter().find(|t| !QUALIFIERS.contains(t)).copied();
                for name in declared_names(decl) {
                    match ty.and_then(|t| structs.get(t)) {
                        Some(fields) => {
                            uniforms.extend(fields.iter().map(|f| format!("{name}.{f}")));
                        }
                        None => uniforms.push(name.to_string()),
                    }
                }
                i = end + 1;
            }
            _ => i += 1,
        }
    }

    uniforms
}

/// Index of the next `;` (or the end of the token stream, or a closing `}`).
fn statement_end(tokens: &[&str], from: usize) -> usize {
    let mut j = from;
    while j < tokens.len() && tokens[j] != ";" && tokens[j] != "}" {
        j += 1;
    }
    j
}

/// Names from `[qualifier] type name [ '[' n ']' ] { , name ... }`.
fn declared_names<'a>(decl: &[&'a str]) -> Vec<&'a str> {
    let mut rest = decl.iter().copied().skip_while(|t| QUALIFIERS.contains(t));
    // Skip the type.
    rest.next();

    let mut names = Vec::new();
    let mut in_brackets = false;
    for t in rest {
        match t {
            "[" => in_brackets = true,
            "]" => in_brackets = false,
            "," => {}
            _ if !in_brackets => names.push(t),
            _ => {}
        }
    }
    names
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for line in source.lines() {
        let line = line.split("//").next().unwrap_or("");
        if line.trim_start().starts_with('#') {
            continue;
        }

        let mut start: Option<usize> = None;
        for (idx, ch) in line.char_indices() {
            let ident = ch.is_ascii_alphanumeric() || ch == '_' || ch == '.';
            if ident {
                start.get_or_insert(idx);
                continue;
            }
            if let Some(s) = start.take() {
                tokens.push(&line[s..idx]);
            }
            if matches!(ch, '{' | '}' | ';' | ',' | '[' | ']') {
                tokens.push(&line[idx..idx + 1]);
            }
        }
        if let Some(s) = start {
            tokens.push(&line[s..]);
        }
    }
    tokens
}
