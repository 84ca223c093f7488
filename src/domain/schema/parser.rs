//! Declaration grammar parsing
//!
//! Turns DTD-style declarations into a [`Schema`]:
//!
//! ```text
//! <!ENTITY name "TaskName">
//! <!ELEMENT NOUN ( #PCDATA )>
//! <!ATTLIST NOUN type ( person | place | thing ) #REQUIRED>
//! <!ELEMENT ACTION EMPTY>
//! <!ATTLIST ACTION arg0 IDREF prefix="agent" #REQUIRED>
//! ```
//!
//! Parsing runs in three small steps: the text is cleaned (comments removed,
//! curly quotes straightened), split into declarations, and each declaration
//! is tokenized and handed to the rule for its directive. The first error
//! aborts the whole parse.
//!
//! # Examples
//!
//! ```
//! use annotask::domain::schema::SchemaParser;
//!
//! let schema = SchemaParser::parse(
//!     "<!ENTITY name \"T\"><!ELEMENT NOUN (#PCDATA)><!ELEMENT ACTION EMPTY>",
//! )
//! .unwrap();
//! assert_eq!(schema.task_name(), "T");
//! assert_eq!(schema.tag_type("NOUN").unwrap().prefix, "N");
//! ```

use crate::domain::schema::model::{ArgumentType, AttributeType, Schema, ValueSet};
use crate::error::{AnnotaskError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Attribute names handled by the document codec on extent tags
const RESERVED_EXTENT_ATTRIBUTES: [&str; 4] = ["spans", "start", "end", "text"];

/// Positional argument names: arg0, arg1, ...
fn argument_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^arg[0-9]+$").unwrap())
}

/// Names usable as XML element and attribute names
fn name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_.\-]*$").unwrap())
}

/// One `<!...>` declaration with its whitespace collapsed
#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    /// Line on which the declaration starts (1-based)
    line: usize,
    body: String,
}

/// Token types inside a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    /// Parenthesized `a | b | c` list
    Group(Vec<String>),
    /// `key="value"`
    Assign(String, String),
}

/// Declared kind of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttKind {
    Id,
    IdRef,
    CData,
    Enumerated(Vec<String>),
}

/// One attribute definition inside an ATTLIST
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttDef {
    name: String,
    kind: AttKind,
    prefix: Option<String>,
    required: bool,
    default: Option<String>,
}

pub struct SchemaParser;

impl SchemaParser {
    /// Parse declaration text into a schema
    pub fn parse(input: &str) -> Result<Schema> {
        let cleaned = strip_comments(&normalize_quotes(input))?;
        let declarations = split_declarations(&cleaned)?;

        let mut schema = Schema::default();
        for declaration in declarations {
            apply_declaration(&mut schema, &declaration)
                .map_err(|e| e.at_line(declaration.line))?;
        }

        schema.add_default_link_arguments();
        Ok(schema)
    }
}

/// Replace typographic quotes with their ASCII forms
fn normalize_quotes(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect()
}

/// Blank out `<!-- ... -->` blocks, keeping newlines so line numbers hold
fn strip_comments(input: &str) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("<!--") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 4..];
        let end = after_open.find("-->").ok_or_else(|| {
            let line = output.matches('\n').count() + 1;
            AnnotaskError::SchemaFormat(format!("line {}: unterminated comment", line))
        })?;

        let comment = &rest[start..start + 4 + end + 3];
        output.extend(comment.chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
        rest = &after_open[end + 3..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Cut cleaned text into declarations.
///
/// A declaration may span several lines and several may share a line; `>`
/// inside quotes does not close a declaration.
fn split_declarations(input: &str) -> Result<Vec<Declaration>> {
    let mut declarations = Vec::new();
    let mut chars = input.chars();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '<' => match chars.next() {
                Some('!') => {
                    let start_line = line;
                    let mut body = String::new();
                    let mut quote: Option<char> = None;
                    let mut closed = false;

                    for c in chars.by_ref() {
                        if c == '\n' {
                            line += 1;
                        }
                        match (quote, c) {
                            (None, '>') => {
                                closed = true;
                                break;
                            }
                            (None, '"' | '\'') => quote = Some(c),
                            (Some(q), c) if c == q => quote = None,
                            _ => {}
                        }
                        body.push(c);
                    }

                    if !closed {
                        return Err(AnnotaskError::SchemaFormat(format!(
                            "line {}: declaration is never closed with '>'",
                            start_line
                        )));
                    }

                    declarations.push(Declaration {
                        line: start_line,
                        body: body.split_whitespace().collect::<Vec<&str>>().join(" "),
                    });
                }
                Some('?') => {
                    // Processing instruction such as <?xml ...?>
                    let mut previous = '?';
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '\n' {
                            line += 1;
                        }
                        if previous == '?' && c == '>' {
                            closed = true;
                            break;
                        }
                        previous = c;
                    }
                    if !closed {
                        return Err(AnnotaskError::SchemaFormat(format!(
                            "line {}: processing instruction is never closed",
                            line
                        )));
                    }
                }
                _ => {
                    return Err(AnnotaskError::SchemaFormat(format!(
                        "line {}: expected '<!' to start a declaration",
                        line
                    )));
                }
            },
            other => {
                return Err(AnnotaskError::SchemaFormat(format!(
                    "line {}: unexpected text '{}' outside of a declaration",
                    line, other
                )));
            }
        }
    }

    Ok(declarations)
}

/// Split a declaration body into tokens
fn tokenize(body: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::Quoted(read_quoted(&mut chars, c)?));
            }
            '(' => {
                chars.next();
                tokens.push(Token::Group(read_group(&mut chars)?));
            }
            ')' => {
                return Err(AnnotaskError::SchemaFormat(
                    "unbalanced ')' in declaration".to_string(),
                ));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '=') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }

                if chars.peek() == Some(&'=') {
                    chars.next();
                    let value = match chars.peek() {
                        Some(&q) if q == '"' || q == '\'' => {
                            chars.next();
                            read_quoted(&mut chars, q)?
                        }
                        _ => {
                            return Err(AnnotaskError::SchemaFormat(format!(
                                "value of '{}=' must be quoted",
                                word
                            )));
                        }
                    };
                    tokens.push(Token::Assign(word, value));
                } else if word.is_empty() {
                    return Err(AnnotaskError::SchemaFormat(format!(
                        "unexpected character '{}' in declaration",
                        c
                    )));
                } else {
                    tokens.push(Token::Word(word));
                }
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> Result<String> {
    let mut value = String::new();
    for c in chars.by_ref() {
        if c == quote {
            return Ok(value);
        }
        value.push(c);
    }
    Err(AnnotaskError::SchemaFormat(format!(
        "unterminated quoted value {}{}",
        quote, value
    )))
}

/// Read a parenthesized list up to its closing paren; nested parens flatten
fn read_group(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<Vec<String>> {
    let mut depth = 1;
    let mut content = String::new();

    for c in chars.by_ref() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return content
                        .split('|')
                        .map(|item| {
                            let item = item.trim();
                            if item.is_empty() {
                                Err(AnnotaskError::SchemaFormat(format!(
                                    "empty entry in group ({})",
                                    content
                                )))
                            } else {
                                Ok(item.to_string())
                            }
                        })
                        .collect();
                }
            }
            c => content.push(c),
        }
    }

    Err(AnnotaskError::SchemaFormat(format!(
        "group ({} is never closed",
        content
    )))
}

fn apply_declaration(schema: &mut Schema, declaration: &Declaration) -> Result<()> {
    let tokens = tokenize(&declaration.body)?;
    let (directive, rest) = match tokens.split_first() {
        Some((Token::Word(directive), rest)) => (directive.as_str(), rest),
        _ => {
            return Err(AnnotaskError::SchemaFormat(format!(
                "'<!{}>' is not a declaration",
                declaration.body
            )));
        }
    };

    match directive {
        "ENTITY" => apply_entity(schema, rest),
        "ELEMENT" => apply_element(schema, rest),
        "ATTLIST" => apply_attlist(schema, rest),
        other => Err(AnnotaskError::SchemaFormat(format!(
            "unknown directive '{}'; expected ENTITY, ELEMENT or ATTLIST",
            other
        ))),
    }
}

/// `ENTITY name "value"`; only `name` carries meaning (the task title)
fn apply_entity(schema: &mut Schema, tokens: &[Token]) -> Result<()> {
    match tokens {
        [Token::Word(name), Token::Quoted(value)] => {
            if name == "name" {
                schema.set_task_name(value.trim());
            } else {
                log::debug!("ignoring entity '{}'", name);
            }
            Ok(())
        }
        [Token::Word(percent), ..] if percent == "%" => {
            log::debug!("ignoring parameter entity");
            Ok(())
        }
        _ => Err(AnnotaskError::SchemaFormat(
            "ENTITY must look like: ENTITY name \"value\"".to_string(),
        )),
    }
}

/// `ELEMENT typeName EMPTY` declares a link type, `(#PCDATA)` an extent type
fn apply_element(schema: &mut Schema, tokens: &[Token]) -> Result<()> {
    let (name, content) = match tokens {
        [Token::Word(name), content] => (name, content),
        _ => {
            return Err(AnnotaskError::SchemaFormat(
                "ELEMENT must look like: ELEMENT NAME (#PCDATA) or ELEMENT NAME EMPTY".to_string(),
            ));
        }
    };
    check_name(name)?;

    let is_link = match content {
        Token::Word(word) if word == "EMPTY" => true,
        Token::Group(items) if items.len() == 1 && items[0] == "#PCDATA" => false,
        _ => {
            return Err(AnnotaskError::SchemaFormat(format!(
                "element '{}' must be EMPTY or (#PCDATA)",
                name
            )));
        }
    };

    let tag_type = schema.add_tag_type(name, is_link)?;
    log::debug!("declared {} with prefix {}", tag_type.name, tag_type.prefix);
    Ok(())
}

/// `ATTLIST typeName attName kind [prefix="p"] [#REQUIRED|#IMPLIED] ["default"]`,
/// possibly repeated for several attributes of the same type
fn apply_attlist(schema: &mut Schema, tokens: &[Token]) -> Result<()> {
    let (owner, rest) = match tokens.split_first() {
        Some((Token::Word(owner), rest)) => (owner.as_str(), rest),
        _ => {
            return Err(AnnotaskError::SchemaFormat(
                "ATTLIST must name the element it belongs to".to_string(),
            ));
        }
    };

    if schema.tag_type(owner).is_none() {
        return Err(AnnotaskError::SchemaFormat(format!(
            "ATTLIST refers to undeclared element '{}'",
            owner
        )));
    }

    let definitions = parse_att_defs(rest)?;
    if definitions.is_empty() {
        return Err(AnnotaskError::SchemaFormat(format!(
            "ATTLIST for '{}' declares no attribute",
            owner
        )));
    }

    for definition in definitions {
        apply_att_def(schema, owner, definition)?;
    }
    Ok(())
}

fn parse_att_defs(tokens: &[Token]) -> Result<Vec<AttDef>> {
    let mut definitions = Vec::new();
    let mut pos = 0;

    while pos < tokens.len() {
        let name = match &tokens[pos] {
            Token::Word(name) if !name.starts_with('#') => name.clone(),
            other => {
                return Err(AnnotaskError::SchemaFormat(format!(
                    "expected an attribute name, found {:?}",
                    other
                )));
            }
        };
        pos += 1;

        let kind = match tokens.get(pos) {
            Some(Token::Word(kind)) => match kind.as_str() {
                "ID" => AttKind::Id,
                "IDREF" => AttKind::IdRef,
                "CDATA" => AttKind::CData,
                other => {
                    return Err(AnnotaskError::SchemaFormat(format!(
                        "attribute '{}' has unsupported kind '{}'",
                        name, other
                    )));
                }
            },
            Some(Token::Group(values)) => AttKind::Enumerated(values.clone()),
            _ => {
                return Err(AnnotaskError::SchemaFormat(format!(
                    "attribute '{}' is missing its kind (CDATA, ID, IDREF or a value list)",
                    name
                )));
            }
        };
        pos += 1;

        let mut definition = AttDef {
            name,
            kind,
            prefix: None,
            required: false,
            default: None,
        };

        while let Some(token) = tokens.get(pos) {
            match token {
                Token::Word(flag) if flag == "#REQUIRED" => definition.required = true,
                Token::Word(flag) if flag == "#IMPLIED" || flag == "#FIXED" => {}
                Token::Word(flag) if flag.starts_with('#') => {
                    return Err(AnnotaskError::SchemaFormat(format!(
                        "unknown flag '{}' on attribute '{}'",
                        flag, definition.name
                    )));
                }
                Token::Assign(key, value) if key == "prefix" => {
                    definition.prefix = Some(value.clone());
                }
                Token::Assign(key, _) => {
                    return Err(AnnotaskError::SchemaFormat(format!(
                        "unknown setting '{}=' on attribute '{}'",
                        key, definition.name
                    )));
                }
                Token::Quoted(value) => {
                    if definition.default.is_some() {
                        return Err(AnnotaskError::SchemaFormat(format!(
                            "attribute '{}' has more than one default value",
                            definition.name
                        )));
                    }
                    definition.default = Some(value.clone());
                }
                // Next attribute definition
                Token::Word(_) => break,
                Token::Group(_) => {
                    return Err(AnnotaskError::SchemaFormat(format!(
                        "unexpected value list after attribute '{}'",
                        definition.name
                    )));
                }
            }
            pos += 1;
        }

        definitions.push(definition);
    }

    Ok(definitions)
}

fn apply_att_def(schema: &mut Schema, owner: &str, def: AttDef) -> Result<()> {
    check_name(&def.name)?;

    if def.kind == AttKind::Id {
        return apply_id(schema, owner, &def);
    }
    if def.name == "id" {
        return Err(AnnotaskError::SchemaFormat(format!(
            "attribute 'id' of '{}' must be declared with kind ID",
            owner
        )));
    }
    if def.prefix.is_some() && def.kind != AttKind::IdRef {
        return Err(AnnotaskError::SchemaFormat(format!(
            "prefix= on attribute '{}' of '{}' is only allowed with ID or IDREF",
            def.name, owner
        )));
    }
    if is_argument(&def) {
        return apply_argument(schema, owner, def);
    }

    let owner_is_extent = schema.tag_type(owner).is_some_and(|t| t.is_extent());
    if owner_is_extent && RESERVED_EXTENT_ATTRIBUTES.contains(&def.name.as_str()) {
        return apply_reserved(schema, owner, &def);
    }

    apply_attribute(schema, owner, def)
}

/// `id ID [prefix="p"]` optionally sets a custom id prefix
fn apply_id(schema: &mut Schema, owner: &str, def: &AttDef) -> Result<()> {
    if def.name != "id" {
        return Err(AnnotaskError::SchemaFormat(format!(
            "only the 'id' attribute may have kind ID, found '{}' on '{}'",
            def.name, owner
        )));
    }
    match &def.prefix {
        Some(prefix) => schema.set_prefix(owner, prefix),
        None => Ok(()),
    }
}

fn is_argument(def: &AttDef) -> bool {
    argument_regex().is_match(&def.name) || (def.kind == AttKind::IdRef && def.prefix.is_some())
}

/// `argN IDREF [prefix="name"] [#REQUIRED]` declares a link argument
fn apply_argument(schema: &mut Schema, owner: &str, def: AttDef) -> Result<()> {
    if def.default.is_some() {
        return Err(AnnotaskError::InvalidValue(format!(
            "argument '{}' of '{}' cannot declare a default value",
            def.name, owner
        )));
    }

    let name = def.prefix.as_deref().unwrap_or(&def.name);
    check_name(name)?;

    let owner_type = schema.require_tag_type(owner)?;
    let argument = ArgumentType::new(owner_type, name, def.required)?;
    schema.add_argument_type(argument)
}

/// Codec-owned names on extent types; an optional `spans`/`start` marks the
/// type as non-consuming
fn apply_reserved(schema: &mut Schema, owner: &str, def: &AttDef) -> Result<()> {
    let marks_non_consuming =
        def.kind == AttKind::CData && matches!(def.name.as_str(), "spans" | "start") && !def.required;

    if marks_non_consuming {
        schema.set_non_consuming(owner)
    } else {
        log::debug!("'{}' on '{}' is handled by the document codec", def.name, owner);
        Ok(())
    }
}

fn apply_attribute(schema: &mut Schema, owner: &str, def: AttDef) -> Result<()> {
    let value_set = match &def.kind {
        AttKind::Enumerated(values) => ValueSet::Enumerated(values.clone()),
        _ => ValueSet::FreeText,
    };
    let default = def.default.as_deref().unwrap_or("");

    let mut attribute = AttributeType::new(owner, &def.name, value_set, def.required, default)?;
    if def.kind == AttKind::IdRef {
        attribute = attribute.with_id_ref();
    }

    schema.add_attribute_type(attribute)
}

fn check_name(name: &str) -> Result<()> {
    if name_regex().is_match(name) {
        Ok(())
    } else {
        Err(AnnotaskError::SchemaFormat(format!(
            "'{}' is not a valid name",
            name
        )))
    }
}
