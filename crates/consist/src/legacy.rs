//! Reader for the legacy bracketed `.con` format.
//!
//! Only the facts the resolver needs are extracted: the display name, the maximum velocity,
//! the durability, and for every `Engine`/`Wagon` block its UiD, vehicle file, and flip flag.

use std::path::Path;

use crate::ConsistError;
use crate::model::{Consist, ConsistEntry};

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
}

#[derive(Debug)]
enum Item {
    Value(String),
    Block(String, Vec<Item>),
}

impl Item {
    fn block<'a>(items: &'a [Item], name: &str) -> Option<&'a [Item]> {
        items.iter().find_map(|item| match item {
            Item::Block(n, children) if n.eq_ignore_ascii_case(name) => Some(children.as_slice()),
            _ => None,
        })
    }

    fn values(items: &[Item]) -> impl Iterator<Item = &str> {
        items.iter().filter_map(|item| match item {
            Item::Value(v) => Some(v.as_str()),
            Item::Block(..) => None,
        })
    }
}

pub(crate) fn parse(path: &Path, bytes: &[u8]) -> Result<Consist, ConsistError> {
    let fail = |reason: String| ConsistError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let text = decode(bytes);
    let tokens = tokenize(&text).map_err(&fail)?;
    let mut pos = 0;
    let items = parse_items(&tokens, &mut pos, 0).map_err(&fail)?;
    if pos != tokens.len() {
        return Err(fail("unbalanced closing bracket".to_string()));
    }

    let train =
        Item::block(&items, "Train").ok_or_else(|| fail("missing Train block".into()))?;
    let cfg =
        Item::block(train, "TrainCfg").ok_or_else(|| fail("missing TrainCfg block".into()))?;

    let display_name = Item::block(cfg, "Name")
        .and_then(|name| Item::values(name).next())
        .or_else(|| Item::values(cfg).next())
        .unwrap_or_default()
        .to_string();
    let max_velocity_mps = Item::block(cfg, "MaxVelocity")
        .and_then(|v| Item::values(v).next())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v > 0.0);
    let durability = Item::block(cfg, "Durability")
        .and_then(|v| Item::values(v).next())
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(1.0);

    let mut entries = Vec::new();
    for item in cfg {
        let Item::Block(kind, children) = item else {
            continue;
        };
        let (data_block, extension) = if kind.eq_ignore_ascii_case("Engine") {
            ("EngineData", "eng")
        } else if kind.eq_ignore_ascii_case("Wagon") {
            ("WagonData", "wag")
        } else {
            continue;
        };

        let data = Item::block(children, data_block)
            .ok_or_else(|| fail(format!("{kind} block without {data_block}")))?;
        let mut data_values = Item::values(data);
        let (Some(name), Some(folder)) = (data_values.next(), data_values.next()) else {
            return Err(fail(format!("{data_block} needs a name and a folder")));
        };

        let uid = match Item::block(children, "UiD").and_then(|u| Item::values(u).next()) {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| fail(format!("invalid UiD '{raw}'")))?,
            ),
            None => None,
        };
        let flipped = Item::block(children, "Flip").is_some();

        let mut entry =
            ConsistEntry::new(format!("{folder}/{name}.{extension}")).flipped(flipped);
        entry.uid = uid;
        entries.push(entry);
    }

    Ok(Consist {
        max_velocity_mps,
        durability,
        ..Consist::from_list(display_name, entries)
    })
}

/// Legacy files are frequently UTF-16LE with a byte-order mark.
fn decode(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF_u8, 0xFE]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        let rest = bytes.strip_prefix(&[0xEF_u8, 0xBB, 0xBF]).unwrap_or(bytes);
        String::from_utf8_lossy(rest).into_owned()
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut word = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => word.push(ch),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Word(word));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

/// Deepest bracket nesting accepted in a `.con` file.
const MAX_NESTING: usize = 64;

fn parse_items(tokens: &[Token], pos: &mut usize, depth: usize) -> Result<Vec<Item>, String> {
    if depth > MAX_NESTING {
        return Err(format!("brackets nested deeper than {MAX_NESTING} levels"));
    }
    let mut items = Vec::new();
    while *pos < tokens.len() {
        match &tokens[*pos] {
            Token::Close => return Ok(items),
            Token::Open => {
                // anonymous bracket, keep its contents inline
                *pos += 1;
                let children = parse_items(tokens, pos, depth + 1)?;
                expect_close(tokens, pos)?;
                items.extend(children);
            }
            Token::Word(word) => {
                *pos += 1;
                if tokens.get(*pos) == Some(&Token::Open) {
                    *pos += 1;
                    let children = parse_items(tokens, pos, depth + 1)?;
                    expect_close(tokens, pos)?;
                    items.push(Item::Block(word.clone(), children));
                } else {
                    items.push(Item::Value(word.clone()));
                }
            }
        }
    }
    Ok(items)
}

fn expect_close(tokens: &[Token], pos: &mut usize) -> Result<(), String> {
    if tokens.get(*pos) == Some(&Token::Close) {
        *pos += 1;
        Ok(())
    } else {
        Err("missing closing bracket".to_string())
    }
}
