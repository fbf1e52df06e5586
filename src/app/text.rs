//! Word tokenization, bigram counting and sentence splitting.

use std::collections::HashMap;

use super::types::Bigram;

/// Words that end in a period without ending a sentence.
const ABBREVIATIONS: [&str; 36] = [
    "inc", "ltd", "llc", "co", "corp", "plc", "gmbh", "mr", "mrs", "ms", "dr", "prof", "sr", "jr",
    "st", "mt", "vs", "etc", "no", "nos", "dept", "est", "approx", "fig", "vol", "jan", "feb",
    "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov",
];

const LEADING_PUNCT: [char; 6] = ['(', '[', '{', '<', '"', '`'];
const TRAILING_PUNCT: [char; 12] = [',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\'', '.'];
const SPLIT_PUNCT: [char; 6] = [';', '@', '#', '$', '%', '&'];
const CONTRACTIONS: [&str; 7] = ["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

/// True for `word` (without its trailing period) when the period is part of
/// the word: known abbreviations, dotted initialisms like `e.g` or `U.S`, or
/// a single capital initial.
pub fn is_abbreviation(word: &str) -> bool {
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }
    if word.contains('.') {
        return true;
    }

    let lower = word.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }

    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(a), None) => a.is_uppercase(),
        _ => false,
    }
}

/// [`is_abbreviation`], plus capital-lowercase titles like `Mr` that only
/// matter when deciding where a sentence ends.
fn is_sentence_abbreviation(word: &str) -> bool {
    if is_abbreviation(word) {
        return true;
    }
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let mut chars = word.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None) => a.is_uppercase() && b.is_lowercase(),
        _ => false,
    }
}

/// Treebank-style word tokenizer.
pub fn word_tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut start = 0;
        for (idx, ch) in chunk.char_indices() {
            if SPLIT_PUNCT.contains(&ch) {
                if start < idx {
                    tokenize_word(&chunk[start..idx], &mut tokens);
                }
                tokens.push(ch.to_string());
                start = idx + ch.len_utf8();
            }
        }
        if start < chunk.len() {
            tokenize_word(&chunk[start..], &mut tokens);
        }
    }
    tokens
}

fn tokenize_word(chunk: &str, tokens: &mut Vec<String>) {
    if !chunk.chars().any(char::is_alphanumeric) {
        tokens.push(chunk.to_string());
        return;
    }

    let mut rest = chunk;
    while let Some(ch) = rest.chars().next() {
        if !LEADING_PUNCT.contains(&ch) {
            break;
        }
        tokens.push(if ch == '"' {
            "``".to_string()
        } else {
            ch.to_string()
        });
        rest = &rest[ch.len_utf8()..];
    }

    let mut trailing = Vec::new();
    while let Some(ch) = rest.chars().next_back() {
        if !TRAILING_PUNCT.contains(&ch) || rest.len() == ch.len_utf8() {
            break;
        }
        if ch == '.' {
            if rest.ends_with("...") && rest.len() > 3 {
                trailing.push("...".to_string());
                rest = &rest[..rest.len() - 3];
                continue;
            }
            if is_abbreviation(&rest[..rest.len() - 1]) {
                break;
            }
        }
        trailing.push(match ch {
            '"' => "''".to_string(),
            other => other.to_string(),
        });
        rest = &rest[..rest.len() - ch.len_utf8()];
    }

    match split_contraction(rest) {
        Some((stem, suffix)) => {
            tokens.push(stem.to_string());
            tokens.push(suffix.to_string());
        }
        None => {
            if !rest.is_empty() {
                tokens.push(rest.to_string());
            }
        }
    }
    tokens.extend(trailing.into_iter().rev());
}

fn split_contraction(word: &str) -> Option<(&str, &str)> {
    for suffix in CONTRACTIONS {
        if word.len() <= suffix.len() {
            continue;
        }
        let idx = word.len() - suffix.len();
        if word.is_char_boundary(idx) && word[idx..].eq_ignore_ascii_case(suffix) {
            return Some((&word[..idx], &word[idx..]));
        }
    }
    None
}

/// Most frequent adjacent token pairs. Ties keep first-seen order.
pub fn top_bigrams(tokens: &[String], limit: usize) -> Vec<Bigram> {
    let mut index = HashMap::<(&str, &str), usize>::new();
    let mut counted = Vec::<Bigram>::new();

    for pair in tokens.windows(2) {
        let key = (pair[0].as_str(), pair[1].as_str());
        match index.get(&key) {
            Some(&idx) => counted[idx].count += 1,
            None => {
                index.insert(key, counted.len());
                counted.push(Bigram {
                    first: pair[0].clone(),
                    second: pair[1].clone(),
                    count: 1,
                });
            }
        }
    }

    counted.sort_by(|a, b| b.count.cmp(&a.count));
    counted.truncate(limit);
    counted
}

/// The first sentence of `text`, split after `.` or `?` followed by whitespace.
pub fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    let mut prev: Option<char> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            match prev {
                Some('?') => return &text[..idx],
                Some('.') => {
                    let word = text[..idx - 1]
                        .rsplit(char::is_whitespace)
                        .next()
                        .unwrap_or("");
                    if !is_sentence_abbreviation(word) {
                        return &text[..idx];
                    }
                }
                _ => {}
            }
        }
        prev = Some(ch);
    }

    text
}

/// Uppercase first character, lowercase rest.
pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
