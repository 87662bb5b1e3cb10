
use fancy_regex::Regex;
use itertools::Itertools;
use std::sync::LazyLock;

static NAME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)recipe name:[ \t]*(.*)").expect("regex is valid"));

const LINE_PREFIX: &str = r"(?m)^[ \t]*(?:#+[ \t]*|[*\-][ \t]+)+";

/// Ordered rewrites applied by [`strip_markdown`]
static MARKDOWN_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // header markers and bullets, in any nesting
        (LINE_PREFIX, ""),
        // bold, then italic
        (r"\*\*([^*\n]+)\*\*", "$1"),
        (r"\*([^*\n]+)\*", "$1"),
        // inline code
        (r"`([^`\n]+)`", "$1"),
        // links keep their label
        (r"\[([^\]\n]+)\]\([^)\n]+\)", "$1"),
        // markers uncovered by the rewrites above
        (LINE_PREFIX, ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("regex is valid"), replacement))
    .collect()
});

/// Split the recipe name off generated recipe text.
///
/// The first line carrying a case-insensitive `recipe name:` label supplies
/// the name (with markdown emphasis removed) and is dropped from the body.
/// Without a label the text is returned unchanged.
#[inline]
pub fn extract_name(text: &str) -> (Option<String>, String) {
    let mut consumed = 0;

    for line in text.split_inclusive('\n') {
        let Ok(Some(captures)) = NAME_LABEL.captures(line) else {
            consumed += line.len();
            continue;
        };

        let raw_name = captures.get(1).map_or("", |m| m.as_str());
        let name = trim_emphasis(&strip_markdown(trim_emphasis(raw_name)).replace("**", ""))
            .to_string();

        let before = text.get(..consumed).unwrap_or_default();
        let after = text.get(consumed + line.len()..).unwrap_or_default();
        let body = format!("{before}{after}").trim().to_string();

        return ((!name.is_empty()).then_some(name), body);
    }

    (None, text.to_string())
}

fn trim_emphasis(text: &str) -> &str {
    text.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
}

/// Remove headers, emphasis, bullets, inline code and link targets.
///
/// Text without markdown syntax is returned unchanged.
#[inline]
pub fn strip_markdown(text: &str) -> String {
    let mut result = text.to_string();
    for (pattern, replacement) in MARKDOWN_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).into_owned();
    }
    result
}

/// Encode text as WinAnsi (the single-byte encoding of the standard PDF fonts).
///
/// Characters without a WinAnsi code point become `?`. Tabs become spaces,
/// other control characters except newlines are dropped.
#[inline]
pub fn transliterate(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => bytes.push(b'\n'),
            '\t' => bytes.push(b' '),
            c if c.is_control() => {}
            c => bytes.push(win_ansi_byte(c).unwrap_or(b'?')),
        }
    }
    bytes
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    if (0x20..0x7F).contains(&code) || (0xA0..=0xFF).contains(&code) {
        return u8::try_from(code).ok();
    }

    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        // no-break and thin spaces
        '\u{2002}'..='\u{200A}' | '\u{202F}' => b' ',
        '\u{2010}' | '\u{2011}' => b'-',
        _ => return None,
    };
    Some(byte)
}

/// File name for a recipe PDF, derived from the recipe name
#[inline]
pub fn file_name(name: Option<&str>) -> String {
    let stem: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .split_whitespace()
        .join(" ");

    if stem.is_empty() {
        "recipe.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}
