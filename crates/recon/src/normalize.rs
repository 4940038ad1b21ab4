//! Text canonicalization for identity comparison.

/// Tokens that carry no identity: legal-entity forms and connectors.
const STOPWORDS: &[&str] = &[
    // Spanish legal forms and connectors
    "sa", "srl", "sas", "saic", "sacif", "sacifi", "de", "del", "la", "el", "los", "las", "y",
    "e", "cia", "hnos", "hermanos", "hijos", "distribuidora", "distribucion",
    // English equivalents
    "and", "of", "inc", "llc", "ltd", "co", "corp",
];

/// Canonical form of an identity string.
///
/// Lower-cases, folds diacritics, turns punctuation into spaces, drops
/// stopwords and collapses whitespace. Dotted abbreviations collapse first
/// (`S.A.` → `sa`), so `"José García S.A."` and `"JOSE GARCIA"` both become
/// `"jose garcia"`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' { c } else { ' ' })
        .collect();

    let mut tokens: Vec<String> = Vec::new();
    for chunk in folded.split_whitespace() {
        if let Some(abbrev) = collapse_abbreviation(chunk) {
            tokens.push(abbrev);
        } else {
            tokens.extend(chunk.split('.').filter(|p| !p.is_empty()).map(str::to_string));
        }
    }

    tokens
        .into_iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `s.a.` / `s.r.l` / `j.p.` → `sa` / `srl` / `jp`.
fn collapse_abbreviation(chunk: &str) -> Option<String> {
    let parts: Vec<&str> = chunk.split('.').filter(|p| !p.is_empty()).collect();
    if parts.len() >= 2 && chunk.contains('.') && parts.iter().all(|p| p.len() == 1) {
        Some(parts.concat())
    } else {
        None
    }
}

/// Statement description normalization: upper-case, accent-free, keeps
/// `[A-Z0-9 -.]`, collapses whitespace.
pub fn normalize_statement_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, ' ' | '-' | '.'))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
