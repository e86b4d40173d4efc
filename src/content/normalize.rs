use icu_normalizer::DecomposingNormalizerBorrowed;

/// Canonicalize a romanized code for comparison.
///
/// `ü` becomes `v` (the pinyin keyboard convention), toned vowels lose their
/// marks, and everything outside `[a-z]` is dropped. Used for both the
/// phonetic and the structural alphabet.
pub fn normalize(code: &str) -> String {
    let nfd = DecomposingNormalizerBorrowed::new_nfd();
    let decomposed = nfd.normalize(code);

    let mut out = String::with_capacity(decomposed.len());
    let mut chars = decomposed.chars().peekable();
    while let Some(c) = chars.next() {
        // Toned and bare ü both decompose to u + U+0308.
        if matches!(c, 'u' | 'U') && chars.peek() == Some(&DIAERESIS) {
            out.push('v');
            continue;
        }
        if is_combining_mark(c) {
            continue;
        }
        out.extend(c.to_lowercase().filter(|l| l.is_ascii_lowercase()));
    }
    out
}

const DIAERESIS: char = '\u{0308}';

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}
