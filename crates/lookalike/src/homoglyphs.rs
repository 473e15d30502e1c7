//! Homoglyph and script confusion checks
//!
//! A fixed map from each Latin letter to the code points that render close
//! enough to pass at a glance (Cyrillic, Greek, Armenian, digits). Some
//! substitutes are ambiguous ('1' passes for both 'i' and 'l'), so embedded
//! matching slides a confusable-aware window instead of normalising first.

/// Latin letter and the characters visually confusable with it
const CONFUSABLES: &[(char, &[char])] = &[
    ('a', &['а', 'ạ', 'ă', 'ą']),
    ('b', &['ь', 'ḃ']),
    ('c', &['с', 'ϲ']),
    ('e', &['е', 'ė', 'ę', 'ế']),
    ('g', &['ɡ', 'ġ']),
    ('h', &['һ', 'ḣ']),
    ('i', &['і', 'ı', 'l', '1', '!']),
    ('l', &['1', 'I', 'і', '|']),
    ('m', &['т', 'ṁ']),
    ('n', &['п', 'ո']),
    ('o', &['о', 'ο', '0', 'ö', 'ø']),
    ('p', &['р', 'ρ']),
    ('s', &['ѕ', 'ṡ']),
    ('x', &['х', 'χ']),
    ('y', &['у', 'ỳ', 'ý']),
];

/// True when `a` and `b` are a known confusable pair, in either direction
pub fn confusable(a: char, b: char) -> bool {
    CONFUSABLES.iter().any(|(latin, lookalikes)| {
        (*latin == a && lookalikes.contains(&b)) || (*latin == b && lookalikes.contains(&a))
    })
}

fn confusable_eq(a: char, b: char) -> bool {
    a == b || confusable(a, b)
}

/// Find `brand` embedded in `label` allowing confusable substitutions.
///
/// Returns the first substitution as (position-in-label, seen-char,
/// expected-char). `None` when no window matches or the only matching window
/// is an exact substring (no substitution involved).
pub fn find_confusable_embedding(label: &str, brand: &str) -> Option<(usize, char, char)> {
    let label_chars: Vec<char> = label.chars().collect();
    let brand_chars: Vec<char> = brand.chars().collect();
    if brand_chars.is_empty() || label_chars.len() < brand_chars.len() {
        return None;
    }

    for start in 0..=(label_chars.len() - brand_chars.len()) {
        let window = &label_chars[start..start + brand_chars.len()];
        if window.iter().zip(&brand_chars).all(|(l, b)| confusable_eq(*l, *b)) {
            if let Some((offset, (seen, expected))) = window
                .iter()
                .zip(&brand_chars)
                .enumerate()
                .find(|(_, (l, b))| l != b)
                .map(|(i, (l, b))| (i, (*l, *b)))
            {
                return Some((start + offset, seen, expected));
            }
        }
    }
    None
}

/// Compare aligned leading positions of candidate and brand label.
///
/// Returns (position, seen, expected) for the first differing pair that is a
/// known confusable, mirroring how typosquatters substitute in place.
pub fn aligned_substitution(label: &str, brand: &str) -> Option<(usize, char, char)> {
    label
        .chars()
        .zip(brand.chars())
        .enumerate()
        .find(|(_, (l, b))| l != b && confusable(*l, *b))
        .map(|(i, (l, b))| (i, l, b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Script {
    Latin,
    Cyrillic,
    Greek,
}

impl Script {
    fn name(self) -> &'static str {
        match self {
            Script::Latin => "latin",
            Script::Cyrillic => "cyrillic",
            Script::Greek => "greek",
        }
    }

    fn of(c: char) -> Option<Self> {
        match c {
            'а'..='я' | 'А'..='Я' => Some(Script::Cyrillic),
            'α'..='ω' | 'Α'..='Ω' => Some(Script::Greek),
            _ if c.is_alphabetic() => Some(Script::Latin),
            _ => None,
        }
    }
}

/// Report mixed-script usage among {Latin, Cyrillic, Greek}, if any.
///
/// Returns the detail string for the lookalike report, e.g.
/// `"Mixed scripts detected: latin, cyrillic"`.
pub fn mixed_scripts(label: &str) -> Option<String> {
    let mut scripts: Vec<Script> = label.chars().filter_map(Script::of).collect();
    scripts.sort();
    scripts.dedup();

    if scripts.len() > 1 {
        let names: Vec<&str> = scripts.iter().map(|s| s.name()).collect();
        Some(format!("Mixed scripts detected: {}", names.join(", ")))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusable_works_both_directions() {
        assert!(confusable('l', '1'));
        assert!(confusable('1', 'l'));
        assert!(confusable('o', 'о')); // Cyrillic о
        assert!(!confusable('a', 'b'));
    }

    #[test]
    fn embedding_found_despite_digit_substitution() {
        let (pos, seen, expected) = find_confusable_embedding("paypa1-verify-login", "paypal").unwrap();
        assert_eq!((pos, seen, expected), (5, '1', 'l'));
    }

    #[test]
    fn embedding_found_mid_label() {
        let (pos, seen, expected) = find_confusable_embedding("secure-micr0soft-login", "microsoft").unwrap();
        assert_eq!((pos, seen, expected), (11, '0', 'o'));
    }

    #[test]
    fn exact_substring_is_not_a_substitution() {
        assert!(find_confusable_embedding("paypal-secure", "paypal").is_none());
        assert!(find_confusable_embedding("short", "muchlongerbrand").is_none());
    }

    #[test]
    fn aligned_substitution_reports_position() {
        let (pos, seen, expected) = aligned_substitution("paypa1", "paypal").unwrap();
        assert_eq!((pos, seen, expected), (5, '1', 'l'));
        assert!(aligned_substitution("paypal", "paypal").is_none());
        assert!(aligned_substitution("gxogle", "google").is_none());
    }

    #[test]
    fn mixed_scripts_detected_for_cyrillic_blend() {
        let detail = mixed_scripts("pаypal").unwrap(); // Cyrillic а
        assert_eq!(detail, "Mixed scripts detected: latin, cyrillic");
        assert!(mixed_scripts("paypal").is_none());
        assert!(mixed_scripts("12345").is_none());
    }
}
