//! Text normalization shared by label routing and value assignment

/// Placeholder values the catalog shows instead of data
const ABSENT_SENTINELS: [&str; 2] = ["not available", "n/a"];

/// Advertisement the catalog injects into the adverse-effects field, whitespace-collapsed
const ADVERSE_EFFECTS_PROMO: &str = "Improve decision support & research outcomesWith \
    structured adverse effects data, including: blackbox warnings, adverse reactions, \
    warning & precautions, & incidence rates. View sample adverse effects data in our new \
    Data Library!See the data Improve decision support & research outcomes with our \
    structured adverse effects data.See a data sample";

/// Collapses runs of whitespace to single spaces and trims the ends
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases and collapses whitespace
pub fn normalize(input: &str) -> String {
    collapse_whitespace(&input.to_lowercase())
}

/// Capitalizes the first letter of every word
///
/// A word starts at the beginning of the input or after a space, hyphen or apostrophe.
pub fn to_title_case(input: &str) -> String {
    capitalize_after(input, |c| c == ' ' || c == '-' || c == '\'')
}

/// Capitalizes the first letter of every sentence
pub fn to_sentence_case(input: &str) -> String {
    capitalize_after(input, |c| c == '.' || c == '!' || c == '?')
}

fn capitalize_after(input: &str, is_boundary: impl Fn(char) -> bool) -> String {
    let mut result = String::with_capacity(input.len());
    let mut capitalize_next = true;

    for c in input.chars() {
        if capitalize_next && c.is_alphabetic() {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            if is_boundary(c) {
                capitalize_next = true;
            }
            result.push(c);
        }
    }

    result
}

/// Whether a raw field value is a "no data" placeholder
pub fn is_absent(value: &str) -> bool {
    let value = normalize(value);
    ABSENT_SENTINELS.contains(&value.as_str())
}

/// Folds a human-readable label into its canonical CamelCase form
///
/// `"CAS number"` becomes `"CasNumber"`, `"Half-life"` becomes `"HalfLife"`.
pub fn canonical_label(label: &str) -> String {
    to_title_case(&normalize(label))
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Removes the adverse-effects advertisement
pub fn scrub_promotional(input: &str) -> String {
    collapse_whitespace(&collapse_whitespace(input).replace(ADVERSE_EFFECTS_PROMO, ""))
}
