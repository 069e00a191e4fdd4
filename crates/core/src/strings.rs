//! Substring substitution helpers.
//!
//! The flush and read paths build file names and group paths by splicing
//! values into placeholder patterns (`%T` in filename patterns, the
//! `%T/` suffix of the base path, trailing path separators). These two
//! primitives are the only splice operations they use.
//!
//! Note the historical asymmetry the naming layer depends on: file
//! creation substitutes the **first** placeholder occurrence, file
//! re-opening the **last**. For the conventional single-`%T` pattern the
//! two agree; patterns with several placeholders make the asymmetry
//! observable and are kept working unchanged for compatibility.

/// Replace the first occurrence of `target` in `s`, if any.
pub fn replace_first(s: &str, target: &str, replacement: &str) -> String {
    match s.find(target) {
        Some(pos) => splice(s, pos, target.len(), replacement),
        None => s.to_string(),
    }
}

/// Replace the last occurrence of `target` in `s`, if any.
pub fn replace_last(s: &str, target: &str, replacement: &str) -> String {
    match s.rfind(target) {
        Some(pos) => splice(s, pos, target.len(), replacement),
        None => s.to_string(),
    }
}

fn splice(s: &str, pos: usize, len: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(s.len() - len + replacement.len());
    out.push_str(&s[..pos]);
    out.push_str(replacement);
    out.push_str(&s[pos + len..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_replace_first_takes_leftmost() {
        assert_eq!(replace_first("sim_%T_%T.h5", "%T", "7"), "sim_7_%T.h5");
    }

    #[test]
    fn test_replace_last_takes_rightmost() {
        assert_eq!(replace_last("sim_%T_%T.h5", "%T", "7"), "sim_%T_7.h5");
    }

    #[test]
    fn test_base_path_suffix_strip() {
        assert_eq!(replace_first("/data/%T/", "%T/", ""), "/data/");
    }

    #[test]
    fn test_trailing_separator_strip() {
        assert_eq!(replace_last("meshes/", "/", ""), "meshes");
        assert_eq!(replace_last("a/b/", "/", ""), "a/b");
    }

    #[test]
    fn test_absent_target_is_identity() {
        assert_eq!(replace_first("simData.h5", "%T", "7"), "simData.h5");
        assert_eq!(replace_last("simData.h5", "%T", "7"), "simData.h5");
    }

    proptest! {
        #[test]
        fn prop_first_and_last_agree_on_single_occurrence(
            prefix in "[a-z_.]{0,8}",
            suffix in "[a-z_.]{0,8}",
            index in 0u64..1_000_000,
        ) {
            let s = format!("{prefix}%T{suffix}");
            let r = index.to_string();
            prop_assert_eq!(replace_first(&s, "%T", &r), replace_last(&s, "%T", &r));
        }

        #[test]
        fn prop_two_occurrences_substitute_opposite_ends(
            a in "[a-z_.]{0,6}",
            b in "[a-z_.]{0,6}",
            c in "[a-z_.]{0,6}",
        ) {
            let s = format!("{a}%T{b}%T{c}");
            prop_assert_eq!(replace_first(&s, "%T", "9"), format!("{a}9{b}%T{c}"));
            prop_assert_eq!(replace_last(&s, "%T", "9"), format!("{a}%T{b}9{c}"));
        }

        #[test]
        fn prop_length_accounting(s in "[a-z%T_]{0,24}") {
            let out = replace_first(&s, "%T", "1234");
            if s.contains("%T") {
                prop_assert_eq!(out.len(), s.len() + 2);
            } else {
                prop_assert_eq!(out, s);
            }
        }
    }
}
