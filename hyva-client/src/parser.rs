//! Statistical-finding extraction from progress message text
//!
//! The validation service reports its statistical tests as free-form
//! human-readable lines inside `message` fields. This module recognizes
//! those lines with an ordered table of pattern rules: each rule pairs a
//! line predicate with a numeric extractor, rules are tried in priority
//! order, and the first matching rule wins - a line never yields more
//! than one finding.
//!
//! A line no rule matches is not an error; it is silently skipped, so
//! arbitrary prose in progress messages cannot abort the stream fold.

use hyva_common::types::StatisticalFinding;

/// Numeric captures pulled out of a matched line
struct Extracted {
    statistic: Option<f64>,
    p_value: f64,
}

/// One entry in the ordered parsing grammar
struct ParseRule {
    test_name: &'static str,
    description: &'static str,
    /// Predicate over the lowercased line
    matches: fn(&str) -> bool,
    /// Extractor over the lowercased line; `None` when the required
    /// numbers are absent, in which case the line yields no finding
    extract: fn(&str) -> Option<Extracted>,
}

/// The parsing grammar, in priority order. Each rule produces a distinct
/// `test_name`.
const RULES: &[ParseRule] = &[
    ParseRule {
        test_name: "Bootstrap Test",
        description: "Bootstrap resampling significance test",
        matches: |line| line.contains("bootstrap") && line.contains("p-value"),
        extract: p_value_only,
    },
    ParseRule {
        test_name: "Fisher's Method",
        description: "Fisher's method for combining independent p-values",
        matches: |line| line.contains("fisher") && line.contains("p-value"),
        extract: p_value_only,
    },
    ParseRule {
        test_name: "Kolmogorov-Smirnov (Tangential Motion)",
        description: "Two-sample K-S test on tangential proper motion",
        matches: |line| line.contains("tangential motion") && line.contains("statistic"),
        extract: statistic_and_p_value,
    },
    ParseRule {
        test_name: "Kolmogorov-Smirnov (Perpendicular Motion)",
        description: "Two-sample K-S test on perpendicular proper motion",
        matches: |line| line.contains("perpendicular motion") && line.contains("statistic"),
        extract: statistic_and_p_value,
    },
    ParseRule {
        test_name: "Tangential/Radial Ratio",
        description: "Ratio test of tangential to radial velocity components",
        matches: |line| line.contains("tangential/radial"),
        extract: statistic_and_p_value,
    },
    ParseRule {
        test_name: "Combined Kolmogorov-Smirnov Test",
        description: "Combined two-sample Kolmogorov-Smirnov test",
        matches: |line| {
            line.contains("combined") && (line.contains("kolmogorov") || line.contains("k-s"))
        },
        extract: p_value_only,
    },
];

/// Scan one line of message text for a recognizable statistical-test
/// report. Returns at most one finding (first matching rule wins).
pub fn parse_line(raw: &str) -> Option<StatisticalFinding> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();

    let rule = RULES.iter().find(|rule| (rule.matches)(&lower))?;
    let extracted = (rule.extract)(&lower)?;

    Some(StatisticalFinding {
        test_name: rule.test_name.to_string(),
        statistic: extracted.statistic,
        p_value: extracted.p_value,
        description: rule.description.to_string(),
        raw_text: trimmed.to_string(),
    })
}

/// Scan a whole message, line by line, collecting findings in order.
/// Findings are never deduplicated: a test reported twice is kept twice.
pub fn parse_message(message: &str) -> Vec<StatisticalFinding> {
    message.lines().filter_map(parse_line).collect()
}

fn p_value_only(line: &str) -> Option<Extracted> {
    Some(Extracted {
        statistic: None,
        p_value: number_after(line, &["p-value", "p value"])?,
    })
}

fn statistic_and_p_value(line: &str) -> Option<Extracted> {
    Some(Extracted {
        statistic: Some(number_after(line, &["statistic"])?),
        p_value: number_after(line, &["p-value", "p value"])?,
    })
}

/// Find the first of `keys` in the line and parse the number following it,
/// skipping separator characters (`:`, `=`, whitespace) between key and
/// value. Accepts plain decimal and exponential notation.
fn number_after(line: &str, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(idx) = line.find(key) {
            let rest = &line[idx + key.len()..];
            let rest = rest.trim_start_matches(|c: char| c == ':' || c == '=' || c.is_whitespace());
            if let Some(value) = leading_float(rest) {
                return Some(value);
            }
        }
    }
    None
}

/// Parse the float at the start of `s`, consuming an optional sign, a
/// decimal mantissa, and an optional exponent (`3.05462e-171`).
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => {
                seen_digit = true;
                end += 1;
            }
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }

    // Optional exponent; only consumed if a digit actually follows
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        if matches!(bytes.get(exp), Some(b'0'..=b'9')) {
            end = exp;
            while matches!(bytes.get(end), Some(b'0'..=b'9')) {
                end += 1;
            }
        }
    }

    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_line() {
        let finding = parse_line("Bootstrap p-value: 0.497").unwrap();
        assert_eq!(finding.test_name, "Bootstrap Test");
        assert_eq!(finding.p_value, 0.497);
        assert_eq!(finding.statistic, None);
        assert_eq!(finding.raw_text, "Bootstrap p-value: 0.497");
    }

    #[test]
    fn test_fisher_line() {
        let finding = parse_line("Fisher's method combined p-value: 1.2e-5").unwrap();
        assert_eq!(finding.test_name, "Fisher's Method");
        assert_eq!(finding.p_value, 1.2e-5);
        assert_eq!(finding.statistic, None);
    }

    #[test]
    fn test_tangential_ks_line_with_exponential_p_value() {
        let finding =
            parse_line("Tangential motion (pm_l): statistic=0.14753, p-value=3.05462e-171")
                .unwrap();
        assert_eq!(finding.test_name, "Kolmogorov-Smirnov (Tangential Motion)");
        assert_eq!(finding.statistic, Some(0.14753));
        assert_eq!(finding.p_value, 3.05462e-171);
    }

    #[test]
    fn test_perpendicular_ks_line() {
        let finding =
            parse_line("Perpendicular motion (pm_b): statistic=0.08211, p-value=0.00042").unwrap();
        assert_eq!(
            finding.test_name,
            "Kolmogorov-Smirnov (Perpendicular Motion)"
        );
        assert_eq!(finding.statistic, Some(0.08211));
        assert_eq!(finding.p_value, 0.00042);
    }

    #[test]
    fn test_tangential_radial_ratio_line() {
        let finding =
            parse_line("Tangential/radial velocity ratio: statistic=1.833, p-value=0.0127")
                .unwrap();
        assert_eq!(finding.test_name, "Tangential/Radial Ratio");
        assert_eq!(finding.statistic, Some(1.833));
        assert_eq!(finding.p_value, 0.0127);
    }

    #[test]
    fn test_combined_ks_line() {
        let finding =
            parse_line("Combined Kolmogorov-Smirnov test p-value: 0.0031").unwrap();
        assert_eq!(finding.test_name, "Combined Kolmogorov-Smirnov Test");
        assert_eq!(finding.p_value, 0.0031);
        assert_eq!(finding.statistic, None);
    }

    #[test]
    fn test_fisher_wins_over_combined_rule() {
        // Contains "combined" too, but the Fisher rule has priority
        let finding = parse_line("Fisher's method combined p-value: 0.02").unwrap();
        assert_eq!(finding.test_name, "Fisher's Method");
    }

    #[test]
    fn test_unrecognized_line_is_silently_skipped() {
        assert!(parse_line("Loading Gaia DR3 proper motion catalog...").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn test_matched_line_with_missing_number_yields_nothing() {
        // Predicate matches but the p-value is unparseable
        assert!(parse_line("Bootstrap p-value: pending").is_none());
        // K-S rule requires both statistic and p-value
        assert!(parse_line("Tangential motion (pm_l): statistic=0.14753").is_none());
    }

    #[test]
    fn test_case_insensitive_matching_preserves_raw_text() {
        let finding = parse_line("  BOOTSTRAP P-VALUE: 0.03  ").unwrap();
        assert_eq!(finding.test_name, "Bootstrap Test");
        assert_eq!(finding.p_value, 0.03);
        assert_eq!(finding.raw_text, "BOOTSTRAP P-VALUE: 0.03");
    }

    #[test]
    fn test_multi_line_message_collects_in_order() {
        let message = "Running distribution comparison...\n\
                       Tangential motion (pm_l): statistic=0.14753, p-value=3.05462e-171\n\
                       Perpendicular motion (pm_b): statistic=0.08211, p-value=0.00042\n\
                       Bootstrap p-value: 0.497";
        let findings = parse_message(message);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].test_name, "Kolmogorov-Smirnov (Tangential Motion)");
        assert_eq!(findings[1].test_name, "Kolmogorov-Smirnov (Perpendicular Motion)");
        assert_eq!(findings[2].test_name, "Bootstrap Test");
    }

    #[test]
    fn test_duplicate_findings_are_kept() {
        let message = "Bootstrap p-value: 0.1\nBootstrap p-value: 0.1";
        assert_eq!(parse_message(message).len(), 2);
    }

    #[test]
    fn test_leading_float_forms() {
        assert_eq!(leading_float("0.497"), Some(0.497));
        assert_eq!(leading_float("3.05462e-171,"), Some(3.05462e-171));
        assert_eq!(leading_float("1E6 rest"), Some(1e6));
        assert_eq!(leading_float("-0.5"), Some(-0.5));
        assert_eq!(leading_float(".75"), Some(0.75));
        // "e" without a following digit is not an exponent
        assert_eq!(leading_float("2e"), Some(2.0));
        assert_eq!(leading_float("none"), None);
        assert_eq!(leading_float(""), None);
    }
}
