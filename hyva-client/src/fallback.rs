//! Deterministic local fallback for unreachable validation service
//!
//! When the live stream cannot be established or breaks before a terminal
//! event, the session substitutes a locally computed approximation so the
//! caller always receives a usable `ValidationResult`. Selection is a
//! small ordered keyword table over the hypothesis text; each template is
//! a fully pre-baked result whose `methods` are produced by the real
//! message parser from canned report lines, so simulated findings are
//! structurally identical to parsed ones. Only `is_simulated` discloses
//! provenance.
//!
//! Determinism contract: identical `(hypothesis, alpha)` inputs always
//! yield a bit-identical result, so the timestamp is a fixed constant
//! rather than the construction time.

use chrono::{DateTime, Utc};

use hyva_common::types::{Evidence, EvidenceStrength, Source, ValidationResult};

use crate::parser;

/// Fixed timestamp for simulated results (2025-01-01T00:00:00Z)
const SIMULATED_TIMESTAMP_SECS: i64 = 1_735_689_600;

struct Template {
    validation_score: f64,
    p_value: f64,
    supporting: &'static [(&'static str, &'static str, EvidenceStrength)],
    contradicting: &'static [(&'static str, &'static str, EvidenceStrength)],
    /// Canned report lines, run through the real parser to build `methods`
    method_lines: &'static [&'static str],
    sources: &'static [(&'static str, Option<&'static str>, Option<&'static str>)],
    conclusion: &'static str,
}

static ASTROPHYSICS: Template = Template {
    validation_score: 0.87,
    p_value: 3.2e-4,
    supporting: &[
        (
            "Rubin & Ford (1970)",
            "Flat rotation curves of spiral galaxies require unseen mass at large radii",
            EvidenceStrength::Strong,
        ),
        (
            "SPARC database",
            "Baryonic Tully-Fisher relation holds across five decades of galaxy mass",
            EvidenceStrength::Moderate,
        ),
        (
            "Bullet Cluster lensing",
            "Lensing mass peaks are offset from the baryonic gas after cluster collision",
            EvidenceStrength::Strong,
        ),
    ],
    contradicting: &[(
        "MOND rotation-curve fits",
        "Modified Newtonian dynamics reproduces many rotation curves without dark matter",
        EvidenceStrength::Moderate,
    )],
    method_lines: &[
        "Tangential motion (pm_l): statistic=0.18432, p-value=2.41887e-12",
        "Perpendicular motion (pm_b): statistic=0.09127, p-value=1.77215e-4",
        "Combined Kolmogorov-Smirnov test p-value: 8.90211e-5",
        "Bootstrap p-value: 0.0023",
        "Fisher's method combined p-value: 3.2e-4",
    ],
    sources: &[
        (
            "Rubin & Ford 1970, ApJ 159, 379",
            Some("https://ui.adsabs.harvard.edu/abs/1970ApJ...159..379R"),
            Some("Foundational rotation-curve measurements"),
        ),
        (
            "Lelli et al. 2016, AJ 152, 157 (SPARC)",
            Some("https://ui.adsabs.harvard.edu/abs/2016AJ....152..157L"),
            Some("Rotation-curve sample used for the mass-discrepancy statistics"),
        ),
    ],
    conclusion: "Proper-motion distributions are inconsistent with a purely baryonic \
                 mass model; the rotation-curve discrepancy persists across all tested radii.",
};

static STELLAR_VELOCITY: Template = Template {
    validation_score: 0.74,
    p_value: 0.0127,
    supporting: &[
        (
            "Gaia DR3 proper motions",
            "Tangential velocity excess in the outer-disk tracer sample",
            EvidenceStrength::Moderate,
        ),
        (
            "APOGEE radial velocities",
            "Line-of-sight velocity dispersion rises with galactocentric radius",
            EvidenceStrength::Moderate,
        ),
    ],
    contradicting: &[(
        "Disk-warp models",
        "A warped stellar disk can mimic part of the observed tangential excess",
        EvidenceStrength::Weak,
    )],
    method_lines: &[
        "Tangential motion (pm_l): statistic=0.14753, p-value=3.05462e-171",
        "Perpendicular motion (pm_b): statistic=0.04418, p-value=0.00731",
        "Tangential/radial velocity ratio: statistic=1.833, p-value=0.0127",
        "Bootstrap p-value: 0.0391",
    ],
    sources: &[(
        "Gaia Collaboration 2023, A&A 674, A1",
        Some("https://ui.adsabs.harvard.edu/abs/2023A%26A...674A...1G"),
        Some("Astrometric catalog underlying the velocity sample"),
    )],
    conclusion: "The stellar velocity field shows a statistically significant tangential \
                 anisotropy relative to the axisymmetric equilibrium model.",
};

static GENERIC: Template = Template {
    validation_score: 0.55,
    p_value: 0.0813,
    supporting: &[(
        "Literature survey",
        "Published results are broadly consistent with the stated hypothesis",
        EvidenceStrength::Moderate,
    )],
    contradicting: &[(
        "Replication sample",
        "Effect size shrinks in the held-out replication sample",
        EvidenceStrength::Weak,
    )],
    method_lines: &[
        "Bootstrap p-value: 0.0813",
        "Fisher's method combined p-value: 0.0655",
    ],
    sources: &[],
    conclusion: "Available evidence is mixed; the test battery neither strongly supports \
                 nor rejects the hypothesis.",
};

/// Ordered keyword table: first row whose keywords all appear in the
/// lowercased hypothesis selects the template.
fn select_template(hypothesis: &str) -> &'static Template {
    let lower = hypothesis.to_lowercase();
    if lower.contains("dark matter") && lower.contains("galaxy") {
        &ASTROPHYSICS
    } else if lower.contains("stellar") && lower.contains("velocity") {
        &STELLAR_VELOCITY
    } else {
        &GENERIC
    }
}

/// Produce a deterministic simulated result for the given request.
pub fn simulate(hypothesis: &str, alpha: f64) -> ValidationResult {
    let template = select_template(hypothesis);

    let verdict = if template.p_value < alpha {
        "supported"
    } else {
        "not supported"
    };

    ValidationResult {
        hypothesis: hypothesis.to_string(),
        validation_score: template.validation_score,
        p_value: template.p_value,
        supporting_evidence: evidence_list(template.supporting),
        contradicting_evidence: evidence_list(template.contradicting),
        methods: template
            .method_lines
            .iter()
            .filter_map(|line| parser::parse_line(line))
            .collect(),
        sources: template
            .sources
            .iter()
            .map(|(title, url, relevance)| Source {
                title: (*title).to_string(),
                url: url.map(str::to_string),
                relevance: relevance.map(str::to_string),
            })
            .collect(),
        conclusion: format!(
            "{} The hypothesis is {} at the alpha = {} significance level.",
            template.conclusion, verdict, alpha
        ),
        timestamp: DateTime::from_timestamp(SIMULATED_TIMESTAMP_SECS, 0)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        is_simulated: true,
    }
}

fn evidence_list(
    items: &[(&str, &str, EvidenceStrength)],
) -> Vec<Evidence> {
    items
        .iter()
        .map(|(source, description, strength)| Evidence {
            source: (*source).to_string(),
            description: (*description).to_string(),
            strength: *strength,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DARK_MATTER: &str =
        "The presence of dark matter affects galaxy rotation curves.";

    #[test]
    fn test_identical_inputs_yield_byte_identical_results() {
        let a = simulate(DARK_MATTER, 0.05);
        let b = simulate(DARK_MATTER, 0.05);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_keyword_selection() {
        let astro = simulate(DARK_MATTER, 0.05);
        assert_eq!(astro.validation_score, 0.87);

        let stellar = simulate("Stellar velocity dispersion increases with radius.", 0.05);
        assert_eq!(stellar.validation_score, 0.74);

        let generic = simulate("Coffee improves code review throughput.", 0.05);
        assert_eq!(generic.validation_score, 0.55);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let astro = simulate("DARK MATTER halos shape GALAXY rotation.", 0.05);
        assert_eq!(astro.validation_score, 0.87);
    }

    #[test]
    fn test_result_is_flagged_simulated() {
        assert!(simulate(DARK_MATTER, 0.05).is_simulated);
    }

    #[test]
    fn test_methods_match_parser_output_structurally() {
        let result = simulate(DARK_MATTER, 0.05);
        assert_eq!(result.methods.len(), 5);

        // Every simulated method must round-trip through the live parser
        for method in &result.methods {
            let reparsed = parser::parse_line(&method.raw_text).unwrap();
            assert_eq!(&reparsed, method);
        }
        assert_eq!(result.methods[0].test_name, "Kolmogorov-Smirnov (Tangential Motion)");
        assert_eq!(result.methods[3].test_name, "Bootstrap Test");
    }

    #[test]
    fn test_alpha_threshold_changes_verdict() {
        let strict = simulate("Coffee improves code review throughput.", 0.05);
        assert!(strict.conclusion.contains("not supported"));

        let lenient = simulate("Coffee improves code review throughput.", 0.10);
        assert!(lenient.conclusion.contains("is supported"));
    }
}
