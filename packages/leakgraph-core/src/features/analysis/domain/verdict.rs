//! Classifier verdicts

use super::trace::LeakingStatus;

/// What one classifier concluded about one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Leaking(String),
    NotLeaking(String),
    Unknown,
}

/// Combine every classifier's verdict for one element
///
/// Agreeing verdicts merge their reasons; `Leaking` against `NotLeaking`
/// resolves to `Unknown` carrying both sides. The leaking object itself is
/// always `Leaking`.
pub fn resolve_status(verdicts: &[Verdict], is_leaking_object: bool) -> (LeakingStatus, String) {
    let leaking: Vec<&str> = verdicts
        .iter()
        .filter_map(|v| match v {
            Verdict::Leaking(reason) => Some(reason.as_str()),
            _ => None,
        })
        .collect();
    let not_leaking: Vec<&str> = verdicts
        .iter()
        .filter_map(|v| match v {
            Verdict::NotLeaking(reason) => Some(reason.as_str()),
            _ => None,
        })
        .collect();

    if is_leaking_object {
        let mut reasons = vec!["leaking object"];
        reasons.extend(leaking);
        return (LeakingStatus::Leaking, reasons.join(" and "));
    }

    match (leaking.is_empty(), not_leaking.is_empty()) {
        (true, true) => (LeakingStatus::Unknown, String::new()),
        (false, true) => (LeakingStatus::Leaking, leaking.join(" and ")),
        (true, false) => (LeakingStatus::NotLeaking, not_leaking.join(" and ")),
        (false, false) => (
            LeakingStatus::Unknown,
            format!(
                "conflicting verdicts: leaking ({}) vs not leaking ({})",
                leaking.join(" and "),
                not_leaking.join(" and ")
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_resolves_to_unknown_with_both_reasons() {
        let (status, reason) = resolve_status(
            &[Verdict::Leaking("destroyed".into()), Verdict::NotLeaking("attached".into())],
            false,
        );
        assert_eq!(status, LeakingStatus::Unknown);
        assert!(reason.contains("destroyed") && reason.contains("attached"));
    }

    #[test]
    fn test_leaking_object_always_leaks() {
        let (status, reason) = resolve_status(&[Verdict::NotLeaking("singleton".into())], true);
        assert_eq!(status, LeakingStatus::Leaking);
        assert_eq!(reason, "leaking object");
    }

    #[test]
    fn test_no_verdicts_is_unknown() {
        assert_eq!(resolve_status(&[Verdict::Unknown], false), (LeakingStatus::Unknown, String::new()));
    }
}
