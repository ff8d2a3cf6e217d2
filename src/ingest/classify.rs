// src/ingest/classify.rs
use super::types::GENERAL_TOPIC;

/// First topic (in list order) contained in the title, case-insensitively.
/// Falls back to `"General"`; blank topic terms never match.
pub fn classify<S: AsRef<str>>(title: &str, topics: &[S]) -> String {
    let haystack = title.to_lowercase();
    topics
        .iter()
        .map(AsRef::as_ref)
        .find(|t| {
            let needle = t.trim();
            !needle.is_empty() && haystack.contains(&needle.to_lowercase())
        })
        .map(str::to_string)
        .unwrap_or_else(|| GENERAL_TOPIC.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_in_list_order_wins() {
        let topics = vec!["Ransomware".to_string(), "CVE".to_string()];
        assert_eq!(
            classify("New CVE exploited by ransomware gang", &topics),
            "Ransomware"
        );
    }

    #[test]
    fn match_is_case_insensitive_and_returns_configured_spelling() {
        assert_eq!(classify("zero-day in VPN appliance", &["Zero-Day"]), "Zero-Day");
    }

    #[test]
    fn empty_list_and_no_match_default_to_general() {
        let none: [&str; 0] = [];
        assert_eq!(classify("anything", &none), GENERAL_TOPIC);
        assert_eq!(classify("weather report", &["malware"]), GENERAL_TOPIC);
        assert_eq!(classify("", &["malware"]), GENERAL_TOPIC);
    }

    #[test]
    fn blank_terms_are_skipped() {
        assert_eq!(classify("phishing wave", &["  ", "phishing"]), "phishing");
    }
}
