// src/notify/digest.rs
use std::fmt::Write as _;

use crate::ingest::NormalizedItem;

pub const DIGEST_TITLE: &str = "Daily Cybersecurity Briefing";

/// Plain-text digest body: title line, blank line, then one block per item
/// in input order.
pub fn format_digest(items: &[NormalizedItem]) -> String {
    let mut out = format!("{DIGEST_TITLE}\n\n");
    for it in items {
        let _ = write!(
            out,
            "- {}\n  Source: {}\n  Topic: {}\n  Published: {}\n  Link: {}\n\n",
            it.title,
            it.source_name,
            it.topic,
            it.pub_date(),
            it.link
        );
    }
    out
}
