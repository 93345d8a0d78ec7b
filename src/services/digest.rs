//! Alert digest composition.
//!
//! Turns a classification into at most one HTML message. The headline is
//! picked by priority: new failures, then continued failures, then transient
//! failures, then fixes.

use std::collections::BTreeSet;

use crate::models::micros_to_datetime;
use crate::services::classifier::{Classification, ClassificationBuckets};

/// Framing of a digest, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Headline {
    NewFailure,
    ContinuedFailure,
    TransientFailure,
    AllFixed,
}

impl Headline {
    /// First matching headline for the buckets, or `None` if nothing is worth sending.
    pub fn select(buckets: &ClassificationBuckets) -> Option<Self> {
        if !buckets.new_failures.is_empty() {
            Some(Self::NewFailure)
        } else if !buckets.continued_failures.is_empty() {
            Some(Self::ContinuedFailure)
        } else if !buckets.transient.is_empty() {
            Some(Self::TransientFailure)
        } else if !buckets.fixed.is_empty() {
            Some(Self::AllFixed)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewFailure => "new_failure",
            Self::ContinuedFailure => "continued_failure",
            Self::TransientFailure => "transient_failure",
            Self::AllFixed => "all_fixed",
        }
    }

    fn greeting(&self, test_name: &str, build_ids: &str) -> String {
        match self {
            Self::NewFailure => format!(
                "New test case failure(s) in {} for device build ID(s): {}.",
                test_name, build_ids
            ),
            Self::ContinuedFailure => format!(
                "Continuous test case failure(s) in {} for device build ID(s): {}.",
                test_name, build_ids
            ),
            Self::TransientFailure => format!(
                "Transient test case failure(s) in {} but tests all are passing in the latest device build(s): {}.",
                test_name, build_ids
            ),
            Self::AllFixed => format!(
                "All test cases passed in {} for device build ID(s): {}!",
                test_name, build_ids
            ),
        }
    }
}

/// A composed alert ready to hand to the mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub headline: Headline,
    pub subject: String,
    pub html_body: String,
    pub recipients: Vec<String>,
}

/// Link to the status page of a test, anchored at the run that triggered the digest.
pub fn status_link(dashboard_url: &str, test_name: &str, run_id: i64) -> String {
    format!(
        "{}/show_tree?testName={}&endTime={}",
        dashboard_url.trim_end_matches('/'),
        urlencoding::encode(test_name),
        run_id
    )
}

/// Compose the digest for a classification, or `None` when no headline applies.
pub fn compose_digest(
    test_name: &str,
    classification: &Classification,
    link: &str,
    recipients: Vec<String>,
) -> Option<Digest> {
    let buckets = &classification.buckets;
    let headline = Headline::select(buckets)?;

    let build_ids = classification
        .build_ids
        .iter()
        .map(|id| escape_html(id))
        .collect::<Vec<_>>()
        .join(",");

    let date = micros_to_datetime(classification.newest_start)
        .map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_default();
    let subject = format!("Test Alert: {} @ {}", test_name, date);

    let html_body = format!(
        "Hello,<br><br>{}<br><br>{}<br><br>For details, visit the <a href='{}'>dashboard.</a>",
        headline.greeting(&escape_html(test_name), &build_ids),
        summary(buckets),
        escape_html(link)
    );

    Some(Digest {
        headline,
        subject,
        html_body,
        recipients,
    })
}

fn summary(buckets: &ClassificationBuckets) -> String {
    let mut sections = Vec::new();

    if !buckets.new_failures.is_empty() || !buckets.continued_failures.is_empty() {
        let mut section = String::from("The following test cases failed in the latest test run:<br>");
        for name in &buckets.new_failures {
            section.push_str(&format!("- <b>{}</b><br>", escape_html(name)));
        }
        push_items(&mut section, &buckets.continued_failures);
        sections.push(section);
    }
    if !buckets.fixed.is_empty() {
        let mut section = String::from("The following test cases were fixed in the latest test run:<br>");
        for name in &buckets.fixed {
            section.push_str(&format!("- <i>{}</i><br>", escape_html(name)));
        }
        sections.push(section);
    }
    if !buckets.transient.is_empty() {
        let mut section = String::from("The following transient test case failures occurred:<br>");
        push_items(&mut section, &buckets.transient);
        sections.push(section);
    }
    if !buckets.skipped_since_failing.is_empty() {
        let mut section =
            String::from("The following test cases have not been run since failing:<br>");
        push_items(&mut section, &buckets.skipped_since_failing);
        sections.push(section);
    }

    sections.join("<br>")
}

fn push_items(section: &mut String, names: &BTreeSet<String>) {
    for name in names {
        section.push_str(&format!("- {}<br>", escape_html(name)));
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
