//! The built-in email sequence.

use chrono::Duration;
use domain::CampaignStep;

/// Returns the default three-step drip sequence.
///
/// Delays are relative to the previous step: step 1 goes out an hour after
/// the lead is captured, step 2 a day after that, step 3 two days later.
pub fn default_campaign() -> Vec<CampaignStep> {
    vec![
        CampaignStep::new(
            1,
            Duration::hours(1),
            "Did you forget to send your Notice?",
            r#"<p>You started a Preliminary Notice but didn't finish.</p><p>Remember: The 20-day clock is ticking. <a href="https://sendmynotice.com">Finish it here</a>.</p>"#,
        ),
        CampaignStep::new(
            2,
            Duration::hours(23),
            "IMPORTANT: 20-Day Deadline Warning",
            r#"<p>Don't risk your lien rights over a $29 fee.</p><p>80% of contractors lose their money because they miss the deadline. <a href="https://sendmynotice.com">Send it now</a>.</p>"#,
        ),
        CampaignStep::new(
            3,
            Duration::hours(48),
            "Why lawyers charge $350 for this",
            r#"<p>A lawyer charges $350/hour to do what our tool does in 30 seconds. Save your money. <a href="https://sendmynotice.com">Protect your invoice</a>.</p>"#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_ordered_one_indexed() {
        let steps = default_campaign();
        assert_eq!(steps.len(), 3);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.number, i as u32 + 1);
            assert!(step.delay > Duration::zero());
            assert!(!step.subject.is_empty());
            assert!(!step.body.is_empty());
        }
    }
}
