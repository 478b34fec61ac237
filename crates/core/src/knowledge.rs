use serde::Serialize;

use crate::domain::results::KnowledgeArticle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeTopic {
    Billing,
    Technical,
    Account,
    General,
}

impl KnowledgeTopic {
    /// Keyword buckets are checked in order; the first hit wins.
    pub fn classify(query: &str) -> Self {
        let query = query.to_lowercase();
        let has_any = |needles: &[&str]| needles.iter().any(|needle| query.contains(needle));

        if has_any(&["billing", "charge", "refund"]) {
            Self::Billing
        } else if has_any(&["technical", "error", "issue"]) {
            Self::Technical
        } else if has_any(&["account", "login", "password"]) {
            Self::Account
        } else {
            Self::General
        }
    }
}

struct ArticleSeed {
    title: &'static str,
    content: &'static str,
    slug: &'static str,
    relevance: f64,
}

const BILLING: &[ArticleSeed] = &[
    ArticleSeed {
        title: "Billing and Refund Process",
        content: "Standard process for handling duplicate charges: 1) Verify the duplicate charge in billing history 2) Initiate refund through the billing system 3) Send confirmation email to customer 4) Monitor account for similar issues",
        slug: "billing-refund",
        relevance: 0.95,
    },
    ArticleSeed {
        title: "Subscription Billing Issues",
        content: "Common subscription billing issues and resolutions: - Duplicate charges during system maintenance - Failed payments - Subscription renewal problems - Refund processing times",
        slug: "subscription-billing",
        relevance: 0.90,
    },
    ArticleSeed {
        title: "Customer Account Monitoring",
        content: "Best practices for monitoring customer accounts: 1) Set up alerts for unusual billing patterns 2) Document all billing-related issues 3) Regular account review for high-risk customers",
        slug: "account-monitoring",
        relevance: 0.85,
    },
];

const TECHNICAL: &[ArticleSeed] = &[
    ArticleSeed {
        title: "Common Technical Issues and Solutions",
        content: "Troubleshooting steps for common technical problems: 1) Clear browser cache 2) Try a different network 3) Update software 4) Restart the application",
        slug: "technical-issues",
        relevance: 0.95,
    },
    ArticleSeed {
        title: "Network Connectivity Problems",
        content: "Solutions for network-related errors: - Check internet connection - Verify firewall settings - Test alternative networks - Reset network settings",
        slug: "network-connectivity",
        relevance: 0.90,
    },
    ArticleSeed {
        title: "Software Update Requirements",
        content: "Guide to updating software: 1) Check current version 2) Download latest update 3) Install update 4) Verify successful update",
        slug: "software-updates",
        relevance: 0.85,
    },
];

const ACCOUNT: &[ArticleSeed] = &[
    ArticleSeed {
        title: "Account Access Troubleshooting",
        content: "Steps to resolve login issues: 1) Reset password 2) Verify email address 3) Check account status 4) Clear browser cookies",
        slug: "account-access",
        relevance: 0.95,
    },
    ArticleSeed {
        title: "Password Reset Process",
        content: "How to reset your password: - Use the forgot password link - Check your email for the reset link - Create a strong new password - Update password in all devices",
        slug: "password-reset",
        relevance: 0.90,
    },
    ArticleSeed {
        title: "Account Security Best Practices",
        content: "Recommendations for account security: 1) Use strong passwords 2) Enable two-factor authentication 3) Monitor account activity 4) Sign out from shared devices",
        slug: "account-security",
        relevance: 0.85,
    },
];

const GENERAL: &[ArticleSeed] = &[
    ArticleSeed {
        title: "Customer Support Guide",
        content: "Overview of customer support services: 1) Chat support 2) Email support 3) Phone support 4) Self-service options",
        slug: "support-guide",
        relevance: 0.80,
    },
    ArticleSeed {
        title: "Frequently Asked Questions",
        content: "Answers to common questions about our products and services",
        slug: "faq",
        relevance: 0.75,
    },
    ArticleSeed {
        title: "Contact Information",
        content: "How to reach different support departments: - Technical support - Billing support - Account management - General inquiries",
        slug: "contact",
        relevance: 0.70,
    },
];

pub const DEFAULT_HELP_CENTER_URL: &str = "https://example.com/help";

/// Read-only help-center corpus matched by topic keywords.
#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    base_url: String,
    max_results: usize,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(DEFAULT_HELP_CENTER_URL, 5)
    }
}

impl KnowledgeBase {
    pub fn new(base_url: impl Into<String>, max_results: usize) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), max_results }
    }

    pub fn search(&self, query: &str) -> Vec<KnowledgeArticle> {
        let seeds = match KnowledgeTopic::classify(query) {
            KnowledgeTopic::Billing => BILLING,
            KnowledgeTopic::Technical => TECHNICAL,
            KnowledgeTopic::Account => ACCOUNT,
            KnowledgeTopic::General => GENERAL,
        };

        seeds
            .iter()
            .take(self.max_results)
            .map(|seed| KnowledgeArticle {
                title: seed.title.to_string(),
                content: seed.content.to_string(),
                url: format!("{}/{}", self.base_url, seed.slug),
                relevance: seed.relevance,
            })
            .collect()
    }
}

/// Builds a search query from the leading words of a summary.
pub fn query_from_summary(summary: &str) -> String {
    summary.split_whitespace().take(5).collect::<Vec<_>>().join(" ")
}
