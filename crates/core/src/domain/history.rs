use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const ISSUE_TYPES: &[&str] = &[
    "Login Problem",
    "Password Reset",
    "Account Access",
    "Billing Issue",
    "Refund Request",
    "Subscription Cancellation",
    "Technical Error",
    "Feature Request",
    "Bug Report",
    "Product Question",
    "Service Outage",
    "Mobile App Issue",
    "Browser Compatibility",
    "Data Migration",
    "API Error",
];

pub const SUPPORT_TEAMS: &[&str] = &[
    "Technical Support",
    "Billing Support",
    "Account Management",
    "Product Support",
    "Security Team",
    "Escalations Team",
    "General Support",
];

const STATUSES: &[&str] = &["Resolved", "Pending", "Escalated", "Closed", "Reopened"];
const PRIORITIES: &[&str] = &["Low", "Medium", "High", "Critical"];
const CUSTOMER_TYPES: &[&str] = &["Free", "Basic", "Premium", "Enterprise"];
const DEFAULT_RESOLUTIONS: &[&str] = &["Issue investigated and resolved", "Applied standard fix"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalTicket {
    pub ticket_id: String,
    pub issue_type: String,
    pub assigned_team: String,
    pub status: String,
    pub priority: String,
    pub customer_type: String,
    pub first_response_time_minutes: u32,
    pub resolution_time_hours: u32,
    pub resolution_details: String,
    pub customer_satisfaction: u8,
    pub created_date: NaiveDate,
}

/// Deterministic synthetic ticket history used to seed a fresh store.
pub struct HistoryGenerator {
    rng: StdRng,
    anchor: NaiveDate,
}

impl HistoryGenerator {
    pub fn new(seed: u64, anchor: NaiveDate) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), anchor }
    }

    pub fn generate(&mut self, count: usize) -> Vec<HistoricalTicket> {
        (0..count).map(|index| self.ticket(index)).collect()
    }

    fn ticket(&mut self, index: usize) -> HistoricalTicket {
        let issue_type = self.pick(ISSUE_TYPES);
        let priority = self.pick(PRIORITIES);

        let first_response_time_minutes = match priority {
            "Critical" => self.rng.gen_range(1..=30),
            "High" => self.rng.gen_range(15..=60),
            _ => self.rng.gen_range(1..=120),
        };
        let resolution_time_hours = if issue_type.contains("Technical") || issue_type.contains("Bug")
        {
            self.rng.gen_range(4..=72)
        } else if issue_type.contains("Password") || issue_type.contains("Login") {
            self.rng.gen_range(1..=4)
        } else {
            self.rng.gen_range(1..=72)
        };
        let resolution_details = self.pick(resolution_templates(issue_type)).to_string();
        let age_days = self.rng.gen_range(1..=180);

        HistoricalTicket {
            ticket_id: format!("TICK-{}", index + 1000),
            issue_type: issue_type.to_string(),
            assigned_team: self.pick(SUPPORT_TEAMS).to_string(),
            status: self.pick(STATUSES).to_string(),
            priority: priority.to_string(),
            customer_type: self.pick(CUSTOMER_TYPES).to_string(),
            first_response_time_minutes,
            resolution_time_hours,
            resolution_details,
            customer_satisfaction: self.rng.gen_range(1..=5),
            created_date: self.anchor - Duration::days(age_days),
        }
    }

    fn pick(&mut self, values: &'static [&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

fn resolution_templates(issue_type: &str) -> &'static [&'static str] {
    match issue_type {
        "Login Problem" => {
            &["Reset user password", "Cleared browser cache", "Updated user credentials"]
        }
        "Password Reset" => {
            &["Sent password reset link", "Reset password manually", "Verified security questions"]
        }
        "Billing Issue" => {
            &["Processed refund", "Corrected billing information", "Applied account credit"]
        }
        "Technical Error" => {
            &["Applied software patch", "Cleared user data cache", "Reinstalled application"]
        }
        _ => DEFAULT_RESOLUTIONS,
    }
}
