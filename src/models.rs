use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Where a framework agreement currently sits in its renewal workflow.
///
/// The tracking sheet records progress as free text; `from_label` is the only
/// place that text is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    NotStarted,
    DataPrep,
    ApprovalPending,
    PurchasePending,
    SealPending,
    Completed,
    Unknown(String),
}

impl LifecycleStage {
    pub const DATA_PREP_LABEL: &'static str = "资料整理中";
    pub const APPROVAL_PENDING_LABEL: &'static str = "发起事财权阶段";
    pub const PURCHASE_PENDING_LABEL: &'static str = "合同采购阶段";
    pub const SEAL_PENDING_LABEL: &'static str = "合同用印阶段";
    pub const COMPLETED_LABEL: &'static str = "已完成";

    pub fn from_label(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::NotStarted,
            Self::DATA_PREP_LABEL => Self::DataPrep,
            Self::APPROVAL_PENDING_LABEL => Self::ApprovalPending,
            Self::PURCHASE_PENDING_LABEL => Self::PurchasePending,
            Self::SEAL_PENDING_LABEL => Self::SealPending,
            Self::COMPLETED_LABEL => Self::Completed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The sheet text for this stage; empty for `NotStarted`.
    pub fn label(&self) -> &str {
        match self {
            Self::NotStarted => "",
            Self::DataPrep => Self::DATA_PREP_LABEL,
            Self::ApprovalPending => Self::APPROVAL_PENDING_LABEL,
            Self::PurchasePending => Self::PURCHASE_PENDING_LABEL,
            Self::SealPending => Self::SEAL_PENDING_LABEL,
            Self::Completed => Self::COMPLETED_LABEL,
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgreementRecord {
    pub id: i32,
    pub system_name: String,
    pub business_department: String,
    pub responsible_department: String,
    pub previous_agreement_expiry: Option<NaiveDate>,
    pub planned_approval_date: Option<NaiveDate>,
    pub planned_purchase_date: Option<NaiveDate>,
    pub planned_contract_date: Option<NaiveDate>,
    pub responsible_person: String,
    pub progress: LifecycleStage,
}

/// Urgency tier, 1 (most urgent) through 5 (least urgent or undated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum AlertLevel {
    Critical = 1,
    Urgent = 2,
    Moderate = 3,
    Normal = 4,
    Low = 5,
}

impl AlertLevel {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn is_urgent(self) -> bool {
        self <= Self::Urgent
    }
}

impl From<AlertLevel> for u8 {
    fn from(level: AlertLevel) -> Self {
        level.value()
    }
}

/// A record together with the values derived for it during one analysis pass.
#[derive(Debug, Clone, Serialize)]
pub struct AlertedAgreement {
    #[serde(flatten)]
    pub record: AgreementRecord,
    pub reference_date: Option<NaiveDate>,
    pub alert_level: AlertLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub generated_at: NaiveDateTime,
    pub need_data: Vec<String>,
    pub need_approval: Vec<String>,
    pub need_purchase: Vec<String>,
    pub need_seal: Vec<String>,
    pub agreements: Vec<AlertedAgreement>,
}

impl AlertReport {
    pub fn has_alerts(&self) -> bool {
        !(self.need_data.is_empty()
            && self.need_approval.is_empty()
            && self.need_purchase.is_empty()
            && self.need_seal.is_empty())
    }

    pub fn completed_count(&self) -> usize {
        self.agreements
            .iter()
            .filter(|agreement| agreement.record.progress.is_completed())
            .count()
    }

    pub fn urgent_count(&self) -> usize {
        self.agreements
            .iter()
            .filter(|agreement| agreement.alert_level.is_urgent())
            .count()
    }

    /// Distinct people named across all four alert lists.
    pub fn alerted_people(&self) -> usize {
        let mut names: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for name in self
            .need_data
            .iter()
            .chain(&self.need_approval)
            .chain(&self.need_purchase)
            .chain(&self.need_seal)
        {
            names.insert(name.as_str());
        }
        names.len()
    }
}
