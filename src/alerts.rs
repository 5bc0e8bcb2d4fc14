use std::collections::HashSet;

use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{AgreementRecord, AlertLevel, AlertReport, AlertedAgreement, LifecycleStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertCategory {
    NeedData,
    NeedApproval,
    NeedPurchase,
    NeedSeal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookback {
    Months(u32),
    Days(i64),
}

impl AlertCategory {
    pub const ALL: [AlertCategory; 4] = [
        AlertCategory::NeedData,
        AlertCategory::NeedApproval,
        AlertCategory::NeedPurchase,
        AlertCategory::NeedSeal,
    ];

    fn lookback(self) -> Lookback {
        match self {
            Self::NeedData => Lookback::Months(3),
            Self::NeedApproval => Lookback::Months(2),
            Self::NeedPurchase => Lookback::Months(1),
            Self::NeedSeal => Lookback::Days(14),
        }
    }

    /// Last workflow step a record may still be sitting in and be listed here.
    fn checkpoint(self) -> u8 {
        match self {
            Self::NeedData => 1,
            Self::NeedApproval => 2,
            Self::NeedPurchase => 3,
            Self::NeedSeal => 4,
        }
    }

    /// First day of the alert window that ends at `reference`.
    pub fn window_start(self, reference: NaiveDate) -> Option<NaiveDate> {
        match self.lookback() {
            Lookback::Months(months) => reference.checked_sub_months(Months::new(months)),
            Lookback::Days(days) => reference.checked_sub_signed(Duration::days(days)),
        }
    }

    pub fn qualifies(self, stage: &LifecycleStage) -> bool {
        pending_step(stage).is_some_and(|step| step <= self.checkpoint())
    }
}

fn pending_step(stage: &LifecycleStage) -> Option<u8> {
    match stage {
        LifecycleStage::NotStarted => Some(0),
        LifecycleStage::DataPrep => Some(1),
        LifecycleStage::ApprovalPending => Some(2),
        LifecycleStage::PurchasePending => Some(3),
        LifecycleStage::SealPending => Some(4),
        LifecycleStage::Completed | LifecycleStage::Unknown(_) => None,
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn reference_date(record: &AgreementRecord) -> Option<NaiveDate> {
    record
        .previous_agreement_expiry
        .or(record.planned_approval_date)
}

/// Whole days from `now` until the start of `reference`, truncated toward zero.
pub fn days_until(reference: NaiveDate, now: NaiveDateTime) -> i64 {
    (start_of_day(reference) - now).num_days()
}

pub fn classify(reference: Option<NaiveDate>, now: NaiveDateTime) -> AlertLevel {
    let Some(reference) = reference else {
        return AlertLevel::Low;
    };

    match days_until(reference, now) {
        i64::MIN..=6 => AlertLevel::Critical,
        7..=13 => AlertLevel::Urgent,
        14..=29 => AlertLevel::Moderate,
        30..=89 => AlertLevel::Normal,
        _ => AlertLevel::Low,
    }
}

pub fn is_alerted(
    category: AlertCategory,
    reference: Option<NaiveDate>,
    stage: &LifecycleStage,
    now: NaiveDateTime,
) -> bool {
    let Some(reference) = reference else {
        return false;
    };
    let Some(start) = category.window_start(reference) else {
        return false;
    };

    now >= start_of_day(start) && now < start_of_day(reference) && category.qualifies(stage)
}

pub fn assess(record: &AgreementRecord, now: NaiveDateTime) -> AlertedAgreement {
    let reference = reference_date(record);
    AlertedAgreement {
        record: record.clone(),
        reference_date: reference,
        alert_level: classify(reference, now),
    }
}

/// Responsible people for one category, deduplicated in first-seen order.
pub fn collect_names(
    agreements: &[AlertedAgreement],
    category: AlertCategory,
    now: NaiveDateTime,
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();

    for agreement in agreements {
        if !is_alerted(
            category,
            agreement.reference_date,
            &agreement.record.progress,
            now,
        ) {
            continue;
        }

        let person = agreement.record.responsible_person.as_str();
        if seen.insert(person) {
            names.push(person.to_string());
        }
    }

    names
}

/// Open work first, then by urgency; ties keep their input order.
pub fn sort_for_display(agreements: &mut [AlertedAgreement]) {
    agreements.sort_by_key(|agreement| {
        (
            agreement.record.progress.is_completed(),
            agreement.alert_level,
        )
    });
}

pub fn analyze(records: &[AgreementRecord], now: NaiveDateTime) -> AlertReport {
    let mut agreements: Vec<AlertedAgreement> =
        records.iter().map(|record| assess(record, now)).collect();

    let [need_data, need_approval, need_purchase, need_seal] =
        AlertCategory::ALL.map(|category| collect_names(&agreements, category, now));

    sort_for_display(&mut agreements);

    tracing::debug!(
        records = agreements.len(),
        need_data = need_data.len(),
        need_approval = need_approval.len(),
        need_purchase = need_purchase.len(),
        need_seal = need_seal.len(),
        "alert analysis complete"
    );

    AlertReport {
        generated_at: now,
        need_data,
        need_approval,
        need_purchase,
        need_seal,
        agreements,
    }
}
