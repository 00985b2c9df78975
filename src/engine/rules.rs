//! In-process violation rule engine.
//!
//! A fixed decision tree over the deed attributes. Structured flags are
//! checked first; free-text conditions are answered by [`TextPredicate`]s,
//! each an explicit keyword set matched against a normalized deed body.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::input::{AnalysisInput, DocumentType};

/// Days allowed between the inquiry request and the deed execution before the
/// facilitation-law branch applies.
pub const INQUIRY_WINDOW_DAYS: i64 = 21;

/// Terminal outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    NonBooklet,
    TashilJointLiabilityMissing,
    ResidentialUse,
    InquiryResponseIssue,
    ConditionalTransaction,
    NoViolation,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::NonBooklet,
        Outcome::TashilJointLiabilityMissing,
        Outcome::ResidentialUse,
        Outcome::InquiryResponseIssue,
        Outcome::ConditionalTransaction,
        Outcome::NoViolation,
    ];

    /// The user-facing label persisted as `analysis_result`.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NonBooklet => "ارسال به کارتابل تخلف بازرسی (نوع سند غیر دفترچه‌ای)",
            Outcome::TashilJointLiabilityMissing => {
                "ارسال به کارتابل تخلف بازرسی (عدم وجود تعهدات تضامنی قانون تسهیل)"
            }
            Outcome::ResidentialUse => "ارسال به کارتابل تخلف بازرسی (استنباط کاربری مسکونی از متن)",
            Outcome::InquiryResponseIssue => "ارسال به کارتابل تخلف بازرسی (ایراد در پاسخ استعلام)",
            Outcome::ConditionalTransaction => "ارسال به کارتابل تخلف بازرسی (مشروط بودن معامله)",
            Outcome::NoViolation => "پایان (تخلفی شناسایی نشد)",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Outcome::NonBooklet => "non_booklet_type",
            Outcome::TashilJointLiabilityMissing => "missing_joint_liabilities",
            Outcome::ResidentialUse => "residential_use_inferred",
            Outcome::InquiryResponseIssue => "inquiry_response_issue",
            Outcome::ConditionalTransaction => "conditional_transaction",
            Outcome::NoViolation => "no_violation",
        }
    }

    pub fn is_violation(&self) -> bool {
        !matches!(self, Outcome::NoViolation)
    }

    pub fn from_label(label: &str) -> Option<Outcome> {
        let trimmed = label.trim();
        Outcome::ALL
            .into_iter()
            .find(|outcome| outcome.label() == trimmed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named keyword set standing in for one yes/no question about the deed body.
#[derive(Debug, Clone, Copy)]
pub struct TextPredicate {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

impl TextPredicate {
    /// Returns the first keyword found at the start of a word, if any.
    pub fn find(&self, text: &NormalizedText) -> Option<&'static str> {
        self.keywords
            .iter()
            .copied()
            .find(|keyword| text.contains_word(&normalize(keyword)))
    }

    pub fn matches(&self, text: &NormalizedText) -> bool {
        self.find(text).is_some()
    }
}

/// Joint liability of the parties as required under the facilitation law.
pub const JOINT_LIABILITY: TextPredicate = TextPredicate {
    name: "joint_liability_clause",
    keywords: &[
        "تضامن",
        "مسئولیت مشترک",
        "مسئولیت‌های مشترک",
        "joint liabilit",
        "jointly liable",
        "joint and several",
        "shared responsibility",
    ],
};

/// Residential use, or land together with a structure on it.
pub const RESIDENTIAL_USE: TextPredicate = TextPredicate {
    name: "residential_use",
    keywords: &[
        "مسکونی",
        "آپارتمان",
        "خانه",
        "منزل",
        "ساختمان",
        "عرصه و اعیان",
        "اعیانی",
        "زمین و بنا",
        "residential",
        "apartment",
        "house",
        "dwelling",
        "land and building",
        "building",
    ],
};

/// Reference to an inquiry answered by an accepted authority.
pub const INQUIRY_REFERENCE: TextPredicate = TextPredicate {
    name: "inquiry_reference",
    keywords: &[
        "پاسخ استعلام",
        "استعلام شماره",
        "به استناد استعلام",
        "شهرداری",
        "جهاد کشاورزی",
        "اداره ثبت",
        "منابع طبیعی",
        "inquiry response",
        "municipality",
        "agricultural jihad",
        "registration office",
        "registration of deeds",
        "with reference to the letter",
    ],
};

/// Transfer or execution made conditional on a future event.
pub const CONDITIONAL_TRANSACTION: TextPredicate = TextPredicate {
    name: "conditional_transaction",
    keywords: &[
        "مشروط",
        "به شرط",
        "به شرطی که",
        "در صورتی که",
        "در صورت عدم",
        "متعهد است",
        "متعهد گردید",
        "ملزم است",
        "conditional",
        "conditioned",
        "on condition",
        "provided that",
        "is obligated",
        "shall be obligated",
    ],
};

/// Deed body folded for keyword matching: lower-cased, Arabic yeh and kaf
/// mapped to their Persian forms, zero-width non-joiners and whitespace runs
/// collapsed to a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// True when `needle` occurs starting at a word boundary. The match may
    /// run on into a suffix ("houses"), but never starts mid-word, so
    /// "خانه" does not hit "کارخانه" and "house" does not hit "warehouse".
    pub fn contains_word(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        self.0.match_indices(needle).any(|(start, _)| {
            self.0[..start]
                .chars()
                .next_back()
                .map_or(true, |before| !before.is_alphanumeric())
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|ch| match ch {
            'ي' | 'ى' => 'ی',
            'ك' => 'ک',
            '\u{200c}' | '\u{200b}' => ' ',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Record of the walk through the decision tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    pub steps: Vec<&'static str>,
    pub decision_path: Vec<&'static str>,
    pub factors: Map<String, Value>,
}

impl Trace {
    fn step(&mut self, name: &'static str) {
        self.steps.push(name);
    }

    fn decide(&mut self, path: &'static str) {
        self.decision_path.push(path);
    }

    fn factor(&mut self, key: &str, value: Value) {
        self.factors.insert(key.to_string(), value);
    }

    fn finish(&mut self, outcome: Outcome) -> Outcome {
        self.decide(outcome.code());
        self.step(if outcome.is_violation() {
            "violation_detected"
        } else {
            "analysis_complete"
        });
        outcome
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub trace: Trace,
}

impl Evaluation {
    /// Wire form shared with remote engines: the label under `result`, the
    /// trace under `analysis_details`.
    pub fn to_response(&self) -> Value {
        json!({
            "result": self.outcome.label(),
            "analysis_details": self.trace,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, input: &AnalysisInput) -> Evaluation {
        let mut trace = Trace::default();
        let text = NormalizedText::new(&input.text);
        let outcome = walk(input, &text, &mut trace);
        Evaluation { outcome, trace }
    }
}

fn walk(input: &AnalysisInput, text: &NormalizedText, trace: &mut Trace) -> Outcome {
    trace.step("check_document_type");
    trace.factor("document_type", json!(input.document_type.as_str()));
    if input.document_type != DocumentType::Booklet {
        return trace.finish(Outcome::NonBooklet);
    }

    trace.step("check_inquiry_history");
    trace.factor("has_inquiry_history", json!(input.has_inquiry_history));
    if input.has_inquiry_history {
        trace.step("check_inquiry_timing");
        match (input.inquiry_date, input.deed_date) {
            (Some(inquiry_date), Some(deed_date)) => {
                let days = (deed_date - inquiry_date).num_days();
                trace.factor("days_difference", json!(days));
                if days > INQUIRY_WINDOW_DAYS {
                    trace.decide("inquiry_timing_over_21_days");
                } else {
                    trace.decide("inquiry_timing_within_21_days");
                    return analyze_text(input, text, trace);
                }
            }
            _ => {
                trace.decide("missing_dates");
                return analyze_text(input, text, trace);
            }
        }
    }

    trace.step("check_tashil_law");
    trace.factor("uses_tashil_law", json!(input.uses_tashil_law));
    if !input.uses_tashil_law {
        trace.decide("no_tashil_law");
        return analyze_text(input, text, trace);
    }

    trace.step("analyze_joint_liabilities");
    match JOINT_LIABILITY.find(text) {
        Some(keyword) => {
            trace.factor(JOINT_LIABILITY.name, json!(keyword));
            trace.decide("joint_liabilities_present");
        }
        None => return trace.finish(Outcome::TashilJointLiabilityMissing),
    }

    analyze_text(input, text, trace)
}

fn analyze_text(input: &AnalysisInput, text: &NormalizedText, trace: &mut Trace) -> Outcome {
    trace.step("analyze_residential_use");
    if let Some(keyword) = RESIDENTIAL_USE.find(text) {
        trace.factor(RESIDENTIAL_USE.name, json!(keyword));
        return trace.finish(Outcome::ResidentialUse);
    }

    trace.step("analyze_inquiry_reference");
    if let Some(keyword) = INQUIRY_REFERENCE.find(text) {
        trace.factor(INQUIRY_REFERENCE.name, json!(keyword));
        trace.step("check_inquiry_response_issue");
        trace.factor(
            "inquiry_response_has_issue",
            json!(input.inquiry_response_has_issue),
        );
        if input.inquiry_response_has_issue {
            return trace.finish(Outcome::InquiryResponseIssue);
        }
    }

    trace.step("analyze_conditionality");
    if let Some(keyword) = CONDITIONAL_TRANSACTION.find(text) {
        trace.factor(CONDITIONAL_TRANSACTION.name, json!(keyword));
        return trace.finish(Outcome::ConditionalTransaction);
    }

    trace.finish(Outcome::NoViolation)
}
