use crate::models::{Channel, PipelineStage};

const INTERNAL_MARKERS: &[&str] = &["nội bộ", "noi bo", "internal", "beevent"];
const GOV_MARKERS: &[&str] = &[
    "gov",
    "hiệp hội",
    "hiep hoi",
    "association",
    "chính phủ",
    "nhà nước",
];

/// Stage keyword sets, tested in funnel order.
const STAGE_KEYWORDS: &[(PipelineStage, &[&str])] = &[
    (PipelineStage::Lead, &["lead", "mới", "tiềm năng"]),
    (
        PipelineStage::Qualified,
        &["qualified", "đàm phán", "dam phan", "negotiat"],
    ),
    (
        PipelineStage::Proposal,
        &["proposal", "báo giá", "đề xuất", "quote"],
    ),
    (
        PipelineStage::Won,
        &["won", "đã ký", "hoàn thành", "đang thực hiện", "signed", "completed"],
    ),
];

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| haystack.contains(marker))
}

/// Internal wins over Gov when both marker sets match; anything else is Corporate.
pub fn classify_channel(category: &str, customer: &str) -> Channel {
    let category = category.to_lowercase();
    let customer = customer.to_lowercase();

    if contains_any(&category, INTERNAL_MARKERS) || contains_any(&customer, INTERNAL_MARKERS) {
        Channel::Internal
    } else if contains_any(&category, GOV_MARKERS) || contains_any(&customer, GOV_MARKERS) {
        Channel::Gov
    } else {
        Channel::Corporate
    }
}

/// First stage whose keyword set matches the status text. `None` keeps the record
/// out of the funnel.
pub fn classify_stage(status: &str) -> Option<PipelineStage> {
    let status = status.to_lowercase();
    STAGE_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(&status, keywords))
        .map(|(stage, _)| *stage)
}
