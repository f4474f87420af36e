//! Analysis results
//!
//! [`AnalysisResult`] is the payload handed to the presentation layer when a
//! session completes. [`AnalysisReport`] is the richer view model the result
//! screen renders. Both are mocked: no classification happens anywhere.

use crate::core::session::{CaptureOrigin, ImageRef};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Disclaimer shown under every report
pub const DISCLAIMER: &str = "This analysis is for informational purposes only and should not \
replace professional medical advice. Please consult with a qualified dermatologist for proper \
diagnosis and treatment.";

// =============================================================================
// Confidence
// =============================================================================

/// Integer confidence percentage, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    /// Create a confidence value, clamping anything above 100
    pub fn new(percent: u32) -> Self {
        Self(percent.min(100) as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_percent(self.0)
    }
}

impl From<u32> for Confidence {
    fn from(value: u32) -> Self {
        Confidence::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Confidence band used to colour the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    /// 90 and above
    High,
    /// 70 to 89
    Moderate,
    /// Below 70
    Low,
}

impl ConfidenceLevel {
    pub fn from_percent(percent: u8) -> Self {
        if percent >= 90 {
            ConfidenceLevel::High
        } else if percent >= 70 {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Hex colour the result screen uses for this band
    pub fn color_hex(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "#10b981",
            ConfidenceLevel::Moderate => "#f59e0b",
            ConfidenceLevel::Low => "#ef4444",
        }
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Severity of a detected condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }

    /// Parse a severity label (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "healthy" => Some(Severity::None),
            "mild" => Some(Severity::Mild),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            _ => None,
        }
    }

    pub fn color_hex(&self) -> &'static str {
        match self {
            Severity::None => "#10b981",
            Severity::Mild => "#f59e0b",
            Severity::Moderate => "#ef4444",
            Severity::Severe => "#dc2626",
        }
    }

    /// Whether the result screen shows a warning icon
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Moderate | Severity::Severe)
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Result payload
// =============================================================================

/// Whether the session's image travels with the result payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAttachment {
    /// Include the image whenever the session has one
    #[default]
    Always,
    /// Only upload-originated sessions carry their image
    UploadOnly,
}

impl ImageAttachment {
    pub fn includes(&self, origin: CaptureOrigin) -> bool {
        match self {
            ImageAttachment::Always => true,
            ImageAttachment::UploadOnly => origin == CaptureOrigin::Upload,
        }
    }
}

/// Mocked result values for one capture origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultTemplate {
    pub condition: String,
    pub confidence: u32,
    /// Newline-separated recommendations
    pub recommendation: String,
}

impl ResultTemplate {
    pub fn camera() -> Self {
        Self {
            condition: "Sample Skin Condition".to_string(),
            confidence: 85,
            recommendation:
                "Keep skin moisturized.\nAvoid direct sunlight.\nUse sunscreen regularly."
                    .to_string(),
        }
    }

    pub fn upload() -> Self {
        Self {
            condition: "Uploaded Skin Condition".to_string(),
            confidence: 78,
            recommendation:
                "Keep area clean.\nApply medicated cream as advised.\nFollow up in 2 weeks."
                    .to_string(),
        }
    }
}

impl Default for ResultTemplate {
    fn default() -> Self {
        Self::camera()
    }
}

/// Payload passed to the presentation layer on completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    #[serde(rename = "predicted_class")]
    pub condition: String,
    pub confidence: Confidence,
    pub recommendation: String,
    pub image: Option<ImageRef>,
    pub origin: CaptureOrigin,
}

impl AnalysisResult {
    /// Build the payload for a finished session
    pub fn from_template(
        template: &ResultTemplate,
        origin: CaptureOrigin,
        image: Option<&ImageRef>,
        attachment: ImageAttachment,
    ) -> Self {
        let image = if attachment.includes(origin) {
            image.cloned()
        } else {
            None
        };
        Self {
            condition: template.condition.clone(),
            confidence: Confidence::new(template.confidence),
            recommendation: template.recommendation.clone(),
            image,
            origin,
        }
    }

    /// Recommendation text split into individual items
    pub fn recommendations(&self) -> Vec<String> {
        split_lines(&self.recommendation)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

// =============================================================================
// Report view model
// =============================================================================

/// Everything the result screen shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub condition: String,
    pub confidence: Confidence,
    pub severity: Severity,
    pub description: String,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub image: Option<ImageRef>,
}

impl AnalysisReport {
    /// The fixed report shown by the result screen
    pub fn sample() -> Self {
        Self {
            condition: "Mild Eczema".to_string(),
            confidence: Confidence::new(87),
            severity: Severity::Mild,
            description: "Eczema is a common skin condition that causes dry, itchy, and \
                inflamed skin. The affected area shows typical signs of mild eczematous \
                dermatitis."
                .to_string(),
            recommendations: vec![
                "Apply fragrance-free moisturizer twice daily".to_string(),
                "Avoid known triggers like harsh soaps".to_string(),
                "Use lukewarm water when bathing".to_string(),
                "Consider over-the-counter hydrocortisone cream".to_string(),
            ],
            risk_factors: vec![
                "Family history of allergies".to_string(),
                "Dry skin conditions".to_string(),
                "Environmental allergens".to_string(),
            ],
            image: Some(ImageRef::new(
                "https://images.pexels.com/photos/5938519/pexels-photo-5938519.jpeg?auto=compress&cs=tinysrgb&w=400",
            )),
        }
    }

    /// Report for a session payload. Fields the payload does not carry fall
    /// back to the sample report.
    pub fn from_result(result: &AnalysisResult) -> Self {
        let sample = Self::sample();
        Self {
            condition: result.condition.clone(),
            confidence: result.confidence,
            recommendations: result.recommendations(),
            image: result.image.clone().or(sample.image),
            ..sample
        }
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence.level()
    }

    pub fn disclaimer(&self) -> &'static str {
        DISCLAIMER
    }
}
