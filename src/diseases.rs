/// Disease label registry and the client-side classification mapping.
///
/// The prediction service returns a label such as "Potato___Early_blight".
/// This module is the single source of truth for how a label is presented:
/// marker color, legend text and the farmer-facing advisory content.
/// Classification is total. A label missing from the registry still gets a
/// descriptor (grey marker, label words as the display name), so new classes
/// introduced server-side render without a client update.

use std::fmt;

use crate::model::{AdviceDetails, AdviceSection};

// ---------------------------------------------------------------------------
// Marker colors
// ---------------------------------------------------------------------------

const MARKER_ICON_BASE: &str =
    "https://cdn.rawgit.com/pointhi/leaflet-color-markers/master/img/marker-icon-2x-";

/// Marker shadow shared by every marker color.
pub const MARKER_SHADOW_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/0.7.7/images/marker-shadow.png";

/// Visual marker class. `Grey` is reserved for unrecognized labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    Red,
    Orange,
    Green,
    Grey,
}

impl MarkerColor {
    fn slug(&self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Orange => "orange",
            MarkerColor::Green => "green",
            MarkerColor::Grey => "grey",
        }
    }

    /// Leaflet color-marker icon for this class.
    pub fn icon_url(&self) -> String {
        format!("{}{}.png", MARKER_ICON_BASE, self.slug())
    }

    /// CSS hex color, used for the `marker-color` GeoJSON property.
    pub fn hex(&self) -> &'static str {
        match self {
            MarkerColor::Red => "#cb2b3e",
            MarkerColor::Orange => "#cb8427",
            MarkerColor::Green => "#2aad27",
            MarkerColor::Grey => "#7b7b7b",
        }
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

// ---------------------------------------------------------------------------
// Registry entries
// ---------------------------------------------------------------------------

/// A titled list of steps, stored statically.
pub struct StaticSection {
    pub title: &'static str,
    pub steps: &'static [&'static str],
}

impl StaticSection {
    fn to_section(&self) -> AdviceSection {
        AdviceSection {
            title: self.title.to_string(),
            steps: self.steps.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Advisory content for one known label.
pub struct StaticAdvice {
    pub title: &'static str,
    pub overview: &'static str,
    pub prevention: StaticSection,
    pub cure: StaticSection,
}

impl StaticAdvice {
    pub fn to_details(&self) -> AdviceDetails {
        AdviceDetails {
            title: self.title.to_string(),
            overview: self.overview.to_string(),
            prevention: self.prevention.to_section(),
            cure: self.cure.to_section(),
        }
    }
}

/// Presentation metadata for one known classifier label.
pub struct DiseaseEntry {
    /// Exact label string emitted by the prediction service.
    pub label: &'static str,
    pub marker: MarkerColor,
    /// Text used in the legend and in marker popups.
    pub legend: &'static str,
    pub advice: StaticAdvice,
}

/// All labels with dedicated presentation, in legend order.
pub static DISEASE_REGISTRY: &[DiseaseEntry] = &[
    DiseaseEntry {
        label: "Potato___Early_blight",
        marker: MarkerColor::Red,
        legend: "Potato Early Blight",
        advice: StaticAdvice {
            title: "Potato Early Blight (Aalu ka Ageti Angamari)",
            overview: "This is a common fungal disease that affects potato leaves and tubers, \
                       especially in warm and humid weather. It starts as small, dark spots on \
                       lower leaves.",
            prevention: StaticSection {
                title: "How to Prevent (Roktham)",
                steps: &[
                    "**Use Healthy Seeds:** Start with certified, disease-free potato seeds from a trusted source.",
                    "**Give Space to Plants:** Plant potatoes with enough space between them so air can move freely and dry the leaves.",
                    "**Water Carefully:** Water the soil at the base of the plant, not the leaves. Water in the morning so any wet leaves can dry quickly.",
                    "**Crop Rotation (Fasal Chakra):** Do not plant potatoes or tomatoes in the same soil for at least 2-3 years. This helps to reduce the fungus in the soil.",
                ],
            },
            cure: StaticSection {
                title: "How to Cure (Upchar)",
                steps: &[
                    "**Remove Infected Leaves:** As soon as you see spotted leaves, carefully remove them and burn or bury them far away from your field.",
                    "**Organic Spray (Jaivik Upchar):** A spray made from Neem oil (Neem ka Tel) can help control the spread. Mix as per instructions.",
                    "**Chemical Spray (Rasayanik Upchar):** If the infection is high, use a copper-based fungicide like Copper Oxychloride. Always follow the instructions on the packet carefully and spray in the evening.",
                ],
            },
        },
    },
    DiseaseEntry {
        label: "Tomato___Late_blight",
        marker: MarkerColor::Orange,
        legend: "Tomato Late Blight",
        advice: StaticAdvice {
            title: "Tomato Late Blight (Tamatar ka Pachet Angamari)",
            overview: "This is a very serious fungal disease that can destroy an entire tomato \
                       crop quickly, especially in cool and moist weather. It appears as large, \
                       dark, water-soaked spots on leaves and stems.",
            prevention: StaticSection {
                title: "How to Prevent (Roktham)",
                steps: &[
                    "**Proper Spacing:** Ensure good airflow by not planting tomatoes too close to each other.",
                    "**Use Stakes (Sahara Dena):** Use bamboo stakes or cages to lift the plants and fruit off the wet ground.",
                    "**Check Plants Regularly:** Inspect your plants every 2-3 days, especially the lower leaves, for any signs of disease.",
                    "**Avoid Overhead Watering:** Water the soil directly to keep the plant leaves as dry as possible.",
                ],
            },
            cure: StaticSection {
                title: "How to Cure (Upchar)",
                steps: &[
                    "**Act Fast:** This disease spreads very quickly. Immediately remove and destroy any infected parts of the plant. Do not put them in your compost pile.",
                    "**Chemical Spray (Rasayanik Upchar):** Fungicides containing Mancozeb or Copper are effective. Spray the entire plant, especially under the leaves.",
                    "**Organic Spray (Jaivik Upchar):** A Bordeaux mixture (copper sulfate and lime) is a traditional and effective organic option. Use it as a preventive spray before the rain.",
                ],
            },
        },
    },
    DiseaseEntry {
        label: "Tomato___healthy",
        marker: MarkerColor::Green,
        legend: "Healthy Tomato",
        advice: StaticAdvice {
            title: "Healthy Plant (Swasth Paudha)",
            overview: "Your plant appears to be healthy and free from common diseases.",
            prevention: StaticSection {
                title: "How to Keep it Healthy",
                steps: &[
                    "Continue to provide regular water and sunlight.",
                    "Ensure the soil has good nutrients. You can add cow dung manure (gobar khad) for better growth.",
                    "Keep checking your plants every few days to catch any problems early.",
                ],
            },
            cure: StaticSection {
                title: "Action Needed",
                steps: &["No cure needed. Your plant is healthy."],
            },
        },
    },
];

/// Marker used for any label not in `DISEASE_REGISTRY`.
pub const DEFAULT_MARKER: MarkerColor = MarkerColor::Grey;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How a label is drawn on the map and named in popups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationDescriptor {
    pub marker: MarkerColor,
    pub display_name: String,
    /// False when the default descriptor was used.
    pub known: bool,
}

/// Looks up a registry entry by exact label. Returns `None` if not found.
pub fn find_disease(label: &str) -> Option<&'static DiseaseEntry> {
    DISEASE_REGISTRY.iter().find(|d| d.label == label)
}

/// Converts a classifier label to display words: every run of underscores
/// becomes a single space, e.g. "Unknown___Disease" -> "Unknown Disease".
pub fn display_label(label: &str) -> String {
    label
        .split('_')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps any label to its presentation descriptor. Never fails.
pub fn classify(label: &str) -> ClassificationDescriptor {
    match find_disease(label) {
        Some(entry) => ClassificationDescriptor {
            marker: entry.marker,
            display_name: entry.legend.to_string(),
            known: true,
        },
        None => ClassificationDescriptor {
            marker: DEFAULT_MARKER,
            display_name: display_label(label),
            known: false,
        },
    }
}

/// Advisory content for a label, falling back to a generic advisory for
/// labels without dedicated content. The fallback title is the label's
/// display name, so it reads the same as the map popup.
pub fn advisory_for(label: &str) -> AdviceDetails {
    match find_disease(label) {
        Some(entry) => entry.advice.to_details(),
        None => AdviceDetails {
            title: display_label(label),
            overview: "No detailed information available for this diagnosis.".to_string(),
            prevention: AdviceSection {
                title: "Prevention".to_string(),
                steps: vec!["No information available.".to_string()],
            },
            cure: AdviceSection {
                title: "Cure".to_string(),
                steps: vec!["No information available.".to_string()],
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

/// One row of the map legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub marker: MarkerColor,
    pub icon_url: String,
    pub text: &'static str,
}

/// Legend rows for every known label, in registry order.
pub fn legend_entries() -> Vec<LegendEntry> {
    DISEASE_REGISTRY
        .iter()
        .map(|d| LegendEntry {
            marker: d.marker,
            icon_url: d.marker.icon_url(),
            text: d.legend,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_labels() {
        let mut seen = std::collections::HashSet::new();
        for entry in DISEASE_REGISTRY {
            assert!(
                seen.insert(entry.label),
                "duplicate label '{}' found in DISEASE_REGISTRY",
                entry.label
            );
        }
    }

    #[test]
    fn test_default_marker_is_not_used_by_any_known_label() {
        // Grey must stay distinguishable as "unrecognized".
        for entry in DISEASE_REGISTRY {
            assert_ne!(entry.marker, DEFAULT_MARKER, "'{}' uses the default marker", entry.label);
        }
    }

    #[test]
    fn test_known_labels_classify_to_registry_colors() {
        assert_eq!(classify("Potato___Early_blight").marker, MarkerColor::Red);
        assert_eq!(classify("Tomato___Late_blight").marker, MarkerColor::Orange);
        assert_eq!(classify("Tomato___healthy").marker, MarkerColor::Green);
        assert_eq!(classify("Tomato___healthy").display_name, "Healthy Tomato");
        assert!(classify("Tomato___healthy").known);
    }

    #[test]
    fn test_unknown_label_gets_default_descriptor() {
        let d = classify("Unknown___Disease");
        assert_eq!(d.marker, MarkerColor::Grey);
        assert_eq!(d.display_name, "Unknown Disease");
        assert!(!d.known);
    }

    #[test]
    fn test_match_is_exact_not_case_insensitive() {
        assert!(!classify("tomato___healthy").known);
        assert!(!classify(" Tomato___healthy").known);
    }

    #[test]
    fn test_classify_is_total_on_odd_inputs() {
        for label in ["", "___", "_a_", "Pepper,_bell___Bacterial_spot", "🍅"] {
            let d = classify(label);
            assert_eq!(d.marker, MarkerColor::Grey);
        }
        assert_eq!(classify("").display_name, "");
        assert_eq!(classify("_a_").display_name, "a");
        assert_eq!(
            classify("Pepper,_bell___Bacterial_spot").display_name,
            "Pepper, bell Bacterial spot"
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        for label in ["Potato___Early_blight", "Corn___Common_rust", ""] {
            assert_eq!(classify(label), classify(label));
        }
    }

    #[test]
    fn test_advisory_for_unknown_label_uses_generic_content() {
        let advice = advisory_for("Grape___Black_rot");
        assert_eq!(advice.title, "Grape Black rot");
        assert_eq!(advice.overview, "No detailed information available for this diagnosis.");
        assert_eq!(advice.cure.steps, vec!["No information available.".to_string()]);
    }

    #[test]
    fn test_advisory_fallback_title_matches_popup_text() {
        let advice = advisory_for("Unknown___Disease");
        assert_eq!(advice.title, "Unknown Disease");
        assert_eq!(advice.title, display_label("Unknown___Disease"));
    }

    #[test]
    fn test_every_known_label_has_prevention_and_cure_steps() {
        for entry in DISEASE_REGISTRY {
            let details = entry.advice.to_details();
            assert!(!details.prevention.steps.is_empty(), "{} has no prevention steps", entry.label);
            assert!(!details.cure.steps.is_empty(), "{} has no cure steps", entry.label);
        }
    }

    #[test]
    fn test_legend_follows_registry_order() {
        let legend = legend_entries();
        assert_eq!(legend.len(), DISEASE_REGISTRY.len());
        assert_eq!(legend[0].text, "Potato Early Blight");
        assert!(legend[0].icon_url.ends_with("marker-icon-2x-red.png"));
    }
}
