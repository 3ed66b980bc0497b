/// Crop planning calculator.
///
/// Deterministic: the plan is a function of the form values and the static
/// `CROP_REQUIREMENTS` table only. The form holds raw user input and is
/// validated once, when a plan is requested.
///
/// Only the water figure is scaled by land size, and it uses a fixed
/// 2000-2500 liters/acre/day baseline whatever the crop. The crop's own
/// baseline is carried through unchanged in `PlanResult::water_per_acre`.
/// Fertilizer, yield, investment and profit are per-acre reference bands
/// copied from the table as-is.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::logging::{self, DataSource};
use crate::model::ValidationError;

/// Fixed daily water baseline per acre, in liters.
pub const WATER_LOW_PER_ACRE: f64 = 2000.0;
pub const WATER_HIGH_PER_ACRE: f64 = 2500.0;

/// Crop whose requirements are used when the requested crop is not in the table.
pub const DEFAULT_CROP: &str = "tomato";

// ---------------------------------------------------------------------------
// Soil and climate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoilType {
    #[default]
    Loamy,
    Clay,
    Sandy,
    Black,
}

impl FromStr for SoilType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loamy" => Ok(SoilType::Loamy),
            "clay" => Ok(SoilType::Clay),
            "sandy" => Ok(SoilType::Sandy),
            "black" => Ok(SoilType::Black),
            other => Err(format!("unknown soil type '{}'", other)),
        }
    }
}

impl fmt::Display for SoilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoilType::Loamy => write!(f, "Loamy Soil"),
            SoilType::Clay => write!(f, "Clay Soil"),
            SoilType::Sandy => write!(f, "Sandy Soil"),
            SoilType::Black => write!(f, "Black Soil"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Climate {
    #[default]
    Temperate,
    Tropical,
    Arid,
    SemiArid,
}

impl FromStr for Climate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperate" => Ok(Climate::Temperate),
            "tropical" => Ok(Climate::Tropical),
            "arid" => Ok(Climate::Arid),
            "semi-arid" | "semiarid" => Ok(Climate::SemiArid),
            other => Err(format!("unknown climate zone '{}'", other)),
        }
    }
}

impl fmt::Display for Climate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Climate::Temperate => write!(f, "Temperate"),
            Climate::Tropical => write!(f, "Tropical"),
            Climate::Arid => write!(f, "Arid"),
            Climate::SemiArid => write!(f, "Semi-Arid"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requirements table
// ---------------------------------------------------------------------------

pub struct FertilizerBands {
    pub nitrogen: &'static str,
    pub phosphorus: &'static str,
    pub potassium: &'static str,
}

/// Per-acre reference figures for one crop.
pub struct CropRequirements {
    pub crop: &'static str,
    pub water_per_acre: &'static str,
    pub fertilizer: FertilizerBands,
    pub chemicals: &'static [&'static str],
    pub expected_yield: &'static str,
    pub investment: &'static str,
    pub profit: &'static str,
}

pub static CROP_REQUIREMENTS: &[CropRequirements] = &[
    CropRequirements {
        crop: "tomato",
        water_per_acre: "2000-2500 liters/day",
        fertilizer: FertilizerBands {
            nitrogen: "120-150 kg/acre",
            phosphorus: "60-80 kg/acre",
            potassium: "80-100 kg/acre",
        },
        chemicals: &["Copper Oxychloride for blight", "Neem oil for pests"],
        expected_yield: "15-20 tons/acre",
        investment: "₹80,000-1,20,000",
        profit: "₹1,50,000-2,50,000",
    },
    CropRequirements {
        crop: "potato",
        water_per_acre: "1800-2200 liters/day",
        fertilizer: FertilizerBands {
            nitrogen: "100-120 kg/acre",
            phosphorus: "50-70 kg/acre",
            potassium: "60-80 kg/acre",
        },
        chemicals: &["Mancozeb for blight", "Imidacloprid for insects"],
        expected_yield: "12-18 tons/acre",
        investment: "₹60,000-90,000",
        profit: "₹1,20,000-2,00,000",
    },
    CropRequirements {
        crop: "wheat",
        water_per_acre: "1500-2000 liters/day",
        fertilizer: FertilizerBands {
            nitrogen: "80-100 kg/acre",
            phosphorus: "40-60 kg/acre",
            potassium: "20-40 kg/acre",
        },
        chemicals: &["2,4-D for weeds", "Propiconazole for rust"],
        expected_yield: "25-35 quintals/acre",
        investment: "₹40,000-60,000",
        profit: "₹80,000-1,20,000",
    },
    CropRequirements {
        crop: "rice",
        water_per_acre: "3000-4000 liters/day",
        fertilizer: FertilizerBands {
            nitrogen: "100-120 kg/acre",
            phosphorus: "50-60 kg/acre",
            potassium: "40-60 kg/acre",
        },
        chemicals: &["Butachlor for weeds", "Carbendazim for blast"],
        expected_yield: "20-30 quintals/acre",
        investment: "₹50,000-70,000",
        profit: "₹90,000-1,40,000",
    },
];

/// General advice shown with every plan, in display order.
pub static RECOMMENDATIONS: &[&str] = &[
    "Start soil preparation 15-20 days before planting",
    "Ensure proper drainage system",
    "Use certified seeds from authorized dealers",
    "Follow integrated pest management practices",
    "Monitor weather conditions regularly",
];

/// Looks up a crop (case-insensitive). Returns `None` if not in the table.
pub fn find_crop(name: &str) -> Option<&'static CropRequirements> {
    let name = name.trim();
    CROP_REQUIREMENTS
        .iter()
        .find(|c| c.crop.eq_ignore_ascii_case(name))
}

fn default_crop() -> &'static CropRequirements {
    // DEFAULT_CROP is the first table row; the test below pins this.
    &CROP_REQUIREMENTS[0]
}

// ---------------------------------------------------------------------------
// Form and input
// ---------------------------------------------------------------------------

/// Raw calculator fields as typed by the user. Not validated until `plan`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanForm {
    /// Acres, as entered.
    pub land_size: String,
    pub crop_type: String,
    pub soil_type: SoilType,
    pub climate: Climate,
}

/// Validated calculator input.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInput {
    pub land_size_acres: f64,
    pub crop_type: String,
    pub soil_type: SoilType,
    pub climate: Climate,
}

impl PlanForm {
    pub fn validate(&self) -> Result<PlanInput, ValidationError> {
        let raw_land = self.land_size.trim();
        let crop = self.crop_type.trim();

        if raw_land.is_empty() {
            return Err(ValidationError::EmptyLandSize);
        }
        if crop.is_empty() {
            return Err(ValidationError::EmptyCropType);
        }

        let land_size_acres: f64 = raw_land
            .parse()
            .map_err(|_| ValidationError::InvalidLandSize(raw_land.to_string()))?;
        if !land_size_acres.is_finite() {
            return Err(ValidationError::InvalidLandSize(raw_land.to_string()));
        }
        if land_size_acres <= 0.0 {
            return Err(ValidationError::NonPositiveLandSize);
        }

        Ok(PlanInput {
            land_size_acres,
            crop_type: crop.to_string(),
            soil_type: self.soil_type,
            climate: self.climate,
        })
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FertilizerPlan {
    pub nitrogen: String,
    pub phosphorus: String,
    pub potassium: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    /// Crop as requested by the user.
    pub crop: String,
    /// Table row the figures came from.
    pub requirements_crop: String,
    pub used_default_crop: bool,
    pub land_size_acres: f64,
    pub soil_type: SoilType,
    pub climate: Climate,
    /// The crop's own per-acre water band, unscaled.
    pub water_per_acre: String,
    pub total_water_low: f64,
    pub total_water_high: f64,
    /// e.g. "10,000-12,500 liters/day"
    pub total_water: String,
    pub fertilizer: FertilizerPlan,
    pub chemicals: Vec<String>,
    pub expected_yield: String,
    pub total_investment: String,
    pub expected_profit: String,
    pub recommendations: Vec<String>,
}

/// Validates the form and computes a plan.
pub fn plan(form: &PlanForm) -> Result<PlanResult, ValidationError> {
    let input = form.validate().inspect_err(|e| {
        logging::debug(DataSource::Planner, None, &format!("rejected input: {:?}", e));
    })?;
    Ok(plan_for(&input))
}

/// Computes a plan from already-validated input.
pub fn plan_for(input: &PlanInput) -> PlanResult {
    let (requirements, used_default_crop) = match find_crop(&input.crop_type) {
        Some(r) => (r, false),
        None => {
            logging::info(
                DataSource::Planner,
                Some(&input.crop_type),
                &format!("crop not in table, using {} requirements", DEFAULT_CROP),
            );
            (default_crop(), true)
        }
    };

    let total_water_low = input.land_size_acres * WATER_LOW_PER_ACRE;
    let total_water_high = input.land_size_acres * WATER_HIGH_PER_ACRE;

    PlanResult {
        crop: input.crop_type.clone(),
        requirements_crop: requirements.crop.to_string(),
        used_default_crop,
        land_size_acres: input.land_size_acres,
        soil_type: input.soil_type,
        climate: input.climate,
        water_per_acre: requirements.water_per_acre.to_string(),
        total_water_low,
        total_water_high,
        total_water: format!(
            "{}-{} liters/day",
            format_grouped(total_water_low),
            format_grouped(total_water_high)
        ),
        fertilizer: FertilizerPlan {
            nitrogen: requirements.fertilizer.nitrogen.to_string(),
            phosphorus: requirements.fertilizer.phosphorus.to_string(),
            potassium: requirements.fertilizer.potassium.to_string(),
        },
        chemicals: requirements.chemicals.iter().map(|c| c.to_string()).collect(),
        expected_yield: requirements.expected_yield.to_string(),
        total_investment: requirements.investment.to_string(),
        expected_profit: requirements.profit.to_string(),
        recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// Formats a number with comma thousands separators and at most three
/// fractional digits, trailing zeros dropped: 12500.0 -> "12,500",
/// 833.25 -> "833.25".
pub fn format_grouped(value: f64) -> String {
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let frac = frac_part.trim_end_matches('0');
    let sign = if value < 0.0 && (int_part != "0" || !frac.is_empty()) { "-" } else { "" };

    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
