/// Crop planner properties across the whole requirements table.
///
/// The planner is a pure function of its form, so these tests sweep every
/// crop, soil and climate rather than checking single examples.

use cdews_client::model::ValidationError;
use cdews_client::planner::{
    format_grouped, plan, Climate, PlanForm, SoilType, CROP_REQUIREMENTS, DEFAULT_CROP,
    RECOMMENDATIONS,
};

const SOILS: [SoilType; 4] = [SoilType::Loamy, SoilType::Clay, SoilType::Sandy, SoilType::Black];
const CLIMATES: [Climate; 4] = [
    Climate::Temperate,
    Climate::Tropical,
    Climate::Arid,
    Climate::SemiArid,
];

fn form(land: &str, crop: &str, soil: SoilType, climate: Climate) -> PlanForm {
    PlanForm {
        land_size: land.to_string(),
        crop_type: crop.to_string(),
        soil_type: soil,
        climate,
    }
}

#[test]
fn test_every_table_crop_uses_its_own_row() {
    for crop in CROP_REQUIREMENTS {
        let result = plan(&form("1", crop.crop, SoilType::Loamy, Climate::Temperate))
            .unwrap_or_else(|e| panic!("{} should plan: {}", crop.crop, e));
        assert!(!result.used_default_crop, "{} fell back", crop.crop);
        assert_eq!(result.requirements_crop, crop.crop);
        assert_eq!(result.water_per_acre, crop.water_per_acre);
        assert_eq!(result.expected_yield, crop.expected_yield);
        assert_eq!(result.total_investment, crop.investment);
        assert_eq!(result.expected_profit, crop.profit);
    }
}

#[test]
fn test_soil_and_climate_do_not_change_figures() {
    let baseline = plan(&form("12", "potato", SoilType::Loamy, Climate::Temperate)).unwrap();
    for soil in SOILS {
        for climate in CLIMATES {
            let result = plan(&form("12", "potato", soil, climate)).unwrap();
            assert_eq!(result.total_water, baseline.total_water);
            assert_eq!(result.fertilizer, baseline.fertilizer);
            assert_eq!(result.chemicals, baseline.chemicals);
            assert_eq!(result.soil_type, soil);
            assert_eq!(result.climate, climate);
        }
    }
}

#[test]
fn test_water_scales_linearly_with_land_size() {
    let cases = [
        ("1", "2,000-2,500 liters/day"),
        ("5", "10,000-12,500 liters/day"),
        ("0.5", "1,000-1,250 liters/day"),
        ("400", "800,000-1,000,000 liters/day"),
        (" 3 ", "6,000-7,500 liters/day"),
    ];
    for (land, expected) in cases {
        for crop in CROP_REQUIREMENTS {
            let result = plan(&form(land, crop.crop, SoilType::Clay, Climate::Arid)).unwrap();
            assert_eq!(result.total_water, expected, "land {:?} crop {}", land, crop.crop);
        }
    }
}

#[test]
fn test_unknown_crops_fall_back_to_default() {
    for crop in ["mango", "cotton", "sugarcane"] {
        let result = plan(&form("2", crop, SoilType::Sandy, Climate::Tropical)).unwrap();
        assert!(result.used_default_crop);
        assert_eq!(result.requirements_crop, DEFAULT_CROP);
        assert_eq!(result.crop, crop);
    }
}

#[test]
fn test_invalid_forms_never_produce_a_plan() {
    let cases: [(&str, &str, ValidationError); 6] = [
        ("0", "tomato", ValidationError::NonPositiveLandSize),
        ("-1", "rice", ValidationError::NonPositiveLandSize),
        ("", "rice", ValidationError::EmptyLandSize),
        ("   ", "rice", ValidationError::EmptyLandSize),
        ("4", "", ValidationError::EmptyCropType),
        ("4 acres", "rice", ValidationError::InvalidLandSize("4 acres".to_string())),
    ];
    for (land, crop, expected) in cases {
        let err = plan(&form(land, crop, SoilType::Loamy, Climate::Temperate)).unwrap_err();
        assert_eq!(err, expected, "land {:?} crop {:?}", land, crop);
    }
}

#[test]
fn test_missing_fields_share_one_message() {
    assert_eq!(
        ValidationError::EmptyLandSize.to_string(),
        ValidationError::EmptyCropType.to_string()
    );
}

#[test]
fn test_recommendations_are_the_fixed_list() {
    let result = plan(&form("9", "wheat", SoilType::Black, Climate::SemiArid)).unwrap();
    let expected: Vec<String> = RECOMMENDATIONS.iter().map(|r| r.to_string()).collect();
    assert_eq!(result.recommendations, expected);
}

#[test]
fn test_format_grouped_trims_to_three_decimals() {
    assert_eq!(format_grouped(1234.56789), "1,234.568");
    assert_eq!(format_grouped(2500.10), "2,500.1");
    assert_eq!(format_grouped(12_345_678.0), "12,345,678");
}

#[test]
fn test_plan_serializes_for_json_output() {
    let result = plan(&form("5", "tomato", SoilType::Loamy, Climate::SemiArid)).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["total_water"], "10,000-12,500 liters/day");
    assert_eq!(json["climate"], "semi-arid");
    assert_eq!(json["soil_type"], "loamy");
}
