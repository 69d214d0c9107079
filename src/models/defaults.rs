//! Values given to fields a new record leaves blank.

use chrono::{Datelike, NaiveDate};

const ICON_BASE: &str = "https://raw.githubusercontent.com/Absheron-Career-Portal/WEBSITE/b2d2fafaefad0db14296c97b360e559713dbc984/frontend/src/assets/svg";

const MONTHS_AZ: [&str; 12] = [
    "yanvar", "fevral", "mart", "aprel", "may", "iyun", "iyul", "avqust", "sentyabr", "oktyabr",
    "noyabr", "dekabr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerDefaults {
    pub location: String,
    pub job_type: String,
    pub date_image: String,
    pub type_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDefaults {
    pub image: String,
    pub link_image: String,
    pub date_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDefaults {
    pub career: CareerDefaults,
    pub activity: ActivityDefaults,
}

impl Default for CareerDefaults {
    fn default() -> Self {
        Self {
            location: "Bakı, Azərbaycan".to_string(),
            job_type: "Tam iş günü".to_string(),
            date_image: format!("{}/calendar.svg", ICON_BASE),
            type_image: format!("{}/suitcase.svg", ICON_BASE),
        }
    }
}

impl Default for ActivityDefaults {
    fn default() -> Self {
        Self {
            image: "/image/default-activity.jpg".to_string(),
            link_image: format!("{}/landscape.crop.rectangle.svg", ICON_BASE),
            date_image: format!("{}/calendar.svg", ICON_BASE),
        }
    }
}

/// Format a date the way the website prints it, e.g. `19 oktyabr 2026`.
pub fn display_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_AZ[date.month0() as usize],
        date.year()
    )
}

/// Use `value` unless it is blank.
pub(crate) fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
