//! Career (job posting) model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::defaults::or_default;
use super::lenient::int_or_string;
use super::{AuxiliaryFile, Record, RecordDefaults};

fn default_visible() -> bool {
    true
}

/// A job posting as stored in `career.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Career {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// When set, `description` is also published as this file in the descriptions folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_file: Option<String>,
    #[serde(default)]
    pub date_image: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub type_image: String,
    #[serde(default, deserialize_with = "int_or_string")]
    pub view: i64,
    #[serde(default)]
    pub link: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    /// Fields this backend does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Editor scratch form for a career.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CareerForm {
    pub title: String,
    pub description: String,
    pub description_file: Option<String>,
    pub date: String,
    pub expire_date: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(deserialize_with = "int_or_string")]
    pub view: i64,
    pub link: String,
    pub is_visible: bool,
}

impl Default for CareerForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            description_file: None,
            date: String::new(),
            expire_date: String::new(),
            location: String::new(),
            job_type: String::new(),
            view: 0,
            link: String::new(),
            is_visible: true,
        }
    }
}

impl Record for Career {
    type Form = CareerForm;

    const COLLECTION: &'static str = "careers";

    fn id(&self) -> u64 {
        self.id
    }

    fn is_visible(&self) -> bool {
        self.is_visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    fn to_form(&self) -> CareerForm {
        CareerForm {
            title: self.title.clone(),
            description: self.description.clone(),
            description_file: self.description_file.clone(),
            date: self.date.clone(),
            expire_date: self.expire_date.clone(),
            location: self.location.clone(),
            job_type: self.job_type.clone(),
            view: self.view,
            link: self.link.clone(),
            is_visible: self.is_visible,
        }
    }

    fn apply_form(&mut self, form: &CareerForm) {
        self.title = form.title.clone();
        self.description = form.description.clone();
        self.description_file = form.description_file.clone().filter(|f| !f.trim().is_empty());
        self.date = form.date.clone();
        self.expire_date = form.expire_date.clone();
        self.location = form.location.clone();
        self.job_type = form.job_type.clone();
        self.view = form.view;
        self.link = form.link.clone();
        self.is_visible = form.is_visible;
    }

    fn from_form(id: u64, form: &CareerForm, defaults: &RecordDefaults, today: &str) -> Self {
        let defaults = &defaults.career;
        Self {
            id,
            title: form.title.trim().to_string(),
            description: form.description.clone(),
            description_file: form.description_file.clone().filter(|f| !f.trim().is_empty()),
            date_image: defaults.date_image.clone(),
            date: or_default(&form.date, today),
            expire_date: form.expire_date.clone(),
            location: or_default(&form.location, &defaults.location),
            job_type: or_default(&form.job_type, &defaults.job_type),
            type_image: defaults.type_image.clone(),
            view: form.view,
            link: form.link.clone(),
            is_visible: form.is_visible,
            extra: Map::new(),
        }
    }

    fn form_title(form: &CareerForm) -> &str {
        &form.title
    }

    fn auxiliary_files(&self, descriptions_dir: &str) -> Vec<AuxiliaryFile> {
        match &self.description_file {
            Some(name) => vec![AuxiliaryFile {
                name: name.clone(),
                path: format!("{}/{}", descriptions_dir.trim_end_matches('/'), name),
                content: self.description.clone(),
            }],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_visibility_defaults_to_true() {
        let career: Career = serde_json::from_value(json!({"id": 1, "title": "A"})).unwrap();
        assert!(career.is_visible);

        let hidden: Career =
            serde_json::from_value(json!({"id": 2, "title": "B", "isVisible": false})).unwrap();
        assert!(!hidden.is_visible);
    }

    #[test]
    fn test_view_accepts_strings_and_unknown_fields_survive() {
        let career: Career = serde_json::from_value(json!({
            "id": 3,
            "title": "Engineer",
            "type": "Part-time",
            "view": "17",
            "salary": "negotiable"
        }))
        .unwrap();
        assert_eq!(career.view, 17);
        assert_eq!(career.job_type, "Part-time");

        let back = serde_json::to_value(&career).unwrap();
        assert_eq!(back["salary"], "negotiable");
        assert_eq!(back["type"], "Part-time");
        assert_eq!(back["view"], 17);
        assert!(back.get("descriptionFile").is_none());
    }

    #[test]
    fn test_from_form_fills_defaults() {
        let form = CareerForm {
            title: "B".to_string(),
            ..CareerForm::default()
        };
        let defaults = RecordDefaults::default();
        let career = Career::from_form(1, &form, &defaults, "19 oktyabr 2026");

        assert_eq!(career.id, 1);
        assert!(career.is_visible);
        assert_eq!(career.location, "Bakı, Azərbaycan");
        assert_eq!(career.job_type, "Tam iş günü");
        assert_eq!(career.date, "19 oktyabr 2026");
        assert_eq!(career.date_image, defaults.career.date_image);
        assert_eq!(career.view, 0);
    }

    #[test]
    fn test_description_file_becomes_auxiliary_file() {
        let mut career: Career =
            serde_json::from_value(json!({"id": 4, "description": "Long text"})).unwrap();
        assert!(career.auxiliary_files("public/docs").is_empty());

        career.description_file = Some("career-4.txt".to_string());
        let files = career.auxiliary_files("public/docs/");
        assert_eq!(
            files,
            vec![AuxiliaryFile {
                name: "career-4.txt".to_string(),
                path: "public/docs/career-4.txt".to_string(),
                content: "Long text".to_string(),
            }]
        );
    }
}
