//! Activity (news post) model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::defaults::or_default;
use super::lenient::string_or_number;
use super::{Record, RecordDefaults};

fn default_visible() -> bool {
    true
}

/// An activity post as stored in `activity.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: u64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link_image: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub image_total: String,
    #[serde(default)]
    pub date_image: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub additional_images: Vec<String>,
    #[serde(default)]
    pub extended_description: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Editor scratch form for an activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityForm {
    pub title: String,
    pub description: String,
    pub extended_description: String,
    pub date: String,
    pub image: String,
    pub additional_images: Vec<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub image_total: String,
    pub is_visible: bool,
}

impl Default for ActivityForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            extended_description: String::new(),
            date: String::new(),
            image: String::new(),
            additional_images: Vec::new(),
            image_total: String::new(),
            is_visible: true,
        }
    }
}

impl Record for Activity {
    type Form = ActivityForm;

    const COLLECTION: &'static str = "activities";

    fn id(&self) -> u64 {
        self.id
    }

    fn is_visible(&self) -> bool {
        self.is_visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    fn to_form(&self) -> ActivityForm {
        ActivityForm {
            title: self.title.clone(),
            description: self.description.clone(),
            extended_description: self.extended_description.clone(),
            date: self.date.clone(),
            image: self.image.clone(),
            additional_images: self.additional_images.clone(),
            image_total: self.image_total.clone(),
            is_visible: self.is_visible,
        }
    }

    fn apply_form(&mut self, form: &ActivityForm) {
        self.title = form.title.clone();
        self.description = form.description.clone();
        self.extended_description = form.extended_description.clone();
        self.date = form.date.clone();
        self.image = form.image.clone();
        self.additional_images = form.additional_images.clone();
        self.image_total = form.image_total.clone();
        self.is_visible = form.is_visible;
    }

    fn from_form(id: u64, form: &ActivityForm, defaults: &RecordDefaults, today: &str) -> Self {
        let defaults = &defaults.activity;
        let image_total = or_default(&form.image_total, &form.additional_images.len().to_string());
        Self {
            id,
            image: or_default(&form.image, &defaults.image),
            link_image: defaults.link_image.clone(),
            image_total,
            date_image: defaults.date_image.clone(),
            date: or_default(&form.date, today),
            title: form.title.trim().to_string(),
            description: form.description.clone(),
            additional_images: form.additional_images.clone(),
            extended_description: form.extended_description.clone(),
            is_visible: form.is_visible,
            extra: Map::new(),
        }
    }

    fn form_title(form: &ActivityForm) -> &str {
        &form.title
    }
}
