//! Behaviour shared by every record kind.

use serde::{de::DeserializeOwned, Serialize};

use super::RecordDefaults;

/// A text file published alongside a record, e.g. a long career description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFile {
    pub name: String,
    /// Full storage path
    pub path: String,
    pub content: String,
}

/// One entry of a collection document.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Scratch form used by the editor.
    type Form: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static;

    /// Collection name, also the snapshot key.
    const COLLECTION: &'static str;

    fn id(&self) -> u64;

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    fn to_form(&self) -> Self::Form;

    fn apply_form(&mut self, form: &Self::Form);

    /// Build a new record, filling blanks from `defaults`. `today` is the display date.
    fn from_form(id: u64, form: &Self::Form, defaults: &RecordDefaults, today: &str) -> Self;

    fn form_title(form: &Self::Form) -> &str;

    /// Files that must be published before the collection document.
    fn auxiliary_files(&self, _descriptions_dir: &str) -> Vec<AuxiliaryFile> {
        Vec::new()
    }
}
