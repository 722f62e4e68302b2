//! File-sharing panel state: the capped file listing and the upload selection.

/// Maximum number of files kept in the listing and allowed before upload.
pub const FILE_LIST_CAP: usize = 10;

/// A file picked for upload, with its contents already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    /// Name of the picked file.
    pub source_name: String,
    pub contents: Vec<u8>,
    /// Name to store the file under, if different from `source_name`.
    pub custom_name: Option<String>,
}

impl FileSelection {
    pub fn new(source_name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            source_name: source_name.into(),
            contents,
            custom_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    /// The `fileName` form field: the custom name, else the source name.
    pub fn upload_name(&self) -> &str {
        match self.custom_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.source_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilePanel {
    files: Vec<String>,
    selection: Option<FileSelection>,
    cap: usize,
}

impl Default for FilePanel {
    fn default() -> Self {
        Self::new(FILE_LIST_CAP)
    }
}

impl FilePanel {
    pub fn new(cap: usize) -> Self {
        Self {
            files: Vec::new(),
            selection: None,
            cap,
        }
    }

    /// Replace the listing, keeping only the first `cap` entries.
    pub fn set_files(&mut self, mut files: Vec<String>) {
        files.truncate(self.cap);
        self.files = files;
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn is_full(&self) -> bool {
        self.files.len() >= self.cap
    }

    /// Alert shown when an upload is attempted with a full listing.
    pub fn cap_alert(&self) -> String {
        format!("You can only upload up to {} files.", self.cap)
    }

    pub fn select(&mut self, selection: Option<FileSelection>) {
        self.selection = selection;
    }

    pub fn selection(&self) -> Option<&FileSelection> {
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_is_capped() {
        let mut panel = FilePanel::default();
        panel.set_files((0..15).map(|i| format!("f{i}.txt")).collect());
        assert_eq!(panel.files().len(), FILE_LIST_CAP);
        assert_eq!(panel.files()[9], "f9.txt");
        assert!(panel.is_full());
        assert_eq!(panel.cap_alert(), "You can only upload up to 10 files.");
    }

    #[test]
    fn upload_name_prefers_custom_name() {
        let sel = FileSelection::new("report.pdf", vec![1, 2]);
        assert_eq!(sel.upload_name(), "report.pdf");
        assert_eq!(sel.clone().with_name("q3.pdf").upload_name(), "q3.pdf");
        assert_eq!(sel.with_name("").upload_name(), "report.pdf");
    }
}
