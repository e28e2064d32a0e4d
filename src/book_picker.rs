use log::{error, info};
use std::path::{Path, PathBuf};

/// One selectable file in the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEntry {
    pub path: PathBuf,
    pub display_name: String,
}

/// The file-selection control: a flat, extension-filtered listing of one
/// directory. Only `.epub` files make it into the list, which is the whole
/// client-side validation story — anything deeper is the engine's job.
#[derive(Debug)]
pub struct BookPicker {
    directory: PathBuf,
    entries: Vec<BookEntry>,
    selected: usize,
}

impl BookPicker {
    pub fn scan(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let entries = Self::discover(&directory);
        info!(
            "found {} epub file(s) in {}",
            entries.len(),
            directory.display()
        );
        Self {
            directory,
            entries,
            selected: 0,
        }
    }

    fn discover(directory: &Path) -> Vec<BookEntry> {
        let reader = match std::fs::read_dir(directory) {
            Ok(reader) => reader,
            Err(e) => {
                error!("cannot list {}: {e}", directory.display());
                return Vec::new();
            }
        };

        let mut entries: Vec<BookEntry> = reader
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let extension = path.extension()?.to_str()?.to_ascii_lowercase();
                if extension != "epub" {
                    return None;
                }
                let display_name = path.file_stem()?.to_string_lossy().into_owned();
                Some(BookEntry { path, display_name })
            })
            .collect();
        entries.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        });
        entries
    }

    /// Re-read the directory, keeping the selection in range.
    pub fn rescan(&mut self) {
        self.entries = Self::discover(&self.directory);
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }

    pub fn entries(&self) -> &[BookEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&BookEntry> {
        self.entries.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_index(&mut self, index: usize) {
        if index < self.entries.len() {
            self.selected = index;
        }
    }
}
