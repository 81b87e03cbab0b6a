use std::path::PathBuf;

use quill_primitives::DocumentId;
use rustc_hash::FxHashMap;

use crate::Document;

/// All open documents of one host.
#[derive(Debug, Default)]
pub struct DocumentStore {
	documents: FxHashMap<DocumentId, Document>,
	next_id: u64,
}

impl DocumentStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens a new document and returns its id.
	pub fn open(&mut self, text: &str, path: Option<PathBuf>) -> DocumentId {
		self.next_id += 1;
		let id = DocumentId(self.next_id);
		let mut doc = Document::new(id, text);
		if let Some(path) = path {
			doc = doc.with_path(path);
		}
		self.documents.insert(id, doc);
		id
	}

	pub fn get(&self, id: DocumentId) -> Option<&Document> {
		self.documents.get(&id)
	}

	pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
		self.documents.get_mut(&id)
	}

	/// Removes a document, returning it if it was open.
	pub fn close(&mut self, id: DocumentId) -> Option<Document> {
		self.documents.remove(&id)
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn open_assigns_distinct_ids() {
		let mut store = DocumentStore::new();
		let a = store.open("a", None);
		let b = store.open("b", Some(PathBuf::from("/tmp/b.txt")));
		assert_ne!(a, b);
		assert_eq!(store.get(a).map(Document::contents).as_deref(), Some("a"));
		assert_eq!(store.get(b).and_then(Document::path), Some(std::path::Path::new("/tmp/b.txt")));
		assert!(store.close(a).is_some());
		assert!(store.close(a).is_none());
		assert_eq!(store.len(), 1);
	}
}
