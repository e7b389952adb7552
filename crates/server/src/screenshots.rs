//! In-memory log of screenshots captured during tool calls.
//!
//! Owned store object with an explicit lifecycle instead of a process-global
//! map; rebuilt empty on restart like the rest of the session state.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Name-keyed base64 PNG payloads from the `screenshot` tool.
pub struct ScreenshotStore {
	shots: Mutex<HashMap<String, String>>,
}

impl ScreenshotStore {
	pub fn new() -> Self {
		Self {
			shots: Mutex::new(HashMap::new()),
		}
	}

	/// Records a shot, replacing any previous one under the same name.
	pub fn insert(&self, name: impl Into<String>, data: impl Into<String>) {
		self.shots.lock().insert(name.into(), data.into());
	}

	pub fn get(&self, name: &str) -> Option<String> {
		self.shots.lock().get(name).cloned()
	}

	/// Names of all recorded shots, sorted for stable listings.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.shots.lock().keys().cloned().collect();
		names.sort();
		names
	}
}

impl Default for ScreenshotStore {
	fn default() -> Self {
		Self::new()
	}
}
