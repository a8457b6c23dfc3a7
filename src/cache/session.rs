//! In-memory session cache: `(generatorId, generatorVersion, templateName) →
//! TemplateBody`, shared across every spec within one preparation. Writes
//! are idempotent — the same key always maps to the same value — so a
//! concurrent `RwLock` is enough; no compare-and-swap is needed.

use crate::types::{GeneratorId, TemplateBody, TemplateName};
use std::collections::HashMap;
use std::sync::RwLock;

type Key = (GeneratorId, Option<String>, TemplateName);

#[derive(Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<Key, TemplateBody>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, generator: &GeneratorId, version: Option<&str>, name: &TemplateName) -> Option<TemplateBody> {
        let key = (generator.clone(), version.map(str::to_string), name.clone());
        self.entries.read().unwrap().get(&key).cloned()
    }

    pub fn insert(&self, generator: GeneratorId, version: Option<String>, name: TemplateName, body: TemplateBody) {
        let key = (generator, version, name);
        self.entries.write().unwrap().entry(key).or_insert(body);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
