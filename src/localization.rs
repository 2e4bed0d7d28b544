//! Localized strings and the one-shot localizer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Language used when a translation is missing.
pub const FALLBACK_LANGUAGE: &str = "English";

/// A text with one translation per language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalizedText {
    translations: BTreeMap<String, String>,
}

impl LocalizedText {
    pub fn set(&mut self, language: &str, text: impl Into<String>) -> &mut Self {
        self.translations.insert(language.to_string(), text.into());
        self
    }

    pub fn english(&mut self, text: impl Into<String>) -> &mut Self {
        self.set("English", text)
    }

    pub fn german(&mut self, text: impl Into<String>) -> &mut Self {
        self.set("German", text)
    }

    /// Translation for `language`, falling back to English.
    pub fn get(&self, language: &str) -> Option<&str> {
        self.translations
            .get(language)
            .or_else(|| self.translations.get(FALLBACK_LANGUAGE))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

type CompletionHook = Box<dyn FnOnce() + Send>;

/// Loads translations once and notifies interested code afterwards.
#[derive(Default)]
pub struct Localizer {
    loaded: AtomicBool,
    hooks: Mutex<Vec<CompletionHook>>,
}

impl Localizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load translations. Returns false when already loaded.
    pub fn load(&self) -> bool {
        let hooks: Vec<CompletionHook> = {
            let mut pending = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            if self.loaded.swap(true, Ordering::SeqCst) {
                return false;
            }
            std::mem::take(&mut *pending)
        };
        tracing::debug!(hooks = hooks.len(), "Localization loaded");
        for hook in hooks {
            hook();
        }
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Run `hook` after loading completes, immediately if it already has.
    pub fn on_complete(&self, hook: impl FnOnce() + Send + 'static) {
        {
            let mut pending = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_loaded() {
                pending.push(Box::new(hook));
                return;
            }
        }
        hook();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_fallback_to_english() {
        let mut name = LocalizedText::default();
        name.english("Fun Ward").german("Spaßschutz");

        assert_eq!(name.get("German"), Some("Spaßschutz"));
        assert_eq!(name.get("French"), Some("Fun Ward"));
        assert!(LocalizedText::default().get("English").is_none());
    }

    #[test]
    fn test_load_runs_hooks_once() {
        let localizer = Localizer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        localizer.on_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(localizer.load());
        assert!(!localizer.load());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = calls.clone();
        localizer.on_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
