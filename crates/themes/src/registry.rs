use std::collections::HashSet;
use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{builtin_variants, DEFAULT_VARIANT};
use crate::config::ConfigError;
use crate::variant::VariantDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown theme `{key}`")]
    UnknownVariant { key: String },
    #[error("theme `{0}` is defined more than once")]
    DuplicateKey(String),
    #[error("theme keys must not be empty")]
    EmptyKey,
    #[error("default theme `{0}` is not registered")]
    UnknownDefault(String),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Ordered table of themes keyed by their unique key.
#[derive(Debug, Clone)]
pub struct VariantRegistry {
    variants: Vec<VariantDescriptor>,
    default_index: usize,
}

impl VariantRegistry {
    pub fn new(variants: Vec<VariantDescriptor>, default_key: &str) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for variant in &variants {
            if variant.key().trim().is_empty() {
                return Err(RegistryError::EmptyKey);
            }
            if !seen.insert(variant.key()) {
                return Err(RegistryError::DuplicateKey(variant.key().to_string()));
            }
        }
        let default_index = variants
            .iter()
            .position(|variant| variant.key() == default_key)
            .ok_or_else(|| RegistryError::UnknownDefault(default_key.to_string()))?;
        Ok(Self {
            variants,
            default_index,
        })
    }

    /// The authored catalog with `plasma` as the default.
    pub fn builtin() -> Self {
        let variants = builtin_variants();
        let default_index = variants
            .iter()
            .position(|variant| variant.key() == DEFAULT_VARIANT)
            .unwrap_or(0);
        Self {
            variants,
            default_index,
        }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// All themes in authoring order, enabled or not.
    pub fn iter(&self) -> impl Iterator<Item = &VariantDescriptor> {
        self.variants.iter()
    }

    pub fn get(&self, key: &str) -> Option<&VariantDescriptor> {
        self.variants.iter().find(|variant| variant.key() == key)
    }

    pub fn resolve(&self, key: &str) -> Result<&VariantDescriptor, RegistryError> {
        self.get(key).ok_or_else(|| RegistryError::UnknownVariant {
            key: key.to_string(),
        })
    }

    /// Like [`Self::resolve`], falling back to the default theme.
    pub fn resolve_or_default(&self, key: &str) -> &VariantDescriptor {
        match self.resolve(key) {
            Ok(variant) => variant,
            Err(err) => {
                let fallback = self.default_variant();
                tracing::warn!(error = %err, fallback = fallback.key(), "using default theme");
                fallback
            }
        }
    }

    pub fn default_variant(&self) -> &VariantDescriptor {
        &self.variants[self.default_index]
    }

    pub fn set_default(&mut self, key: &str) -> Result<(), RegistryError> {
        self.default_index = self
            .variants
            .iter()
            .position(|variant| variant.key() == key)
            .ok_or_else(|| RegistryError::UnknownDefault(key.to_string()))?;
        Ok(())
    }

    pub fn set_enabled(&mut self, key: &str, enabled: bool) -> Result<(), RegistryError> {
        let variant = self
            .variants
            .iter_mut()
            .find(|variant| variant.key() == key)
            .ok_or_else(|| RegistryError::UnknownVariant {
                key: key.to_string(),
            })?;
        variant.set_enabled(enabled);
        Ok(())
    }

    /// Appends a theme after the existing ones.
    pub fn push(&mut self, variant: VariantDescriptor) -> Result<(), RegistryError> {
        if variant.key().trim().is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        if self.get(variant.key()).is_some() {
            return Err(RegistryError::DuplicateKey(variant.key().to_string()));
        }
        self.variants.push(variant);
        Ok(())
    }

    pub fn list_enabled(&self) -> Vec<&VariantDescriptor> {
        self.variants
            .iter()
            .filter(|variant| variant.is_enabled())
            .collect()
    }

    /// Picks an enabled theme other than `current`, uniformly.
    ///
    /// Returns the only enabled key when there is just one, and `None` when
    /// nothing is enabled.
    pub fn pick_random_other<R>(&self, current: &str, rng: &mut R) -> Option<&str>
    where
        R: Rng + ?Sized,
    {
        let enabled: Vec<&str> = self
            .list_enabled()
            .into_iter()
            .map(|variant| variant.key())
            .collect();
        let candidates: Vec<&str> = enabled
            .iter()
            .copied()
            .filter(|key| *key != current)
            .collect();
        if candidates.is_empty() {
            return enabled.first().copied();
        }
        candidates.choose(rng).copied()
    }

    /// Next enabled theme after `current` in authoring order, wrapping around.
    pub fn next_enabled(&self, current: &str) -> Option<&str> {
        let len = self.variants.len();
        let start = self.position(current).unwrap_or(len.saturating_sub(1));
        (1..=len)
            .map(|step| &self.variants[(start + step) % len])
            .find(|variant| variant.is_enabled())
            .map(|variant| variant.key())
    }

    /// Previous enabled theme before `current` in authoring order, wrapping around.
    pub fn previous_enabled(&self, current: &str) -> Option<&str> {
        let len = self.variants.len();
        let start = self.position(current).unwrap_or(0);
        (1..=len)
            .map(|step| &self.variants[(start + len - step) % len])
            .find(|variant| variant.is_enabled())
            .map(|variant| variant.key())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.variants.iter().position(|variant| variant.key() == key)
    }
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shaderhost::{ShaderSource, QUAD_VERTEX_SHADER};

    use super::*;

    fn variant(key: &'static str, enabled: bool) -> VariantDescriptor {
        VariantDescriptor::shader(
            key,
            key.to_uppercase(),
            "#000000",
            ShaderSource::new(QUAD_VERTEX_SHADER, "void main() {}"),
        )
        .with_enabled(enabled)
    }

    fn table(rows: &[(&'static str, bool)]) -> VariantRegistry {
        let variants = rows.iter().map(|(key, enabled)| variant(*key, *enabled)).collect();
        VariantRegistry::new(variants, rows[0].0).expect("valid registry")
    }

    #[test]
    fn resolves_known_keys() {
        let registry = VariantRegistry::builtin();
        let plasma = registry.resolve("plasma").unwrap();
        assert_eq!(plasma.display_name(), "Plasma Field");
        assert_eq!(registry.default_variant().key(), "plasma");
    }

    #[test]
    fn every_authored_key_resolves_to_itself() {
        let mut registry = VariantRegistry::builtin();
        let authored = builtin_variants();
        assert_eq!(authored.len(), 22);
        for descriptor in &authored {
            let resolved = registry.resolve(descriptor.key()).unwrap();
            assert_eq!(resolved.key(), descriptor.key());
            assert_eq!(resolved, descriptor);
        }

        registry.push(variant("custom", true)).unwrap();
        assert_eq!(registry.resolve("custom").unwrap().key(), "custom");
        for descriptor in &authored {
            assert_eq!(registry.resolve(descriptor.key()).unwrap().key(), descriptor.key());
        }
    }

    #[test]
    fn unknown_key_is_an_error_or_falls_back() {
        let registry = VariantRegistry::builtin();
        match registry.resolve("nonexistent") {
            Err(RegistryError::UnknownVariant { key }) => assert_eq!(key, "nonexistent"),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(registry.resolve_or_default("nonexistent").key(), "plasma");
        assert_eq!(registry.resolve_or_default("galaxy").key(), "galaxy");
    }

    #[test]
    fn list_enabled_keeps_authoring_order() {
        let registry = table(&[("a", true), ("b", false), ("c", true), ("d", true)]);
        let keys: Vec<&str> = registry
            .list_enabled()
            .into_iter()
            .map(|variant| variant.key())
            .collect();
        assert_eq!(keys, vec!["a", "c", "d"]);
    }

    #[test]
    fn pick_random_other_is_uniform_and_excludes_current() {
        let registry = table(&[("a", true), ("b", true), ("c", true)]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = 0;
        let mut c = 0;
        for _ in 0..1000 {
            match registry.pick_random_other("a", &mut rng) {
                Some("b") => b += 1,
                Some("c") => c += 1,
                other => panic!("unexpected pick {other:?}"),
            }
        }
        assert!(b > 400 && c > 400, "skewed distribution b={b} c={c}");
    }

    #[test]
    fn pick_random_other_with_single_or_no_enabled() {
        let mut rng = StdRng::seed_from_u64(1);
        let single = table(&[("a", true), ("b", false)]);
        assert_eq!(single.pick_random_other("a", &mut rng), Some("a"));
        assert_eq!(single.pick_random_other("b", &mut rng), Some("a"));

        let none = table(&[("a", false), ("b", false)]);
        assert_eq!(none.pick_random_other("a", &mut rng), None);
    }

    #[test]
    fn pick_from_unknown_current_considers_every_enabled_key() {
        let registry = table(&[("a", true), ("b", true)]);
        let mut rng = StdRng::seed_from_u64(3);
        let picks: HashSet<&str> = (0..64)
            .filter_map(|_| registry.pick_random_other("missing", &mut rng))
            .collect();
        assert_eq!(picks, HashSet::from(["a", "b"]));
    }

    #[test]
    fn stepping_wraps_around_enabled_themes() {
        let registry = table(&[("a", true), ("b", false), ("c", true), ("d", true)]);
        assert_eq!(registry.next_enabled("a"), Some("c"));
        assert_eq!(registry.next_enabled("d"), Some("a"));
        assert_eq!(registry.next_enabled("b"), Some("c"));
        assert_eq!(registry.previous_enabled("a"), Some("d"));
        assert_eq!(registry.previous_enabled("c"), Some("a"));
        assert_eq!(registry.next_enabled("unknown"), Some("a"));
        assert_eq!(registry.previous_enabled("unknown"), Some("d"));

        let single = table(&[("a", true), ("b", false)]);
        assert_eq!(single.next_enabled("a"), Some("a"));

        let none = table(&[("a", false)]);
        assert_eq!(none.next_enabled("a"), None);
    }

    #[test]
    fn construction_validates_keys_and_default() {
        let err = VariantRegistry::new(vec![variant("a", true), variant("a", true)], "a").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey(key) if key == "a"));

        let err = VariantRegistry::new(vec![variant("", true)], "").unwrap_err();
        assert!(matches!(err, RegistryError::EmptyKey));

        let err = VariantRegistry::new(vec![variant("a", true)], "z").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDefault(key) if key == "z"));
    }

    #[test]
    fn enabled_flags_can_be_overridden() {
        let mut registry = VariantRegistry::builtin();
        assert!(!registry.resolve("kaleidoscope").unwrap().is_enabled());
        registry.set_enabled("kaleidoscope", true).unwrap();
        assert!(registry.resolve("kaleidoscope").unwrap().is_enabled());

        let err = registry.set_enabled("nope", true).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownVariant { .. }));
    }

    #[test]
    fn push_rejects_duplicates() {
        let mut registry = table(&[("a", true)]);
        registry.push(variant("b", true)).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(matches!(
            registry.push(variant("a", true)),
            Err(RegistryError::DuplicateKey(_))
        ));
    }
}
