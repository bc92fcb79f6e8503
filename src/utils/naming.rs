use crate::utils::validation::ValidatedType;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

/// Bytes of randomness in every generated key.
pub const KEY_ENTROPY_BYTES: usize = 32;

/// Name under which one uploaded asset is stored, e.g. `Zq3..._w.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Draws 256 bits from the OS entropy source and appends the extension
    /// derived from the validated content type.
    pub fn generate(content_type: &ValidatedType) -> Result<Self, rand::Error> {
        Self::generate_with(&mut OsRng, content_type)
    }

    pub fn generate_with<R: RngCore>(
        rng: &mut R,
        content_type: &ValidatedType,
    ) -> Result<Self, rand::Error> {
        let mut bytes = [0u8; KEY_ENTROPY_BYTES];
        rng.try_fill_bytes(&mut bytes)?;

        Ok(Self(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(bytes),
            content_type.extension()
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
