use crate::error::VesError;

/// External stream-cipher collaborator.
///
/// The core never implements cryptography itself; it only guarantees that at
/// most one cipher is bound to an item at a time and routes value transforms
/// through the binding. Implementations translate between the locally stored
/// plaintext and what is transmitted.
pub trait StreamCipher {
    /// Algorithm identifier, e.g. `AES256GCMp`.
    fn algo(&self) -> &str;

    /// Encrypts a plaintext chunk.
    ///
    /// # Errors
    /// Returns [`VesError::CipherMismatch`] when the payload cannot be
    /// transformed by this cipher.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VesError>;

    /// Decrypts a ciphertext chunk.
    ///
    /// # Errors
    /// Returns [`VesError::CipherMismatch`] when the payload does not match
    /// this cipher.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, VesError>;
}

impl std::fmt::Debug for dyn StreamCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCipher")
            .field("algo", &self.algo())
            .finish()
    }
}
