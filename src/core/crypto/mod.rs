pub mod cipher;
pub mod key_manager;

pub use cipher::TemplateCipher;
pub use key_manager::{KeyManager, KeyMaterial, KeySource, KEY_ENV};
