//! Translation: the plain-text `Translator` collaborator and the markup-aware
//! layer that drives it leaf by leaf.
use crate::error::TranslationError;
use async_trait::async_trait;

pub mod google;
pub mod markup_aware;

pub use google::GoogleTranslator;
pub use markup_aware::MarkupAwareTranslator;

/// Plain-text translator for a fixed source/target language pair.
///
/// Implementations make no promise about markup; callers hand them text only.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslationError>;

    /// Used in logs.
    fn name(&self) -> &str;
}
