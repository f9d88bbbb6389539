use crate::error::{BotError, LengthScope};
use crate::markup::{escape_html, split_padding, unescape_html, Document};
use crate::model::Content;
use crate::translator::Translator;
use crate::validator::ContentValidator;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A leaf with something to translate, entities decoded.
struct LeafJob {
    idx: usize,
    lead: String,
    core: String,
    trail: String,
}

/// Translates Telegram HTML leaf by leaf so tags and whitespace survive.
///
/// A leaf whose translation fails keeps its original text; only the length
/// check on the finished document can fail the whole operation.
#[derive(Clone)]
pub struct MarkupAwareTranslator {
    translator: Arc<dyn Translator>,
    validator: ContentValidator,
}

impl MarkupAwareTranslator {
    pub fn new(translator: Arc<dyn Translator>, validator: ContentValidator) -> Self {
        Self {
            translator,
            validator,
        }
    }

    #[instrument(skip_all, fields(translator = self.translator.name()))]
    pub async fn translate_markup(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }

        let mut doc = Document::parse(input);
        let mut leaves = doc.leaves_mut();

        // Padding is split after decoding so `&nbsp;` counts as whitespace.
        let jobs: Vec<LeafJob> = leaves
            .iter()
            .enumerate()
            .filter_map(|(idx, leaf)| {
                let plain = unescape_html(leaf);
                let (lead, core, trail) = split_padding(&plain);
                (!core.is_empty()).then(|| LeafJob {
                    idx,
                    lead: lead.to_string(),
                    core: core.to_string(),
                    trail: trail.to_string(),
                })
            })
            .collect();

        let results = join_all(jobs.iter().map(|job| self.translator.translate(&job.core))).await;

        let mut failed = 0usize;
        for (job, result) in jobs.iter().zip(results) {
            match result {
                Ok(translated) if !translated.trim().is_empty() => {
                    *leaves[job.idx] = format!(
                        "{}{}{}",
                        escape_html(&job.lead),
                        escape_html(translated.trim()),
                        escape_html(&job.trail)
                    );
                }
                Ok(_) => failed += 1,
                Err(err) => {
                    warn!(?err, "leaf left untranslated");
                    failed += 1;
                }
            }
        }
        debug!(leaves = jobs.len(), failed, "translated document");

        drop(leaves);
        doc.serialize()
    }

    /// Translate the marked-up part of `source`, keeping its shape and file reference.
    /// The result must still fit the kind's length limit.
    pub async fn translate_content(&self, source: &Content) -> Result<Content, BotError> {
        let translated = self.translate_markup(source.markup()).await;
        self.validator
            .validate_as(source.with_markup(translated), LengthScope::Translated)
    }
}
