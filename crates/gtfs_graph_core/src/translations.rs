use std::collections::BTreeMap;

use gtfs_graph_model::RawRow;

use crate::csv_reader::{read_rows, write_rows};
use crate::GraphError;

pub const TRANSLATION_FIELDS: &[&str] = &["trans_id", "lang", "translation"];

/// Per-language lookup from a source text to its translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translator {
    by_lang: BTreeMap<String, BTreeMap<String, String>>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a translation, replacing any earlier one for the same text
    /// and language.
    pub fn add_translation(
        &mut self,
        trans_id: impl Into<String>,
        lang: impl Into<String>,
        translation: impl Into<String>,
    ) {
        self.by_lang
            .entry(lang.into())
            .or_default()
            .insert(trans_id.into(), translation.into());
    }

    pub fn translate(&self, trans_id: &str, lang: &str) -> Option<&str> {
        self.by_lang
            .get(lang)
            .and_then(|entries| entries.get(trans_id))
            .map(String::as_str)
    }

    /// The translation when one exists, the text itself otherwise.
    pub fn try_translate<'a>(&'a self, trans_id: &'a str, lang: &str) -> &'a str {
        self.translate(trans_id, lang).unwrap_or(trans_id)
    }

    pub fn has_data(&self) -> bool {
        !self.by_lang.is_empty()
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.by_lang.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_lang.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn load(&mut self, file: &str, data: &[u8]) -> Result<usize, GraphError> {
        let rows = read_rows(file, data)?;
        let mut count = 0;
        for row in &rows {
            let (Some(trans_id), Some(lang), Some(translation)) = (
                row.get("trans_id"),
                row.get("lang"),
                row.get("translation"),
            ) else {
                continue;
            };
            self.add_translation(trans_id, lang, translation);
            count += 1;
        }
        Ok(count)
    }

    /// Rows ordered by text, then language.
    pub(crate) fn to_csv(&self, file: &str) -> Result<Vec<u8>, GraphError> {
        let mut ordered: BTreeMap<(&str, &str), &str> = BTreeMap::new();
        for (lang, entries) in &self.by_lang {
            for (trans_id, translation) in entries {
                ordered.insert((trans_id.as_str(), lang.as_str()), translation.as_str());
            }
        }
        let rows: Vec<RawRow> = ordered
            .into_iter()
            .map(|((trans_id, lang), translation)| {
                RawRow::from_pairs([
                    ("trans_id", trans_id),
                    ("lang", lang),
                    ("translation", translation),
                ])
            })
            .collect();
        write_rows(file, TRANSLATION_FIELDS, &rows)
    }
}
