//! Translatable data trees.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Deserializer;
use serde::de::MapAccess;
use serde::de::SeqAccess;
use serde::de::Visitor;

use crate::i18n::Locale;

/// One string per locale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTranslation {
    values: BTreeMap<Locale, String>,
}

impl RawTranslation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locale: Locale, text: impl Into<String>) -> Self {
        self.values.insert(locale, text.into());
        self
    }

    pub fn get(&self, locale: Locale) -> Option<&str> {
        self.values.get(&locale).map(String::as_str)
    }

    /// The string for `locale`, else for `default`.
    pub fn resolve(&self, locale: Locale, default: Locale) -> Option<&str> {
        self.get(locale).or_else(|| self.get(default))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Locale, &str)> {
        self.values
            .iter()
            .map(|(locale, text)| (*locale, text.as_str()))
    }

    /// Locale code to string map, the shape Discord localizations take.
    pub fn to_localizations(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(locale, text)| (locale.as_str().to_string(), text.clone()))
            .collect()
    }
}

impl<'de> Deserialize<'de> for RawTranslation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<String>>::deserialize(deserializer)?;
        let mut values = BTreeMap::new();
        for (key, text) in raw {
            let locale: Locale = key.parse().map_err(serde::de::Error::custom)?;
            if let Some(text) = text {
                values.insert(locale, text);
            }
        }
        Ok(Self { values })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

/// A translatable tree.
///
/// When parsed, a non-empty mapping whose keys are all supported locales and whose values
/// are strings or null is a [`TranslationNode::Leaf`]; any other mapping is a record.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationNode {
    Null,
    Scalar(Scalar),
    Leaf(RawTranslation),
    Record(IndexMap<String, TranslationNode>),
    Sequence(Vec<TranslationNode>),
}

impl Default for TranslationNode {
    fn default() -> Self {
        Self::Record(IndexMap::new())
    }
}

impl TranslationNode {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn record<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, TranslationNode)>,
        K: Into<String>,
    {
        Self::Record(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Str(value.into()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar(_) => "scalar",
            Self::Leaf(_) => "translation",
            Self::Record(_) => "record",
            Self::Sequence(_) => "sequence",
        }
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, TranslationNode>> {
        match self {
            Self::Record(map) => Some(map),
            _ => None,
        }
    }

    fn from_entries(entries: IndexMap<String, TranslationNode>) -> Self {
        let is_leaf = !entries.is_empty()
            && entries.iter().all(|(key, value)| {
                key.parse::<Locale>().is_ok()
                    && matches!(value, Self::Null | Self::Scalar(Scalar::Str(_)))
            });
        if !is_leaf {
            return Self::Record(entries);
        }

        let mut leaf = RawTranslation::new();
        for (key, value) in entries {
            if let (Ok(locale), Self::Scalar(Scalar::Str(text))) = (key.parse::<Locale>(), value) {
                leaf = leaf.with(locale, text);
            }
        }
        Self::Leaf(leaf)
    }
}

impl From<RawTranslation> for TranslationNode {
    fn from(value: RawTranslation) -> Self {
        Self::Leaf(value)
    }
}

impl<'de> Deserialize<'de> for TranslationNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = TranslationNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a translation tree")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(TranslationNode::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(TranslationNode::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        TranslationNode::deserialize(deserializer)
    }

    fn visit_bool<E: serde::de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(TranslationNode::Scalar(Scalar::Bool(value)))
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(TranslationNode::Scalar(Scalar::Int(value)))
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(TranslationNode::Scalar(match i64::try_from(value) {
            Ok(value) => Scalar::Int(value),
            Err(_) => Scalar::Float(value as f64),
        }))
    }

    fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(TranslationNode::Scalar(Scalar::Float(value)))
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(TranslationNode::text(value))
    }

    fn visit_string<E: serde::de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(TranslationNode::text(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<TranslationNode>()? {
            items.push(item);
        }
        Ok(TranslationNode::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = IndexMap::new();
        while let Some((key, value)) = map.next_entry::<String, TranslationNode>()? {
            entries.insert(key, value);
        }
        Ok(TranslationNode::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_mapping_parses_as_leaf() {
        let node = TranslationNode::from_yaml_str("en-US: Hello\nfr: Bonjour\nde: ~\n").unwrap();
        let TranslationNode::Leaf(leaf) = node else {
            panic!("expected a leaf, got {node:?}");
        };
        assert_eq!(leaf.get(Locale::EnUs), Some("Hello"));
        assert_eq!(leaf.get(Locale::Fr), Some("Bonjour"));
        assert_eq!(leaf.get(Locale::De), None);
        assert_eq!(leaf.len(), 2);
    }

    #[test]
    fn test_mixed_mapping_parses_as_record() {
        let node = TranslationNode::from_yaml_str(
            "title:\n  en-US: Title\nitems:\n  - en-US: One\n  - 2\ncount: 3\nflag: true\n",
        )
        .unwrap();
        let record = node.as_record().unwrap();
        assert!(matches!(record["title"], TranslationNode::Leaf(_)));
        assert!(matches!(record["items"], TranslationNode::Sequence(ref items) if items.len() == 2));
        assert_eq!(record["count"], TranslationNode::Scalar(Scalar::Int(3)));
        assert_eq!(record["flag"], TranslationNode::Scalar(Scalar::Bool(true)));
    }

    #[test]
    fn test_record_order_is_preserved() {
        let node = TranslationNode::from_yaml_str("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        let keys: Vec<&str> = node.as_record().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_empty_mapping_is_record() {
        let node = TranslationNode::from_yaml_str("{}").unwrap();
        assert_eq!(node, TranslationNode::default());
    }

    #[test]
    fn test_raw_translation_rejects_unknown_locale() {
        let result: Result<RawTranslation, _> = serde_yaml::from_str("en-US: Hi\nklingon: Qapla\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_localizations_use_locale_codes() {
        let leaf = RawTranslation::new()
            .with(Locale::EnUs, "ping")
            .with(Locale::PtBr, "pingue");
        let map = leaf.to_localizations();
        assert_eq!(map.get("pt-BR").map(String::as_str), Some("pingue"));
        assert_eq!(map.len(), 2);
    }
}
