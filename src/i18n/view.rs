//! Lazy locale-bound views over translation trees.

use std::cell::Cell;
use std::fmt;

use crate::i18n::I18nError;
use crate::i18n::Locale;
use crate::i18n::Scalar;
use crate::i18n::TranslationNode;

/// A borrowed translation tree read through a locale.
///
/// Leaves are resolved when they are reached: to the string of the view's locale, else of
/// its default locale. Records and sequences come back as child views sharing the locales
/// the parent had at that moment. The locales sit in cells, so retargeting a view is seen
/// through every reference to it.
pub struct View<'a> {
    node: &'a TranslationNode,
    locale: Cell<Locale>,
    default: Cell<Locale>,
    path: String,
}

/// The result of one lookup through a [`View`].
#[derive(Debug)]
pub enum Resolved<'a> {
    Null,
    Text(&'a str),
    Scalar(&'a Scalar),
    View(View<'a>),
}

impl<'a> Resolved<'a> {
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_view(self) -> Option<View<'a>> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Resolved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::View(view) => write!(f, "<{} {}>", view.node.kind(), view.path),
        }
    }
}

impl<'a> View<'a> {
    pub fn new(node: &'a TranslationNode, locale: Locale, default: Locale) -> Self {
        Self::at(node, locale, default, String::new())
    }

    fn at(node: &'a TranslationNode, locale: Locale, default: Locale, path: String) -> Self {
        Self {
            node,
            locale: Cell::new(locale),
            default: Cell::new(default),
            path,
        }
    }

    pub fn node(&self) -> &'a TranslationNode {
        self.node
    }

    /// Dotted path of this view from the root it was created over.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn locale(&self) -> Locale {
        self.locale.get()
    }

    pub fn default_locale(&self) -> Locale {
        self.default.get()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.locale.set(locale);
    }

    pub fn set_default_locale(&self, locale: Locale) {
        self.default.set(locale);
    }

    /// Retargets this view; `None` means the default locale.
    pub fn apply_locale(
        &self,
        locale: Option<&str>,
        default: Option<&str>,
    ) -> Result<&Self, I18nError> {
        crate::i18n::apply_locale(self, locale, default)
    }

    fn child_path(&self, segment: &str) -> String {
        if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.path, segment)
        }
    }

    fn wrap_value(&self, node: &'a TranslationNode, path: String) -> Result<Resolved<'a>, I18nError> {
        match node {
            TranslationNode::Null => Ok(Resolved::Null),
            TranslationNode::Scalar(Scalar::Str(text)) => Ok(Resolved::Text(text)),
            TranslationNode::Scalar(scalar) => Ok(Resolved::Scalar(scalar)),
            TranslationNode::Leaf(leaf) => leaf
                .resolve(self.locale(), self.default_locale())
                .map(Resolved::Text)
                .ok_or(I18nError::MissingTranslation {
                    path,
                    locale: self.locale(),
                }),
            TranslationNode::Record(_) | TranslationNode::Sequence(_) => Ok(Resolved::View(
                View::at(node, self.locale(), self.default_locale(), path),
            )),
        }
    }

    /// Looks up a field of a record.
    pub fn get(&self, key: &str) -> Result<Resolved<'a>, I18nError> {
        let TranslationNode::Record(fields) = self.node else {
            return Err(I18nError::NotARecord {
                path: self.path.clone(),
            });
        };
        let path = self.child_path(key);
        match fields.get(key) {
            Some(node) => self.wrap_value(node, path),
            None => Err(I18nError::KeyNotFound { path }),
        }
    }

    /// Looks up a field that must resolve to a string.
    pub fn text(&self, key: &str) -> Result<&'a str, I18nError> {
        self.get(key)?.as_text().ok_or_else(|| I18nError::NotText {
            path: self.child_path(key),
        })
    }

    /// Looks up an item of a sequence.
    pub fn index(&self, index: usize) -> Result<Resolved<'a>, I18nError> {
        let TranslationNode::Sequence(items) = self.node else {
            return Err(I18nError::NotASequence {
                path: self.path.clone(),
            });
        };
        match items.get(index) {
            Some(node) => self.wrap_value(node, self.child_path(&index.to_string())),
            None => Err(I18nError::IndexOutOfRange {
                path: self.path.clone(),
                index,
            }),
        }
    }

    /// Follows a dotted path such as `pages.0.title`. Numeric segments index sequences.
    pub fn resolve(&self, path: &str) -> Result<Resolved<'a>, I18nError> {
        let mut current = Resolved::View(View::at(
            self.node,
            self.locale(),
            self.default_locale(),
            self.path.clone(),
        ));
        for segment in path.split('.') {
            let view = match current {
                Resolved::View(view) => view,
                _ => {
                    return Err(I18nError::NotARecord {
                        path: path.to_string(),
                    });
                }
            };
            current = match (view.node, segment.parse::<usize>()) {
                (TranslationNode::Sequence(_), Ok(index)) => view.index(index)?,
                _ => view.get(segment)?,
            };
        }
        Ok(current)
    }

    /// Items of a sequence, each resolved as it is reached. A record yields its keys.
    pub fn iter(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<Resolved<'a>, I18nError>> + '_>, I18nError> {
        match self.node {
            TranslationNode::Sequence(items) => Ok(Box::new(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, node)| self.wrap_value(node, self.child_path(&i.to_string()))),
            )),
            TranslationNode::Record(fields) => Ok(Box::new(
                fields.keys().map(|key| Ok(Resolved::Text(key.as_str()))),
            )),
            _ => Err(I18nError::NotASequence {
                path: self.path.clone(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self.node {
            TranslationNode::Record(fields) => fields.len(),
            TranslationNode::Sequence(items) => items.len(),
            TranslationNode::Leaf(leaf) => leaf.len(),
            TranslationNode::Null | TranslationNode::Scalar(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Result<impl Iterator<Item = &'a str>, I18nError> {
        let TranslationNode::Record(fields) = self.node else {
            return Err(I18nError::NotARecord {
                path: self.path.clone(),
            });
        };
        Ok(fields.keys().map(String::as_str))
    }

    pub fn values(
        &self,
    ) -> Result<impl Iterator<Item = Result<Resolved<'a>, I18nError>> + '_, I18nError> {
        Ok(self.items()?.map(|(_, value)| value))
    }

    pub fn items(
        &self,
    ) -> Result<impl Iterator<Item = (&'a str, Result<Resolved<'a>, I18nError>)> + '_, I18nError>
    {
        let TranslationNode::Record(fields) = self.node else {
            return Err(I18nError::NotARecord {
                path: self.path.clone(),
            });
        };
        Ok(fields.iter().map(|(key, node)| {
            (
                key.as_str(),
                self.wrap_value(node, self.child_path(key)),
            )
        }))
    }
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("path", &self.path)
            .field("kind", &self.node.kind())
            .field("locale", &self.locale())
            .field("default", &self.default_locale())
            .finish()
    }
}
