//! Supported locales.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::i18n::I18nError;

macro_rules! locales {
    ($($variant:ident => $code:literal),* $(,)?) => {
        /// The closed set of locales Discord supports.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Locale {
            $($variant),*
        }

        impl Locale {
            pub const ALL: &'static [Locale] = &[$(Locale::$variant),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Locale::$variant => $code),*
                }
            }
        }

        impl FromStr for Locale {
            type Err = I18nError;

            /// Accepts `-` and `_` as the separator.
            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.replace('_', "-").as_str() {
                    $($code => Ok(Locale::$variant),)*
                    _ => Err(I18nError::InvalidLocale(value.to_string())),
                }
            }
        }
    };
}

locales! {
    EnUs => "en-US",
    EnGb => "en-GB",
    Bg => "bg",
    ZhCn => "zh-CN",
    ZhTw => "zh-TW",
    Hr => "hr",
    Cs => "cs",
    Da => "da",
    Nl => "nl",
    Fi => "fi",
    Fr => "fr",
    De => "de",
    El => "el",
    Hi => "hi",
    Hu => "hu",
    It => "it",
    Ja => "ja",
    Ko => "ko",
    Lt => "lt",
    No => "no",
    Pl => "pl",
    PtBr => "pt-BR",
    Ro => "ro",
    Ru => "ru",
    EsEs => "es-ES",
    Es419 => "es-419",
    SvSe => "sv-SE",
    Th => "th",
    Tr => "tr",
    Uk => "uk",
    Vi => "vi",
}

impl Default for Locale {
    fn default() -> Self {
        Self::EnUs
    }
}

impl Locale {
    /// Parses an optional locale, `None` meaning the default locale.
    pub fn parse_or_default(value: Option<&str>) -> Result<Self, I18nError> {
        value.map_or(Ok(Self::default()), str::parse)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
