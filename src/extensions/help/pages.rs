//! Help categories read from `pages/*.yml`.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::i18n::I18nError;
use crate::i18n::Locale;
use crate::i18n::RawTranslation;

#[derive(Debug, Clone, Deserialize)]
pub struct HelpPage {
    pub title: RawTranslation,
    pub description: RawTranslation,
    #[serde(default)]
    pub category: Option<RawTranslation>,
    #[serde(default)]
    pub quick_tips: Vec<RawTranslation>,
    #[serde(default)]
    pub examples: Vec<RawTranslation>,
    /// Names of commands the page talks about.
    #[serde(default)]
    pub related_commands: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelpCategory {
    pub name: RawTranslation,
    pub description: RawTranslation,
    pub pages: IndexMap<String, HelpPage>,
    /// Position among the categories.
    pub order: i64,
}

/// Every category in `dir`, sorted by `order`.
pub fn load_categories(dir: &Path) -> Result<Vec<HelpCategory>, I18nError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "yml" || ext == "yaml")
        })
        .collect();
    paths.sort();

    let mut categories = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        categories.push(serde_yaml::from_str::<HelpCategory>(&content)?);
    }
    categories.sort_by_key(|category| category.order);
    Ok(categories)
}

/// Section titles of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiStrings {
    pub quick_tips_title: String,
    pub examples_title: String,
    pub related_commands_title: String,
}

impl Default for UiStrings {
    fn default() -> Self {
        Self {
            quick_tips_title: "Quick tips".to_string(),
            examples_title: "Examples".to_string(),
            related_commands_title: "Related commands".to_string(),
        }
    }
}

/// One page in one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<(String, String)>,
}

fn text(translation: &RawTranslation, locale: Locale) -> String {
    translation
        .resolve(locale, Locale::default())
        .unwrap_or_default()
        .to_string()
}

fn bullets(items: impl Iterator<Item = String>) -> String {
    items
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders every page of every category, in order.
pub fn render_pages(categories: &[HelpCategory], locale: Locale, ui: &UiStrings) -> Vec<RenderedPage> {
    let mut rendered = Vec::new();
    for (i, category) in categories.iter().enumerate() {
        let category_name = text(&category.name, locale);
        for (j, page) in category.pages.values().enumerate() {
            let mut fields = Vec::new();
            if !page.quick_tips.is_empty() {
                fields.push((
                    ui.quick_tips_title.clone(),
                    bullets(page.quick_tips.iter().map(|tip| text(tip, locale))),
                ));
            }
            if !page.examples.is_empty() {
                fields.push((
                    ui.examples_title.clone(),
                    bullets(page.examples.iter().map(|example| text(example, locale))),
                ));
            }
            if !page.related_commands.is_empty() {
                fields.push((
                    ui.related_commands_title.clone(),
                    bullets(page.related_commands.iter().map(|name| format!("`/{name}`"))),
                ));
            }
            rendered.push(RenderedPage {
                title: format!("{} - {}", category_name, text(&page.title, locale)),
                description: text(&page.description, locale),
                color: gradient_color(i, j, 50, 10),
                fields,
            });
        }
    }
    rendered
}

const BASE_COLORS: [(f64, f64, f64); 11] = [
    (179.0, 229.0, 252.0),
    (225.0, 190.0, 231.0),
    (255.0, 209.0, 220.0),
    (255.0, 224.0, 178.0),
    (255.0, 255.0, 198.0),
    (200.0, 230.0, 201.0),
    (178.0, 255.0, 255.0),
    (187.0, 222.0, 251.0),
    (225.0, 190.0, 231.0),
    (255.0, 236.0, 179.0),
    (200.0, 230.0, 255.0),
];

/// Pastel colour from a two-dimensional gradient: `color_index` walks the base colours,
/// `shade_index` goes from a light grey tone of that colour towards white.
pub fn gradient_color(shade_index: usize, color_index: usize, max_shade: usize, max_color: usize) -> u32 {
    let shade = (shade_index as f64 / max_shade as f64).clamp(0.0, 1.0);
    let color = (color_index as f64 / max_color as f64).clamp(0.0, 1.0);

    let position = color * (BASE_COLORS.len() - 1) as f64;
    let low = position as usize;
    let high = (low + 1).min(BASE_COLORS.len() - 1);
    let blend = position - low as f64;

    let (l, h) = (BASE_COLORS[low], BASE_COLORS[high]);
    let base = [l.0, l.1, l.2]
        .into_iter()
        .zip([h.0, h.1, h.2])
        .map(|(a, b)| (a * (1.0 - blend) + b * blend).trunc())
        .collect::<Vec<_>>();

    let channels: Vec<u32> = if shade < 0.5 {
        let factor = shade * 2.0;
        base.iter()
            .map(|c| {
                let dark = (c * 0.8).max(180.0);
                (dark + (c - dark) * factor) as u32
            })
            .collect()
    } else {
        let factor = (shade - 0.5) * 2.0;
        base.iter()
            .map(|c| (c * (1.0 - factor) + 255.0 * factor) as u32)
            .collect()
    };
    (channels[0] << 16) | (channels[1] << 8) | channels[2]
}
