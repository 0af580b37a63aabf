//! Style selection: the four facets every generation request needs.
//!
//! The option lists come from the style catalog collaborator (here, the
//! `[catalog]` config section). The core only checks that every facet has
//! been chosen; whether a value appears in the catalog is the catalog's
//! business.

use crate::config::CatalogConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four required style dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    ModelType,
    Background,
    Style,
    Lighting,
}

impl Facet {
    pub const ALL: [Facet; 4] = [
        Facet::ModelType,
        Facet::Background,
        Facet::Style,
        Facet::Lighting,
    ];
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Facet::ModelType => "model type",
            Facet::Background => "background",
            Facet::Style => "style",
            Facet::Lighting => "lighting",
        })
    }
}

/// The user's style choice. Facets are optional until submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleChoice {
    pub model_type: Option<String>,
    pub background: Option<String>,
    pub style: Option<String>,
    pub lighting: Option<String>,
}

impl StyleChoice {
    /// A choice with all four facets set.
    pub fn complete(
        model_type: impl Into<String>,
        background: impl Into<String>,
        style: impl Into<String>,
        lighting: impl Into<String>,
    ) -> Self {
        Self {
            model_type: Some(model_type.into()),
            background: Some(background.into()),
            style: Some(style.into()),
            lighting: Some(lighting.into()),
        }
    }

    pub fn get(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::ModelType => self.model_type.as_deref(),
            Facet::Background => self.background.as_deref(),
            Facet::Style => self.style.as_deref(),
            Facet::Lighting => self.lighting.as_deref(),
        }
    }

    pub fn set(&mut self, facet: Facet, value: impl Into<String>) {
        let slot = match facet {
            Facet::ModelType => &mut self.model_type,
            Facet::Background => &mut self.background,
            Facet::Style => &mut self.style,
            Facet::Lighting => &mut self.lighting,
        };
        *slot = Some(value.into());
    }

    /// Facets that are unset or blank, in canonical order.
    pub fn missing_facets(&self) -> Vec<Facet> {
        Facet::ALL
            .into_iter()
            .filter(|&f| self.get(f).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_facets().is_empty()
    }
}

/// Option lists for each facet, as offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCatalog {
    pub model_types: Vec<String>,
    pub backgrounds: Vec<String>,
    pub styles: Vec<String>,
    pub lighting: Vec<String>,
}

impl StyleCatalog {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            model_types: config.model_types.clone(),
            backgrounds: config.backgrounds.clone(),
            styles: config.styles.clone(),
            lighting: config.lighting.clone(),
        }
    }

    pub fn options(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::ModelType => &self.model_types,
            Facet::Background => &self.backgrounds,
            Facet::Style => &self.styles,
            Facet::Lighting => &self.lighting,
        }
    }

    /// A complete choice using the first option of every facet.
    ///
    /// Returns `None` if any facet has no options.
    pub fn first_choice(&self) -> Option<StyleChoice> {
        let mut choice = StyleChoice::default();
        for facet in Facet::ALL {
            choice.set(facet, self.options(facet).first()?.clone());
        }
        Some(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_choice_misses_all_facets() {
        assert_eq!(StyleChoice::default().missing_facets(), Facet::ALL.to_vec());
    }

    #[test]
    fn complete_choice_has_no_missing_facets() {
        let c = StyleChoice::complete("female", "studio", "minimal", "soft");
        assert!(c.is_complete());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut c = StyleChoice::complete("female", "studio", "minimal", "soft");
        c.set(Facet::Lighting, "  ");
        assert_eq!(c.missing_facets(), vec![Facet::Lighting]);
    }

    #[test]
    fn missing_facets_keep_canonical_order() {
        let mut c = StyleChoice::default();
        c.set(Facet::Background, "outdoor");
        c.set(Facet::ModelType, "male");
        assert_eq!(c.missing_facets(), vec![Facet::Style, Facet::Lighting]);
    }

    #[test]
    fn catalog_first_choice_is_complete() {
        let catalog = StyleCatalog::from_config(&CatalogConfig::default());
        let choice = catalog.first_choice().unwrap();
        assert!(choice.is_complete());
        assert_eq!(choice.model_type.as_deref(), catalog.model_types.first().map(String::as_str));
    }

    #[test]
    fn catalog_without_options_has_no_first_choice() {
        let mut config = CatalogConfig::default();
        config.lighting.clear();
        assert!(StyleCatalog::from_config(&config).first_choice().is_none());
    }
}
